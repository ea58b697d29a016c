//! WebSocket protocol messages for the board controller.

use crate::animation::AnimationError;
use crate::service::{FlashOutcome, RollOutcome, ServiceError};
use hexlight_core::{BoardConfiguration, BoardState, Rgb};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Request the current board
    GetState,

    /// Generate a new layout, optionally with a new configuration
    Randomize {
        #[serde(default)]
        config: Option<BoardConfiguration>,
    },

    /// Switch to play mode
    StartGame,

    /// Switch back to setup mode
    BackToSetup,

    /// Request the stored configuration
    GetConfig,

    /// Replace the stored configuration
    UpdateConfig { config: BoardConfiguration },

    /// Roll the dice or enter a total by hand
    Roll {
        #[serde(default)]
        auto: bool,
        #[serde(default)]
        value: Option<i32>,
    },

    /// Blink the light under one tile. Signed so a negative index is
    /// reported as an invalid tile rather than a malformed message.
    FlashUnit { tile_index: i32 },

    /// Request the terrain colors
    GetPalette,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned client ID
    Welcome { client_id: Uuid },

    /// Board state, sent on request and after every change
    BoardState { state: BoardState },

    /// Stored configuration
    Config { config: BoardConfiguration },

    /// Dice result and the tiles it lit
    RollResult { outcome: RollOutcome },

    /// Outcome of a flash request
    FlashResult {
        status: FlashStatus,
        tile_index: i32,
        unit: Option<usize>,
    },

    /// Terrain name to color
    Palette { colors: BTreeMap<String, Rgb> },

    /// Request failed
    Error { kind: ErrorKind, message: String },

    /// Pong response
    Pong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashStatus {
    Flashing,
    NoIndicator,
    AlreadyFlashing,
    AlertInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidConfig,
    InvalidRoll,
    InvalidTile,
    Busy,
    AlreadyFlashing,
    NoIndicator,
    UnitOutOfRange,
    Malformed,
}

impl From<&ServiceError> for ErrorKind {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::Configuration(_) => ErrorKind::InvalidConfig,
            ServiceError::InvalidRoll { .. } => ErrorKind::InvalidRoll,
            ServiceError::InvalidTile(_) => ErrorKind::InvalidTile,
            ServiceError::Animation(AnimationError::Busy) => ErrorKind::Busy,
            ServiceError::Animation(AnimationError::AlreadyFlashing(_)) => {
                ErrorKind::AlreadyFlashing
            }
            ServiceError::Animation(AnimationError::NoIndicator(_)) => ErrorKind::NoIndicator,
            ServiceError::Animation(AnimationError::UnitOutOfRange { .. }) => {
                ErrorKind::UnitOutOfRange
            }
        }
    }
}

impl ServerMessage {
    pub fn error(err: &ServiceError) -> Self {
        ServerMessage::Error {
            kind: err.into(),
            message: err.to_string(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            kind: ErrorKind::Malformed,
            message: message.into(),
        }
    }

    /// Reply for a flash request.
    ///
    /// Contention and the desert are statuses, not errors.
    pub fn flash(tile_index: i32, result: Result<FlashOutcome, ServiceError>) -> Self {
        let (status, unit) = match result {
            Ok(outcome) => (FlashStatus::Flashing, Some(outcome.unit)),
            Err(ServiceError::Animation(AnimationError::NoIndicator(_))) => {
                (FlashStatus::NoIndicator, None)
            }
            Err(ServiceError::Animation(AnimationError::AlreadyFlashing(unit))) => {
                (FlashStatus::AlreadyFlashing, Some(unit))
            }
            Err(ServiceError::Animation(AnimationError::Busy)) => {
                (FlashStatus::AlertInProgress, None)
            }
            Err(err) => return ServerMessage::error(&err),
        };
        ServerMessage::FlashResult {
            status,
            tile_index,
            unit,
        }
    }
}
