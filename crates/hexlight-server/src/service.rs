//! Board service: the single board plus the lights that show it.
//!
//! Every request-facing operation lives here. Board mutations happen under
//! one lock; animations are handed to the coordinator and run in the
//! background after the call returns.

use crate::animation::{AnimationCoordinator, AnimationError};
use hexlight_core::{
    generate, BoardConfiguration, BoardState, ConfigError, MatchingTile, Mode, Rgb, ALERT_VALUE,
    POSITION_COUNT,
};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Invalid roll value {value:?}, expected 2-12")]
    InvalidRoll { value: Option<i32> },

    #[error("Invalid tile index {0}, expected 0-18")]
    InvalidTile(i32),

    #[error(transparent)]
    Animation(#[from] AnimationError),
}

/// A dice roll request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RollRequest {
    /// Roll two dice instead of using `value`
    #[serde(default)]
    pub auto: bool,
    /// Manually entered total
    #[serde(default)]
    pub value: Option<i32>,
}

impl RollRequest {
    pub fn auto() -> Self {
        Self {
            auto: true,
            value: None,
        }
    }

    pub fn manual(value: i32) -> Self {
        Self {
            auto: false,
            value: Some(value),
        }
    }
}

/// Which animation a roll started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollAnimation {
    Highlight,
    Alert,
}

/// Result of a roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    /// Individual dice, absent for manual rolls
    pub die1: Option<u8>,
    pub die2: Option<u8>,
    pub total: u8,
    pub matching: Vec<MatchingTile>,
    pub animation: RollAnimation,
}

/// Result of a single-unit flash request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashOutcome {
    pub tile_index: usize,
    pub unit: usize,
}

pub struct BoardService {
    board: Mutex<BoardState>,
    animations: AnimationCoordinator,
    max_attempts: usize,
}

impl BoardService {
    pub fn new(
        config: BoardConfiguration,
        animations: AnimationCoordinator,
        max_attempts: usize,
    ) -> Self {
        Self {
            board: Mutex::new(BoardState::new(config)),
            animations,
            max_attempts,
        }
    }

    /// Start the idle animation on the empty board
    pub fn init(&self) {
        self.animations.start_idle();
        info!(units = self.animations.unit_count(), "Board initialized");
    }

    pub fn animations(&self) -> &AnimationCoordinator {
        &self.animations
    }

    /// Snapshot of the current board
    pub fn state(&self) -> BoardState {
        self.board.lock().clone()
    }

    pub fn config(&self) -> BoardConfiguration {
        self.board.lock().config.clone()
    }

    /// Store a configuration for the next layout without generating one
    pub fn update_config(
        &self,
        config: BoardConfiguration,
    ) -> Result<BoardConfiguration, ServiceError> {
        config.validate()?;
        self.board.lock().config = config.clone();
        Ok(config)
    }

    /// Generate a new layout, store it and paint it.
    ///
    /// Uses the stored configuration when none is given.
    pub async fn randomize(
        &self,
        config: Option<BoardConfiguration>,
    ) -> Result<BoardState, ServiceError> {
        let config = config.unwrap_or_else(|| self.config());
        config.validate()?;

        self.animations.stop_idle().await;

        let layout = generate(&config, self.max_attempts)?;
        if layout.constraint_met {
            debug!(attempts = layout.attempts, "Layout generated");
        } else {
            warn!(
                attempts = layout.attempts,
                "No layout kept high numbers apart, using the last attempt"
            );
        }

        let state = {
            let mut board = self.board.lock();
            board.apply_layout(config, layout);
            board.clone()
        };
        self.animations.paint_static(&state.tiles);

        info!("Board randomized");
        Ok(state)
    }

    /// Switch to play mode; the idle animation stops for good
    pub async fn start_game(&self) -> BoardState {
        let state = {
            let mut board = self.board.lock();
            board.mode = Mode::Play;
            board.clone()
        };
        self.animations.stop_idle().await;
        info!("Game started");
        state
    }

    /// Back to setup mode. An empty board gets its idle animation back; a
    /// laid out board keeps its resource colors.
    pub fn back_to_setup(&self) -> BoardState {
        let state = {
            let mut board = self.board.lock();
            board.mode = Mode::Setup;
            // Started under the board lock so a layout cannot land between
            // the check and the start
            if !board.is_laid_out() {
                self.animations.start_idle();
            }
            board.clone()
        };
        info!("Back to setup");
        state
    }

    /// Resolve a roll and start its animation in the background
    pub fn roll(&self, request: RollRequest) -> Result<RollOutcome, ServiceError> {
        if self.animations.is_alert_active() {
            return Err(AnimationError::Busy.into());
        }

        let (die1, die2, total) = if request.auto {
            let mut rng = rand::thread_rng();
            let a: u8 = rng.gen_range(1..=6);
            let b: u8 = rng.gen_range(1..=6);
            (Some(a), Some(b), a + b)
        } else {
            match request.value {
                Some(v) if (2..=12).contains(&v) => (None, None, v as u8),
                value => return Err(ServiceError::InvalidRoll { value }),
            }
        };

        let matching = self.board.lock().matching_tiles(total);

        let animation = if total == ALERT_VALUE {
            self.animations.start_alert()?;
            RollAnimation::Alert
        } else {
            let units = matching.iter().filter_map(|m| m.unit).collect();
            self.animations.start_highlight(units)?;
            RollAnimation::Highlight
        };

        info!(total, matches = matching.len(), "Rolled");
        Ok(RollOutcome {
            die1,
            die2,
            total,
            matching,
            animation,
        })
    }

    /// Blink the light under one tile
    pub fn flash_unit(&self, tile_index: i32) -> Result<FlashOutcome, ServiceError> {
        if self.animations.is_alert_active() {
            return Err(AnimationError::Busy.into());
        }
        let tile_index = usize::try_from(tile_index)
            .ok()
            .filter(|&index| index < POSITION_COUNT)
            .ok_or(ServiceError::InvalidTile(tile_index))?;

        let unit = self.board.lock().tile(tile_index).and_then(|t| t.unit);
        let unit = unit.ok_or(AnimationError::NoIndicator(tile_index))?;
        self.animations.start_single_flash(unit)?;

        Ok(FlashOutcome { tile_index, unit })
    }

    /// Colors used for each terrain
    pub fn palette(&self) -> BTreeMap<String, Rgb> {
        self.animations.palette().entries()
    }
}
