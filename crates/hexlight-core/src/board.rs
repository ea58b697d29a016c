//! The board record: current tiles, mode and configuration.
//!
//! There is exactly one board per process. It starts empty, gets replaced
//! wholesale by layout generation and is queried when dice are rolled.

use crate::adjacency::POSITION_COUNT;
use crate::layout::{BoardConfiguration, Layout, Tile};
use crate::palette::Resource;
use serde::{Deserialize, Serialize};

/// What the board is being used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Arranging tiles and testing lights
    #[default]
    Setup,
    /// A game is running; rolls drive the lights
    Play,
}

/// A tile whose number matched a roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingTile {
    /// Board position
    pub index: usize,
    pub resource: Option<Resource>,
    pub unit: Option<usize>,
}

/// Current board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    pub tiles: Vec<Tile>,
    pub mode: Mode,
    pub config: BoardConfiguration,
}

impl BoardState {
    /// Empty board with the given configuration
    pub fn new(config: BoardConfiguration) -> Self {
        Self {
            tiles: (0..POSITION_COUNT).map(Tile::empty).collect(),
            mode: Mode::Setup,
            config,
        }
    }

    /// Whether a layout has been generated
    pub fn is_laid_out(&self) -> bool {
        self.tiles.iter().any(|t| t.terrain.is_some())
    }

    /// Get a tile by position
    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// Replace the tiles with a generated layout. Returns to setup mode.
    pub fn apply_layout(&mut self, config: BoardConfiguration, layout: Layout) {
        self.tiles = layout.tiles;
        self.config = config;
        self.mode = Mode::Setup;
    }

    /// Tiles whose number token equals the roll
    pub fn matching_tiles(&self, total: u8) -> Vec<MatchingTile> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.number == Some(total))
            .map(|(index, t)| MatchingTile {
                index,
                resource: t.resource(),
                unit: t.unit,
            })
            .collect()
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new(BoardConfiguration::standard())
    }
}
