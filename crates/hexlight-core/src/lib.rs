//! Hexlight - layout engine for a lit hexagonal game board
//!
//! This crate provides the platform-agnostic half of the board controller:
//! - Resource kinds and the colors each tile shows on its light
//! - The static neighbor table of the 19 board positions
//! - Randomized layout generation with the optional high-number spacing rule
//! - The board record shared with the light controller
//!
//! Nothing here touches hardware or async runtimes; the server crate drives
//! the lights.
//!
//! # Modules
//!
//! - [`palette`]: Resource kinds, terrain and colors
//! - [`adjacency`]: Position numbering and neighbor table
//! - [`layout`]: Board configuration and the layout generator
//! - [`board`]: Current board state and roll lookups

pub mod adjacency;
pub mod board;
pub mod layout;
pub mod palette;

// Re-export commonly used types
pub use adjacency::{AdjacencyGraph, CENTER, POSITION_COUNT};
pub use board::{BoardState, MatchingTile, Mode};
pub use layout::{
    generate, generate_with_rng, unit_for_position, BoardConfiguration, ConfigError, Layout, Tile,
    ALERT_VALUE, DEFAULT_MAX_ATTEMPTS, HIGH_VALUES, RESOURCE_TILE_COUNT, STANDARD_NUMBERS,
};
pub use palette::{hue_to_rgb, ColorPalette, Resource, Rgb, Terrain};
