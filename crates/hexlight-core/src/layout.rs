//! Randomized board layout generation.
//!
//! This module contains:
//! - The tile record stored per board position
//! - The board configuration (resource counts, number tokens, options)
//! - The generator that shuffles resources and numbers onto the board,
//!   optionally keeping the high-probability numbers apart

use crate::adjacency::{AdjacencyGraph, CENTER, POSITION_COUNT};
use crate::palette::{Resource, Terrain};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Number of positions that carry a resource (everything but the center)
pub const RESOURCE_TILE_COUNT: usize = POSITION_COUNT - 1;

/// Roll total that flashes every light instead of highlighting tiles
pub const ALERT_VALUE: u8 = 7;

/// Roll totals kept apart when `prevent_adjacent_high` is set
pub const HIGH_VALUES: [u8; 2] = [ALERT_VALUE - 1, ALERT_VALUE + 1];

/// Default attempt budget for the number shuffle
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// Standard number tokens (no 7, the desert gets none)
pub const STANDARD_NUMBERS: [u8; RESOURCE_TILE_COUNT] =
    [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

/// Light unit wired to each position. The center has no light.
const UNIT_FOR_POSITION: [Option<usize>; POSITION_COUNT] = [
    None,
    Some(0),
    Some(1),
    Some(2),
    Some(3),
    Some(4),
    Some(5),
    Some(6),
    Some(7),
    Some(8),
    Some(9),
    Some(10),
    Some(11),
    Some(12),
    Some(13),
    Some(14),
    Some(15),
    Some(16),
    Some(17),
];

/// Light unit attached to a board position, if any
pub fn unit_for_position(position: usize) -> Option<usize> {
    UNIT_FOR_POSITION.get(position).copied().flatten()
}

/// Errors from validating a board configuration
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("Resources must add up to {expected}, got {got}")]
    ResourceCount { expected: usize, got: usize },

    #[error("Expected {expected} number tokens, got {got}")]
    TokenCount { expected: usize, got: usize },

    #[error("Number token {0} is reserved for the alert roll")]
    ReservedToken(u8),

    #[error("Number token {0} is not a possible roll")]
    TokenOutOfRange(u8),

    #[error("Malformed configuration: {0}")]
    Malformed(String),
}

/// A single board position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// What the position holds (`None` before the first layout)
    pub terrain: Option<Terrain>,
    /// Number token (2-12, `None` for the desert)
    pub number: Option<u8>,
    /// Light unit index (`None` for the center)
    pub unit: Option<usize>,
}

impl Tile {
    /// An unassigned position with its light wiring
    pub fn empty(position: usize) -> Self {
        Self {
            terrain: None,
            number: None,
            unit: unit_for_position(position),
        }
    }

    /// The center desert tile
    pub fn desert() -> Self {
        Self {
            terrain: Some(Terrain::Desert),
            number: None,
            unit: None,
        }
    }

    /// Get the resource this tile produces, if any
    pub fn resource(&self) -> Option<Resource> {
        self.terrain.and_then(|t| t.resource())
    }
}

/// Inputs to layout generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfiguration {
    /// How many tiles of each resource (the desert is implicit)
    pub resources: BTreeMap<Resource, usize>,
    /// Number tokens dealt onto the resource tiles
    pub numbers: Vec<u8>,
    /// Keep the high-value tokens off neighboring tiles
    #[serde(default)]
    pub prevent_adjacent_high: bool,
}

impl BoardConfiguration {
    /// Standard distribution: 3 brick, 4 wood, 4 sheep, 4 wheat, 3 ore
    pub fn standard() -> Self {
        let resources = [
            (Resource::Brick, 3),
            (Resource::Wood, 4),
            (Resource::Sheep, 4),
            (Resource::Wheat, 4),
            (Resource::Ore, 3),
        ]
        .into_iter()
        .collect();

        Self {
            resources,
            numbers: STANDARD_NUMBERS.to_vec(),
            prevent_adjacent_high: false,
        }
    }

    /// Parse a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Total resource tiles requested
    pub fn resource_total(&self) -> usize {
        self.resources.values().sum()
    }

    /// Check the resource counts only
    pub fn validate_resources(&self) -> Result<(), ConfigError> {
        let got = self.resource_total();
        if got != RESOURCE_TILE_COUNT {
            return Err(ConfigError::ResourceCount {
                expected: RESOURCE_TILE_COUNT,
                got,
            });
        }
        Ok(())
    }

    /// Check resource counts and number tokens
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_resources()?;

        if self.numbers.len() != RESOURCE_TILE_COUNT {
            return Err(ConfigError::TokenCount {
                expected: RESOURCE_TILE_COUNT,
                got: self.numbers.len(),
            });
        }
        for &n in &self.numbers {
            if n == ALERT_VALUE {
                return Err(ConfigError::ReservedToken(n));
            }
            if !(2..=12).contains(&n) {
                return Err(ConfigError::TokenOutOfRange(n));
            }
        }
        Ok(())
    }

    /// One entry per resource tile, in a fixed order
    fn resource_list(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .flat_map(|(&resource, &count)| std::iter::repeat(resource).take(count))
            .collect()
    }
}

impl Default for BoardConfiguration {
    fn default() -> Self {
        Self::standard()
    }
}

/// A generated layout and how it was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// All 19 positions, desert first
    pub tiles: Vec<Tile>,
    /// Number shuffles tried
    pub attempts: usize,
    /// False only when the adjacency constraint was requested and no shuffle
    /// within the budget satisfied it
    pub constraint_met: bool,
}

/// Generate a layout using the thread-local rng
pub fn generate(config: &BoardConfiguration, max_attempts: usize) -> Result<Layout, ConfigError> {
    let mut rng = rand::thread_rng();
    generate_with_rng(config, max_attempts, &mut rng)
}

/// Generate a layout with a provided rng.
///
/// Resources are shuffled once. Number tokens are reshuffled up to
/// `max_attempts` times (at least once) while `prevent_adjacent_high` is set
/// and two high tokens touch. If the budget runs out the last shuffle is
/// kept and [`Layout::constraint_met`] is false.
pub fn generate_with_rng<R: Rng + ?Sized>(
    config: &BoardConfiguration,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Layout, ConfigError> {
    config.validate()?;

    let mut resources = config.resource_list();
    resources.shuffle(rng);

    let mut tiles = Vec::with_capacity(POSITION_COUNT);
    tiles.push(Tile::desert());
    for (i, resource) in resources.into_iter().enumerate() {
        let position = i + 1;
        tiles.push(Tile {
            terrain: Some(Terrain::Resource(resource)),
            number: None,
            unit: unit_for_position(position),
        });
    }

    let graph = AdjacencyGraph::standard();
    let mut numbers = config.numbers.clone();
    let budget = max_attempts.max(1);
    let mut attempts = 0;
    let mut constraint_met = true;

    while attempts < budget {
        attempts += 1;
        numbers.shuffle(rng);
        for (tile, &n) in tiles.iter_mut().skip(1).zip(numbers.iter()) {
            tile.number = Some(n);
        }

        if !config.prevent_adjacent_high {
            break;
        }
        let values: Vec<Option<u8>> = tiles.iter().map(|t| t.number).collect();
        constraint_met = !graph.is_constraint_violated(&values, &HIGH_VALUES);
        if constraint_met {
            break;
        }
    }

    debug_assert_eq!(tiles[CENTER], Tile::desert());

    Ok(Layout {
        tiles,
        attempts,
        constraint_met,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_standard_config_is_valid() {
        assert_eq!(BoardConfiguration::standard().validate(), Ok(()));
    }

    #[test]
    fn test_resource_count_must_be_18() {
        let mut config = BoardConfiguration::standard();
        config.resources.insert(Resource::Ore, 2);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ResourceCount {
                expected: 18,
                got: 17
            })
        );

        config.resources.insert(Resource::Ore, 4);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ResourceCount {
                expected: 18,
                got: 19
            })
        );
    }

    #[test]
    fn test_alert_token_is_rejected() {
        let mut config = BoardConfiguration::standard();
        config.numbers[0] = 7;
        assert_eq!(config.validate(), Err(ConfigError::ReservedToken(7)));
    }

    #[test]
    fn test_token_count_and_range() {
        let mut config = BoardConfiguration::standard();
        config.numbers.pop();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TokenCount { got: 17, .. })
        ));

        let mut config = BoardConfiguration::standard();
        config.numbers[0] = 13;
        assert_eq!(config.validate(), Err(ConfigError::TokenOutOfRange(13)));
    }

    #[test]
    fn test_generate_rejects_bad_counts() {
        let mut config = BoardConfiguration::standard();
        config.resources.insert(Resource::Wood, 5);
        assert!(generate(&config, DEFAULT_MAX_ATTEMPTS).is_err());
    }

    #[test]
    fn test_desert_fixed_at_center() {
        let mut rng = StdRng::seed_from_u64(7);
        let layout =
            generate_with_rng(&BoardConfiguration::standard(), DEFAULT_MAX_ATTEMPTS, &mut rng)
                .unwrap();

        assert_eq!(layout.tiles.len(), POSITION_COUNT);
        assert_eq!(layout.tiles[0], Tile::desert());
        assert!(layout.tiles[1..]
            .iter()
            .all(|t| t.resource().is_some() && t.number.is_some()));
    }

    #[test]
    fn test_units_independent_of_shuffle() {
        let config = BoardConfiguration::standard();
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let layout = generate_with_rng(&config, DEFAULT_MAX_ATTEMPTS, &mut rng).unwrap();
            let units: Vec<_> = layout.tiles.iter().map(|t| t.unit).collect();
            assert_eq!(units, UNIT_FOR_POSITION.to_vec());
        }
    }

    #[test]
    fn test_unconstrained_uses_single_attempt() {
        let mut rng = StdRng::seed_from_u64(1);
        let layout =
            generate_with_rng(&BoardConfiguration::standard(), DEFAULT_MAX_ATTEMPTS, &mut rng)
                .unwrap();
        assert_eq!(layout.attempts, 1);
        assert!(layout.constraint_met);
    }

    #[test]
    fn test_zero_budget_still_deals_numbers() {
        let mut rng = StdRng::seed_from_u64(3);
        let layout = generate_with_rng(&BoardConfiguration::standard(), 0, &mut rng).unwrap();
        assert_eq!(layout.attempts, 1);
        assert!(layout.tiles[1..].iter().all(|t| t.number.is_some()));
    }

    #[test]
    fn test_exhausted_budget_returns_last_attempt() {
        // Every token is a high value, so no arrangement can satisfy the rule
        let mut config = BoardConfiguration::standard();
        config.numbers = vec![6; RESOURCE_TILE_COUNT];
        config.prevent_adjacent_high = true;

        let mut rng = StdRng::seed_from_u64(11);
        let layout = generate_with_rng(&config, 5, &mut rng).unwrap();

        assert_eq!(layout.attempts, 5);
        assert!(!layout.constraint_met);
        assert!(layout.tiles[1..].iter().all(|t| t.number == Some(6)));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "resources": {"brick": 3, "wood": 4, "sheep": 4, "wheat": 4, "ore": 3},
            "numbers": [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12]
        }"#;
        let config = BoardConfiguration::from_json(json).unwrap();
        assert_eq!(config, BoardConfiguration::standard());

        let short = r#"{"resources": {"brick": 3}, "numbers": []}"#;
        assert!(matches!(
            BoardConfiguration::from_json(short),
            Err(ConfigError::ResourceCount { got: 3, .. })
        ));

        assert!(matches!(
            BoardConfiguration::from_json("not json"),
            Err(ConfigError::Malformed(_))
        ));
    }
}
