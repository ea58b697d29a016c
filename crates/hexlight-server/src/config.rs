//! Startup configuration from environment variables.

use crate::animation::AnimationTiming;
use crate::indicator::DriverKind;
use anyhow::{anyhow, ensure, Context};
use hexlight_core::{BoardConfiguration, DEFAULT_MAX_ATTEMPTS, RESOURCE_TILE_COUNT};
use std::net::SocketAddr;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `SERVER_ADDR`
    pub addr: SocketAddr,
    /// `HEXLIGHT_MAX_ATTEMPTS`: number shuffles per layout
    pub max_attempts: usize,
    /// `HEXLIGHT_INDICATOR`: `none` or `log`
    pub driver: DriverKind,
    /// `HEXLIGHT_UNITS`: lights on the strip
    pub units: usize,
    /// `HEXLIGHT_BOARD_CONFIG`: optional JSON file with the starting
    /// board configuration
    pub board: BoardConfiguration,
    pub timing: AnimationTiming,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.into())
            .parse()
            .context("SERVER_ADDR is not a socket address")?;

        let max_attempts = match lookup("HEXLIGHT_MAX_ATTEMPTS") {
            Some(v) => v.parse().context("HEXLIGHT_MAX_ATTEMPTS is not a number")?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let driver = match lookup("HEXLIGHT_INDICATOR") {
            Some(v) => v.parse::<DriverKind>().map_err(|e| anyhow!(e))?,
            None => DriverKind::None,
        };

        let units = match lookup("HEXLIGHT_UNITS") {
            Some(v) => v.parse().context("HEXLIGHT_UNITS is not a number")?,
            None => RESOURCE_TILE_COUNT,
        };
        ensure!(
            units >= RESOURCE_TILE_COUNT,
            "HEXLIGHT_UNITS must be at least {}, got {}",
            RESOURCE_TILE_COUNT,
            units
        );

        let board = match lookup("HEXLIGHT_BOARD_CONFIG") {
            Some(path) => {
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading board configuration {}", path))?;
                BoardConfiguration::from_json(&json)
                    .with_context(|| format!("invalid board configuration {}", path))?
            }
            None => BoardConfiguration::standard(),
        };

        Ok(Self {
            addr,
            max_attempts,
            driver,
            units,
            board,
            timing: AnimationTiming::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.addr, DEFAULT_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.driver, DriverKind::None);
        assert_eq!(config.units, 18);
        assert_eq!(config.board, BoardConfiguration::standard());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("SERVER_ADDR", "127.0.0.1:9000"),
            ("HEXLIGHT_MAX_ATTEMPTS", "5"),
            ("HEXLIGHT_INDICATOR", "log"),
            ("HEXLIGHT_UNITS", "20"),
        ])
        .unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.driver, DriverKind::Log);
        assert_eq!(config.units, 20);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(from_pairs(&[("SERVER_ADDR", "nowhere")]).is_err());
        assert!(from_pairs(&[("HEXLIGHT_MAX_ATTEMPTS", "many")]).is_err());
        assert!(from_pairs(&[("HEXLIGHT_INDICATOR", "ws2812")]).is_err());
        assert!(from_pairs(&[("HEXLIGHT_UNITS", "12")]).is_err());
        assert!(from_pairs(&[("HEXLIGHT_BOARD_CONFIG", "/nonexistent/board.json")]).is_err());
    }
}
