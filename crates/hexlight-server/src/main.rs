//! Hexlight board controller.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod animation;
mod config;
mod indicator;
mod protocol;
mod server;
mod service;

use animation::AnimationCoordinator;
use config::ServerConfig;
use server::ServerState;
use service::BoardService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        driver = ?config.driver,
        units = config.units,
        max_attempts = config.max_attempts,
        "Starting Hexlight server..."
    );

    let driver = config.driver.build(config.units);
    let animations = AnimationCoordinator::new(driver, config.timing);
    let service = BoardService::new(config.board, animations, config.max_attempts);
    service.init();

    let state = Arc::new(ServerState::new(service));

    server::run_server(config.addr, state).await
}
