//! Marketflow Pipeline Service
//!
//! Entry point for the market-data decision pipeline: starts every stage,
//! serves the read-only health surface, and handles graceful shutdown.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use marketflow_service::{
    initialize_logging, load_configuration, setup_signal_handlers, Pipeline,
};

#[tokio::main]
async fn main() -> Result<()> {
    initialize_logging()?;

    info!("Starting Marketflow Service v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("MARKETFLOW_CONFIG").ok().map(PathBuf::from);
    let config = load_configuration(config_path.as_deref())?;
    info!("Configuration loaded successfully");

    let pipeline = Pipeline::start(config).await.context("Failed to start pipeline")?;

    let shutdown_signal = setup_signal_handlers()?;
    info!("Marketflow Service is running. Press Ctrl+C to shutdown gracefully.");
    let _ = shutdown_signal.await;

    info!("Shutdown signal received. Initiating graceful shutdown...");
    pipeline.shutdown().await?;

    info!("Marketflow Service shutdown complete");
    Ok(())
}
