//! Marketflow Service Library
//!
//! Wires the pipeline stages together: ingest supervisors, normalizer,
//! router, engine shards, coordinator, gateway and recorder, connected by
//! bounded typed channels. Also owns configuration loading, logging setup,
//! signal handling and the read-only health surface.

use anyhow::{Context, Result};

pub mod config;
pub mod health;
pub mod logging;
pub mod pipeline;
pub mod signals;

pub use config::ServiceConfig;
pub use health::{HealthMonitor, HealthReport};
pub use logging::initialize_logging;
pub use pipeline::Pipeline;
pub use signals::setup_signal_handlers;

/// Load configuration from the optional TOML file and environment overrides
pub fn load_configuration(path: Option<&std::path::Path>) -> Result<ServiceConfig> {
    config::load_config(path).context("Failed to load service configuration")
}
