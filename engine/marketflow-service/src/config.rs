//! Service configuration management

use anyhow::{Context, Result};
use decision_coordinator::CoordinatorConfig;
use feed_ingest::IngestConfig;
use flow_recorder::RecorderConfig;
use instrument_registry::SeedInstrument;
use serde::{Deserialize, Serialize};
use sim_gateway::SimGatewayConfig;
use std::path::{Path, PathBuf};
use strategy_engine::EngineConfig;
use tick_core::AssetClass;
use tick_router::RouterRules;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service-level settings
    pub service: ServiceSettings,

    /// One entry per supervised venue connection
    pub ingest: Vec<IngestConfig>,

    /// Pre-seeded instruments (unknown symbols still auto-register)
    pub instruments: Vec<SeedInstrument>,

    /// Router classification rules and queue depths
    pub router: RouterRules,

    /// Engine configuration, shared by every shard
    pub engine: EngineConfig,

    /// Coordinator configuration
    pub coordinator: CoordinatorConfig,

    /// Simulated gateway configuration
    pub gateway: SimGatewayConfig,

    /// Recorder configuration
    pub recorder: RecorderConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Health surface configuration
    pub health: HealthConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Number of engine shards; fixed for the life of the process
    pub shard_count: u32,

    /// Gateway mode; only simulation is available in this build
    pub simulation_mode: bool,

    /// Asset class assumed for auto-registered symbols
    pub default_asset_class: AssetClass,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            shard_count: 4,
            simulation_mode: true,
            default_asset_class: AssetClass::Crypto,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Health surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { enabled: true, port: 8900 }
    }
}

/// Load configuration from an optional TOML file, then apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let mut config = match path {
        Some(path) if path.exists() => load_from_file(path)?,
        Some(path) => {
            anyhow::bail!("configuration file not found: {}", path.display());
        }
        None => ServiceConfig::default(),
    };

    load_from_env(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn load_from_file(path: &Path) -> Result<ServiceConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("Failed to parse configuration file {}", path.display()))
}

fn load_from_env(config: &mut ServiceConfig) {
    if let Ok(level) = std::env::var("MARKETFLOW_LOG_LEVEL") {
        config.logging.level = level;
    }

    if let Ok(format) = std::env::var("MARKETFLOW_LOG_FORMAT") {
        config.logging.format = format;
    }

    if let Ok(data_dir) = std::env::var("MARKETFLOW_DATA_DIR") {
        config.recorder.data_dir = PathBuf::from(data_dir);
    }

    if let Ok(shards) = std::env::var("MARKETFLOW_SHARDS") {
        if let Ok(shards) = shards.parse() {
            config.service.shard_count = shards;
        }
    }

    if let Ok(simulation) = std::env::var("MARKETFLOW_SIMULATION") {
        config.service.simulation_mode = simulation.parse().unwrap_or(true);
    }
}

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> Result<()> {
    if config.service.shard_count == 0 {
        anyhow::bail!("shard_count must be at least 1");
    }

    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => anyhow::bail!("Invalid log level: {other}"),
    }

    match config.logging.format.as_str() {
        "json" | "pretty" => {}
        other => anyhow::bail!("Invalid log format: {other}"),
    }

    for ingest in &config.ingest {
        ingest.validate().map_err(|e| anyhow::anyhow!("ingest config: {e}"))?;
    }
    config.router.validate().map_err(|e| anyhow::anyhow!("router config: {e}"))?;
    config.engine.validate().map_err(|e| anyhow::anyhow!("engine config: {e}"))?;
    config.coordinator.validate().map_err(|e| anyhow::anyhow!("coordinator config: {e}"))?;
    config.gateway.validate().map_err(|e| anyhow::anyhow!("gateway config: {e}"))?;
    config.recorder.validate().map_err(|e| anyhow::anyhow!("recorder config: {e}"))?;

    Ok(())
}
