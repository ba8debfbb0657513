//! Configuration for the recorder

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the recorder stage and its local store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Base directory for the four relation files
    pub data_dir: PathBuf,

    /// Interval between background flushes of buffered writes
    pub flush_interval: Duration,

    /// Whether to fsync files on every flush (maximum durability)
    pub fsync_on_flush: bool,

    /// Depth of the recorder's inbound channel
    pub channel_depth: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            flush_interval: Duration::from_millis(250),
            fsync_on_flush: false,
            channel_depth: 8_192,
        }
    }
}

impl RecorderConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), ..Default::default() }
    }

    pub fn ticks_file(&self) -> PathBuf {
        self.data_dir.join("ticks.jsonl")
    }

    pub fn decisions_file(&self) -> PathBuf {
        self.data_dir.join("strategy_decisions.jsonl")
    }

    pub fn intents_file(&self) -> PathBuf {
        self.data_dir.join("order_intents.jsonl")
    }

    pub fn executions_file(&self) -> PathBuf {
        self.data_dir.join("order_executions.jsonl")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.flush_interval.is_zero() {
            return Err("flush_interval must be non-zero".to_string());
        }
        if self.channel_depth == 0 {
            return Err("channel_depth must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RecorderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_relation_file_paths() {
        let config = RecorderConfig::new("/tmp/mf");
        assert_eq!(config.ticks_file(), PathBuf::from("/tmp/mf/ticks.jsonl"));
        assert_eq!(config.executions_file(), PathBuf::from("/tmp/mf/order_executions.jsonl"));
    }
}
