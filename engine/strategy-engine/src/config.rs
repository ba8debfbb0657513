use serde::{Deserialize, Serialize};

/// Momentum strategy parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MomentumConfig {
    pub enabled: bool,
    /// Fractional move across the window that triggers a signal
    pub threshold: f64,
    /// Suggested order size per signal
    pub qty: f64,
    /// Merge precedence; lower wins
    pub priority: u8,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self { enabled: true, threshold: 0.005, qty: 1.0, priority: 1 }
    }
}

/// Mean-reversion strategy parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeanReversionConfig {
    pub enabled: bool,
    /// Z-score magnitude at which the strategy fades the move
    pub entry_z: f64,
    pub qty: f64,
    pub priority: u8,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self { enabled: true, entry_z: 2.0, qty: 1.0, priority: 2 }
    }
}

/// Engine configuration, shared by every shard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum lookback window before an instrument turns Active
    pub lookback_window: usize,

    pub momentum: MomentumConfig,
    pub mean_reversion: MeanReversionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_window: 20,
            momentum: MomentumConfig::default(),
            mean_reversion: MeanReversionConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.lookback_window < 2 {
            return Err("lookback_window must be at least 2".to_string());
        }
        if self.momentum.enabled && self.momentum.threshold <= 0.0 {
            return Err("momentum threshold must be positive".to_string());
        }
        if self.mean_reversion.enabled && self.mean_reversion.entry_z <= 0.0 {
            return Err("mean reversion entry_z must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_catches_bad_lookback() {
        let mut cfg = EngineConfig::default();
        cfg.lookback_window = 1;
        assert!(cfg.validate().is_err());
    }
}
