use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect backoff parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// First retry delay
    pub base: Duration,
    /// Ceiling for the computed delay, jitter included
    pub max: Duration,
    /// Growth factor between attempts
    pub multiplier: f64,
    /// Fraction of the delay randomized in both directions, in [0, 1)
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.base.is_zero() {
            return Err("backoff base must be non-zero".to_string());
        }
        if self.max < self.base {
            return Err("backoff max must be >= base".to_string());
        }
        if self.multiplier < 1.0 {
            return Err("backoff multiplier must be >= 1.0".to_string());
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err("backoff jitter must be in [0, 1)".to_string());
        }
        Ok(())
    }
}

/// Exponential backoff with jitter, capped at the policy ceiling.
///
/// One instance lives inside each connection supervisor; `reset` is called
/// after a healthy session so the next disconnect starts from the base delay.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next reconnect attempt.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.policy.base.as_secs_f64() * self.policy.multiplier.powi(self.attempt as i32);
        self.attempt = self.attempt.saturating_add(1);

        let capped = exp.min(self.policy.max.as_secs_f64());
        let jittered = if self.policy.jitter > 0.0 {
            let spread = capped * self.policy.jitter;
            capped + rand::thread_rng().gen_range(-spread..=spread)
        } else {
            capped
        };

        Duration::from_secs_f64(jittered.clamp(0.0, self.policy.max.as_secs_f64()))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
