use crate::config::EngineConfig;
use crate::state::InstrumentState;
use tick_core::{Signal, Tick};

/// A strategy's raw output for one evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalOutput {
    pub signal: Signal,
    /// Conviction in [0, 1]
    pub strength: f64,
    pub qty_hint: f64,
}

/// A trading strategy: a pure function of (state, tick).
///
/// Strategies never touch another instrument's state and never perform I/O.
/// The engine only evaluates them once the instrument is Active, and
/// isolates panics per invocation.
pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    /// Merge precedence carried on every decision; lower wins.
    fn priority(&self) -> u8;

    fn evaluate(&self, state: &InstrumentState, tick: &Tick) -> Option<SignalOutput>;
}

/// Trend following: signals in the direction of the move across the window.
pub struct MomentumStrategy {
    threshold: f64,
    qty: f64,
    priority: u8,
}

impl MomentumStrategy {
    pub fn new(threshold: f64, qty: f64, priority: u8) -> Self {
        Self { threshold, qty, priority }
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn evaluate(&self, state: &InstrumentState, _tick: &Tick) -> Option<SignalOutput> {
        let first = state.window.first()?;
        let last = state.window.last()?;
        if first <= 0.0 {
            return None;
        }

        let drift = last / first - 1.0;
        if drift.abs() < self.threshold {
            return Some(SignalOutput { signal: Signal::Hold, strength: 0.0, qty_hint: 0.0 });
        }

        let signal = if drift > 0.0 { Signal::Buy } else { Signal::Sell };
        // Conviction saturates at 3x the threshold
        let strength = (drift.abs() / (self.threshold * 3.0)).min(1.0);
        Some(SignalOutput { signal, strength, qty_hint: self.qty })
    }
}

/// Fades moves that stretch past `entry_z` standard deviations from the
/// window mean.
pub struct MeanReversionStrategy {
    entry_z: f64,
    qty: f64,
    priority: u8,
}

impl MeanReversionStrategy {
    pub fn new(entry_z: f64, qty: f64, priority: u8) -> Self {
        Self { entry_z, qty, priority }
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &'static str {
        "mean_reversion"
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn evaluate(&self, state: &InstrumentState, tick: &Tick) -> Option<SignalOutput> {
        let std_dev = state.window.std_dev();
        if std_dev <= f64::EPSILON {
            return None;
        }

        let z = (tick.price - state.window.mean()) / std_dev;
        if z.abs() < self.entry_z {
            return Some(SignalOutput { signal: Signal::Hold, strength: 0.0, qty_hint: 0.0 });
        }

        let signal = if z > 0.0 { Signal::Sell } else { Signal::Buy };
        let strength = ((z.abs() - self.entry_z) / self.entry_z).min(1.0);
        Some(SignalOutput { signal, strength, qty_hint: self.qty })
    }
}

/// Build the closed set of registered strategies from configuration.
pub fn build_strategies(config: &EngineConfig) -> Vec<Box<dyn Strategy>> {
    let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
    if config.momentum.enabled {
        strategies.push(Box::new(MomentumStrategy::new(
            config.momentum.threshold,
            config.momentum.qty,
            config.momentum.priority,
        )));
    }
    if config.mean_reversion.enabled {
        strategies.push(Box::new(MeanReversionStrategy::new(
            config.mean_reversion.entry_z,
            config.mean_reversion.qty,
            config.mean_reversion.priority,
        )));
    }
    strategies
}
