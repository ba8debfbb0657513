use crate::window::RollingWindow;
use tick_core::{InstrumentId, Tick};

/// Per-instrument engine phase.
///
/// `Uninitialized -> Warming` on the first tick, `Warming -> Active` once
/// the lookback window is satisfied, `Active` stays `Active`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstrumentPhase {
    Uninitialized,
    Warming,
    Active,
}

/// Mutable working set for one instrument.
///
/// Exclusively owned by the instrument's engine shard; no other component
/// reads or writes it. Applying ticks in order is a pure fold, so replaying
/// the same tick sequence reproduces the same state.
#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentState {
    pub instrument_id: InstrumentId,
    pub phase: InstrumentPhase,
    pub last_price: f64,
    pub window: RollingWindow,
    pub position: f64,
    pub ticks_applied: u64,
}

impl InstrumentState {
    pub fn new(instrument_id: InstrumentId, lookback: usize) -> Self {
        Self {
            instrument_id,
            phase: InstrumentPhase::Uninitialized,
            last_price: 0.0,
            window: RollingWindow::new(lookback),
            position: 0.0,
            ticks_applied: 0,
        }
    }

    /// Fold one tick into the state.
    pub fn apply(&mut self, tick: &Tick) {
        debug_assert_eq!(tick.instrument_id, self.instrument_id);

        self.window.push(tick.price);
        self.last_price = tick.price;
        self.ticks_applied += 1;

        self.phase = match self.phase {
            InstrumentPhase::Uninitialized | InstrumentPhase::Warming => {
                if self.window.is_full() {
                    InstrumentPhase::Active
                } else {
                    InstrumentPhase::Warming
                }
            }
            InstrumentPhase::Active => InstrumentPhase::Active,
        };
    }

    pub fn is_active(&self) -> bool {
        self.phase == InstrumentPhase::Active
    }
}
