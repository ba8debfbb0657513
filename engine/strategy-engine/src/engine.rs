use crate::config::EngineConfig;
use crate::lane::ShardReceiver;
use crate::state::InstrumentState;
use crate::strategy::Strategy;
use chrono::Utc;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tick_core::{InstrumentId, RecordEvent, ShardId, StrategyDecision, Tick, TickRef};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Per-shard counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    pub ticks_processed: AtomicU64,
    pub decisions_emitted: AtomicU64,
    pub strategy_panics: AtomicU64,
    pub discarded_at_shutdown: AtomicU64,
}

/// One engine instance, owning exclusive mutable state for the instruments
/// assigned to its shard.
///
/// The shard's inbound queues are processed strictly sequentially, which is
/// what makes the unsynchronized `InstrumentState` table safe.
pub struct ShardEngine {
    shard_id: ShardId,
    config: EngineConfig,
    states: HashMap<InstrumentId, InstrumentState>,
    strategies: Vec<Box<dyn Strategy>>,
    decision_tx: mpsc::Sender<StrategyDecision>,
    record_tx: mpsc::Sender<RecordEvent>,
    metrics: Arc<EngineMetrics>,
}

impl ShardEngine {
    pub fn new(
        shard_id: ShardId,
        config: EngineConfig,
        strategies: Vec<Box<dyn Strategy>>,
        decision_tx: mpsc::Sender<StrategyDecision>,
        record_tx: mpsc::Sender<RecordEvent>,
    ) -> Self {
        Self {
            shard_id,
            config,
            states: HashMap::new(),
            strategies,
            decision_tx,
            record_tx,
            metrics: Arc::new(EngineMetrics::default()),
        }
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }

    /// Apply one tick and evaluate every registered strategy against the
    /// updated state. Pure with respect to the tick order: replaying the
    /// same sequence yields the same decisions.
    pub fn on_tick(&mut self, tick: &Tick) -> Vec<StrategyDecision> {
        let lookback = self.config.lookback_window;
        let state = self
            .states
            .entry(tick.instrument_id)
            .or_insert_with(|| InstrumentState::new(tick.instrument_id, lookback));

        state.apply(tick);
        self.metrics.ticks_processed.fetch_add(1, Ordering::Relaxed);

        if !state.is_active() {
            return Vec::new();
        }

        let mut decisions = Vec::new();
        for strategy in &self.strategies {
            // A panicking strategy must never take down the shard; isolate
            // each invocation and skip it for this tick.
            let outcome =
                std::panic::catch_unwind(AssertUnwindSafe(|| strategy.evaluate(state, tick)));

            match outcome {
                Ok(Some(output)) => {
                    decisions.push(StrategyDecision {
                        instrument_id: tick.instrument_id,
                        shard_id: self.shard_id,
                        strategy: strategy.name().to_string(),
                        priority: strategy.priority(),
                        signal: output.signal,
                        strength: output.strength,
                        qty_hint: output.qty_hint,
                        trigger: TickRef::from_tick(tick),
                        decided_at: Utc::now(),
                    });
                }
                Ok(None) => {}
                Err(_) => {
                    self.metrics.strategy_panics.fetch_add(1, Ordering::Relaxed);
                    error!(
                        shard = self.shard_id,
                        strategy = strategy.name(),
                        instrument = tick.instrument_id,
                        "strategy panicked; skipping for this tick"
                    );
                }
            }
        }
        decisions
    }

    async fn process(&mut self, tick: Tick) {
        let decisions = self.on_tick(&tick);

        // The tick is now owned by the recorder.
        if self.record_tx.send(RecordEvent::Tick(tick)).await.is_err() {
            warn!(shard = self.shard_id, "recorder channel closed");
        }

        for decision in decisions {
            // Hold decisions still flow to the coordinator: they supersede
            // a strategy's earlier buy/sell for the instrument.
            self.metrics.decisions_emitted.fetch_add(1, Ordering::Relaxed);
            if self.record_tx.send(RecordEvent::Decision(decision.clone())).await.is_err() {
                warn!(shard = self.shard_id, "recorder channel closed");
            }
            if self.decision_tx.send(decision).await.is_err() {
                warn!(shard = self.shard_id, "coordinator channel closed");
                return;
            }
        }
    }

    fn has_signal_strategies(&self) -> bool {
        !self.strategies.is_empty()
    }

    /// Shard task: FIFO over the shard's inbound queues. The fast lane is
    /// always drained before the warm/cold queue.
    ///
    /// Terminates when the router drops the shard's sender; by then the
    /// warm/cold queue has been fully consumed (its no-drop policy), while
    /// anything still in the fast lane is stale by definition and is
    /// discarded, counted.
    pub async fn run(mut self, mut inbox: ShardReceiver) {
        if !self.has_signal_strategies() {
            warn!(shard = self.shard_id, "engine started with no strategies registered");
        }

        loop {
            while let Some(tick) = inbox.fast.pop() {
                self.process(tick).await;
            }

            tokio::select! {
                biased;
                _ = inbox.notify.notified() => {}
                tick = inbox.slow.recv() => match tick {
                    Some(tick) => self.process(tick).await,
                    None => break,
                }
            }
        }

        let discarded = inbox.fast.clear();
        self.metrics.discarded_at_shutdown.fetch_add(discarded as u64, Ordering::Relaxed);

        info!(
            shard = self.shard_id,
            ticks = self.metrics.ticks_processed.load(Ordering::Relaxed),
            decisions = self.metrics.decisions_emitted.load(Ordering::Relaxed),
            discarded_fast = discarded,
            "shard engine stopped"
        );
    }
}
