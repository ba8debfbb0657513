use crate::merge::{merge_fingerprint, resolve_intent};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tick_core::{InstrumentId, OrderIntent, RecordEvent, StrategyDecision};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Decision window length; at most one intent per instrument per window
    pub window_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { window_ms: 250 }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.window_ms == 0 {
            return Err("coordinator window_ms must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CoordinatorMetrics {
    pub decisions_received: AtomicU64,
    pub superseded: AtomicU64,
    pub intents_emitted: AtomicU64,
    pub netted_out: AtomicU64,
    pub duplicates_suppressed: AtomicU64,
}

/// Collects decisions across shards and reduces them to at most one
/// `OrderIntent` per instrument per decision window.
///
/// Only the most recent decision per (instrument, strategy) is retained;
/// older ones are superseded, never accumulated, so memory stays bounded by
/// instruments x strategies.
pub struct DecisionCoordinator {
    config: CoordinatorConfig,
    latest: HashMap<(InstrumentId, String), StrategyDecision>,
    dirty: HashSet<InstrumentId>,
    last_fingerprint: HashMap<InstrumentId, u64>,
    intent_tx: mpsc::Sender<OrderIntent>,
    record_tx: mpsc::Sender<RecordEvent>,
    metrics: Arc<CoordinatorMetrics>,
}

impl DecisionCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        intent_tx: mpsc::Sender<OrderIntent>,
        record_tx: mpsc::Sender<RecordEvent>,
    ) -> Self {
        Self {
            config,
            latest: HashMap::new(),
            dirty: HashSet::new(),
            last_fingerprint: HashMap::new(),
            intent_tx,
            record_tx,
            metrics: Arc::new(CoordinatorMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<CoordinatorMetrics> {
        self.metrics.clone()
    }

    /// Fold one decision into the retained set. A decision only replaces
    /// its predecessor when its trigger is at least as recent, so delivery
    /// order cannot change the merge outcome.
    pub fn absorb(&mut self, decision: StrategyDecision) {
        self.metrics.decisions_received.fetch_add(1, Ordering::Relaxed);
        let key = (decision.instrument_id, decision.strategy.clone());

        match self.latest.get(&key) {
            Some(existing) if existing.trigger.is_newer_than(&decision.trigger) => {
                // Late or duplicate delivery of an older decision
                self.metrics.superseded.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.dirty.insert(decision.instrument_id);
                self.latest.insert(key, decision);
            }
        }
    }

    /// Resolve every instrument touched since the previous window.
    pub fn close_window(&mut self) -> Vec<OrderIntent> {
        let mut intents = Vec::new();

        let mut instruments: Vec<InstrumentId> = self.dirty.drain().collect();
        instruments.sort_unstable();

        for instrument_id in instruments {
            let decisions: Vec<StrategyDecision> = self
                .latest
                .iter()
                .filter(|((id, _), _)| *id == instrument_id)
                .map(|(_, d)| d.clone())
                .collect();

            let fingerprint = merge_fingerprint(&decisions);
            if self.last_fingerprint.get(&instrument_id) == Some(&fingerprint) {
                // Redelivered decisions we already acted on
                self.metrics.duplicates_suppressed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            self.last_fingerprint.insert(instrument_id, fingerprint);

            match resolve_intent(&decisions) {
                Some(spec) => {
                    self.metrics.intents_emitted.fetch_add(1, Ordering::Relaxed);
                    intents.push(OrderIntent {
                        intent_id: Uuid::new_v4(),
                        instrument_id,
                        side: spec.side,
                        quantity: spec.quantity,
                        limit_price: None,
                        reference_price: spec.reference_price,
                        decisions: spec.decisions,
                        created_at: Utc::now(),
                    });
                }
                None => {
                    self.metrics.netted_out.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        intents
    }

    async fn emit(&self, intents: Vec<OrderIntent>) -> bool {
        for intent in intents {
            if self.record_tx.send(RecordEvent::Intent(intent.clone())).await.is_err() {
                warn!("recorder channel closed");
            }
            if self.intent_tx.send(intent).await.is_err() {
                warn!("gateway channel closed, stopping coordinator");
                return false;
            }
        }
        true
    }

    /// Stage task: decisions in from every shard, intents out.
    ///
    /// Terminates when the last engine shard drops its sender; decisions
    /// already absorbed are resolved in one final window so nothing the
    /// shards emitted is silently dropped.
    pub async fn run(mut self, mut decision_rx: mpsc::Receiver<StrategyDecision>) {
        let mut window = tokio::time::interval(Duration::from_millis(self.config.window_ms));
        window.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                decision = decision_rx.recv() => match decision {
                    Some(decision) => self.absorb(decision),
                    None => break,
                },
                _ = window.tick() => {
                    let intents = self.close_window();
                    if !self.emit(intents).await {
                        return;
                    }
                }
            }
        }

        let intents = self.close_window();
        self.emit(intents).await;

        info!(
            received = self.metrics.decisions_received.load(Ordering::Relaxed),
            intents = self.metrics.intents_emitted.load(Ordering::Relaxed),
            "coordinator stopped"
        );
    }
}
