//! Recorder stage task

use crate::config::RecorderConfig;
use crate::error::Result;
use crate::store::RecordStore;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tick_core::RecordEvent;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Recorder counters.
#[derive(Debug, Default)]
pub struct RecorderStats {
    pub ticks: AtomicU64,
    pub decisions: AtomicU64,
    pub intents: AtomicU64,
    pub executions: AtomicU64,
    pub duplicates: AtomicU64,
    pub write_errors: AtomicU64,
    pub lineage_violations: AtomicU64,
}

/// The recorder stage: drains the pipeline's record channel into the store,
/// flushing periodically and once more before exiting.
///
/// Terminates when every upstream stage has dropped its sender, which the
/// shutdown signal drives; consuming until closure is what lets upstream
/// drains land in storage instead of racing the recorder's own exit.
pub struct Recorder {
    config: RecorderConfig,
    store: Arc<dyn RecordStore>,
    stats: Arc<RecorderStats>,
    /// Intent ids seen this session, for the lineage sanity check
    seen_intents: HashSet<Uuid>,
}

impl Recorder {
    pub fn new(config: RecorderConfig, store: Arc<dyn RecordStore>) -> Self {
        Self { config, store, stats: Arc::new(RecorderStats::default()), seen_intents: HashSet::new() }
    }

    pub fn stats(&self) -> Arc<RecorderStats> {
        self.stats.clone()
    }

    async fn record(&mut self, event: RecordEvent) {
        let outcome: Result<bool> = match &event {
            RecordEvent::Tick(tick) => self.store.append_tick(tick).await,
            RecordEvent::Decision(decision) => self.store.append_decision(decision).await,
            RecordEvent::Intent(intent) => {
                self.seen_intents.insert(intent.intent_id);
                self.store.append_intent(intent).await
            }
            RecordEvent::Execution(execution) => {
                if !self.seen_intents.contains(&execution.intent_id) {
                    // An execution with no backing intent is a programming
                    // error in the pipeline, not a runtime condition.
                    self.stats.lineage_violations.fetch_add(1, Ordering::Relaxed);
                    error!(
                        intent_id = %execution.intent_id,
                        "execution recorded without a backing intent"
                    );
                    debug_assert!(false, "execution without backing intent");
                }
                self.store.append_execution(execution).await
            }
        };

        match outcome {
            Ok(true) => {
                let counter = match &event {
                    RecordEvent::Tick(_) => &self.stats.ticks,
                    RecordEvent::Decision(_) => &self.stats.decisions,
                    RecordEvent::Intent(_) => &self.stats.intents,
                    RecordEvent::Execution(_) => &self.stats.executions,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {
                self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                // Storage trouble is transient (category a); the row is
                // lost but the pipeline keeps running and the failure is
                // visible in the stats.
                self.stats.write_errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "record append failed");
            }
        }
    }

    pub async fn run(mut self, mut record_rx: mpsc::Receiver<RecordEvent>) {
        let mut flush_timer = tokio::time::interval(self.config.flush_interval);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = record_rx.recv() => match event {
                    Some(event) => self.record(event).await,
                    None => break,
                },
                _ = flush_timer.tick() => {
                    if let Err(e) = self.store.flush().await {
                        warn!(error = %e, "periodic flush failed");
                    }
                }
            }
        }

        // Everything buffered must be durable before the process is allowed
        // to exit.
        if let Err(e) = self.store.flush().await {
            error!(error = %e, "final flush failed");
        }

        info!(
            ticks = self.stats.ticks.load(Ordering::Relaxed),
            decisions = self.stats.decisions.load(Ordering::Relaxed),
            intents = self.stats.intents.load(Ordering::Relaxed),
            executions = self.stats.executions.load(Ordering::Relaxed),
            duplicates = self.stats.duplicates.load(Ordering::Relaxed),
            "recorder stopped"
        );
    }
}
