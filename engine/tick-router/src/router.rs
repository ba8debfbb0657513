use crate::classify::{classify, RouterRules};
use instrument_registry::ShardAssignment;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strategy_engine::ShardSender;
use thiserror::Error;
use tick_core::{PriorityClass, Tick};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Router error types
#[derive(Error, Debug)]
pub enum RouterError {
    /// A shard's warm/cold queue closed underneath the router
    #[error("shard {0} channel closed")]
    ShardClosed(u32),

    #[error("router configuration error: {0}")]
    Config(String),
}

/// Router counters.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    pub fast_enqueued: AtomicU64,
    pub fast_dropped_oldest: AtomicU64,
    pub warm_enqueued: AtomicU64,
    pub cold_enqueued: AtomicU64,
}

/// Assigns each tick a priority class and delivers it to the owning shard.
///
/// FAST traffic goes through the shard's drop-oldest lane; WARM and COLD
/// traffic awaits on the bounded queue, applying backpressure to the
/// producer instead of dropping.
pub struct TickRouter {
    rules: RouterRules,
    assignment: ShardAssignment,
    shards: Vec<ShardSender>,
    metrics: Arc<RouterMetrics>,
}

impl TickRouter {
    pub fn new(
        rules: RouterRules,
        assignment: ShardAssignment,
        shards: Vec<ShardSender>,
    ) -> Result<Self, RouterError> {
        rules.validate().map_err(RouterError::Config)?;
        if shards.len() != assignment.num_shards() as usize {
            return Err(RouterError::Config(format!(
                "{} shard senders for {} shards",
                shards.len(),
                assignment.num_shards()
            )));
        }
        Ok(Self { rules, assignment, shards, metrics: Arc::new(RouterMetrics::default()) })
    }

    pub fn metrics(&self) -> Arc<RouterMetrics> {
        self.metrics.clone()
    }

    /// Route one tick to its shard. Awaits on warm/cold backpressure.
    pub async fn route(&self, tick: Tick) -> Result<(), RouterError> {
        let class = classify(&tick, &self.rules);
        let shard_id = self.assignment.shard_for(tick.instrument_id);
        let shard = &self.shards[shard_id as usize];

        match class {
            PriorityClass::Fast => {
                if let Some(evicted) = shard.fast.push(tick) {
                    self.metrics.fast_dropped_oldest.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        shard = shard_id,
                        instrument = evicted.instrument_id,
                        "fast lane overflow, dropped oldest tick"
                    );
                }
                self.metrics.fast_enqueued.fetch_add(1, Ordering::Relaxed);
                shard.notify.notify_one();
            }
            PriorityClass::Warm | PriorityClass::Cold => {
                shard.slow.send(tick).await.map_err(|_| RouterError::ShardClosed(shard_id))?;
                match class {
                    PriorityClass::Warm => {
                        self.metrics.warm_enqueued.fetch_add(1, Ordering::Relaxed)
                    }
                    _ => self.metrics.cold_enqueued.fetch_add(1, Ordering::Relaxed),
                };
            }
        }
        Ok(())
    }

    /// Stage task: ticks in from the normalizer, shard queues out.
    ///
    /// Terminates when the normalizer closes the tick channel; everything
    /// buffered is still classified and delivered, honoring the no-drop
    /// policy for warm/cold traffic.
    pub async fn run(self, mut tick_rx: mpsc::Receiver<Tick>) {
        while let Some(tick) = tick_rx.recv().await {
            if let Err(e) = self.route(tick).await {
                warn!(error = %e, "routing failed, stopping router");
                break;
            }
        }

        info!(
            fast = self.metrics.fast_enqueued.load(Ordering::Relaxed),
            warm = self.metrics.warm_enqueued.load(Ordering::Relaxed),
            cold = self.metrics.cold_enqueued.load(Ordering::Relaxed),
            dropped = self.metrics.fast_dropped_oldest.load(Ordering::Relaxed),
            "router stopped"
        );
    }
}
