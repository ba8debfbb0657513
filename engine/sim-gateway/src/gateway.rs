use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tick_core::{ExecStatus, OrderExecution, OrderIntent, RecordEvent};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// The intent -> execution contract.
///
/// Every accepted intent terminates in exactly one execution record, in
/// every mode. A live implementation plugs in behind this trait and must
/// surface transport failure as a rejected execution, never a dropped
/// intent.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    fn mode(&self) -> &'static str;

    async fn execute(&self, intent: &OrderIntent) -> OrderExecution;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimGatewayConfig {
    /// Intents above this size take the synthetic rejection path
    pub max_order_qty: f64,
}

impl Default for SimGatewayConfig {
    fn default() -> Self {
        Self { max_order_qty: 10_000.0 }
    }
}

impl SimGatewayConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_order_qty <= 0.0 {
            return Err("max_order_qty must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct GatewayMetrics {
    pub filled: AtomicU64,
    pub rejected: AtomicU64,
}

/// Deterministic simulated fills: full fill at the intent's limit price, or
/// at its reference price when unconstrained, with an immediate timestamp
/// and a synthetic venue reference.
pub struct SimGateway {
    config: SimGatewayConfig,
    fill_seq: AtomicU64,
    metrics: Arc<GatewayMetrics>,
}

impl SimGateway {
    pub fn new(config: SimGatewayConfig) -> Self {
        Self { config, fill_seq: AtomicU64::new(0), metrics: Arc::new(GatewayMetrics::default()) }
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        self.metrics.clone()
    }
}

#[async_trait]
impl ExecutionGateway for SimGateway {
    fn mode(&self) -> &'static str {
        "simulation"
    }

    async fn execute(&self, intent: &OrderIntent) -> OrderExecution {
        let seq = self.fill_seq.fetch_add(1, Ordering::Relaxed);

        if intent.quantity > self.config.max_order_qty {
            self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
            return OrderExecution {
                intent_id: intent.intent_id,
                fill_price: 0.0,
                fill_qty: 0.0,
                status: ExecStatus::Rejected,
                reject_reason: Some(format!(
                    "quantity {} exceeds max {}",
                    intent.quantity, self.config.max_order_qty
                )),
                executed_at: Utc::now(),
                venue_ref: format!("SIM-{seq}"),
            };
        }

        self.metrics.filled.fetch_add(1, Ordering::Relaxed);
        OrderExecution {
            intent_id: intent.intent_id,
            fill_price: intent.limit_price.unwrap_or(intent.reference_price),
            fill_qty: intent.quantity,
            status: ExecStatus::Filled,
            reject_reason: None,
            executed_at: Utc::now(),
            venue_ref: format!("SIM-{seq}"),
        }
    }
}

/// Stage task wrapping any `ExecutionGateway`: intents in, one execution
/// out per intent, straight to the recorder.
///
/// Terminates when the coordinator closes the intent channel, which is
/// driven by the pipeline's shutdown signal. Running until closure is what
/// guarantees that every accepted intent, including ones emitted in the
/// coordinator's final window, still terminates in an execution record.
pub struct GatewayTask {
    gateway: Arc<dyn ExecutionGateway>,
    record_tx: mpsc::Sender<RecordEvent>,
}

impl GatewayTask {
    pub fn new(gateway: Arc<dyn ExecutionGateway>, record_tx: mpsc::Sender<RecordEvent>) -> Self {
        Self { gateway, record_tx }
    }

    pub async fn run(self, mut intent_rx: mpsc::Receiver<OrderIntent>) {
        let mut executed: u64 = 0;

        while let Some(intent) = intent_rx.recv().await {
            let execution = self.gateway.execute(&intent).await;
            executed += 1;
            if self.record_tx.send(RecordEvent::Execution(execution)).await.is_err() {
                warn!("recorder channel closed, stopping gateway");
                return;
            }
        }

        info!(mode = self.gateway.mode(), executed, "gateway stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tick_core::Side;
    use uuid::Uuid;

    fn intent(quantity: f64, limit: Option<f64>) -> OrderIntent {
        OrderIntent {
            intent_id: Uuid::new_v4(),
            instrument_id: 1,
            side: Side::Buy,
            quantity,
            limit_price: limit,
            reference_price: 101.5,
            decisions: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fills_at_limit_price_when_constrained() {
        let gateway = SimGateway::new(SimGatewayConfig::default());
        let i = intent(5.0, Some(100.0));
        let execution = gateway.execute(&i).await;

        assert_eq!(execution.intent_id, i.intent_id);
        assert_eq!(execution.status, ExecStatus::Filled);
        assert_eq!(execution.fill_price, 100.0);
        assert_eq!(execution.fill_qty, 5.0);
        assert!(execution.venue_ref.starts_with("SIM-"));
    }

    #[tokio::test]
    async fn test_fills_at_reference_price_when_unconstrained() {
        let gateway = SimGateway::new(SimGatewayConfig::default());
        let execution = gateway.execute(&intent(5.0, None)).await;
        assert_eq!(execution.fill_price, 101.5);
    }

    #[tokio::test]
    async fn test_oversize_intent_takes_rejection_path() {
        let gateway = SimGateway::new(SimGatewayConfig { max_order_qty: 10.0 });
        let i = intent(11.0, None);
        let execution = gateway.execute(&i).await;

        assert_eq!(execution.status, ExecStatus::Rejected);
        assert_eq!(execution.intent_id, i.intent_id);
        assert!(execution.reject_reason.as_deref().unwrap().contains("exceeds max"));
        assert_eq!(gateway.metrics().rejected.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_every_intent_terminates_in_exactly_one_execution() {
        let gateway = Arc::new(SimGateway::new(SimGatewayConfig { max_order_qty: 10.0 }));
        let (record_tx, mut record_rx) = mpsc::channel(32);
        let (intent_tx, intent_rx) = mpsc::channel(32);

        let task = GatewayTask::new(gateway, record_tx);
        let handle = tokio::spawn(task.run(intent_rx));

        let sent: Vec<OrderIntent> = vec![intent(1.0, None), intent(99.0, None), intent(2.0, Some(50.0))];
        for i in &sent {
            intent_tx.send(i.clone()).await.unwrap();
        }
        drop(intent_tx);

        let mut executions = Vec::new();
        while let Some(RecordEvent::Execution(e)) = record_rx.recv().await {
            executions.push(e);
        }
        handle.await.unwrap();

        assert_eq!(executions.len(), sent.len());
        for i in &sent {
            let matching: Vec<_> =
                executions.iter().filter(|e| e.intent_id == i.intent_id).collect();
            assert_eq!(matching.len(), 1, "exactly one execution per intent");
        }
        assert_eq!(executions[1].status, ExecStatus::Rejected);
    }
}
