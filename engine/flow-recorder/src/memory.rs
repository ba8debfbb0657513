//! In-memory store for tests and ephemeral runs

use crate::error::Result;
use crate::store::{RecordStore, RelationCounts};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use tick_core::{InstrumentId, OrderExecution, OrderIntent, StrategyDecision, Tick};
use uuid::Uuid;

#[derive(Default)]
struct Relations {
    ticks: Vec<Tick>,
    decisions: Vec<StrategyDecision>,
    intents: Vec<OrderIntent>,
    executions: Vec<OrderExecution>,
    tick_keys: HashSet<String>,
    decision_keys: HashSet<String>,
    intent_keys: HashSet<Uuid>,
    execution_keys: HashSet<Uuid>,
}

/// In-memory `RecordStore` with the same idempotence semantics as the
/// durable implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Relations>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append_tick(&self, tick: &Tick) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.tick_keys.insert(tick.natural_key()) {
            return Ok(false);
        }
        inner.ticks.push(tick.clone());
        Ok(true)
    }

    async fn append_decision(&self, decision: &StrategyDecision) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.decision_keys.insert(decision.natural_key()) {
            return Ok(false);
        }
        inner.decisions.push(decision.clone());
        Ok(true)
    }

    async fn append_intent(&self, intent: &OrderIntent) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.intent_keys.insert(intent.intent_id) {
            return Ok(false);
        }
        inner.intents.push(intent.clone());
        Ok(true)
    }

    async fn append_execution(&self, execution: &OrderExecution) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.execution_keys.insert(execution.intent_id) {
            return Ok(false);
        }
        inner.executions.push(execution.clone());
        Ok(true)
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn is_reachable(&self) -> bool {
        true
    }

    async fn counts(&self) -> Result<RelationCounts> {
        let inner = self.inner.read();
        Ok(RelationCounts {
            ticks: inner.ticks.len() as u64,
            decisions: inner.decisions.len() as u64,
            intents: inner.intents.len() as u64,
            executions: inner.executions.len() as u64,
        })
    }

    async fn ticks_for_instrument(&self, instrument_id: InstrumentId) -> Result<Vec<Tick>> {
        let inner = self.inner.read();
        Ok(inner.ticks.iter().filter(|t| t.instrument_id == instrument_id).cloned().collect())
    }

    async fn decisions_for_instrument(
        &self,
        instrument_id: InstrumentId,
    ) -> Result<Vec<StrategyDecision>> {
        let inner = self.inner.read();
        Ok(inner
            .decisions
            .iter()
            .filter(|d| d.instrument_id == instrument_id)
            .cloned()
            .collect())
    }

    async fn intents_for_instrument(
        &self,
        instrument_id: InstrumentId,
    ) -> Result<Vec<OrderIntent>> {
        let inner = self.inner.read();
        Ok(inner.intents.iter().filter(|i| i.instrument_id == instrument_id).cloned().collect())
    }

    async fn execution_for_intent(&self, intent_id: Uuid) -> Result<Option<OrderExecution>> {
        let inner = self.inner.read();
        Ok(inner.executions.iter().find(|e| e.intent_id == intent_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tick_core::{ExecStatus, Side, TickKind};

    fn tick(seq: u64) -> Tick {
        Tick {
            instrument_id: 1,
            symbol: "BTC-USD".to_string(),
            venue: "simex".to_string(),
            kind: TickKind::Trade,
            event_time: Utc::now(),
            ingest_time: Utc::now(),
            price: 100.0,
            size: 1.0,
            side: Some(Side::Buy),
            venue_seq: Some(seq),
        }
    }

    #[tokio::test]
    async fn test_duplicate_tick_suppressed() {
        let store = MemoryStore::new();
        assert!(store.append_tick(&tick(1)).await.unwrap());
        assert!(!store.append_tick(&tick(1)).await.unwrap());
        assert_eq!(store.counts().await.unwrap().ticks, 1);
    }

    #[tokio::test]
    async fn test_execution_lookup_by_intent() {
        let store = MemoryStore::new();
        let intent_id = Uuid::new_v4();
        let execution = OrderExecution {
            intent_id,
            fill_price: 100.0,
            fill_qty: 1.0,
            status: ExecStatus::Filled,
            reject_reason: None,
            executed_at: Utc::now(),
            venue_ref: "SIM-0".to_string(),
        };

        assert!(store.append_execution(&execution).await.unwrap());
        // Duplicate delivery of the same execution does not duplicate rows
        assert!(!store.append_execution(&execution).await.unwrap());

        let found = store.execution_for_intent(intent_id).await.unwrap();
        assert_eq!(found.unwrap().venue_ref, "SIM-0");
        assert!(store.execution_for_intent(Uuid::new_v4()).await.unwrap().is_none());
    }
}
