//! Abstract store contract for the four audit relations

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tick_core::{InstrumentId, OrderExecution, OrderIntent, StrategyDecision, Tick};
use uuid::Uuid;

/// Row counts per relation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationCounts {
    pub ticks: u64,
    pub decisions: u64,
    pub intents: u64,
    pub executions: u64,
}

/// Append-only storage for audit records.
///
/// Appends return `Ok(false)` when the row's natural key was already
/// persisted, which is what makes the recorder idempotent under
/// at-least-once redelivery from upstream. The read side serves the
/// dashboard/native-client collaborators, which never write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn append_tick(&self, tick: &Tick) -> Result<bool>;

    async fn append_decision(&self, decision: &StrategyDecision) -> Result<bool>;

    async fn append_intent(&self, intent: &OrderIntent) -> Result<bool>;

    async fn append_execution(&self, execution: &OrderExecution) -> Result<bool>;

    /// Flush buffered writes to durable storage.
    async fn flush(&self) -> Result<()>;

    /// Health-surface probe; never fails, only reports.
    async fn is_reachable(&self) -> bool;

    async fn counts(&self) -> Result<RelationCounts>;

    // Lineage queries

    async fn ticks_for_instrument(&self, instrument_id: InstrumentId) -> Result<Vec<Tick>>;

    async fn decisions_for_instrument(
        &self,
        instrument_id: InstrumentId,
    ) -> Result<Vec<StrategyDecision>>;

    async fn intents_for_instrument(&self, instrument_id: InstrumentId)
        -> Result<Vec<OrderIntent>>;

    async fn execution_for_intent(&self, intent_id: Uuid) -> Result<Option<OrderExecution>>;
}
