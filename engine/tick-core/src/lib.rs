// tick-core - canonical data model shared by every pipeline stage

mod instrument;
mod records;
mod types;

pub use instrument::{Instrument, InstrumentStatus};
pub use records::{
    DecisionRef, ExecStatus, OrderExecution, OrderIntent, RawVenueMessage, RecordEvent,
    StrategyDecision, Tick, TickRef,
};
pub use types::{AssetClass, InstrumentId, PriorityClass, ShardId, Side, Signal, TickKind};
