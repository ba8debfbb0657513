// tick-router - priority classification, shard resolution and backpressure

mod classify;
mod router;

pub use classify::{classify, RouterRules};
pub use router::{RouterError, RouterMetrics, TickRouter};
