use serde::{Deserialize, Serialize};
use tick_core::{InstrumentId, ShardId};

/// Stable instrument-to-shard mapping.
///
/// Built once at startup from the configured shard count and never changed
/// for the life of the process; an instrument must not migrate shards
/// mid-session, since shard ownership is what makes unsynchronized engine
/// state safe. Changing the shard count requires a restart.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShardAssignment {
    num_shards: u32,
}

impl ShardAssignment {
    pub fn new(num_shards: u32) -> Self {
        assert!(num_shards > 0, "shard count must be at least 1");
        Self { num_shards }
    }

    pub fn num_shards(&self) -> u32 {
        self.num_shards
    }

    /// Resolve the owning shard for an instrument.
    pub fn shard_for(&self, instrument_id: InstrumentId) -> ShardId {
        instrument_id % self.num_shards
    }
}
