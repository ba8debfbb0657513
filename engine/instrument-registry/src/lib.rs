// instrument-registry - shared instrument table and stable shard assignment

mod hashing;
mod registry;
mod sharding;

pub use hashing::instrument_id_for;
pub use registry::{InstrumentRegistry, RegistryStats, SeedInstrument};
pub use sharding::ShardAssignment;
