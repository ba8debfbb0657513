//! # Flow Recorder
//!
//! Append-only persistence for the four audit relations produced by the
//! pipeline: ticks, strategy decisions, order intents and order executions.
//!
//! The recorder is the only component with a write dependency on durable
//! storage. Rows carry natural keys so the lineage chain
//! (execution -> intent -> decision -> tick) is reconstructable from
//! persisted records alone, and writes are idempotent under at-least-once
//! redelivery.

mod config;
mod error;
mod local;
mod memory;
mod recorder;
mod store;

pub use config::RecorderConfig;
pub use error::{RecorderError, Result};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use recorder::{Recorder, RecorderStats};
pub use store::{RecordStore, RelationCounts};
