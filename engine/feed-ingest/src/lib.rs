// feed-ingest - venue feed connections, reconnect supervision and backoff

mod backoff;
mod config;
mod connector;
mod supervisor;
mod ws;

pub use backoff::{Backoff, BackoffPolicy};
pub use config::IngestConfig;
pub use connector::{IngestError, VenueConnector, VenueStream};
pub use supervisor::{ConnState, ConnectionSupervisor, IngestStats};
pub use ws::WsConnector;
