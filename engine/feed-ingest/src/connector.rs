use async_trait::async_trait;
use thiserror::Error;

/// Errors from venue feed transports
#[derive(Error, Debug)]
pub enum IngestError {
    /// Connection establishment failed
    #[error("connect failed: {0}")]
    Connect(String),

    /// Transport failed mid-stream
    #[error("transport error: {0}")]
    Transport(String),

    /// Subscription handshake was rejected by the venue
    #[error("subscribe rejected: {0}")]
    Subscribe(String),

    /// Configuration problem (bad URL, missing credential)
    #[error("ingest configuration error: {0}")]
    Config(String),
}

/// An established streaming session with a venue.
#[async_trait]
pub trait VenueStream: Send {
    /// Next raw message payload. `Ok(None)` signals a clean close by the
    /// venue; an `Err` signals a broken transport. Either way the
    /// supervisor tears the session down and re-enters backoff.
    async fn next_message(&mut self) -> Result<Option<String>, IngestError>;
}

/// Factory for venue streaming sessions.
///
/// The production implementation speaks WebSocket; tests plug in scripted
/// connectors. One connector instance backs one supervised connection.
#[async_trait]
pub trait VenueConnector: Send + Sync {
    fn venue(&self) -> &str;

    async fn connect(&self) -> Result<Box<dyn VenueStream>, IngestError>;
}
