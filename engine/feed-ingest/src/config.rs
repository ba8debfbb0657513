use crate::backoff::BackoffPolicy;
use serde::{Deserialize, Serialize};

/// Configuration for one supervised venue connection.
///
/// A venue with several connections (to respect per-connection subscription
/// limits) appears here once per connection, each with its own subscription
/// list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Venue name stamped on every raw message
    pub venue: String,

    /// Streaming endpoint URL
    pub url: String,

    /// Environment variable holding the connection credential; never the
    /// credential itself
    pub credential_env: Option<String>,

    /// Symbols to subscribe to on connect
    pub subscriptions: Vec<String>,

    /// Reconnect backoff parameters
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.venue.is_empty() {
            return Err("ingest venue must not be empty".to_string());
        }
        if self.url.is_empty() {
            return Err(format!("ingest url for venue {} must not be empty", self.venue));
        }
        self.backoff.validate()
    }

    /// Resolve the credential from the environment, if one is configured.
    pub fn credential(&self) -> Result<Option<String>, String> {
        match &self.credential_env {
            None => Ok(None),
            Some(var) => match std::env::var(var) {
                Ok(value) => Ok(Some(value)),
                Err(_) => Err(format!("credential variable {var} is not set")),
            },
        }
    }
}
