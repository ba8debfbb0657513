use crate::backoff::Backoff;
use crate::connector::VenueConnector;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tick_core::RawVenueMessage;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Connection lifecycle state, observable through the health surface.
///
/// Transitions are driven by exactly one supervising task per connection:
/// `Disconnected -> Connecting -> Connected -> Backoff -> Connecting -> ...`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ConnState {
    Disconnected,
    Connecting,
    Connected,
    Backoff { attempt: u32, delay_ms: u64 },
}

/// Per-connection counters.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub messages: AtomicU64,
    pub reconnects: AtomicU64,
    pub connect_failures: AtomicU64,
}

/// Supervising task for one (venue, credential) connection.
///
/// Owns the reconnect loop so transport failures never propagate past this
/// stage; downstream only ever sees a quiet channel while the supervisor is
/// in backoff.
pub struct ConnectionSupervisor {
    connector: Arc<dyn VenueConnector>,
    raw_tx: mpsc::Sender<RawVenueMessage>,
    state_tx: watch::Sender<ConnState>,
    backoff: Backoff,
    stats: Arc<IngestStats>,
}

impl ConnectionSupervisor {
    pub fn new(
        connector: Arc<dyn VenueConnector>,
        raw_tx: mpsc::Sender<RawVenueMessage>,
        backoff: Backoff,
    ) -> (Self, watch::Receiver<ConnState>, Arc<IngestStats>) {
        let (state_tx, state_rx) = watch::channel(ConnState::Disconnected);
        let stats = Arc::new(IngestStats::default());
        let supervisor =
            Self { connector, raw_tx, state_tx, backoff, stats: stats.clone() };
        (supervisor, state_rx, stats)
    }

    fn set_state(&self, state: ConnState) {
        // Receivers may be gone during shutdown; state changes are advisory.
        let _ = self.state_tx.send(state);
    }

    /// Run the connection until shutdown. Never returns early on transport
    /// failure; every disconnect re-enters backoff.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let venue = self.connector.venue().to_string();

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(ConnState::Connecting);
            let stream = tokio::select! {
                result = self.connector.connect() => result,
                _ = shutdown.changed() => continue,
            };

            match stream {
                Ok(mut stream) => {
                    self.set_state(ConnState::Connected);
                    info!(venue = %venue, "venue feed connected");
                    let mut received_any = false;

                    loop {
                        let msg = tokio::select! {
                            msg = stream.next_message() => msg,
                            _ = shutdown.changed() => break,
                        };

                        match msg {
                            Ok(Some(payload)) => {
                                if !received_any {
                                    // Session is demonstrably healthy; the
                                    // next disconnect starts from the base
                                    // delay again.
                                    self.backoff.reset();
                                    received_any = true;
                                }
                                self.stats.messages.fetch_add(1, Ordering::Relaxed);
                                let raw = RawVenueMessage {
                                    venue: venue.clone(),
                                    payload,
                                    received_at: Utc::now(),
                                };
                                if self.raw_tx.send(raw).await.is_err() {
                                    // Normalizer is gone; pipeline is tearing down.
                                    self.set_state(ConnState::Disconnected);
                                    return;
                                }
                            }
                            Ok(None) => {
                                warn!(venue = %venue, "venue closed the stream");
                                break;
                            }
                            Err(e) => {
                                warn!(venue = %venue, error = %e, "venue stream failed");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    self.stats.connect_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(venue = %venue, error = %e, "venue connect failed");
                }
            }

            if *shutdown.borrow() {
                break;
            }

            let delay = self.backoff.next_delay();
            self.stats.reconnects.fetch_add(1, Ordering::Relaxed);
            self.set_state(ConnState::Backoff {
                attempt: self.backoff.attempt(),
                delay_ms: delay.as_millis() as u64,
            });
            info!(venue = %venue, delay_ms = delay.as_millis() as u64, "reconnect backoff");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {}
            }
        }

        self.set_state(ConnState::Disconnected);
        info!(venue = %venue, "ingest supervisor stopped");
    }
}
