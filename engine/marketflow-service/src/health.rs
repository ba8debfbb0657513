//! Read-only health surface
//!
//! The one interface shared with the excluded dashboard/native-client
//! layer. It reports pipeline status, per-connection state and storage
//! reachability; it never exposes raw pipeline errors and accepts no
//! writes.

use feed_ingest::ConnState;
use flow_recorder::RecordStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::info;
use warp::Filter;

/// Health of one supervised venue connection
#[derive(Clone, Debug, Serialize)]
pub struct ConnectionHealth {
    pub venue: String,
    #[serde(flatten)]
    pub state: ConnState,
}

/// Read-only status snapshot
#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    /// "running" or "stopping"
    pub status: String,
    pub uptime_secs: u64,
    pub connections: Vec<ConnectionHealth>,
    pub storage_reachable: bool,
}

/// Assembles health snapshots from the pipeline's observable state.
pub struct HealthMonitor {
    started: Instant,
    connections: Vec<(String, watch::Receiver<ConnState>)>,
    store: Arc<dyn RecordStore>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HealthMonitor {
    pub fn new(
        connections: Vec<(String, watch::Receiver<ConnState>)>,
        store: Arc<dyn RecordStore>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self { started: Instant::now(), connections, store, shutdown_rx }
    }

    pub async fn snapshot(&self) -> HealthReport {
        let status = if *self.shutdown_rx.borrow() { "stopping" } else { "running" };

        HealthReport {
            status: status.to_string(),
            uptime_secs: self.started.elapsed().as_secs(),
            connections: self
                .connections
                .iter()
                .map(|(venue, state_rx)| ConnectionHealth {
                    venue: venue.clone(),
                    state: state_rx.borrow().clone(),
                })
                .collect(),
            storage_reachable: self.store.is_reachable().await,
        }
    }

    /// Serve `GET /health` until shutdown.
    pub async fn serve(self: Arc<Self>, port: u16) {
        let monitor = self.clone();
        let route = warp::path("health").and(warp::get()).and_then(move || {
            let monitor = monitor.clone();
            async move {
                let report = monitor.snapshot().await;
                Ok::<_, warp::Rejection>(warp::reply::json(&report))
            }
        });

        let mut shutdown_rx = self.shutdown_rx.clone();
        let (addr, server) =
            warp::serve(route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            });

        info!(%addr, "health surface listening");
        server.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_recorder::MemoryStore;

    #[tokio::test]
    async fn test_snapshot_reflects_connection_state() {
        let (state_tx, state_rx) = watch::channel(ConnState::Disconnected);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let monitor = HealthMonitor::new(
            vec![("simex".to_string(), state_rx)],
            Arc::new(MemoryStore::new()),
            shutdown_rx,
        );

        let report = monitor.snapshot().await;
        assert_eq!(report.status, "running");
        assert_eq!(report.connections.len(), 1);
        assert_eq!(report.connections[0].state, ConnState::Disconnected);
        assert!(report.storage_reachable);

        state_tx.send(ConnState::Connected).unwrap();
        let report = monitor.snapshot().await;
        assert_eq!(report.connections[0].state, ConnState::Connected);
    }

    #[tokio::test]
    async fn test_snapshot_reports_stopping_during_shutdown() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let monitor = HealthMonitor::new(vec![], Arc::new(MemoryStore::new()), shutdown_rx);

        shutdown_tx.send(true).unwrap();
        assert_eq!(monitor.snapshot().await.status, "stopping");
    }

    #[test]
    fn test_report_serializes_connection_state_inline() {
        let report = HealthReport {
            status: "running".to_string(),
            uptime_secs: 5,
            connections: vec![ConnectionHealth {
                venue: "simex".to_string(),
                state: ConnState::Backoff { attempt: 2, delay_ms: 400 },
            }],
            storage_reachable: true,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["connections"][0]["venue"], "simex");
        assert_eq!(json["connections"][0]["state"], "backoff");
        assert_eq!(json["connections"][0]["attempt"], 2);
    }
}
