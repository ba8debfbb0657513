//! Pipeline assembly and lifecycle

use anyhow::{Context, Result};
use decision_coordinator::DecisionCoordinator;
use feed_ingest::{Backoff, ConnectionSupervisor, VenueConnector, WsConnector};
use flow_recorder::{LocalStore, RecordStore, Recorder};
use instrument_registry::{InstrumentRegistry, ShardAssignment};
use sim_gateway::{ExecutionGateway, GatewayTask, SimGateway};
use std::sync::Arc;
use std::time::Duration;
use strategy_engine::{build_strategies, shard_channel, ShardEngine, ShardReceiver, ShardSender};
use tick_normalizer::Normalizer;
use tick_router::TickRouter;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::health::HealthMonitor;

const RAW_CHANNEL_DEPTH: usize = 2_048;
const TICK_CHANNEL_DEPTH: usize = 2_048;
const DECISION_CHANNEL_DEPTH: usize = 2_048;
const INTENT_CHANNEL_DEPTH: usize = 512;

/// A running pipeline: one task per stage, connected by bounded channels.
pub struct Pipeline {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
    shutdown_timeout: Duration,

    pub registry: Arc<InstrumentRegistry>,
    pub store: Arc<dyn RecordStore>,
    pub health: Arc<HealthMonitor>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("handles", &self.handles.iter().map(|(n, _)| *n).collect::<Vec<_>>())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Start the pipeline with production adapters: WebSocket connectors
    /// and the local durable store.
    pub async fn start(config: ServiceConfig) -> Result<Self> {
        let connectors: Vec<Arc<dyn VenueConnector>> = config
            .ingest
            .iter()
            .map(|c| Arc::new(WsConnector::new(c.clone())) as Arc<dyn VenueConnector>)
            .collect();

        let store: Arc<dyn RecordStore> = Arc::new(
            LocalStore::open(config.recorder.clone()).context("Failed to open record store")?,
        );

        Self::start_with(config, connectors, store).await
    }

    /// Start the pipeline with injected adapters (tests use scripted
    /// connectors and the in-memory store).
    pub async fn start_with(
        config: ServiceConfig,
        connectors: Vec<Arc<dyn VenueConnector>>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        crate::config::validate_config(&config)?;

        if !config.service.simulation_mode {
            anyhow::bail!("live gateway mode is not available; set simulation_mode = true");
        }

        info!(
            shards = config.service.shard_count,
            connections = connectors.len(),
            "starting pipeline"
        );

        let registry = Arc::new(InstrumentRegistry::new());
        registry.seed(&config.instruments);
        let assignment = ShardAssignment::new(config.service.shard_count);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

        // Channels, downstream first so every stage outlives its consumers.
        let (record_tx, record_rx) = mpsc::channel(config.recorder.channel_depth);
        let (intent_tx, intent_rx) = mpsc::channel(INTENT_CHANNEL_DEPTH);
        let (decision_tx, decision_rx) = mpsc::channel(DECISION_CHANNEL_DEPTH);
        let (tick_tx, tick_rx) = mpsc::channel(TICK_CHANNEL_DEPTH);
        let (raw_tx, raw_rx) = mpsc::channel(RAW_CHANNEL_DEPTH);

        // Recorder and gateway terminate on upstream channel closure, which
        // the shutdown signal drives through the stages ahead of them.
        let recorder = Recorder::new(config.recorder.clone(), store.clone());
        handles.push(("recorder", tokio::spawn(recorder.run(record_rx))));

        let gateway: Arc<dyn ExecutionGateway> =
            Arc::new(SimGateway::new(config.gateway.clone()));
        let gateway_task = GatewayTask::new(gateway, record_tx.clone());
        handles.push(("gateway", tokio::spawn(gateway_task.run(intent_rx))));

        // Coordinator
        let coordinator =
            DecisionCoordinator::new(config.coordinator.clone(), intent_tx, record_tx.clone());
        handles.push(("coordinator", tokio::spawn(coordinator.run(decision_rx))));

        // Engine shards
        let mut shard_senders: Vec<ShardSender> = Vec::new();
        let mut shard_receivers: Vec<ShardReceiver> = Vec::new();
        for _ in 0..config.service.shard_count {
            let (sender, receiver) =
                shard_channel(config.router.fast_lane_depth, config.router.slow_queue_depth);
            shard_senders.push(sender);
            shard_receivers.push(receiver);
        }

        for (shard_id, receiver) in shard_receivers.into_iter().enumerate() {
            let engine = ShardEngine::new(
                shard_id as u32,
                config.engine.clone(),
                build_strategies(&config.engine),
                decision_tx.clone(),
                record_tx.clone(),
            );
            handles.push(("engine", tokio::spawn(engine.run(receiver))));
        }
        drop(decision_tx);
        drop(record_tx);

        // Router
        let router = TickRouter::new(config.router.clone(), assignment, shard_senders)
            .map_err(|e| anyhow::anyhow!("router setup failed: {e}"))?;
        handles.push(("router", tokio::spawn(router.run(tick_rx))));

        // Normalizer
        let normalizer = Normalizer::new(registry.clone(), config.service.default_asset_class);
        handles.push(("normalizer", tokio::spawn(normalizer.run(raw_rx, tick_tx))));

        // Ingest supervisors, one per connection
        let mut connection_states = Vec::new();
        for (index, connector) in connectors.into_iter().enumerate() {
            let backoff_policy = config
                .ingest
                .get(index)
                .map(|c| c.backoff.clone())
                .unwrap_or_default();
            let venue = connector.venue().to_string();
            let (supervisor, state_rx, _stats) =
                ConnectionSupervisor::new(connector, raw_tx.clone(), Backoff::new(backoff_policy));
            connection_states.push((venue, state_rx));
            handles.push(("ingest", tokio::spawn(supervisor.run(shutdown_rx.clone()))));
        }
        drop(raw_tx);

        // Health surface
        let health = Arc::new(HealthMonitor::new(
            connection_states,
            store.clone(),
            shutdown_rx.clone(),
        ));
        if config.health.enabled {
            let health_server = health.clone();
            let port = config.health.port;
            tokio::spawn(async move { health_server.serve(port).await });
        }

        info!("pipeline started");

        Ok(Self {
            shutdown_tx,
            handles,
            shutdown_timeout: Duration::from_secs(config.service.shutdown_timeout_secs),
            registry,
            store,
            health,
        })
    }

    /// Orderly shutdown. The ingest supervisors observe the signal
    /// directly; every stage behind them terminates on its inbound channel
    /// closing, draining or discarding per its backpressure policy, and the
    /// recorder flushes before the call returns.
    pub async fn shutdown(self) -> Result<()> {
        info!("shutting down pipeline");
        let _ = self.shutdown_tx.send(true);

        // Handles were pushed downstream-first; join in reverse so upstream
        // stages drain before the recorder's channel is allowed to close.
        for (name, handle) in self.handles.into_iter().rev() {
            match timeout(self.shutdown_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(stage = name, error = %e, "stage task failed"),
                Err(_) => warn!(stage = name, "stage did not stop within timeout"),
            }
        }

        info!("pipeline shutdown complete");
        Ok(())
    }
}
