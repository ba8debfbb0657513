//! End-to-end pipeline test: scripted venue feed in, audit relations out.

use async_trait::async_trait;
use feed_ingest::{BackoffPolicy, IngestConfig, IngestError, VenueConnector, VenueStream};
use flow_recorder::{MemoryStore, RecordStore};
use marketflow_service::config::ServiceConfig;
use marketflow_service::Pipeline;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Connector that replays canned sessions; once they are exhausted every
/// further connect fails, keeping the supervisor in backoff.
struct ScriptedConnector {
    sessions: Mutex<Vec<Vec<String>>>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    fn new(sessions: Vec<Vec<String>>) -> Self {
        Self { sessions: Mutex::new(sessions), connects: AtomicUsize::new(0) }
    }
}

struct ScriptedStream {
    messages: std::vec::IntoIter<String>,
}

#[async_trait]
impl VenueStream for ScriptedStream {
    async fn next_message(&mut self) -> Result<Option<String>, IngestError> {
        Ok(self.messages.next())
    }
}

#[async_trait]
impl VenueConnector for ScriptedConnector {
    fn venue(&self) -> &str {
        "simex"
    }

    async fn connect(&self) -> Result<Box<dyn VenueStream>, IngestError> {
        self.connects.fetch_add(1, Ordering::Relaxed);
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.is_empty() {
            return Err(IngestError::Connect("feed exhausted".to_string()));
        }
        Ok(Box::new(ScriptedStream { messages: sessions.remove(0).into_iter() }))
    }
}

fn trade(symbol: &str, price: f64, seq: u64) -> String {
    // Fresh event times keep the ticks inside the staleness threshold, so
    // watchlist symbols really take the fast lane.
    format!(
        r#"{{"type":"trade","symbol":"{symbol}","price":{price},"size":1.0,"side":"buy","ts":{ts},"seq":{seq}}}"#,
        ts = chrono::Utc::now().timestamp_millis(),
    )
}

fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.service.shard_count = 2;
    config.service.shutdown_timeout_secs = 5;
    config.engine.lookback_window = 3;
    config.coordinator.window_ms = 20;
    config.router.watchlist = HashSet::from(["BTC-USD".to_string()]);
    config.health.enabled = false;
    config.ingest = vec![IngestConfig {
        venue: "simex".to_string(),
        url: "wss://unused.test/ws".to_string(),
        credential_env: None,
        subscriptions: vec!["BTC-USD".to_string(), "ETH-USD".to_string()],
        backoff: BackoffPolicy {
            base: Duration::from_millis(5),
            max: Duration::from_millis(50),
            multiplier: 2.0,
            jitter: 0.0,
        },
    }];
    config
}

#[tokio::test]
async fn test_end_to_end_flow_with_reconnect_and_replay() {
    // Session 1 ends mid-stream (venue close); session 2 resumes after
    // reconnect and redelivers the last message, at-least-once style.
    let session_1 = vec![
        trade("BTC-USD", 100.0, 1),
        trade("ETH-USD", 50.0, 1),
        trade("BTC-USD", 102.0, 2),
        trade("ETH-USD", 50.5, 2),
        "this is not json".to_string(),
        trade("BTC-USD", 104.0, 3),
        trade("ETH-USD", 51.0, 3),
        trade("BTC-USD", 106.0, 4),
        trade("BTC-USD", 106.0, 4), // duplicate within the session
    ];
    let session_2 = vec![
        trade("BTC-USD", 106.0, 4), // redelivered across the reconnect
        trade("BTC-USD", 108.0, 5),
        trade("ETH-USD", 51.5, 4),
        trade("BTC-USD", 110.0, 6),
    ];

    let connector = Arc::new(ScriptedConnector::new(vec![session_1, session_2]));
    let store = Arc::new(MemoryStore::new());

    let pipeline = Pipeline::start_with(
        test_config(),
        vec![connector.clone() as Arc<dyn VenueConnector>],
        store.clone() as Arc<dyn RecordStore>,
    )
    .await
    .expect("pipeline must start");

    // 6 unique BTC ticks + 4 unique ETH ticks
    let expected_ticks = 10;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let counts = store.counts().await.unwrap();
        if counts.ticks == expected_ticks && counts.executions >= 1 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "pipeline did not converge: {counts:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Reconnect happened and the stream resumed without manual intervention
    assert!(connector.connects.load(Ordering::Relaxed) >= 2);

    // The health surface sees the pipeline and its one connection
    let report = pipeline.health.snapshot().await;
    assert_eq!(report.status, "running");
    assert_eq!(report.connections.len(), 1);
    assert!(report.storage_reachable);

    // Replayed messages created no duplicate tick rows
    let counts = store.counts().await.unwrap();
    assert_eq!(counts.ticks, expected_ticks);

    // No duplicate instrument rows from the resumed stream
    assert_eq!(pipeline.registry.len(), 2);

    let btc_id = pipeline.registry.id_for("simex", "BTC-USD").unwrap();
    let eth_id = pipeline.registry.id_for("simex", "ETH-USD").unwrap();
    assert_ne!(btc_id, eth_id);

    // Lineage: every intent traces to decisions and to exactly one execution
    let mut intents = store.intents_for_instrument(btc_id).await.unwrap();
    intents.extend(store.intents_for_instrument(eth_id).await.unwrap());
    assert!(!intents.is_empty(), "rising prices must produce at least one intent");

    for intent in &intents {
        assert!(!intent.decisions.is_empty(), "intent without originating decisions");
        let execution = store
            .execution_for_intent(intent.intent_id)
            .await
            .unwrap()
            .expect("every intent terminates in an execution");
        assert_eq!(execution.intent_id, intent.intent_id);
    }

    let decisions = store.decisions_for_instrument(btc_id).await.unwrap();
    assert!(!decisions.is_empty());

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_recorder_flushes_to_disk_before_shutdown_completes() {
    use flow_recorder::LocalStore;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.recorder.data_dir = dir.path().to_path_buf();

    let session = vec![
        trade("BTC-USD", 100.0, 1),
        trade("BTC-USD", 101.0, 2),
        trade("BTC-USD", 102.0, 3),
        trade("BTC-USD", 103.0, 4),
    ];
    let connector = Arc::new(ScriptedConnector::new(vec![session]));
    let store = Arc::new(LocalStore::open(config.recorder.clone()).unwrap());

    let pipeline = Pipeline::start_with(
        config.clone(),
        vec![connector as Arc<dyn VenueConnector>],
        store.clone() as Arc<dyn RecordStore>,
    )
    .await
    .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while store.counts().await.unwrap().ticks < 4 {
        assert!(tokio::time::Instant::now() < deadline, "ticks were not recorded");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    pipeline.shutdown().await.unwrap();

    // A fresh store over the same directory sees every row on disk.
    let reopened = LocalStore::open(config.recorder).unwrap();
    assert_eq!(reopened.counts().await.unwrap().ticks, 4);
}

#[tokio::test]
async fn test_live_mode_is_rejected_at_startup() {
    let mut config = test_config();
    config.service.simulation_mode = false;
    config.ingest.clear();

    let result = Pipeline::start_with(
        config,
        vec![],
        Arc::new(MemoryStore::new()) as Arc<dyn RecordStore>,
    )
    .await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("simulation_mode"));
}
