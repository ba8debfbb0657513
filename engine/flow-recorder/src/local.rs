//! Local file-backed store: one JSON-lines file per relation

use crate::config::RecorderConfig;
use crate::error::{RecorderError, Result};
use crate::store::{RecordStore, RelationCounts};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tick_core::{InstrumentId, OrderExecution, OrderIntent, StrategyDecision, Tick};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

struct RelationFile {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: u64,
}

impl RelationFile {
    fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, writer: BufWriter::new(file), rows: 0 })
    }

    fn append<T: Serialize>(&mut self, row: &T) -> Result<()> {
        let line = serde_json::to_string(row)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self, fsync: bool) -> Result<()> {
        self.writer.flush()?;
        if fsync {
            self.writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

struct Inner {
    ticks: RelationFile,
    decisions: RelationFile,
    intents: RelationFile,
    executions: RelationFile,
    tick_keys: HashSet<String>,
    decision_keys: HashSet<String>,
    intent_keys: HashSet<Uuid>,
    execution_keys: HashSet<Uuid>,
}

/// Durable `RecordStore` writing JSON-lines segments under the configured
/// data directory.
///
/// The dedup index is rebuilt from the existing segments on open, so
/// idempotence survives restarts: replaying a batch that was already
/// persisted in a previous session still produces no duplicate rows.
pub struct LocalStore {
    config: RecorderConfig,
    inner: Mutex<Inner>,
}

impl LocalStore {
    pub fn open(config: RecorderConfig) -> Result<Self> {
        config.validate().map_err(RecorderError::config)?;
        std::fs::create_dir_all(&config.data_dir)?;

        let existing_ticks: Vec<Tick> = read_rows(&config.ticks_file())?;
        let existing_decisions: Vec<StrategyDecision> = read_rows(&config.decisions_file())?;
        let existing_intents: Vec<OrderIntent> = read_rows(&config.intents_file())?;
        let existing_executions: Vec<OrderExecution> = read_rows(&config.executions_file())?;

        let mut inner = Inner {
            ticks: RelationFile::open(config.ticks_file())?,
            decisions: RelationFile::open(config.decisions_file())?,
            intents: RelationFile::open(config.intents_file())?,
            executions: RelationFile::open(config.executions_file())?,
            tick_keys: existing_ticks.iter().map(|t| t.natural_key()).collect(),
            decision_keys: existing_decisions.iter().map(|d| d.natural_key()).collect(),
            intent_keys: existing_intents.iter().map(|i| i.intent_id).collect(),
            execution_keys: existing_executions.iter().map(|e| e.intent_id).collect(),
        };
        inner.ticks.rows = existing_ticks.len() as u64;
        inner.decisions.rows = existing_decisions.len() as u64;
        inner.intents.rows = existing_intents.len() as u64;
        inner.executions.rows = existing_executions.len() as u64;

        info!(
            dir = %config.data_dir.display(),
            ticks = inner.ticks.rows,
            executions = inner.executions.rows,
            "opened local record store"
        );

        Ok(Self { config, inner: Mutex::new(inner) })
    }

    async fn read_relation<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        // Make buffered rows visible to the reader first.
        self.flush().await?;
        read_rows(path)
    }
}

/// Read every decodable row from a JSON-lines file. A trailing partial line
/// (crash mid-write) is tolerated and skipped with a warning.
fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping undecodable row");
            }
        }
    }
    Ok(rows)
}

#[async_trait]
impl RecordStore for LocalStore {
    async fn append_tick(&self, tick: &Tick) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.tick_keys.insert(tick.natural_key()) {
            return Ok(false);
        }
        inner.ticks.append(tick)?;
        Ok(true)
    }

    async fn append_decision(&self, decision: &StrategyDecision) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.decision_keys.insert(decision.natural_key()) {
            return Ok(false);
        }
        inner.decisions.append(decision)?;
        Ok(true)
    }

    async fn append_intent(&self, intent: &OrderIntent) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.intent_keys.insert(intent.intent_id) {
            return Ok(false);
        }
        inner.intents.append(intent)?;
        Ok(true)
    }

    async fn append_execution(&self, execution: &OrderExecution) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.execution_keys.insert(execution.intent_id) {
            return Ok(false);
        }
        inner.executions.append(execution)?;
        Ok(true)
    }

    async fn flush(&self) -> Result<()> {
        let fsync = self.config.fsync_on_flush;
        let mut inner = self.inner.lock().await;
        inner.ticks.flush(fsync)?;
        inner.decisions.flush(fsync)?;
        inner.intents.flush(fsync)?;
        inner.executions.flush(fsync)?;
        Ok(())
    }

    async fn is_reachable(&self) -> bool {
        self.config.data_dir.exists()
    }

    async fn counts(&self) -> Result<RelationCounts> {
        let inner = self.inner.lock().await;
        Ok(RelationCounts {
            ticks: inner.ticks.rows,
            decisions: inner.decisions.rows,
            intents: inner.intents.rows,
            executions: inner.executions.rows,
        })
    }

    async fn ticks_for_instrument(&self, instrument_id: InstrumentId) -> Result<Vec<Tick>> {
        let rows: Vec<Tick> = self.read_relation(&self.config.ticks_file()).await?;
        Ok(rows.into_iter().filter(|t| t.instrument_id == instrument_id).collect())
    }

    async fn decisions_for_instrument(
        &self,
        instrument_id: InstrumentId,
    ) -> Result<Vec<StrategyDecision>> {
        let rows: Vec<StrategyDecision> =
            self.read_relation(&self.config.decisions_file()).await?;
        Ok(rows.into_iter().filter(|d| d.instrument_id == instrument_id).collect())
    }

    async fn intents_for_instrument(
        &self,
        instrument_id: InstrumentId,
    ) -> Result<Vec<OrderIntent>> {
        let rows: Vec<OrderIntent> = self.read_relation(&self.config.intents_file()).await?;
        Ok(rows.into_iter().filter(|i| i.instrument_id == instrument_id).collect())
    }

    async fn execution_for_intent(&self, intent_id: Uuid) -> Result<Option<OrderExecution>> {
        let rows: Vec<OrderExecution> =
            self.read_relation(&self.config.executions_file()).await?;
        Ok(rows.into_iter().find(|e| e.intent_id == intent_id))
    }
}
