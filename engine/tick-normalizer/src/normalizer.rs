use crate::wire::{decode_message, WireMessage};
use chrono::{DateTime, TimeZone, Utc};
use instrument_registry::InstrumentRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tick_core::{AssetClass, RawVenueMessage, Tick, TickKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Normalizer counters. Malformed input is dropped and counted, never
/// propagated downstream.
#[derive(Debug, Default)]
pub struct NormalizerStats {
    pub ticks_emitted: AtomicU64,
    pub dropped_malformed: AtomicU64,
    pub heartbeats: AtomicU64,
}

impl NormalizerStats {
    pub fn ticks(&self) -> u64 {
        self.ticks_emitted.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.dropped_malformed.load(Ordering::Relaxed)
    }
}

/// Deterministic mapping from one venue's raw wire format to the canonical
/// Tick shape. Auto-registers previously unseen instruments through the
/// shared registry.
pub struct Normalizer {
    registry: Arc<InstrumentRegistry>,
    default_asset_class: AssetClass,
    stats: Arc<NormalizerStats>,
}

impl Normalizer {
    pub fn new(registry: Arc<InstrumentRegistry>, default_asset_class: AssetClass) -> Self {
        Self { registry, default_asset_class, stats: Arc::new(NormalizerStats::default()) }
    }

    pub fn stats(&self) -> Arc<NormalizerStats> {
        self.stats.clone()
    }

    /// Normalize one raw message. Returns `None` for heartbeats and for
    /// anything that fails to decode; the latter is counted.
    pub fn normalize(&self, raw: &RawVenueMessage) -> Option<Tick> {
        let msg = match decode_message(&raw.payload) {
            Ok(msg) => msg,
            Err(e) => {
                self.stats.dropped_malformed.fetch_add(1, Ordering::Relaxed);
                debug!(venue = %raw.venue, error = %e, "dropping malformed message");
                return None;
            }
        };

        let tick = match msg {
            WireMessage::Trade { symbol, price, size, side, ts, seq } => {
                let instrument_id =
                    self.registry.lookup_or_create(&raw.venue, &symbol, self.default_asset_class);
                Tick {
                    instrument_id,
                    symbol,
                    venue: raw.venue.clone(),
                    kind: TickKind::Trade,
                    event_time: millis_to_utc(ts),
                    ingest_time: raw.received_at,
                    price,
                    size,
                    side: Some(side),
                    venue_seq: seq,
                }
            }
            WireMessage::Quote { symbol, bid, ask, bid_size, ask_size, ts, seq } => {
                let instrument_id =
                    self.registry.lookup_or_create(&raw.venue, &symbol, self.default_asset_class);
                Tick {
                    instrument_id,
                    symbol,
                    venue: raw.venue.clone(),
                    kind: TickKind::Quote,
                    event_time: millis_to_utc(ts),
                    ingest_time: raw.received_at,
                    price: (bid + ask) / 2.0,
                    size: bid_size.min(ask_size),
                    side: None,
                    venue_seq: seq,
                }
            }
            WireMessage::Heartbeat { .. } => {
                self.stats.heartbeats.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        self.stats.ticks_emitted.fetch_add(1, Ordering::Relaxed);
        Some(tick)
    }

    /// Stage task: raw messages in, canonical ticks out.
    ///
    /// Terminates once every ingest supervisor has exited and the raw
    /// channel is drained, so shutdown never abandons buffered messages.
    pub async fn run(self, mut raw_rx: mpsc::Receiver<RawVenueMessage>, tick_tx: mpsc::Sender<Tick>) {
        while let Some(raw) = raw_rx.recv().await {
            if let Some(tick) = self.normalize(&raw) {
                if tick_tx.send(tick).await.is_err() {
                    warn!("router channel closed, stopping normalizer");
                    break;
                }
            }
        }

        info!(
            ticks = self.stats.ticks(),
            malformed = self.stats.malformed(),
            "normalizer stopped"
        );
    }
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}
