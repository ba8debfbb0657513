use crate::types::{InstrumentId, ShardId, Side, Signal, TickKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw, venue-native message as delivered by an ingest connection.
///
/// Opaque to everything except the normalizer for that venue's dialect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawVenueMessage {
    pub venue: String,
    pub payload: String,
    pub received_at: DateTime<Utc>,
}

/// One canonical normalized market event.
///
/// Immutable once constructed by the normalizer. Travels by value through
/// the router into exactly one engine shard, and is eventually owned by the
/// recorder for persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub instrument_id: InstrumentId,
    pub symbol: String,
    pub venue: String,
    pub kind: TickKind,
    /// Timestamp reported by the venue
    pub event_time: DateTime<Utc>,
    /// Timestamp at which the ingest connection received the message
    pub ingest_time: DateTime<Utc>,
    pub price: f64,
    pub size: f64,
    /// Aggressor side for trade events; quotes carry none
    pub side: Option<Side>,
    /// Venue-assigned sequence number, when the feed provides one
    pub venue_seq: Option<u64>,
}

impl Tick {
    /// Natural key for idempotent persistence. Prefers the venue sequence
    /// number; feeds without one fall back to the event timestamp.
    pub fn natural_key(&self) -> String {
        match self.venue_seq {
            Some(seq) => format!("{}/{}/{}", self.venue, self.instrument_id, seq),
            None => format!(
                "{}/{}/t{}",
                self.venue,
                self.instrument_id,
                self.event_time.timestamp_nanos_opt().unwrap_or_default()
            ),
        }
    }
}

/// Condensed reference to the tick that triggered a decision.
///
/// Carried inside `StrategyDecision` so lineage survives after the full
/// `Tick` has been handed to the recorder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickRef {
    pub price: f64,
    pub event_time: DateTime<Utc>,
    pub venue_seq: Option<u64>,
}

impl TickRef {
    pub fn from_tick(tick: &Tick) -> Self {
        Self { price: tick.price, event_time: tick.event_time, venue_seq: tick.venue_seq }
    }

    /// Recency ordering: venue sequence when both sides carry one,
    /// event time otherwise.
    pub fn is_newer_than(&self, other: &TickRef) -> bool {
        match (self.venue_seq, other.venue_seq) {
            (Some(a), Some(b)) if a != b => a > b,
            _ => self.event_time > other.event_time,
        }
    }
}

/// A strategy's signal for one instrument at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyDecision {
    pub instrument_id: InstrumentId,
    pub shard_id: ShardId,
    pub strategy: String,
    /// Merge precedence; lower wins
    pub priority: u8,
    pub signal: Signal,
    /// Signal conviction in [0, 1]
    pub strength: f64,
    /// Suggested order size, in instrument units
    pub qty_hint: f64,
    pub trigger: TickRef,
    pub decided_at: DateTime<Utc>,
}

impl StrategyDecision {
    pub fn natural_key(&self) -> String {
        let trigger = match self.trigger.venue_seq {
            Some(seq) => format!("s{seq}"),
            None => {
                format!("t{}", self.trigger.event_time.timestamp_nanos_opt().unwrap_or_default())
            }
        };
        format!("{}/{}/{}", self.instrument_id, self.strategy, trigger)
    }
}

/// Back-reference from an intent to one of its originating decisions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRef {
    pub strategy: String,
    pub decision_key: String,
}

/// A coordinated, de-duplicated trading instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub intent_id: Uuid,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub quantity: f64,
    /// Price constraint; `None` lets the gateway fill at the reference price
    pub limit_price: Option<f64>,
    /// Last triggering tick price known to the coordinator
    pub reference_price: f64,
    pub decisions: Vec<DecisionRef>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecStatus {
    Filled,
    PartialFill,
    Rejected,
}

/// The realized (or rejected) outcome of an OrderIntent.
///
/// Exactly one execution exists per intent, in every gateway mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderExecution {
    pub intent_id: Uuid,
    pub fill_price: f64,
    pub fill_qty: f64,
    pub status: ExecStatus,
    pub reject_reason: Option<String>,
    pub executed_at: DateTime<Utc>,
    /// Venue order reference; synthetic in simulation mode
    pub venue_ref: String,
}

/// Envelope for the recorder's inbound channel; every stage that produces
/// an auditable record sends one of these.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RecordEvent {
    Tick(Tick),
    Decision(StrategyDecision),
    Intent(OrderIntent),
    Execution(OrderExecution),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tick(seq: Option<u64>) -> Tick {
        Tick {
            instrument_id: 42,
            symbol: "BTC-USD".to_string(),
            venue: "simex".to_string(),
            kind: TickKind::Trade,
            event_time: Utc.timestamp_opt(1_700_000_000, 123).unwrap(),
            ingest_time: Utc.timestamp_opt(1_700_000_001, 0).unwrap(),
            price: 42_000.5,
            size: 0.25,
            side: Some(Side::Buy),
            venue_seq: seq,
        }
    }

    #[test]
    fn test_tick_natural_key_prefers_sequence() {
        assert_eq!(tick(Some(99)).natural_key(), "simex/42/99");
    }

    #[test]
    fn test_tick_natural_key_falls_back_to_event_time() {
        let key = tick(None).natural_key();
        assert!(key.starts_with("simex/42/t"));
        // Same tick replayed must produce the same key
        assert_eq!(key, tick(None).natural_key());
    }

    #[test]
    fn test_tick_ref_recency_by_sequence() {
        let older = TickRef::from_tick(&tick(Some(10)));
        let newer = TickRef::from_tick(&tick(Some(11)));
        assert!(newer.is_newer_than(&older));
        assert!(!older.is_newer_than(&newer));
    }

    #[test]
    fn test_tick_ref_recency_by_time_without_sequence() {
        let t0 = tick(None);
        let mut t1 = tick(None);
        t1.event_time = t1.event_time + chrono::Duration::milliseconds(5);
        assert!(TickRef::from_tick(&t1).is_newer_than(&TickRef::from_tick(&t0)));
    }

    #[test]
    fn test_tick_serde_roundtrip() {
        let t = tick(Some(7));
        let json = serde_json::to_string(&t).unwrap();
        let back: Tick = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
