use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tick_core::{PriorityClass, Tick, TickKind};

/// Static classification rules. Priority is a pure function of the tick and
/// this configuration, never of engine state, which is what keeps it
/// testable in isolation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterRules {
    /// Symbols whose events are latency-sensitive
    pub watchlist: HashSet<String>,

    /// Events older than this at ingest are demoted to Cold regardless of
    /// any other rule
    pub staleness_ms: i64,

    /// Fast lane depth per shard (drop-oldest)
    pub fast_lane_depth: usize,

    /// Warm/cold bounded queue depth per shard (blocking)
    pub slow_queue_depth: usize,
}

impl Default for RouterRules {
    fn default() -> Self {
        Self {
            watchlist: HashSet::new(),
            staleness_ms: 2_000,
            fast_lane_depth: 1_024,
            slow_queue_depth: 4_096,
        }
    }
}

impl RouterRules {
    pub fn validate(&self) -> Result<(), String> {
        if self.staleness_ms <= 0 {
            return Err("staleness_ms must be positive".to_string());
        }
        if self.fast_lane_depth == 0 {
            return Err("fast_lane_depth must be at least 1".to_string());
        }
        if self.slow_queue_depth == 0 {
            return Err("slow_queue_depth must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Assign a priority class to one tick.
///
/// Stale events demote to Cold first; watchlist symbols classify Fast;
/// off-watchlist trade prints classify Warm; everything else is Cold.
pub fn classify(tick: &Tick, rules: &RouterRules) -> PriorityClass {
    let age_ms = (tick.ingest_time - tick.event_time).num_milliseconds();
    if age_ms > rules.staleness_ms {
        return PriorityClass::Cold;
    }

    if rules.watchlist.contains(&tick.symbol) {
        return PriorityClass::Fast;
    }

    match tick.kind {
        TickKind::Trade => PriorityClass::Warm,
        TickKind::Quote => PriorityClass::Cold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn tick(symbol: &str, kind: TickKind, age_ms: i64) -> Tick {
        let ingest = Utc::now();
        Tick {
            instrument_id: 1,
            symbol: symbol.to_string(),
            venue: "simex".to_string(),
            kind,
            event_time: ingest - Duration::milliseconds(age_ms),
            ingest_time: ingest,
            price: 100.0,
            size: 1.0,
            side: None,
            venue_seq: None,
        }
    }

    fn rules_with_watchlist(symbols: &[&str]) -> RouterRules {
        RouterRules {
            watchlist: symbols.iter().map(|s| s.to_string()).collect(),
            ..RouterRules::default()
        }
    }

    #[test]
    fn test_watchlist_classifies_fast() {
        let rules = rules_with_watchlist(&["BTC-USD"]);
        assert_eq!(classify(&tick("BTC-USD", TickKind::Trade, 0), &rules), PriorityClass::Fast);
        assert_eq!(classify(&tick("BTC-USD", TickKind::Quote, 0), &rules), PriorityClass::Fast);
    }

    #[test]
    fn test_off_watchlist_trades_are_warm_quotes_cold() {
        let rules = rules_with_watchlist(&["BTC-USD"]);
        assert_eq!(classify(&tick("ETH-USD", TickKind::Trade, 0), &rules), PriorityClass::Warm);
        assert_eq!(classify(&tick("ETH-USD", TickKind::Quote, 0), &rules), PriorityClass::Cold);
    }

    #[test]
    fn test_staleness_demotes_everything_to_cold() {
        let rules = rules_with_watchlist(&["BTC-USD"]);
        assert_eq!(classify(&tick("BTC-USD", TickKind::Trade, 5_000), &rules), PriorityClass::Cold);
    }

    #[test]
    fn test_classification_is_pure() {
        let rules = rules_with_watchlist(&["BTC-USD"]);
        let t = tick("BTC-USD", TickKind::Trade, 0);
        assert_eq!(classify(&t, &rules), classify(&t, &rules));
    }

    #[test]
    fn test_rules_validation() {
        assert!(RouterRules::default().validate().is_ok());
        let mut bad = RouterRules::default();
        bad.fast_lane_depth = 0;
        assert!(bad.validate().is_err());
    }
}
