use crate::hashing::instrument_id_for;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tick_core::{AssetClass, Instrument, InstrumentId, InstrumentStatus};

/// Pre-seeded instrument definition from configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedInstrument {
    pub symbol: String,
    pub venue: String,
    pub asset_class: AssetClass,
}

/// Registry counters, readable without locking the table.
#[derive(Debug, Default)]
pub struct RegistryStats {
    pub created: AtomicU64,
    pub lookups: AtomicU64,
}

/// The one table shared across normalizer instances: symbol -> instrument.
///
/// Lookup-or-create is atomic per key, so concurrent first-sightings of the
/// same symbol from multiple ingest connections converge on a single row.
pub struct InstrumentRegistry {
    by_key: DashMap<(String, String), InstrumentId>,
    by_id: DashMap<InstrumentId, Instrument>,
    stats: RegistryStats,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self { by_key: DashMap::new(), by_id: DashMap::new(), stats: RegistryStats::default() }
    }

    /// Pre-seed instruments from configuration before any feed is attached.
    pub fn seed(&self, seeds: &[SeedInstrument]) {
        for seed in seeds {
            self.lookup_or_create(&seed.venue, &seed.symbol, seed.asset_class);
        }
    }

    /// Resolve the instrument for (venue, symbol), creating it on first
    /// sighting. Idempotent: every caller observes the same id.
    pub fn lookup_or_create(
        &self,
        venue: &str,
        symbol: &str,
        asset_class: AssetClass,
    ) -> InstrumentId {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);

        let key = (venue.to_string(), symbol.to_string());
        if let Some(existing) = self.by_key.get(&key) {
            return *existing;
        }

        // Entry API holds the shard lock for this key, so racing creators
        // serialize here and all but one observe the winner's insert.
        let id = *self.by_key.entry(key).or_insert_with(|| {
            let id = instrument_id_for(venue, symbol);
            let instrument = Instrument::new(id, symbol, venue, asset_class);
            self.by_id.insert(id, instrument);
            self.stats.created.fetch_add(1, Ordering::Relaxed);
            tracing::info!(venue, symbol, id, "registered instrument");
            id
        });
        id
    }

    pub fn get(&self, id: InstrumentId) -> Option<Instrument> {
        self.by_id.get(&id).map(|entry| entry.clone())
    }

    pub fn id_for(&self, venue: &str, symbol: &str) -> Option<InstrumentId> {
        self.by_key.get(&(venue.to_string(), symbol.to_string())).map(|entry| *entry)
    }

    /// Flip lifecycle status; identity fields never change.
    pub fn set_status(&self, id: InstrumentId, status: InstrumentStatus) -> bool {
        match self.by_id.get_mut(&id) {
            Some(mut entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn created_count(&self) -> u64 {
        self.stats.created.load(Ordering::Relaxed)
    }
}

impl Default for InstrumentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_lookup_or_create_is_idempotent() {
        let registry = InstrumentRegistry::new();

        let a = registry.lookup_or_create("simex", "BTC-USD", AssetClass::Crypto);
        let b = registry.lookup_or_create("simex", "BTC-USD", AssetClass::Crypto);

        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.created_count(), 1);
    }

    #[test]
    fn test_concurrent_first_sightings_converge() {
        let registry = Arc::new(InstrumentRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.lookup_or_create("simex", "ETH-USD", AssetClass::Crypto)
                })
            })
            .collect();

        let ids: Vec<InstrumentId> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ids.windows(2).all(|w| w[0] == w[1]), "all racers must observe one id");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.created_count(), 1);
    }

    #[test]
    fn test_status_update_only_touches_status() {
        let registry = InstrumentRegistry::new();
        let id = registry.lookup_or_create("simex", "BTC-USD", AssetClass::Crypto);

        assert!(registry.set_status(id, InstrumentStatus::Inactive));

        let inst = registry.get(id).unwrap();
        assert_eq!(inst.status, InstrumentStatus::Inactive);
        assert_eq!(inst.symbol, "BTC-USD");
        assert_eq!(inst.venue, "simex");
    }

    #[test]
    fn test_set_status_unknown_instrument() {
        let registry = InstrumentRegistry::new();
        assert!(!registry.set_status(12345, InstrumentStatus::Inactive));
    }

    #[test]
    fn test_seed_from_config() {
        let registry = InstrumentRegistry::new();
        registry.seed(&[
            SeedInstrument {
                symbol: "BTC-USD".to_string(),
                venue: "simex".to_string(),
                asset_class: AssetClass::Crypto,
            },
            SeedInstrument {
                symbol: "ETH-USD".to_string(),
                venue: "simex".to_string(),
                asset_class: AssetClass::Crypto,
            },
        ]);

        assert_eq!(registry.len(), 2);
        assert!(registry.id_for("simex", "BTC-USD").is_some());

        // A feed sighting of a seeded symbol reuses the row
        let id = registry.lookup_or_create("simex", "BTC-USD", AssetClass::Crypto);
        assert_eq!(registry.id_for("simex", "BTC-USD"), Some(id));
        assert_eq!(registry.len(), 2);
    }
}
