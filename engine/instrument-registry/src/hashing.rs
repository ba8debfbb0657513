use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};
use tick_core::InstrumentId;

const HASH_KEY_0: u64 = 0x6d61_726b_6574;
const HASH_KEY_1: u64 = 0x666c_6f77;

/// Derive a stable instrument id from (venue, symbol).
///
/// The same pair always hashes to the same id across restarts, so persisted
/// lineage rows keep referring to the same instrument after recovery.
pub fn instrument_id_for(venue: &str, symbol: &str) -> InstrumentId {
    let mut hasher = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
    venue.hash(&mut hasher);
    symbol.hash(&mut hasher);
    hasher.finish() as InstrumentId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_ids() {
        let a = instrument_id_for("simex", "BTC-USD");
        let b = instrument_id_for("simex", "BTC-USD");
        assert_eq!(a, b);
    }

    #[test]
    fn test_venue_is_part_of_identity() {
        // Same ticker on two venues is two instruments
        assert_ne!(instrument_id_for("simex", "BTC-USD"), instrument_id_for("other", "BTC-USD"));
    }

    #[test]
    fn test_distinct_symbols_get_distinct_ids() {
        assert_ne!(instrument_id_for("simex", "BTC-USD"), instrument_id_for("simex", "ETH-USD"));
    }
}
