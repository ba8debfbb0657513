use crate::types::{AssetClass, InstrumentId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an instrument
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentStatus {
    Active,
    Inactive,
}

/// A tradeable instrument, auto-created on first sighting or pre-seeded.
///
/// Identity (`id`, `symbol`, `venue`, `asset_class`) is immutable after
/// creation; only `status` ever changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub symbol: String,
    pub venue: String,
    pub asset_class: AssetClass,
    pub status: InstrumentStatus,
}

impl Instrument {
    pub fn new(
        id: InstrumentId,
        symbol: impl Into<String>,
        venue: impl Into<String>,
        asset_class: AssetClass,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            venue: venue.into(),
            asset_class,
            status: InstrumentStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == InstrumentStatus::Active
    }
}
