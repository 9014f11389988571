//! Point-in-time copies of territorial state for readers.
//!
//! Snapshots are taken under the state locks and then released, so callers
//! (the AI engine, the observer API) can serialize or analyse them without
//! blocking writers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use frontline_types::{FactionId, TerritorialState, Territory, TerritoryId};
use serde::{Deserialize, Serialize};

/// A territory's definition paired with its current dynamic state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritorySnapshot {
    /// Static definition.
    pub territory: Territory,
    /// Dynamic state at snapshot time.
    pub state: TerritorialState,
}

impl TerritorySnapshot {
    /// Id of the territory.
    pub const fn id(&self) -> TerritoryId {
        self.territory.id
    }
}

/// Every territory's state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Per-territory entries.
    pub territories: BTreeMap<TerritoryId, TerritorySnapshot>,
}

impl WorldSnapshot {
    /// Entry for one territory.
    pub fn get(&self, id: TerritoryId) -> Option<&TerritorySnapshot> {
        self.territories.get(&id)
    }

    /// Influence of a faction in a territory, zero when absent.
    pub fn influence(&self, id: TerritoryId, faction: FactionId) -> f64 {
        self.territories
            .get(&id)
            .map_or(0.0, |entry| entry.state.influence_of(faction))
    }

    /// Territories the faction currently dominates.
    pub fn controlled_by(&self, faction: FactionId) -> Vec<TerritoryId> {
        self.territories
            .values()
            .filter(|entry| entry.state.dominant == Some(faction))
            .map(TerritorySnapshot::id)
            .collect()
    }

    /// Every faction with influence anywhere.
    pub fn factions(&self) -> Vec<FactionId> {
        let mut factions: Vec<FactionId> = self
            .territories
            .values()
            .flat_map(|entry| entry.state.influence.keys().copied())
            .collect();
        factions.sort_unstable();
        factions.dedup();
        factions
    }

    /// Iterate over entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TerritorySnapshot> {
        self.territories.values()
    }
}
