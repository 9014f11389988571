//! Narrow service interfaces onto the state manager.
//!
//! Downstream components depend on these instead of the concrete manager so
//! each can be unit tested against a fake. The route planner needs only
//! [`ControlView`]; the siege manager and AI engine also write through
//! [`InfluenceSink`]; the AI engine reads through [`WorldView`].

use std::collections::BTreeMap;

use frontline_types::{FactionId, InfluenceCause, TerritorialUpdate, TerritoryControl, TerritoryId};

use crate::error::TerritoryError;
use crate::snapshot::WorldSnapshot;

/// Read access to derived control status.
pub trait ControlView: Send + Sync {
    /// Control status of one territory, `None` when unknown.
    fn control_of(&self, id: TerritoryId) -> Option<TerritoryControl>;

    /// Control status of every known territory.
    fn control_snapshot(&self) -> BTreeMap<TerritoryId, TerritoryControl>;

    /// [`control_snapshot`](Self::control_snapshot) with each entry stamped
    /// by the sequence of the update that produced it. Views that do not
    /// sequence their updates stamp everything `0`.
    fn stamped_control_snapshot(&self) -> BTreeMap<TerritoryId, StampedControl> {
        self.control_snapshot()
            .into_iter()
            .map(|(id, control)| (id, StampedControl { control, sequence: 0 }))
            .collect()
    }
}

/// A control status and the update sequence it was read at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StampedControl {
    /// Control status.
    pub control: TerritoryControl,
    /// Sequence of the update that produced it.
    pub sequence: u64,
}

/// The single write path into territorial state.
pub trait InfluenceSink: Send + Sync {
    /// Apply an influence delta. See
    /// [`TerritorialStateManager::apply_influence_change`](crate::TerritorialStateManager::apply_influence_change).
    fn apply_influence_change(
        &self,
        territory: TerritoryId,
        faction: FactionId,
        delta: f64,
        cause: InfluenceCause,
    ) -> Result<TerritorialUpdate, TerritoryError>;
}

/// Snapshot reads for planners.
pub trait WorldView: Send + Sync {
    /// Copy of every territory's state.
    fn world_snapshot(&self) -> WorldSnapshot;

    /// Up to `limit` recent updates, most recent first.
    fn recent_updates(&self, limit: usize) -> Vec<TerritorialUpdate>;
}
