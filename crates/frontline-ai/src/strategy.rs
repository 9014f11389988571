//! The per-faction strategy interface.
//!
//! A strategy turns a world snapshot into [`DecisionDraft`]s. The manager
//! stamps drafts into [`StrategicDecision`]s and queues them; strategies
//! never write territorial state themselves.
//!
//! [`StrategicDecision`]: frontline_types::StrategicDecision

use chrono::{DateTime, Utc};
use frontline_territory::{TerritorySnapshot, WorldSnapshot};
use frontline_types::{
    DecisionKind, FactionId, StrategyKind, TerritorialState, Territory, TerritoryId,
    ThreatAssessment,
};

use crate::config::FactionProfile;

/// Share of a territory's value taken from its strategic score; the rest
/// comes from its tactical score.
pub const STRATEGIC_WEIGHT: f64 = 0.6;

/// Base value of a territory to a faction, in `[0, 100]` before resource
/// weighting.
pub fn territorial_value(profile: &FactionProfile, territory: &Territory) -> f64 {
    let base = territory.strategic_value * STRATEGIC_WEIGHT
        + territory.tactical_value * (1.0 - STRATEGIC_WEIGHT);
    base * profile.resource_weight(territory.resource)
}

/// Everything a strategy sees when planning.
#[derive(Debug, Clone, Copy)]
pub struct PlanningContext<'a> {
    /// The faction's profile.
    pub profile: &'a FactionProfile,
    /// World state at planning time.
    pub world: &'a WorldSnapshot,
    /// Latest ranked threats against the faction.
    pub threats: &'a [ThreatAssessment],
    /// Planning timestamp.
    pub now: DateTime<Utc>,
}

impl PlanningContext<'_> {
    /// The planning faction.
    pub const fn faction(&self) -> FactionId {
        self.profile.id
    }

    /// Territories the faction dominates.
    pub fn holdings(&self) -> impl Iterator<Item = &TerritorySnapshot> {
        let faction = self.faction();
        self.world
            .iter()
            .filter(move |entry| entry.state.dominant == Some(faction))
    }

    /// Territories the faction does not dominate.
    pub fn frontier(&self) -> impl Iterator<Item = &TerritorySnapshot> {
        let faction = self.faction();
        self.world
            .iter()
            .filter(move |entry| entry.state.dominant != Some(faction))
    }

    /// Strongest rival influence in a territory.
    pub fn strongest_rival(&self, state: &TerritorialState) -> f64 {
        let faction = self.faction();
        state
            .influence
            .iter()
            .filter(|(f, _)| **f != faction)
            .map(|(_, v)| *v)
            .fold(0.0, f64::max)
    }

    /// Lead of the faction over its strongest rival in a territory.
    pub fn margin(&self, state: &TerritorialState) -> f64 {
        state.influence_of(self.faction()) - self.strongest_rival(state)
    }
}

/// A decision before the manager assigns it an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionDraft {
    /// Requested action.
    pub kind: DecisionKind,
    /// Target territory.
    pub target: TerritoryId,
    /// Priority in `[0, 1]`.
    pub priority: f64,
    /// Effort committed, in percent.
    pub resource_commitment: f64,
    /// Seconds to wait before executing.
    pub execution_delay_secs: u64,
    /// Explanation for logs and dashboards.
    pub reasoning: String,
}

impl DecisionDraft {
    /// A draft with priority and commitment clamped to their ranges.
    pub fn new(
        kind: DecisionKind,
        target: TerritoryId,
        priority: f64,
        resource_commitment: f64,
        execution_delay_secs: u64,
        reasoning: String,
    ) -> Self {
        Self {
            kind,
            target,
            priority: priority.clamp(0.0, 1.0),
            resource_commitment: resource_commitment.clamp(0.0, 100.0),
            execution_delay_secs,
            reasoning,
        }
    }
}

/// Per-faction decision logic.
pub trait FactionStrategy: Send + Sync + core::fmt::Debug {
    /// Which built-in behaviour this is.
    fn kind(&self) -> StrategyKind;

    /// Priority of a territory to the faction, in `[0, 100]`-ish units.
    fn evaluate_territory_priority(
        &self,
        profile: &FactionProfile,
        territory: &Territory,
        state: &TerritorialState,
    ) -> f64 {
        let _ = state;
        territorial_value(profile, territory)
    }

    /// Slow-cadence planning: where to expand or what to consolidate.
    fn plan_strategic(&self, ctx: &PlanningContext<'_>) -> Vec<DecisionDraft>;

    /// Medium-cadence planning: short-term operations on the front line.
    fn plan_tactical(&self, ctx: &PlanningContext<'_>) -> Vec<DecisionDraft>;

    /// Fast-cadence reaction to one threat, if the strategy reacts at all.
    fn respond_to_threat(
        &self,
        ctx: &PlanningContext<'_>,
        threat: &ThreatAssessment,
    ) -> Option<DecisionDraft>;
}
