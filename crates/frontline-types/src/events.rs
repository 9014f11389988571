//! Outbound events published by the core.
//!
//! Every event is wrapped in an [`EventEnvelope`] carrying a global
//! sequence number so remote observers can detect gaps and keep per-territory
//! order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CrossingDirection, DecisionKind, SiegePhase, SiegeResolution, SiegeSide};
use crate::ids::{DecisionId, FactionId, RouteId, SiegeId, TerritoryId};
use crate::structs::TerritorialUpdate;

/// An event produced by the territorial control core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontlineEvent {
    /// Raw influence mutation.
    InfluenceChanged {
        /// The update record.
        update: TerritorialUpdate,
    },
    /// The dominant faction of a territory changed.
    TerritorialControlChanged {
        /// Territory that changed hands.
        territory_id: TerritoryId,
        /// Previous dominant faction.
        old_faction: Option<FactionId>,
        /// New dominant faction.
        new_faction: Option<FactionId>,
    },
    /// A territory became contested.
    TerritoryContested {
        /// Contested territory.
        territory_id: TerritoryId,
        /// Factions with influence there, strongest first.
        contesting_factions: Vec<FactionId>,
    },
    /// A territory stopped being contested.
    TerritoryUncontested {
        /// Territory that settled.
        territory_id: TerritoryId,
    },
    /// A route generation attempt finished.
    RouteGenerated {
        /// The new route, `None` on failure.
        route_id: Option<RouteId>,
        /// Requesting faction.
        faction: FactionId,
        /// Requested source.
        source: TerritoryId,
        /// Requested destination.
        destination: TerritoryId,
        /// Whether a route was registered.
        success: bool,
    },
    /// A route was deactivated.
    RouteInvalidated {
        /// Deactivated route.
        route_id: RouteId,
        /// Owning faction.
        faction: FactionId,
        /// Human-readable reason.
        cause: String,
    },
    /// A siege encounter began.
    SiegeStarted {
        /// Siege identifier.
        siege_id: SiegeId,
        /// Besieged territory.
        territory_id: TerritoryId,
        /// Attacking faction.
        attacker: FactionId,
        /// Defending faction, if the territory has one.
        defender: Option<FactionId>,
    },
    /// A siege moved to its next phase.
    PhaseChanged {
        /// Siege identifier.
        siege_id: SiegeId,
        /// Besieged territory.
        territory_id: TerritoryId,
        /// Phase left.
        old_phase: SiegePhase,
        /// Phase entered.
        new_phase: SiegePhase,
    },
    /// The dominance meter crossed a notification threshold.
    DominanceThresholdReached {
        /// Siege identifier.
        siege_id: SiegeId,
        /// Besieged territory.
        territory_id: TerritoryId,
        /// Threshold crossed.
        threshold: f64,
        /// Direction of the crossing.
        direction: CrossingDirection,
    },
    /// A ticket pool changed.
    TicketsChanged {
        /// Siege identifier.
        siege_id: SiegeId,
        /// Besieged territory.
        territory_id: TerritoryId,
        /// Side whose pool changed.
        side: SiegeSide,
        /// Tickets left.
        remaining: i64,
    },
    /// A siege ended.
    SiegeResolved {
        /// Siege identifier.
        siege_id: SiegeId,
        /// Besieged territory.
        territory_id: TerritoryId,
        /// Winning side, `None` when the siege fizzled out.
        winning_side: Option<SiegeSide>,
        /// Faction on the winning side, when known.
        winning_faction: Option<FactionId>,
        /// How the siege ended.
        resolution: SiegeResolution,
    },
    /// An AI decision entered the queue.
    DecisionQueued {
        /// Decision identifier.
        decision_id: DecisionId,
        /// Deciding faction.
        faction: FactionId,
        /// Requested action.
        kind: DecisionKind,
        /// Target territory.
        target: TerritoryId,
    },
    /// An AI decision was applied (or failed to apply).
    DecisionExecuted {
        /// Decision identifier.
        decision_id: DecisionId,
        /// Deciding faction.
        faction: FactionId,
        /// Requested action.
        kind: DecisionKind,
        /// Target territory.
        target: TerritoryId,
        /// Whether the influence change was accepted.
        success: bool,
    },
}

impl FrontlineEvent {
    /// Territory the event concerns, if it concerns exactly one.
    pub const fn territory_id(&self) -> Option<TerritoryId> {
        match self {
            Self::InfluenceChanged { update } => Some(update.territory_id),
            Self::TerritorialControlChanged { territory_id, .. }
            | Self::TerritoryContested { territory_id, .. }
            | Self::TerritoryUncontested { territory_id }
            | Self::SiegeStarted { territory_id, .. }
            | Self::PhaseChanged { territory_id, .. }
            | Self::DominanceThresholdReached { territory_id, .. }
            | Self::TicketsChanged { territory_id, .. }
            | Self::SiegeResolved { territory_id, .. } => Some(*territory_id),
            Self::DecisionQueued { target, .. } | Self::DecisionExecuted { target, .. } => {
                Some(*target)
            }
            Self::RouteGenerated { .. } | Self::RouteInvalidated { .. } => None,
        }
    }

    /// Short snake-case name, matching the serialized `type` tag.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InfluenceChanged { .. } => "influence_changed",
            Self::TerritorialControlChanged { .. } => "territorial_control_changed",
            Self::TerritoryContested { .. } => "territory_contested",
            Self::TerritoryUncontested { .. } => "territory_uncontested",
            Self::RouteGenerated { .. } => "route_generated",
            Self::RouteInvalidated { .. } => "route_invalidated",
            Self::SiegeStarted { .. } => "siege_started",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::DominanceThresholdReached { .. } => "dominance_threshold_reached",
            Self::TicketsChanged { .. } => "tickets_changed",
            Self::SiegeResolved { .. } => "siege_resolved",
            Self::DecisionQueued { .. } => "decision_queued",
            Self::DecisionExecuted { .. } => "decision_executed",
        }
    }

    /// Whether the event signals a change in control or contested status.
    pub const fn is_control_signal(&self) -> bool {
        matches!(
            self,
            Self::TerritorialControlChanged { .. }
                | Self::TerritoryContested { .. }
                | Self::TerritoryUncontested { .. }
        )
    }
}

/// An event stamped with its position in the global stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventEnvelope {
    /// Monotonic sequence number, starting at 1.
    pub sequence: u64,
    /// When the event was published.
    pub emitted_at: DateTime<Utc>,
    /// The event itself.
    pub event: FrontlineEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_tag_matches_name() {
        let event = FrontlineEvent::TerritoryUncontested {
            territory_id: TerritoryId(4),
        };
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json.get("type").and_then(|v| v.as_str()), Some(event.name()));
        assert_eq!(event.territory_id(), Some(TerritoryId(4)));
        assert!(event.is_control_signal());
    }

    #[test]
    fn route_events_have_no_single_territory() {
        let event = FrontlineEvent::RouteInvalidated {
            route_id: RouteId::new(),
            faction: FactionId(1),
            cause: String::from("test"),
        };
        assert_eq!(event.territory_id(), None);
        assert!(!event.is_control_signal());
    }
}
