//! Enumeration types shared across the Frontline workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Territory classification
// ---------------------------------------------------------------------------

/// Position of a territory in the region/district/control-point hierarchy.
///
/// Ordering follows depth: a region contains districts, a district
/// contains control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    /// Top-level zone.
    Region,
    /// Mid-level zone inside a region.
    District,
    /// Smallest capturable point inside a district.
    ControlPoint,
}

impl HierarchyLevel {
    /// Depth of this level, `0` for regions.
    pub const fn depth(self) -> u8 {
        match self {
            Self::Region => 0,
            Self::District => 1,
            Self::ControlPoint => 2,
        }
    }

    /// The level a direct child of this level must have, if any.
    pub const fn child_level(self) -> Option<Self> {
        match self {
            Self::Region => Some(Self::District),
            Self::District => Some(Self::ControlPoint),
            Self::ControlPoint => None,
        }
    }
}

/// Dominant resource a territory produces.
///
/// Factions weight territories differently depending on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// No notable resource.
    #[default]
    None,
    /// Farmland and food production.
    Agriculture,
    /// Factories and heavy industry.
    Industry,
    /// Research sites and technology caches.
    Technology,
    /// Power generation.
    Energy,
    /// Barracks, depots, and fortifications.
    Military,
    /// Markets and trade hubs.
    Trade,
}

// ---------------------------------------------------------------------------
// Influence
// ---------------------------------------------------------------------------

/// Why an influence change happened. Carried on every update record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum InfluenceCause {
    /// An objective was captured or held.
    Objective,
    /// Combat outcome reported by the combat system.
    Combat,
    /// Feedback from a resolved siege encounter.
    Siege,
    /// AI expansion decision.
    AiExpand,
    /// AI defensive decision.
    AiDefend,
    /// AI consolidation decision.
    AiConsolidate,
    /// Background exponential decay.
    Decay,
    /// Any other tagged cause (scripted events, admin tools).
    Scripted(String),
}

impl core::fmt::Display for InfluenceCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Objective => f.write_str("objective"),
            Self::Combat => f.write_str("combat"),
            Self::Siege => f.write_str("siege"),
            Self::AiExpand => f.write_str("ai_expand"),
            Self::AiDefend => f.write_str("ai_defend"),
            Self::AiConsolidate => f.write_str("ai_consolidate"),
            Self::Decay => f.write_str("decay"),
            Self::Scripted(tag) => write!(f, "scripted:{tag}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Siege
// ---------------------------------------------------------------------------

/// Phase of a siege encounter. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum SiegePhase {
    /// Attackers test the defences.
    Probe,
    /// Attackers cut the territory's supply.
    Interdict,
    /// Attackers press for control.
    Dominate,
    /// Outcome is locked in until the lock expires.
    Locked,
}

impl SiegePhase {
    /// The phase that follows this one, `None` for [`SiegePhase::Locked`].
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Probe => Some(Self::Interdict),
            Self::Interdict => Some(Self::Dominate),
            Self::Dominate => Some(Self::Locked),
            Self::Locked => None,
        }
    }
}

/// Side of a siege encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum SiegeSide {
    /// The side trying to take the territory.
    Attacker,
    /// The side holding the territory.
    Defender,
}

impl SiegeSide {
    /// The opposing side.
    pub const fn opponent(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }
}

/// How a siege encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum SiegeResolution {
    /// A side's ticket pool ran out.
    TicketsExhausted,
    /// The dominance meter reached 0.0 or 1.0.
    DominanceDecisive,
    /// The Locked phase ran its full duration.
    LockExpired,
    /// The territory stopped being contested.
    Uncontested,
    /// Neither side remained engaged.
    Abandoned,
}

/// Direction in which the dominance meter crossed a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum CrossingDirection {
    /// Moved from below the threshold to at-or-above it.
    Rising,
    /// Moved from at-or-above the threshold to below it.
    Falling,
}

// ---------------------------------------------------------------------------
// Faction AI
// ---------------------------------------------------------------------------

/// The territorial action an AI decision asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Push influence into a territory the faction does not hold.
    Expand,
    /// Shore up a held territory under threat.
    Defend,
    /// Widen the margin on a held territory.
    Consolidate,
}

/// Category of a detected threat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    /// The faction's own influence is dropping.
    InfluenceDecline,
    /// A rival is gaining influence in a held territory.
    HostileExpansion,
    /// The faction lost control of a territory.
    TerritoryLost,
}

/// Which built-in strategy drives a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Aggressive land grabbing.
    #[default]
    Expansionist,
    /// Holds what it has, defends early.
    Fortress,
    /// Prioritises technology territories.
    Technocrat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_in_order_and_stop_at_locked() {
        assert_eq!(SiegePhase::Probe.next(), Some(SiegePhase::Interdict));
        assert_eq!(SiegePhase::Interdict.next(), Some(SiegePhase::Dominate));
        assert_eq!(SiegePhase::Dominate.next(), Some(SiegePhase::Locked));
        assert_eq!(SiegePhase::Locked.next(), None);
    }

    #[test]
    fn hierarchy_children_go_one_level_deeper() {
        assert_eq!(HierarchyLevel::Region.child_level(), Some(HierarchyLevel::District));
        assert_eq!(HierarchyLevel::ControlPoint.child_level(), None);
        assert!(HierarchyLevel::Region.depth() < HierarchyLevel::ControlPoint.depth());
    }

    #[test]
    fn cause_display_is_stable() {
        assert_eq!(InfluenceCause::Objective.to_string(), "objective");
        assert_eq!(
            InfluenceCause::Scripted(String::from("festival")).to_string(),
            "scripted:festival"
        );
    }

    #[test]
    fn enums_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ResourceType::Technology).ok();
        assert_eq!(json.as_deref(), Some("\"technology\""));
        let json = serde_json::to_string(&SiegePhase::Interdict).ok();
        assert_eq!(json.as_deref(), Some("\"interdict\""));
    }
}
