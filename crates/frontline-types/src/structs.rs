//! Core data-model structs.
//!
//! These are plain data records. Behaviour that mutates them lives in the
//! component crates (`frontline-territory`, `frontline-routes`, ...); the
//! helpers here are pure reads and geometry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{DecisionKind, HierarchyLevel, InfluenceCause, ResourceType, ThreatKind};
use crate::ids::{DecisionId, FactionId, RouteId, TerritoryId};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point in world space (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point {
    /// East-west coordinate.
    pub x: f64,
    /// North-south coordinate.
    pub y: f64,
}

impl Point {
    /// Construct a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Geographic extent of a territory: a circle, optionally refined by a
/// polygon outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TerritoryBounds {
    /// Centre of the territory; waypoints are derived from it.
    pub center: Point,
    /// Radius of the bounding circle.
    pub radius: f64,
    /// Optional outline. When non-empty it replaces the circle for
    /// containment tests.
    #[serde(default)]
    pub polygon: Vec<Point>,
}

impl TerritoryBounds {
    /// Circular bounds.
    pub const fn circle(center: Point, radius: f64) -> Self {
        Self {
            center,
            radius,
            polygon: Vec::new(),
        }
    }

    /// Whether `point` lies inside the territory.
    pub fn contains(&self, point: Point) -> bool {
        if self.polygon.len() < 3 {
            return self.center.distance_to(point) <= self.radius;
        }
        // Even-odd ray casting along +x.
        let mut inside = false;
        let next = self.polygon.iter().cycle().skip(1);
        for (a, b) in self.polygon.iter().zip(next) {
            let straddles = (a.y > point.y) != (b.y > point.y);
            if straddles {
                let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
                if point.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

// ---------------------------------------------------------------------------
// Territory
// ---------------------------------------------------------------------------

/// A static territory definition owned by the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Territory {
    /// Catalog identifier.
    pub id: TerritoryId,
    /// Display name.
    pub name: String,
    /// Hierarchy level.
    pub level: HierarchyLevel,
    /// Containing territory, `None` for top-level regions.
    #[serde(default)]
    pub parent: Option<TerritoryId>,
    /// Geographic extent.
    pub bounds: TerritoryBounds,
    /// Long-term strategic worth (0-100).
    #[serde(default)]
    pub strategic_value: f64,
    /// Short-term tactical worth (0-100).
    #[serde(default)]
    pub tactical_value: f64,
    /// Resource tag.
    #[serde(default)]
    pub resource: ResourceType,
    /// Per-territory influence decay half-life override in seconds.
    #[serde(default)]
    pub decay_half_life_secs: Option<f64>,
}

impl Territory {
    /// Centre point of the territory.
    pub const fn center(&self) -> Point {
        self.bounds.center
    }
}

/// Per-territory dynamic state, mutated only by the state manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TerritorialState {
    /// Territory this state belongs to.
    pub territory_id: TerritoryId,
    /// Influence per faction, each clamped to `[0, 100]`.
    pub influence: BTreeMap<FactionId, f64>,
    /// Faction in control, if any.
    pub dominant: Option<FactionId>,
    /// Whether the territory is contested.
    pub contested: bool,
    /// Time of the last mutation.
    pub last_updated: DateTime<Utc>,
    /// Exponential decay constant (per second).
    pub decay_rate: f64,
    /// Sequence of the last published update for this territory, `0`
    /// before the first.
    #[serde(default)]
    pub last_sequence: u64,
}

impl TerritorialState {
    /// Fresh, neutral state.
    pub const fn new(territory_id: TerritoryId, decay_rate: f64, now: DateTime<Utc>) -> Self {
        Self {
            territory_id,
            influence: BTreeMap::new(),
            dominant: None,
            contested: false,
            last_updated: now,
            decay_rate,
            last_sequence: 0,
        }
    }

    /// Influence of `faction`, zero when absent.
    pub fn influence_of(&self, faction: FactionId) -> f64 {
        self.influence.get(&faction).copied().unwrap_or(0.0)
    }

    /// Factions ordered by influence, highest first. Ties order by id.
    pub fn ranked(&self) -> Vec<(FactionId, f64)> {
        let mut ranked: Vec<(FactionId, f64)> =
            self.influence.iter().map(|(f, v)| (*f, *v)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// Derived control view of this state.
    pub const fn control(&self) -> TerritoryControl {
        TerritoryControl {
            dominant: self.dominant,
            contested: self.contested,
        }
    }
}

/// The two derived control facts other components care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TerritoryControl {
    /// Faction in control, if any.
    pub dominant: Option<FactionId>,
    /// Whether the territory is contested.
    pub contested: bool,
}

/// Immutable record of one influence mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TerritorialUpdate {
    /// Manager-wide sequence number, increasing in acceptance order.
    pub sequence: u64,
    /// Territory that changed.
    pub territory_id: TerritoryId,
    /// Faction whose influence changed.
    pub faction_id: FactionId,
    /// Delta actually applied after clamping.
    pub delta: f64,
    /// Why the change happened.
    pub cause: InfluenceCause,
    /// The faction's influence after the change.
    pub resulting_influence: f64,
    /// Whether the dominant faction changed.
    pub control_changed: bool,
    /// Dominant faction after the change.
    pub dominant: Option<FactionId>,
    /// Contested flag after the change.
    pub contested: bool,
    /// When the change was accepted.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Symmetric edge between two territories in the route planner's graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TerritorialConnection {
    /// Lower territory id of the pair.
    pub a: TerritoryId,
    /// Higher territory id of the pair.
    pub b: TerritoryId,
    /// Centre-to-centre distance.
    pub distance: f64,
    /// Whether convoys may travel this edge directly.
    pub direct: bool,
    /// Security level in `[0, 1]`.
    pub security: f64,
}

impl TerritorialConnection {
    /// The endpoint opposite `from`, or `None` if `from` is not an endpoint.
    pub fn other(&self, from: TerritoryId) -> Option<TerritoryId> {
        if from == self.a {
            Some(self.b)
        } else if from == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// A faction's supply route between two territories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConvoyRoute {
    /// Route identifier.
    pub id: RouteId,
    /// Owning faction.
    pub faction: FactionId,
    /// Human-readable name.
    pub name: String,
    /// Ordered territory sequence, at least two entries.
    pub path: Vec<TerritoryId>,
    /// Territory centres along the path.
    pub waypoints: Vec<Point>,
    /// Sum of segment lengths.
    pub total_distance: f64,
    /// Weakest edge security along the path.
    pub security_rating: f64,
    /// Economic value of running the route.
    pub profitability: f64,
    /// Whether the route is usable.
    pub active: bool,
    /// Hash of the generation parameters.
    pub params_hash: u64,
    /// Minimum security requested at generation.
    pub min_security: f64,
    /// Hop limit requested at generation.
    pub max_hops: u32,
    /// When the route was generated.
    pub created_at: DateTime<Utc>,
    /// When security and profitability were last recomputed.
    pub last_validated: DateTime<Utc>,
    /// When the route was deactivated.
    pub invalidated_at: Option<DateTime<Utc>>,
    /// Why the route was deactivated.
    pub invalidation_cause: Option<String>,
}

impl ConvoyRoute {
    /// Source territory.
    pub fn source(&self) -> Option<TerritoryId> {
        self.path.first().copied()
    }

    /// Destination territory.
    pub fn destination(&self) -> Option<TerritoryId> {
        self.path.last().copied()
    }

    /// Whether the path passes through `territory`.
    pub fn passes_through(&self, territory: TerritoryId) -> bool {
        self.path.contains(&territory)
    }
}

// ---------------------------------------------------------------------------
// Faction AI
// ---------------------------------------------------------------------------

/// A ranked threat against a faction's holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ThreatAssessment {
    /// Faction under threat.
    pub faction: FactionId,
    /// Territory where the threat was seen.
    pub territory_id: TerritoryId,
    /// Threat category.
    pub kind: ThreatKind,
    /// Rival responsible, when known.
    pub hostile_faction: Option<FactionId>,
    /// Severity in `[0, 1]`.
    pub severity: f64,
    /// When the threat was detected.
    pub detected_at: DateTime<Utc>,
}

/// A queued AI decision. Applied by the AI manager through the state
/// manager's write path, never directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StrategicDecision {
    /// Decision identifier.
    pub id: DecisionId,
    /// Deciding faction.
    pub faction: FactionId,
    /// Requested action.
    pub kind: DecisionKind,
    /// Territory the action targets.
    pub target: TerritoryId,
    /// Priority in `[0, 1]`; higher runs first.
    pub priority: f64,
    /// Share of the faction's effort committed, in percent.
    pub resource_commitment: f64,
    /// Seconds to wait after creation before executing.
    pub execution_delay_secs: u64,
    /// Free-text explanation for observability only.
    pub reasoning: String,
    /// When the decision was made.
    pub created_at: DateTime<Utc>,
}

impl StrategicDecision {
    /// Earliest time the decision may execute.
    pub fn execute_after(&self) -> DateTime<Utc> {
        let delay = i64::try_from(self.execution_delay_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX);
        self.created_at
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
