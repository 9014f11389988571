//! Built-in strategies and the per-faction registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use frontline_types::{
    DecisionKind, FactionId, ResourceType, StrategyKind, TerritorialState, Territory,
    ThreatAssessment, ThreatKind,
};

use crate::config::FactionProfile;
use crate::strategy::{DecisionDraft, FactionStrategy, PlanningContext, territorial_value};

/// Targets chosen per strategic pass.
const STRATEGIC_TARGETS: usize = 2;

/// Highest-scoring entries first, at most `limit`.
fn top<T>(mut scored: Vec<(f64, T)>, limit: usize) -> Vec<(f64, T)> {
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(limit);
    scored
}

/// How open a territory is to a newcomer: `1` when no rival has any
/// influence, `0` when a rival is at full strength.
fn opening(ctx: &PlanningContext<'_>, state: &TerritorialState) -> f64 {
    (1.0 - ctx.strongest_rival(state) / 100.0).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Expansionist
// ---------------------------------------------------------------------------

/// Grabs valuable, weakly held ground and only defends against serious
/// threats.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expansionist;

impl FactionStrategy for Expansionist {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Expansionist
    }

    fn plan_strategic(&self, ctx: &PlanningContext<'_>) -> Vec<DecisionDraft> {
        let aggression = ctx.profile.aggression();
        let scored = ctx
            .frontier()
            .map(|entry| {
                let value = self.evaluate_territory_priority(ctx.profile, &entry.territory, &entry.state);
                (value * (0.5 + opening(ctx, &entry.state)), entry)
            })
            .collect();
        top(scored, STRATEGIC_TARGETS)
            .into_iter()
            .map(|(score, entry)| {
                DecisionDraft::new(
                    DecisionKind::Expand,
                    entry.id(),
                    score / 150.0,
                    40.0 + aggression * 40.0,
                    30,
                    format!("expand into {} (score {score:.1})", entry.territory.name),
                )
            })
            .collect()
    }

    fn plan_tactical(&self, ctx: &PlanningContext<'_>) -> Vec<DecisionDraft> {
        ctx.holdings()
            .filter(|entry| ctx.margin(&entry.state) < 20.0)
            .map(|entry| {
                DecisionDraft::new(
                    DecisionKind::Consolidate,
                    entry.id(),
                    0.4,
                    30.0,
                    10,
                    format!("firm up thin margin in {}", entry.territory.name),
                )
            })
            .collect()
    }

    fn respond_to_threat(
        &self,
        ctx: &PlanningContext<'_>,
        threat: &ThreatAssessment,
    ) -> Option<DecisionDraft> {
        (threat.severity >= 0.5).then(|| {
            DecisionDraft::new(
                DecisionKind::Defend,
                threat.territory_id,
                threat.severity,
                30.0 + ctx.profile.aggression() * 20.0,
                0,
                format!("{:?} at severity {:.2}", threat.kind, threat.severity),
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Fortress
// ---------------------------------------------------------------------------

/// Holds what it has. Consolidates narrow margins and answers every threat.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fortress;

impl FactionStrategy for Fortress {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fortress
    }

    fn plan_strategic(&self, ctx: &PlanningContext<'_>) -> Vec<DecisionDraft> {
        let holdings: Vec<_> = ctx.holdings().collect();
        if holdings.is_empty() {
            // Nothing to hold yet: claim the single most valuable territory.
            let scored = ctx
                .frontier()
                .map(|entry| {
                    let value =
                        self.evaluate_territory_priority(ctx.profile, &entry.territory, &entry.state);
                    (value * opening(ctx, &entry.state), entry)
                })
                .collect();
            return top(scored, 1)
                .into_iter()
                .map(|(score, entry)| {
                    DecisionDraft::new(
                        DecisionKind::Expand,
                        entry.id(),
                        score / 100.0,
                        50.0,
                        60,
                        format!("establish a foothold in {}", entry.territory.name),
                    )
                })
                .collect();
        }
        let scored = holdings
            .into_iter()
            .map(|entry| (100.0 - ctx.margin(&entry.state), entry))
            .collect();
        top(scored, STRATEGIC_TARGETS)
            .into_iter()
            .map(|(exposure, entry)| {
                DecisionDraft::new(
                    DecisionKind::Consolidate,
                    entry.id(),
                    exposure / 100.0,
                    50.0,
                    20,
                    format!("reinforce {} (exposure {exposure:.1})", entry.territory.name),
                )
            })
            .collect()
    }

    fn plan_tactical(&self, ctx: &PlanningContext<'_>) -> Vec<DecisionDraft> {
        ctx.world
            .iter()
            .filter(|entry| entry.state.contested && entry.state.influence_of(ctx.faction()) > 0.0)
            .map(|entry| {
                DecisionDraft::new(
                    DecisionKind::Defend,
                    entry.id(),
                    0.6,
                    40.0,
                    5,
                    format!("hold contested {}", entry.territory.name),
                )
            })
            .collect()
    }

    fn respond_to_threat(
        &self,
        _ctx: &PlanningContext<'_>,
        threat: &ThreatAssessment,
    ) -> Option<DecisionDraft> {
        Some(DecisionDraft::new(
            DecisionKind::Defend,
            threat.territory_id,
            (threat.severity + 0.2).min(1.0),
            70.0,
            0,
            format!("{:?} at severity {:.2}", threat.kind, threat.severity),
        ))
    }
}

// ---------------------------------------------------------------------------
// Technocrat
// ---------------------------------------------------------------------------

/// Extra weight technology territories carry for a technocrat.
const TECHNOLOGY_BIAS: f64 = 2.0;

/// Chases technology territories and guards them closely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Technocrat;

impl FactionStrategy for Technocrat {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Technocrat
    }

    fn evaluate_territory_priority(
        &self,
        profile: &FactionProfile,
        territory: &Territory,
        _state: &TerritorialState,
    ) -> f64 {
        let value = territorial_value(profile, territory);
        if territory.resource == ResourceType::Technology {
            value * TECHNOLOGY_BIAS
        } else {
            value
        }
    }

    fn plan_strategic(&self, ctx: &PlanningContext<'_>) -> Vec<DecisionDraft> {
        let scored = ctx
            .frontier()
            .map(|entry| {
                let value = self.evaluate_territory_priority(ctx.profile, &entry.territory, &entry.state);
                (value * opening(ctx, &entry.state), entry)
            })
            .collect();
        top(scored, STRATEGIC_TARGETS)
            .into_iter()
            .map(|(score, entry)| {
                DecisionDraft::new(
                    DecisionKind::Expand,
                    entry.id(),
                    score / 200.0,
                    45.0,
                    45,
                    format!("acquire {} (score {score:.1})", entry.territory.name),
                )
            })
            .collect()
    }

    fn plan_tactical(&self, ctx: &PlanningContext<'_>) -> Vec<DecisionDraft> {
        ctx.holdings()
            .filter(|entry| entry.territory.resource == ResourceType::Technology)
            .map(|entry| {
                DecisionDraft::new(
                    DecisionKind::Consolidate,
                    entry.id(),
                    0.5,
                    35.0,
                    10,
                    format!("secure research at {}", entry.territory.name),
                )
            })
            .collect()
    }

    fn respond_to_threat(
        &self,
        ctx: &PlanningContext<'_>,
        threat: &ThreatAssessment,
    ) -> Option<DecisionDraft> {
        let guards_technology = ctx
            .world
            .get(threat.territory_id)
            .is_some_and(|entry| entry.territory.resource == ResourceType::Technology);
        let serious = threat.severity >= 0.4 || threat.kind == ThreatKind::TerritoryLost;
        (guards_technology || serious).then(|| {
            DecisionDraft::new(
                DecisionKind::Defend,
                threat.territory_id,
                threat.severity,
                if guards_technology { 60.0 } else { 35.0 },
                0,
                format!("{:?} at severity {:.2}", threat.kind, threat.severity),
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The built-in strategy for a kind.
pub fn builtin(kind: StrategyKind) -> Arc<dyn FactionStrategy> {
    match kind {
        StrategyKind::Expansionist => Arc::new(Expansionist),
        StrategyKind::Fortress => Arc::new(Fortress),
        StrategyKind::Technocrat => Arc::new(Technocrat),
    }
}

/// Strategy instances keyed by faction.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<FactionId, Arc<dyn FactionStrategy>>,
}

impl StrategyRegistry {
    /// Empty registry.
    pub const fn new() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// One built-in strategy per profile.
    pub fn from_profiles(profiles: &[FactionProfile]) -> Self {
        Self {
            strategies: profiles
                .iter()
                .map(|p| (p.id, builtin(p.strategy)))
                .collect(),
        }
    }

    /// Install or replace a faction's strategy.
    pub fn assign(&mut self, faction: FactionId, strategy: Arc<dyn FactionStrategy>) {
        self.strategies.insert(faction, strategy);
    }

    /// Strategy for a faction.
    pub fn get(&self, faction: FactionId) -> Option<Arc<dyn FactionStrategy>> {
        self.strategies.get(&faction).cloned()
    }

    /// Factions with a strategy.
    pub fn factions(&self) -> Vec<FactionId> {
        self.strategies.keys().copied().collect()
    }

    /// Number of registered factions.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether no faction has a strategy.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::DateTime;
    use frontline_territory::{TerritorySnapshot, WorldSnapshot};
    use frontline_types::{HierarchyLevel, Point, TerritoryBounds, TerritoryId};

    use super::*;

    const A: FactionId = FactionId(1);
    const B: FactionId = FactionId(2);

    fn entry(
        id: u32,
        resource: ResourceType,
        influence: &[(FactionId, f64)],
        dominant: Option<FactionId>,
        contested: bool,
    ) -> TerritorySnapshot {
        let mut state = TerritorialState::new(TerritoryId(id), 0.0, DateTime::default());
        state.influence = influence.iter().copied().collect();
        state.dominant = dominant;
        state.contested = contested;
        TerritorySnapshot {
            territory: Territory {
                id: TerritoryId(id),
                name: format!("Sector {id}"),
                level: HierarchyLevel::District,
                parent: None,
                bounds: TerritoryBounds::circle(Point::new(0.0, 0.0), 100.0),
                strategic_value: 60.0,
                tactical_value: 40.0,
                resource,
                decay_half_life_secs: None,
            },
            state,
        }
    }

    fn world(entries: Vec<TerritorySnapshot>) -> WorldSnapshot {
        WorldSnapshot {
            taken_at: DateTime::default(),
            territories: entries.into_iter().map(|e| (e.id(), e)).collect(),
        }
    }

    fn ctx<'a>(profile: &'a FactionProfile, world: &'a WorldSnapshot) -> PlanningContext<'a> {
        PlanningContext {
            profile,
            world,
            threats: &[],
            now: DateTime::default(),
        }
    }

    fn threat(territory: u32, severity: f64) -> ThreatAssessment {
        ThreatAssessment {
            faction: A,
            territory_id: TerritoryId(territory),
            kind: ThreatKind::HostileExpansion,
            hostile_faction: Some(B),
            severity,
            detected_at: DateTime::default(),
        }
    }

    #[test]
    fn value_blends_scores_and_resource_weight() {
        let mut profile = FactionProfile::new(A, "Alpha", StrategyKind::Expansionist);
        profile.resource_weights.insert(ResourceType::Energy, 1.5);
        let snapshot = entry(1, ResourceType::Energy, &[], None, false);
        let value = territorial_value(&profile, &snapshot.territory);
        assert!((value - (60.0 * 0.6 + 40.0 * 0.4) * 1.5).abs() < 1e-9);
    }

    #[test]
    fn technocrats_prize_technology() {
        let profile = FactionProfile::new(A, "Alpha", StrategyKind::Technocrat);
        let tech = entry(1, ResourceType::Technology, &[], None, false);
        let farm = entry(2, ResourceType::Agriculture, &[], None, false);
        let strategy = Technocrat;
        assert!(
            strategy.evaluate_territory_priority(&profile, &tech.territory, &tech.state)
                > strategy.evaluate_territory_priority(&profile, &farm.territory, &farm.state)
        );

        let world = world(vec![tech, farm]);
        let drafts = strategy.plan_strategic(&ctx(&profile, &world));
        assert_eq!(drafts.first().map(|d| d.target), Some(TerritoryId(1)));
        assert!(drafts.iter().all(|d| d.kind == DecisionKind::Expand));
    }

    #[test]
    fn expansionists_prefer_open_ground() {
        let profile = FactionProfile::new(A, "Alpha", StrategyKind::Expansionist);
        let world = world(vec![
            entry(1, ResourceType::Trade, &[(B, 90.0)], Some(B), false),
            entry(2, ResourceType::Trade, &[], None, false),
            entry(3, ResourceType::Trade, &[(A, 70.0)], Some(A), false),
        ]);
        let drafts = Expansionist.plan_strategic(&ctx(&profile, &world));
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts.first().map(|d| d.target), Some(TerritoryId(2)));
        assert!(drafts.iter().all(|d| d.target != TerritoryId(3)));
        assert!(drafts.iter().all(|d| (0.0..=1.0).contains(&d.priority)));
    }

    #[test]
    fn fortress_consolidates_its_most_exposed_holding() {
        let profile = FactionProfile::new(A, "Alpha", StrategyKind::Fortress);
        let world = world(vec![
            entry(1, ResourceType::Military, &[(A, 90.0)], Some(A), false),
            entry(2, ResourceType::Military, &[(A, 62.0), (B, 50.0)], Some(A), false),
        ]);
        let drafts = Fortress.plan_strategic(&ctx(&profile, &world));
        let first = drafts.first().unwrap();
        assert_eq!(first.kind, DecisionKind::Consolidate);
        assert_eq!(first.target, TerritoryId(2));
    }

    #[test]
    fn fortress_without_holdings_claims_a_foothold() {
        let profile = FactionProfile::new(A, "Alpha", StrategyKind::Fortress);
        let world = world(vec![entry(1, ResourceType::Military, &[], None, false)]);
        let drafts = Fortress.plan_strategic(&ctx(&profile, &world));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts.first().map(|d| d.kind), Some(DecisionKind::Expand));
    }

    #[test]
    fn threat_responses_follow_temperament() {
        let profile = FactionProfile::new(A, "Alpha", StrategyKind::Expansionist);
        let world = world(vec![entry(1, ResourceType::Trade, &[(A, 60.0)], Some(A), false)]);
        let context = ctx(&profile, &world);

        assert!(Expansionist.respond_to_threat(&context, &threat(1, 0.3)).is_none());
        assert!(Expansionist.respond_to_threat(&context, &threat(1, 0.7)).is_some());
        let fortress = Fortress.respond_to_threat(&context, &threat(1, 0.3)).unwrap();
        assert_eq!(fortress.kind, DecisionKind::Defend);
        assert!((fortress.priority - 0.5).abs() < 1e-9);
    }

    #[test]
    fn registry_keys_strategies_by_faction() {
        let profiles = vec![
            FactionProfile::new(A, "Alpha", StrategyKind::Fortress),
            FactionProfile::new(B, "Beta", StrategyKind::Technocrat),
        ];
        let mut registry = StrategyRegistry::from_profiles(&profiles);
        assert_eq!(registry.get(A).map(|s| s.kind()), Some(StrategyKind::Fortress));
        assert_eq!(registry.get(B).map(|s| s.kind()), Some(StrategyKind::Technocrat));

        registry.assign(A, builtin(StrategyKind::Expansionist));
        assert_eq!(registry.get(A).map(|s| s.kind()), Some(StrategyKind::Expansionist));
        assert_eq!(registry.factions(), vec![A, B]);
    }
}
