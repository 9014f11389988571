//! The faction AI manager: one strategy per faction, three cadences, one
//! decision queue.
//!
//! Planning only reads world snapshots. Decisions land in the
//! [`DecisionQueue`] and are applied later by [`FactionAiManager::execute_due`]
//! through the state manager's write path. No manager lock is held while
//! the sink runs, since influence writes fan out synchronously to the other
//! components.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use frontline_events::EventBus;
use frontline_territory::{InfluenceSink, WorldSnapshot, WorldView};
use frontline_types::sync::{lock, read, write};
use frontline_types::{
    Clock, DecisionId, DecisionKind, FactionId, FrontlineEvent, InfluenceCause, StrategicDecision,
    TerritorialUpdate, TerritoryId, ThreatAssessment, elapsed_secs,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::{AiConfig, FactionProfile};
use crate::error::AiError;
use crate::queue::{DecisionQueue, PushOutcome};
use crate::strategies::StrategyRegistry;
use crate::strategy::{DecisionDraft, FactionStrategy, PlanningContext};
use crate::threat::{ThreatScan, analyze_threats};

/// Counts from one planning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Factions planned for.
    pub factions: usize,
    /// Drafts produced by the strategies.
    pub planned: usize,
    /// Drafts that entered the queue.
    pub queued: usize,
    /// Drafts dropped as duplicates or for lack of room.
    pub discarded: usize,
}

/// Counts from one execution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// Decisions applied to territorial state.
    pub executed: usize,
    /// Decisions the state manager rejected.
    pub failed: usize,
}

/// What one [`FactionAiManager::tick`] ran. A `None` pass was not due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AiTickReport {
    /// Threat-response pass.
    pub threat: Option<CycleReport>,
    /// Strategic pass.
    pub strategic: Option<CycleReport>,
    /// Tactical pass.
    pub tactical: Option<CycleReport>,
    /// Execution pass.
    pub execution: Option<ExecutionReport>,
}

#[derive(Debug, Clone, Copy)]
enum Pass {
    Strategic,
    Tactical,
}

#[derive(Debug, Default)]
struct Cadence {
    threat: Option<DateTime<Utc>>,
    strategic: Option<DateTime<Utc>>,
    tactical: Option<DateTime<Utc>>,
    execution: Option<DateTime<Utc>>,
}

/// Whether a pass is due; records `now` as its last run when it is.
fn due(last: &mut Option<DateTime<Utc>>, interval_secs: u64, now: DateTime<Utc>) -> bool {
    let ready = last.is_none_or(|at| elapsed_secs(at, now) >= interval_secs as f64);
    if ready {
        *last = Some(now);
    }
    ready
}

#[derive(Debug, Clone, Default)]
struct FactionMemory {
    held: BTreeSet<TerritoryId>,
    threats: Vec<ThreatAssessment>,
}

/// Share of the base effort each kind of decision applies, and the cause
/// tag written with it.
fn effort(kind: DecisionKind) -> (f64, InfluenceCause) {
    match kind {
        DecisionKind::Expand => (1.0, InfluenceCause::AiExpand),
        DecisionKind::Defend => (0.8, InfluenceCause::AiDefend),
        DecisionKind::Consolidate => (0.5, InfluenceCause::AiConsolidate),
    }
}

/// Drives every AI faction.
pub struct FactionAiManager {
    config: AiConfig,
    profiles: BTreeMap<FactionId, FactionProfile>,
    registry: RwLock<StrategyRegistry>,
    world: Arc<dyn WorldView>,
    sink: Arc<dyn InfluenceSink>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    queue: Mutex<DecisionQueue>,
    cadence: Mutex<Cadence>,
    memory: Mutex<BTreeMap<FactionId, FactionMemory>>,
    /// Highest update sequence the threat pass has already reacted to.
    watermark: Mutex<u64>,
    rng: Mutex<SmallRng>,
}

impl FactionAiManager {
    /// Create a manager for the factions in `config`, each driven by its
    /// built-in strategy.
    pub fn new(
        config: AiConfig,
        world: Arc<dyn WorldView>,
        sink: Arc<dyn InfluenceSink>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let profiles: BTreeMap<FactionId, FactionProfile> = config
            .factions
            .iter()
            .map(|profile| (profile.id, profile.clone()))
            .collect();
        let registry = StrategyRegistry::from_profiles(&config.factions);
        let snapshot = world.world_snapshot();
        let memory = profiles
            .keys()
            .map(|faction| {
                let held = snapshot.controlled_by(*faction).into_iter().collect();
                (
                    *faction,
                    FactionMemory {
                        held,
                        threats: Vec::new(),
                    },
                )
            })
            .collect();
        let queue = DecisionQueue::new(config.queue_capacity);
        tracing::info!(factions = profiles.len(), "faction AI ready");
        Self {
            config,
            profiles,
            registry: RwLock::new(registry),
            world,
            sink,
            bus,
            clock,
            queue: Mutex::new(queue),
            cadence: Mutex::new(Cadence::default()),
            memory: Mutex::new(memory),
            watermark: Mutex::new(0),
            rng: Mutex::new(SmallRng::from_os_rng()),
        }
    }

    /// Seed the delay jitter so runs are reproducible.
    #[must_use]
    pub fn with_rng_seed(self, seed: u64) -> Self {
        *lock(&self.rng) = SmallRng::seed_from_u64(seed);
        self
    }

    /// The AI configuration.
    pub const fn config(&self) -> &AiConfig {
        &self.config
    }

    /// AI-driven factions, by id.
    pub fn factions(&self) -> Vec<FactionId> {
        self.profiles.keys().copied().collect()
    }

    /// A faction's profile.
    pub fn profile(&self, faction: FactionId) -> Option<&FactionProfile> {
        self.profiles.get(&faction)
    }

    /// Replace a faction's strategy.
    pub fn assign_strategy(
        &self,
        faction: FactionId,
        strategy: Arc<dyn FactionStrategy>,
    ) -> Result<(), AiError> {
        if !self.profiles.contains_key(&faction) {
            return Err(AiError::UnknownFaction(faction));
        }
        tracing::info!(faction = %faction, strategy = ?strategy.kind(), "strategy assigned");
        write(&self.registry).assign(faction, strategy);
        Ok(())
    }

    fn resolve(&self, faction: FactionId) -> Result<(&FactionProfile, Arc<dyn FactionStrategy>), AiError> {
        let profile = self
            .profiles
            .get(&faction)
            .ok_or(AiError::UnknownFaction(faction))?;
        let strategy = read(&self.registry)
            .get(faction)
            .ok_or(AiError::UnknownFaction(faction))?;
        Ok((profile, strategy))
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Value of a territory to a faction, as its strategy sees it.
    pub fn evaluate_territorial_value(
        &self,
        faction: FactionId,
        territory: TerritoryId,
    ) -> Result<f64, AiError> {
        let (profile, strategy) = self.resolve(faction)?;
        let world = self.world.world_snapshot();
        let entry = world
            .get(territory)
            .ok_or(AiError::TerritoryNotFound(territory))?;
        Ok(strategy.evaluate_territory_priority(profile, &entry.territory, &entry.state))
    }

    /// Ranked threats against a faction over the whole recent-update window.
    /// Does not change what the threat pass has seen.
    pub fn analyze_threats(&self, faction: FactionId) -> Result<Vec<ThreatAssessment>, AiError> {
        self.resolve(faction)?;
        let world = self.world.world_snapshot();
        let updates = self.world.recent_updates(self.config.threat_window);
        Ok(self.scan(faction, &world, &updates))
    }

    fn scan(
        &self,
        faction: FactionId,
        world: &WorldSnapshot,
        updates: &[TerritorialUpdate],
    ) -> Vec<ThreatAssessment> {
        let previously_held = lock(&self.memory)
            .get(&faction)
            .map(|memory| memory.held.clone())
            .unwrap_or_default();
        analyze_threats(&ThreatScan {
            faction,
            world,
            updates,
            previously_held: &previously_held,
            severity_floor: self.config.threat_severity_floor,
            now: self.clock.now(),
        })
    }

    /// Threats found by the latest threat pass.
    pub fn latest_threats(&self, faction: FactionId) -> Vec<ThreatAssessment> {
        lock(&self.memory)
            .get(&faction)
            .map(|memory| memory.threats.clone())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Cadences
    // -----------------------------------------------------------------------

    /// Run whichever passes are due: threats, then strategy, then tactics,
    /// then execution.
    pub fn tick(&self) -> AiTickReport {
        let now = self.clock.now();
        let (threat, strategic, tactical, execution) = {
            let mut cadence = lock(&self.cadence);
            (
                due(&mut cadence.threat, self.config.threat_interval_secs, now),
                due(&mut cadence.strategic, self.config.strategic_interval_secs, now),
                due(&mut cadence.tactical, self.config.tactical_interval_secs, now),
                due(&mut cadence.execution, self.config.execution_interval_secs, now),
            )
        };
        AiTickReport {
            threat: threat.then(|| self.run_threat_cycle()),
            strategic: strategic.then(|| self.run_strategic_cycle()),
            tactical: tactical.then(|| self.run_tactical_cycle()),
            execution: execution.then(|| self.execute_due()),
        }
    }

    /// Slow pass: where to expand, what to consolidate.
    pub fn run_strategic_cycle(&self) -> CycleReport {
        let report = self.plan(Pass::Strategic);
        tracing::info!(
            factions = report.factions,
            planned = report.planned,
            queued = report.queued,
            "strategic pass complete"
        );
        report
    }

    /// Medium pass: short-term operations.
    pub fn run_tactical_cycle(&self) -> CycleReport {
        let report = self.plan(Pass::Tactical);
        tracing::debug!(
            factions = report.factions,
            planned = report.planned,
            queued = report.queued,
            "tactical pass complete"
        );
        report
    }

    fn plan(&self, pass: Pass) -> CycleReport {
        let now = self.clock.now();
        let world = self.world.world_snapshot();
        let mut report = CycleReport::default();
        for faction in self.factions() {
            let Ok((profile, strategy)) = self.resolve(faction) else {
                continue;
            };
            let threats = self.latest_threats(faction);
            let ctx = PlanningContext {
                profile,
                world: &world,
                threats: &threats,
                now,
            };
            let drafts = match pass {
                Pass::Strategic => strategy.plan_strategic(&ctx),
                Pass::Tactical => strategy.plan_tactical(&ctx),
            };
            self.enqueue_all(faction, drafts, now, &mut report);
        }
        report
    }

    /// Fast pass: detect threats from updates since the previous pass and
    /// let each strategy respond.
    pub fn run_threat_cycle(&self) -> CycleReport {
        let now = self.clock.now();
        let world = self.world.world_snapshot();
        let window = self.world.recent_updates(self.config.threat_window);
        let fresh: Vec<TerritorialUpdate> = {
            let mut watermark = lock(&self.watermark);
            let seen = *watermark;
            if let Some(newest) = window.iter().map(|u| u.sequence).max() {
                *watermark = newest.max(seen);
            }
            window.into_iter().filter(|u| u.sequence > seen).collect()
        };

        let mut report = CycleReport::default();
        for faction in self.factions() {
            let Ok((profile, strategy)) = self.resolve(faction) else {
                continue;
            };
            let threats = self.scan(faction, &world, &fresh);
            {
                let mut memory = lock(&self.memory);
                let entry = memory.entry(faction).or_default();
                entry.held = world.controlled_by(faction).into_iter().collect();
                entry.threats.clone_from(&threats);
            }
            if let Some(worst) = threats.first() {
                tracing::debug!(
                    faction = %faction,
                    count = threats.len(),
                    territory = %worst.territory_id,
                    severity = worst.severity,
                    "threats detected"
                );
            }
            let ctx = PlanningContext {
                profile,
                world: &world,
                threats: &threats,
                now,
            };
            let drafts = threats
                .iter()
                .filter_map(|threat| strategy.respond_to_threat(&ctx, threat))
                .collect();
            self.enqueue_all(faction, drafts, now, &mut report);
        }
        report
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    fn enqueue_all(
        &self,
        faction: FactionId,
        drafts: Vec<DecisionDraft>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        report.factions = report.factions.saturating_add(1);
        for draft in drafts {
            report.planned = report.planned.saturating_add(1);
            if self.enqueue(faction, draft, now).accepted() {
                report.queued = report.queued.saturating_add(1);
            } else {
                report.discarded = report.discarded.saturating_add(1);
            }
        }
    }

    fn jitter(&self) -> u64 {
        let max = self.config.max_delay_jitter_secs;
        if max == 0 {
            return 0;
        }
        lock(&self.rng).random_range(0..=max)
    }

    fn enqueue(&self, faction: FactionId, draft: DecisionDraft, now: DateTime<Utc>) -> PushOutcome {
        let decision = StrategicDecision {
            id: DecisionId::new(),
            faction,
            kind: draft.kind,
            target: draft.target,
            priority: draft.priority,
            resource_commitment: draft.resource_commitment,
            execution_delay_secs: draft.execution_delay_secs.saturating_add(self.jitter()),
            reasoning: draft.reasoning,
            created_at: now,
        };
        let (id, kind, target) = (decision.id, decision.kind, decision.target);
        let outcome = lock(&self.queue).push(decision);
        match &outcome {
            PushOutcome::Evicted(dropped) => tracing::warn!(
                decision = %dropped.id,
                faction = %dropped.faction,
                priority = dropped.priority,
                "decision queue full, dropped lowest priority"
            ),
            PushOutcome::Rejected => tracing::warn!(
                faction = %faction,
                kind = ?kind,
                target = %target,
                "decision queue full, decision rejected"
            ),
            PushOutcome::Queued | PushOutcome::Replaced(_) | PushOutcome::Duplicate => {}
        }
        if outcome.accepted() {
            tracing::debug!(decision = %id, faction = %faction, kind = ?kind, target = %target, "decision queued");
            self.bus.publish(FrontlineEvent::DecisionQueued {
                decision_id: id,
                faction,
                kind,
                target,
            });
        }
        outcome
    }

    /// Queue a decision from outside the planning passes.
    pub fn submit_decision(
        &self,
        faction: FactionId,
        draft: DecisionDraft,
    ) -> Result<PushOutcome, AiError> {
        self.resolve(faction)?;
        if !(0.0..=1.0).contains(&draft.priority) {
            return Err(AiError::InvalidArgument(format!(
                "priority {} outside [0, 1]",
                draft.priority
            )));
        }
        if !(0.0..=100.0).contains(&draft.resource_commitment) {
            return Err(AiError::InvalidArgument(format!(
                "resource commitment {} outside [0, 100]",
                draft.resource_commitment
            )));
        }
        if self.world.world_snapshot().get(draft.target).is_none() {
            return Err(AiError::TerritoryNotFound(draft.target));
        }
        Ok(self.enqueue(faction, draft, self.clock.now()))
    }

    /// Pending decisions, highest priority first.
    pub fn pending_decisions(&self) -> Vec<StrategicDecision> {
        lock(&self.queue).pending()
    }

    /// Pending decisions of one faction, highest priority first.
    pub fn pending_for(&self, faction: FactionId) -> Vec<StrategicDecision> {
        lock(&self.queue).pending_for(faction)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Apply decisions whose delay has elapsed, up to the per-tick limit.
    pub fn execute_due(&self) -> ExecutionReport {
        let now = self.clock.now();
        let due = lock(&self.queue).pop_due(now, self.config.max_executions_per_tick);
        let mut report = ExecutionReport::default();
        for decision in due {
            let success = self.execute(&decision).is_ok();
            if success {
                report.executed = report.executed.saturating_add(1);
            } else {
                report.failed = report.failed.saturating_add(1);
            }
            self.bus.publish(FrontlineEvent::DecisionExecuted {
                decision_id: decision.id,
                faction: decision.faction,
                kind: decision.kind,
                target: decision.target,
                success,
            });
        }
        report
    }

    fn execute(&self, decision: &StrategicDecision) -> Result<TerritorialUpdate, AiError> {
        let (share, cause) = effort(decision.kind);
        let delta = self.config.base_effort * decision.resource_commitment / 100.0 * share;
        match self
            .sink
            .apply_influence_change(decision.target, decision.faction, delta, cause)
        {
            Ok(update) => {
                tracing::debug!(
                    decision = %decision.id,
                    faction = %decision.faction,
                    target = %decision.target,
                    delta,
                    resulting = update.resulting_influence,
                    "decision executed"
                );
                Ok(update)
            }
            Err(err) => {
                tracing::warn!(
                    decision = %decision.id,
                    faction = %decision.faction,
                    target = %decision.target,
                    error = %err,
                    "decision failed"
                );
                Err(err.into())
            }
        }
    }
}

impl core::fmt::Debug for FactionAiManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FactionAiManager")
            .field("factions", &self.profiles.len())
            .field("pending", &lock(&self.queue).len())
            .finish_non_exhaustive()
    }
}
