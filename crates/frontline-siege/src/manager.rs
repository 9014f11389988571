//! The siege registry and its authority/replica roles.
//!
//! At most one siege runs per territory. Every mutation goes through the
//! authority; replicas only mirror [`SiegeSnapshot`]s sent to them. Events
//! for a siege are published while the siege map is locked so they keep
//! their per-territory order. Influence feedback from a resolved siege is
//! written after the lock is released, because the state manager publishes
//! back into this manager's listener.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use frontline_events::{EventBus, EventListener};
use frontline_territory::decay::lambda_from_half_life;
use frontline_territory::{ControlView, InfluenceSink};
use frontline_types::sync::{read, write};
use frontline_types::{
    Clock, CrossingDirection, EventEnvelope, FactionId, FrontlineEvent, InfluenceCause, SiegeId,
    SiegePhase, SiegeResolution, SiegeSide, TerritoryId, elapsed_secs, secs_delta,
};
use serde::{Deserialize, Serialize};

use crate::config::SiegeConfig;
use crate::error::SiegeError;
use crate::instance::{Ending, SiegeInstance};
use crate::meter::Crossing;

/// Whether this manager owns siege state or mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Server-side owner; the only role that may change siege state.
    #[default]
    Authority,
    /// Read-only mirror fed by [`SiegeManager::apply_replicated`].
    Replica,
}

/// Replicated view of one territory's siege slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiegeSnapshot {
    /// Territory the slot belongs to.
    pub territory_id: TerritoryId,
    /// The running siege, `None` once it has ended.
    pub instance: Option<SiegeInstance>,
}

/// How a siege ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiegeOutcome {
    /// The siege.
    pub siege_id: SiegeId,
    /// Besieged territory.
    pub territory_id: TerritoryId,
    /// Winning side, `None` when nobody won.
    pub winning_side: Option<SiegeSide>,
    /// Faction on the winning side, when known.
    pub winning_faction: Option<FactionId>,
    /// Why it ended.
    pub resolution: SiegeResolution,
}

/// State after a mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiegeUpdate {
    /// Phase after the mutation.
    pub phase: SiegePhase,
    /// Progress in that phase.
    pub phase_progress: f64,
    /// Dominance value.
    pub dominance: f64,
    /// Attacker tickets left.
    pub attacker_tickets: i64,
    /// Defender tickets left.
    pub defender_tickets: i64,
    /// Set when the mutation ended the siege.
    pub outcome: Option<SiegeOutcome>,
}

impl SiegeUpdate {
    fn of(instance: &SiegeInstance) -> Self {
        Self {
            phase: instance.phase,
            phase_progress: instance.phase_progress,
            dominance: instance.dominance(),
            attacker_tickets: instance.tickets.remaining(SiegeSide::Attacker),
            defender_tickets: instance.tickets.remaining(SiegeSide::Defender),
            outcome: None,
        }
    }
}

/// Result of one [`SiegeManager::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SiegeTickReport {
    /// Sieges whose meter relaxed toward neutral.
    pub relaxed: usize,
    /// Sieges that ended during the tick.
    pub resolved: usize,
}

/// Runs every siege encounter in the world.
pub struct SiegeManager {
    config: SiegeConfig,
    role: Role,
    lambda: f64,
    control: Arc<dyn ControlView>,
    sink: Arc<dyn InfluenceSink>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    sieges: RwLock<BTreeMap<TerritoryId, SiegeInstance>>,
}

impl SiegeManager {
    /// Create a manager in the given role.
    pub fn new(
        config: SiegeConfig,
        role: Role,
        control: Arc<dyn ControlView>,
        sink: Arc<dyn InfluenceSink>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lambda = lambda_from_half_life(config.dominance_half_life_secs);
        Self {
            config,
            role,
            lambda,
            control,
            sink,
            bus,
            clock,
            sieges: RwLock::new(BTreeMap::new()),
        }
    }

    /// This manager's role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// The active siege configuration.
    pub const fn config(&self) -> &SiegeConfig {
        &self.config
    }

    fn require_authority(&self) -> Result<(), SiegeError> {
        match self.role {
            Role::Authority => Ok(()),
            Role::Replica => Err(SiegeError::NotAuthoritative),
        }
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Start a siege on a contested territory.
    ///
    /// Control is checked again once the siege is registered. If the
    /// territory settled in between, the new siege ends as uncontested and
    /// the call reports [`SiegeError::NotContested`].
    ///
    /// # Errors
    ///
    /// [`SiegeError::NotAuthoritative`] on a replica,
    /// [`SiegeError::TerritoryNotFound`] for an unknown territory,
    /// [`SiegeError::NotContested`] unless the territory is contested, and
    /// [`SiegeError::AlreadyActive`] if a siege is already running there.
    pub fn begin_siege(
        &self,
        territory: TerritoryId,
        attacker: FactionId,
        defender: Option<FactionId>,
    ) -> Result<SiegeId, SiegeError> {
        self.require_authority()?;
        if defender == Some(attacker) {
            return Err(SiegeError::InvalidArgument(format!(
                "faction {attacker} cannot besiege itself"
            )));
        }
        let control = self
            .control
            .control_of(territory)
            .ok_or(SiegeError::TerritoryNotFound(territory))?;
        if !control.contested {
            return Err(SiegeError::NotContested(territory));
        }

        let now = self.clock.now();
        let id = {
            let mut sieges = write(&self.sieges);
            if let Some(existing) = sieges.get(&territory) {
                return Err(SiegeError::AlreadyActive {
                    territory,
                    siege: existing.id,
                });
            }
            let instance = SiegeInstance::new(territory, attacker, defender, &self.config, now);
            let id = instance.id;
            sieges.insert(territory, instance);
            tracing::info!(
                siege = %id,
                territory = %territory,
                attacker = %attacker,
                defender = ?defender,
                "siege started"
            );
            self.bus.publish(FrontlineEvent::SiegeStarted {
                siege_id: id,
                territory_id: territory,
                attacker,
                defender,
            });
            id
        };

        // Settled between the check and the insert.
        if !self
            .control
            .control_of(territory)
            .is_some_and(|control| control.contested)
        {
            tracing::debug!(siege = %id, territory = %territory, "territory settled while the siege started");
            self.close_uncontested(territory, Some(id));
            return Err(SiegeError::NotContested(territory));
        }
        Ok(id)
    }

    /// End a siege because its territory is no longer contested. No
    /// influence feedback is applied. Returns the outcome when a siege was
    /// running.
    pub fn end_uncontested(&self, territory: TerritoryId) -> Option<SiegeOutcome> {
        self.close_uncontested(territory, None)
    }

    // -------------------------------------------------------------------
    // Mutators
    // -------------------------------------------------------------------

    /// Move the dominance meter. Positive values favour the attacker.
    ///
    /// Each newly crossed notification threshold publishes
    /// `DominanceThresholdReached`; rising crossings also add phase
    /// progress. A meter at either end resolves the siege.
    pub fn add_dominance_delta(
        &self,
        territory: TerritoryId,
        delta: f64,
    ) -> Result<SiegeUpdate, SiegeError> {
        if !delta.is_finite() {
            return Err(SiegeError::InvalidArgument(format!(
                "dominance delta must be finite, got {delta}"
            )));
        }
        self.apply(territory, |siege, events, now| {
            siege.touch(now);
            siege.decayed_until = now;
            let crossings = siege.meter.apply(delta);
            self.record_crossings(siege, &crossings, true, events);
            self.auto_advance(siege, events, now);
            Ok(())
        })
    }

    /// Add progress to the current phase.
    pub fn update_phase_progress(
        &self,
        territory: TerritoryId,
        delta: f64,
    ) -> Result<SiegeUpdate, SiegeError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(SiegeError::InvalidArgument(format!(
                "phase progress must be a non-negative number, got {delta}"
            )));
        }
        self.apply(territory, |siege, events, now| {
            if siege.phase == SiegePhase::Locked {
                return Err(SiegeError::PhaseLocked(territory));
            }
            siege.add_progress(delta);
            self.auto_advance(siege, events, now);
            Ok(())
        })
    }

    /// Advance to the next phase once the current one has reached its
    /// progress threshold.
    pub fn advance_phase(&self, territory: TerritoryId) -> Result<SiegeUpdate, SiegeError> {
        self.apply(territory, |siege, events, now| {
            if siege.phase == SiegePhase::Locked {
                return Err(SiegeError::PhaseLocked(territory));
            }
            if let Some(required) = siege.missing_progress(&self.config) {
                return Err(SiegeError::PhaseNotReady {
                    territory,
                    phase: siege.phase,
                    progress: siege.phase_progress,
                    required,
                });
            }
            self.advance(siege, events, now);
            Ok(())
        })
    }

    /// Spend tickets from one side's pool. An exhausted pool ends the siege
    /// in the other side's favour, whatever the phase or meter say.
    pub fn consume_tickets(
        &self,
        territory: TerritoryId,
        side: SiegeSide,
        amount: u32,
    ) -> Result<SiegeUpdate, SiegeError> {
        if amount == 0 {
            return Err(SiegeError::InvalidArgument(String::from(
                "ticket amount must be positive",
            )));
        }
        self.apply(territory, |siege, events, now| {
            siege.touch(now);
            let remaining = siege.tickets.consume(side, amount);
            events.push(FrontlineEvent::TicketsChanged {
                siege_id: siege.id,
                territory_id: territory,
                side,
                remaining,
            });
            Ok(())
        })
    }

    /// Mark a side as engaged or not. A siege with neither side engaged is
    /// abandoned.
    pub fn set_participant_active(
        &self,
        territory: TerritoryId,
        side: SiegeSide,
        active: bool,
    ) -> Result<SiegeUpdate, SiegeError> {
        self.apply(territory, |siege, _, _| {
            match side {
                SiegeSide::Attacker => siege.attacker_active = active,
                SiegeSide::Defender => siege.defender_active = active,
            }
            Ok(())
        })
    }

    /// Background pass: relax idle meters toward neutral and resolve sieges
    /// whose lock has expired. Does nothing on a replica.
    pub fn tick(&self) -> SiegeTickReport {
        let mut report = SiegeTickReport::default();
        if self.role == Role::Replica {
            return report;
        }
        let grace = secs_delta(self.config.idle_grace_secs);
        let territories: Vec<TerritoryId> = read(&self.sieges).keys().copied().collect();
        for territory in territories {
            let result = self.mutate(territory, |siege, events, now| {
                let idle_from = siege
                    .last_activity
                    .checked_add_signed(grace)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                let from = siege.decayed_until.max(idle_from);
                if now <= from {
                    return Ok(false);
                }
                let crossings = siege.meter.relax(self.lambda, elapsed_secs(from, now));
                siege.decayed_until = now;
                self.record_crossings(siege, &crossings, false, events);
                Ok(true)
            });
            match result {
                Ok((relaxed, update)) => {
                    if relaxed {
                        report.relaxed = report.relaxed.saturating_add(1);
                    }
                    if update.outcome.is_some() {
                        report.resolved = report.resolved.saturating_add(1);
                    }
                }
                Err(err) => tracing::debug!(territory = %territory, error = %err, "siege tick skipped"),
            }
        }
        report
    }

    // -------------------------------------------------------------------
    // Replication
    // -------------------------------------------------------------------

    /// Replication view of one territory's siege slot.
    pub fn snapshot(&self, territory: TerritoryId) -> SiegeSnapshot {
        SiegeSnapshot {
            territory_id: territory,
            instance: read(&self.sieges).get(&territory).cloned(),
        }
    }

    /// Replication view of every running siege.
    pub fn snapshots(&self) -> Vec<SiegeSnapshot> {
        read(&self.sieges)
            .iter()
            .map(|(territory, instance)| SiegeSnapshot {
                territory_id: *territory,
                instance: Some(instance.clone()),
            })
            .collect()
    }

    /// Mirror authority state on a replica. Snapshots older than what the
    /// replica holds are ignored. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// [`SiegeError::NotReplica`] on the authority.
    pub fn apply_replicated(&self, snapshot: SiegeSnapshot) -> Result<bool, SiegeError> {
        if self.role == Role::Authority {
            return Err(SiegeError::NotReplica);
        }
        let territory = snapshot.territory_id;
        let mut sieges = write(&self.sieges);
        let Some(incoming) = snapshot.instance else {
            return Ok(sieges.remove(&territory).is_some());
        };
        if let Some(current) = sieges.get(&territory)
            && current.id == incoming.id
            && current.revision >= incoming.revision
        {
            tracing::debug!(territory = %territory, revision = incoming.revision, "stale siege snapshot ignored");
            return Ok(false);
        }
        sieges.insert(territory, incoming);
        Ok(true)
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// The siege running on a territory.
    pub fn get_siege(&self, territory: TerritoryId) -> Option<SiegeInstance> {
        read(&self.sieges).get(&territory).cloned()
    }

    /// Every running siege.
    pub fn active_sieges(&self) -> Vec<SiegeInstance> {
        read(&self.sieges).values().cloned().collect()
    }

    /// Number of running sieges.
    pub fn siege_count(&self) -> usize {
        read(&self.sieges).len()
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    /// Remove a territory's siege as uncontested, only when it is `only`
    /// if that is given.
    fn close_uncontested(&self, territory: TerritoryId, only: Option<SiegeId>) -> Option<SiegeOutcome> {
        if self.role == Role::Replica {
            return None;
        }
        let mut sieges = write(&self.sieges);
        if let Some(id) = only
            && sieges.get(&territory).is_none_or(|siege| siege.id != id)
        {
            return None;
        }
        let instance = sieges.remove(&territory)?;
        Some(self.announce_end(
            &instance,
            Ending {
                winner: None,
                resolution: SiegeResolution::Uncontested,
            },
        ))
    }

    fn apply(
        &self,
        territory: TerritoryId,
        change: impl FnOnce(&mut SiegeInstance, &mut Vec<FrontlineEvent>, DateTime<Utc>) -> Result<(), SiegeError>,
    ) -> Result<SiegeUpdate, SiegeError> {
        self.mutate(territory, change).map(|((), update)| update)
    }

    /// Apply `change` to a territory's siege, publish what it produced,
    /// then resolve the siege if it has ended.
    fn mutate<R>(
        &self,
        territory: TerritoryId,
        change: impl FnOnce(&mut SiegeInstance, &mut Vec<FrontlineEvent>, DateTime<Utc>) -> Result<R, SiegeError>,
    ) -> Result<(R, SiegeUpdate), SiegeError> {
        self.require_authority()?;
        let now = self.clock.now();
        let (result, mut update, finished) = {
            let mut sieges = write(&self.sieges);
            let siege = sieges
                .get_mut(&territory)
                .ok_or(SiegeError::NoActiveSiege(territory))?;
            let mut events = Vec::new();
            let result = change(siege, &mut events, now)?;
            siege.bump();
            let ending = siege.ending(now);
            let update = SiegeUpdate::of(siege);
            for event in events {
                self.bus.publish(event);
            }
            let finished = ending.and_then(|ending| {
                sieges
                    .remove(&territory)
                    .map(|instance| (self.announce_end(&instance, ending), instance))
            });
            (result, update, finished)
        };
        if let Some((outcome, instance)) = finished {
            self.feed_back(&instance, &outcome);
            update.outcome = Some(outcome);
        }
        Ok((result, update))
    }

    fn record_crossings(
        &self,
        siege: &mut SiegeInstance,
        crossings: &[Crossing],
        award_progress: bool,
        events: &mut Vec<FrontlineEvent>,
    ) {
        for crossing in crossings {
            tracing::debug!(
                siege = %siege.id,
                threshold = crossing.threshold,
                direction = ?crossing.direction,
                "dominance threshold reached"
            );
            events.push(FrontlineEvent::DominanceThresholdReached {
                siege_id: siege.id,
                territory_id: siege.territory_id,
                threshold: crossing.threshold,
                direction: crossing.direction,
            });
            if award_progress
                && crossing.direction == CrossingDirection::Rising
                && siege.phase != SiegePhase::Locked
            {
                siege.add_progress(self.config.progress_per_crossing);
            }
        }
    }

    fn auto_advance(
        &self,
        siege: &mut SiegeInstance,
        events: &mut Vec<FrontlineEvent>,
        now: DateTime<Utc>,
    ) {
        if self.config.auto_advance && siege.ready_to_advance(&self.config) {
            self.advance(siege, events, now);
        }
    }

    fn advance(&self, siege: &mut SiegeInstance, events: &mut Vec<FrontlineEvent>, now: DateTime<Utc>) {
        if let Some((old_phase, new_phase)) = siege.advance(&self.config, now) {
            tracing::info!(
                siege = %siege.id,
                territory = %siege.territory_id,
                ?old_phase,
                ?new_phase,
                "siege phase changed"
            );
            events.push(FrontlineEvent::PhaseChanged {
                siege_id: siege.id,
                territory_id: siege.territory_id,
                old_phase,
                new_phase,
            });
        }
    }

    fn announce_end(&self, instance: &SiegeInstance, ending: Ending) -> SiegeOutcome {
        let outcome = SiegeOutcome {
            siege_id: instance.id,
            territory_id: instance.territory_id,
            winning_side: ending.winner,
            winning_faction: ending.winner.and_then(|side| instance.faction_of(side)),
            resolution: ending.resolution,
        };
        tracing::info!(
            siege = %outcome.siege_id,
            territory = %outcome.territory_id,
            winner = ?outcome.winning_side,
            resolution = ?outcome.resolution,
            "siege resolved"
        );
        self.bus.publish(FrontlineEvent::SiegeResolved {
            siege_id: outcome.siege_id,
            territory_id: outcome.territory_id,
            winning_side: outcome.winning_side,
            winning_faction: outcome.winning_faction,
            resolution: outcome.resolution,
        });
        outcome
    }

    /// Grant the winner influence and take the same from the loser.
    fn feed_back(&self, instance: &SiegeInstance, outcome: &SiegeOutcome) {
        let Some(winner) = outcome.winning_side else {
            return;
        };
        let amount = self.config.victory_influence;
        if amount <= 0.0 {
            return;
        }
        let changes = [
            (instance.faction_of(winner), amount),
            (instance.faction_of(winner.opponent()), -amount),
        ];
        for (faction, delta) in changes {
            let Some(faction) = faction else {
                continue;
            };
            if let Err(err) = self.sink.apply_influence_change(
                outcome.territory_id,
                faction,
                delta,
                InfluenceCause::Siege,
            ) {
                tracing::warn!(
                    territory = %outcome.territory_id,
                    faction = %faction,
                    error = %err,
                    "siege feedback rejected"
                );
            }
        }
    }
}

impl EventListener for SiegeManager {
    fn name(&self) -> &'static str {
        "siege_manager"
    }

    fn on_event(&self, envelope: &EventEnvelope) {
        if let FrontlineEvent::InfluenceChanged { update } = &envelope.event
            && !update.contested
        {
            self.end_uncontested(update.territory_id);
        }
    }
}

impl core::fmt::Debug for SiegeManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SiegeManager")
            .field("role", &self.role)
            .field("sieges", &read(&self.sieges).len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use frontline_events::EventRecorder;
    use frontline_graph::GraphStore;
    use frontline_territory::{InfluenceConfig, TerritorialStateManager};
    use frontline_types::{
        HierarchyLevel, ManualClock, Point, ResourceType, Territory, TerritoryBounds,
        TerritoryControl,
    };

    use super::*;

    const A: FactionId = FactionId(1);
    const B: FactionId = FactionId(2);
    const T7: TerritoryId = TerritoryId(7);
    const T8: TerritoryId = TerritoryId(8);

    struct Harness {
        state: Arc<TerritorialStateManager>,
        sieges: Arc<SiegeManager>,
        recorder: Arc<EventRecorder>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn influence(&self, faction: FactionId) -> f64 {
            self.state.get_faction_influence(T7, faction).unwrap()
        }

        fn count(&self, name: &str) -> usize {
            self.recorder.events_named(name).len()
        }

        fn resolution(&self) -> Option<SiegeResolution> {
            self.recorder
                .events_named("siege_resolved")
                .into_iter()
                .find_map(|event| match event {
                    FrontlineEvent::SiegeResolved { resolution, .. } => Some(resolution),
                    _ => None,
                })
        }
    }

    /// Territory 7 is contested (A 40, B 45); territory 8 is neutral.
    fn harness(config: SiegeConfig) -> Harness {
        let store = GraphStore::default();
        for id in [7_u32, 8] {
            store
                .add_territory(Territory {
                    id: TerritoryId(id),
                    name: format!("Sector {id}"),
                    level: HierarchyLevel::Region,
                    parent: None,
                    bounds: TerritoryBounds::circle(Point::new(f64::from(id) * 1000.0, 0.0), 100.0),
                    strategic_value: 50.0,
                    tactical_value: 50.0,
                    resource: ResourceType::Military,
                    decay_half_life_secs: None,
                })
                .unwrap();
        }
        let clock = Arc::new(ManualClock::at_epoch());
        let bus = Arc::new(EventBus::new(clock.clone()));
        let recorder = Arc::new(EventRecorder::new());
        bus.subscribe(recorder.clone());
        let state = Arc::new(TerritorialStateManager::new(
            InfluenceConfig::default(),
            Arc::new(store),
            bus.clone(),
            clock.clone(),
        ));
        state.apply_influence_change(T7, A, 40.0, InfluenceCause::Objective).unwrap();
        state.apply_influence_change(T7, B, 45.0, InfluenceCause::Objective).unwrap();

        let sieges = Arc::new(SiegeManager::new(
            config,
            Role::Authority,
            state.clone(),
            state.clone(),
            bus.clone(),
            clock.clone(),
        ));
        bus.subscribe(sieges.clone());
        recorder.clear();
        Harness {
            state,
            sieges,
            recorder,
            clock,
        }
    }

    /// Reports the territory contested on the first look only.
    #[derive(Default)]
    struct SettlesAfterFirstLook {
        looks: AtomicUsize,
    }

    impl ControlView for SettlesAfterFirstLook {
        fn control_of(&self, _: TerritoryId) -> Option<TerritoryControl> {
            let first = self.looks.fetch_add(1, Ordering::SeqCst) == 0;
            Some(TerritoryControl {
                dominant: if first { None } else { Some(B) },
                contested: first,
            })
        }

        fn control_snapshot(&self) -> BTreeMap<TerritoryId, TerritoryControl> {
            BTreeMap::new()
        }
    }

    fn manual_phases() -> SiegeConfig {
        SiegeConfig {
            auto_advance: false,
            ..SiegeConfig::default()
        }
    }

    #[test]
    fn sieges_start_only_on_contested_territory() {
        let h = harness(SiegeConfig::default());

        assert!(matches!(
            h.sieges.begin_siege(T8, A, None),
            Err(SiegeError::NotContested(_))
        ));
        assert!(matches!(
            h.sieges.begin_siege(TerritoryId(99), A, None),
            Err(SiegeError::TerritoryNotFound(_))
        ));
        assert!(matches!(
            h.sieges.begin_siege(T7, A, Some(A)),
            Err(SiegeError::InvalidArgument(_))
        ));

        let id = h.sieges.begin_siege(T7, A, Some(B)).unwrap();
        assert!(matches!(
            h.sieges.begin_siege(T7, B, Some(A)),
            Err(SiegeError::AlreadyActive { siege, .. }) if siege == id
        ));
        assert_eq!(h.count("siege_started"), 1);
        assert_eq!(h.sieges.get_siege(T7).map(|s| s.phase), Some(SiegePhase::Probe));
    }

    #[test]
    fn a_territory_that_settles_while_starting_keeps_no_siege() {
        let h = harness(SiegeConfig::default());
        let sieges = SiegeManager::new(
            SiegeConfig::default(),
            Role::Authority,
            Arc::new(SettlesAfterFirstLook::default()),
            h.state.clone(),
            h.sieges.bus.clone(),
            h.clock.clone(),
        );

        assert!(matches!(
            sieges.begin_siege(T7, A, Some(B)),
            Err(SiegeError::NotContested(_))
        ));
        assert_eq!(sieges.siege_count(), 0);
        assert_eq!(h.count("siege_started"), 1);
        assert_eq!(h.resolution(), Some(SiegeResolution::Uncontested));
        assert!((h.influence(A) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_fires_once_per_direction() {
        let h = harness(SiegeConfig {
            neutral_dominance: 0.2,
            notification_thresholds: vec![0.25],
            ..SiegeConfig::default()
        });
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();

        for delta in [0.1, -0.1, 0.1] {
            h.sieges.add_dominance_delta(T7, delta).unwrap();
        }
        assert_eq!(h.count("dominance_threshold_reached"), 2);
    }

    #[test]
    fn ticket_exhaustion_overrides_phase_and_meter() {
        let h = harness(SiegeConfig::default());
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();
        h.sieges.add_dominance_delta(T7, 0.2).unwrap();

        let update = h.sieges.consume_tickets(T7, SiegeSide::Attacker, 100).unwrap();

        let outcome = update.outcome.unwrap();
        assert_eq!(outcome.resolution, SiegeResolution::TicketsExhausted);
        assert_eq!(outcome.winning_side, Some(SiegeSide::Defender));
        assert_eq!(outcome.winning_faction, Some(B));
        assert_eq!(h.sieges.siege_count(), 0);
        assert!((h.influence(B) - 70.0).abs() < 1e-9);
        assert!((h.influence(A) - 15.0).abs() < 1e-9);
        assert_eq!(h.state.get_dominant_faction(T7).unwrap(), Some(B));
        assert_eq!(h.count("tickets_changed"), 1);
    }

    #[test]
    fn full_dominance_wins_for_the_attacker() {
        let h = harness(SiegeConfig::default());
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();

        let update = h.sieges.add_dominance_delta(T7, 0.5).unwrap();

        assert_eq!(update.phase, SiegePhase::Interdict);
        let outcome = update.outcome.unwrap();
        assert_eq!(outcome.resolution, SiegeResolution::DominanceDecisive);
        assert_eq!(outcome.winning_faction, Some(A));
        assert_eq!(h.count("dominance_threshold_reached"), 2);
        assert_eq!(h.count("phase_changed"), 1);
        assert_eq!(h.state.get_dominant_faction(T7).unwrap(), Some(A));
    }

    #[test]
    fn the_meter_alone_carries_a_siege_to_locked() {
        let h = harness(SiegeConfig::default());
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();

        // Up through 0.75 and 0.9, down through every band, back to 0.5.
        for delta in [0.4375, -0.8125, 0.375, 0.4375] {
            let update = h.sieges.add_dominance_delta(T7, delta).unwrap();
            assert!(update.outcome.is_none());
        }

        assert_eq!(h.sieges.get_siege(T7).map(|s| s.phase), Some(SiegePhase::Locked));
        assert_eq!(h.count("phase_changed"), 3);
    }

    #[test]
    fn remote_observers_see_the_cause_before_the_siege_ends() {
        let h = harness(SiegeConfig::default());
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();
        let mut rx = h.sieges.bus.subscribe_remote();

        h.state.apply_influence_change(T7, A, 30.0, InfluenceCause::Combat).unwrap();

        let mut received = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            received.push((envelope.sequence, envelope.event.name()));
        }
        let names: Vec<&str> = received.iter().map(|(_, name)| *name).collect();
        assert_eq!(names.first().copied(), Some("influence_changed"));
        assert_eq!(names.get(1).copied(), Some("siege_resolved"));
        assert!(received.windows(2).all(|pair| match pair {
            [(earlier, _), (later, _)] => earlier < later,
            _ => false,
        }));
    }

    #[test]
    fn phases_advance_only_when_ready() {
        let h = harness(manual_phases());
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();

        assert!(matches!(
            h.sieges.advance_phase(T7),
            Err(SiegeError::PhaseNotReady { phase: SiegePhase::Probe, .. })
        ));
        let update = h.sieges.update_phase_progress(T7, 1.0).unwrap();
        assert_eq!(update.phase, SiegePhase::Probe);

        let update = h.sieges.advance_phase(T7).unwrap();
        assert_eq!(update.phase, SiegePhase::Interdict);
        assert!(update.phase_progress.abs() < f64::EPSILON);
        assert!(matches!(
            h.recorder.events_named("phase_changed").first(),
            Some(FrontlineEvent::PhaseChanged {
                old_phase: SiegePhase::Probe,
                new_phase: SiegePhase::Interdict,
                ..
            })
        ));
        assert!(matches!(
            h.sieges.update_phase_progress(T7, -1.0),
            Err(SiegeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn locked_siege_resolves_when_the_lock_expires() {
        let h = harness(manual_phases());
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();
        for _ in 0..3 {
            h.sieges.update_phase_progress(T7, 1.0).unwrap();
            h.sieges.advance_phase(T7).unwrap();
        }
        assert!(matches!(
            h.sieges.update_phase_progress(T7, 1.0),
            Err(SiegeError::PhaseLocked(_))
        ));

        h.clock.advance_secs(299);
        assert_eq!(h.sieges.tick().resolved, 0);
        h.clock.advance_secs(1);
        assert_eq!(h.sieges.tick().resolved, 1);

        assert_eq!(h.resolution(), Some(SiegeResolution::LockExpired));
        assert_eq!(h.state.get_dominant_faction(T7).unwrap(), Some(A));
    }

    #[test]
    fn losing_contested_status_ends_the_siege_without_feedback() {
        let h = harness(SiegeConfig::default());
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();

        h.state.apply_influence_change(T7, B, 20.0, InfluenceCause::Combat).unwrap();

        assert_eq!(h.sieges.siege_count(), 0);
        assert_eq!(h.resolution(), Some(SiegeResolution::Uncontested));
        assert!((h.influence(A) - 40.0).abs() < 1e-9);
        assert!((h.influence(B) - 65.0).abs() < 1e-9);
    }

    #[test]
    fn disengaged_sides_abandon_the_siege() {
        let h = harness(SiegeConfig::default());
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();

        let update = h.sieges.set_participant_active(T7, SiegeSide::Attacker, false).unwrap();
        assert!(update.outcome.is_none());
        let update = h.sieges.set_participant_active(T7, SiegeSide::Defender, false).unwrap();

        assert_eq!(update.outcome.map(|o| o.resolution), Some(SiegeResolution::Abandoned));
        assert!((h.influence(A) - 40.0).abs() < 1e-9);
        assert!((h.influence(B) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn idle_meter_relaxes_after_the_grace_period() {
        let h = harness(SiegeConfig::default());
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();
        h.sieges.add_dominance_delta(T7, 0.2).unwrap();

        h.clock.advance_secs(30);
        assert_eq!(h.sieges.tick().relaxed, 0);
        h.clock.advance_secs(120);
        assert_eq!(h.sieges.tick().relaxed, 1);

        let dominance = h.sieges.get_siege(T7).unwrap().dominance();
        assert!((dominance - 0.6).abs() < 1e-9);
    }

    #[test]
    fn bad_input_and_missing_sieges_are_reported() {
        let h = harness(SiegeConfig::default());
        assert!(matches!(
            h.sieges.add_dominance_delta(T7, 0.1),
            Err(SiegeError::NoActiveSiege(_))
        ));
        h.sieges.begin_siege(T7, A, Some(B)).unwrap();
        assert!(matches!(
            h.sieges.add_dominance_delta(T7, f64::NAN),
            Err(SiegeError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.sieges.consume_tickets(T7, SiegeSide::Defender, 0),
            Err(SiegeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn replicas_mirror_the_authority() {
        let h = harness(SiegeConfig::default());
        let replica = SiegeManager::new(
            SiegeConfig::default(),
            Role::Replica,
            h.state.clone(),
            h.state.clone(),
            Arc::new(EventBus::new(h.clock.clone())),
            h.clock.clone(),
        );
        assert!(matches!(
            replica.begin_siege(T7, A, Some(B)),
            Err(SiegeError::NotAuthoritative)
        ));

        let id = h.sieges.begin_siege(T7, A, Some(B)).unwrap();
        let wire = serde_json::to_string(&h.sieges.snapshot(T7)).unwrap();
        let snapshot: SiegeSnapshot = serde_json::from_str(&wire).unwrap();
        assert!(replica.apply_replicated(snapshot.clone()).unwrap());
        assert!(!replica.apply_replicated(snapshot).unwrap());
        assert_eq!(replica.get_siege(T7).map(|s| s.id), Some(id));

        h.sieges.consume_tickets(T7, SiegeSide::Defender, 10).unwrap();
        assert!(replica.apply_replicated(h.sieges.snapshot(T7)).unwrap());
        assert_eq!(
            replica.get_siege(T7).map(|s| s.tickets.remaining(SiegeSide::Defender)),
            Some(90)
        );

        h.sieges.consume_tickets(T7, SiegeSide::Defender, 90).unwrap();
        assert!(replica.apply_replicated(h.sieges.snapshot(T7)).unwrap());
        assert_eq!(replica.siege_count(), 0);

        assert!(matches!(
            h.sieges.apply_replicated(h.sieges.snapshot(T7)),
            Err(SiegeError::NotReplica)
        ));
    }
}
