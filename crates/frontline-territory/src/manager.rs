//! The territorial state manager: sole writer of per-territory influence.
//!
//! State lives in a map of per-territory mutexes. The map lock is held only
//! long enough to clone a territory's handle, so updates to unrelated
//! territories never serialize on each other. Events for a territory are
//! published while that territory's mutex is held, which keeps per-territory
//! event order identical to acceptance order.
//!
//! Listeners run synchronously inside [`TerritorialStateManager::apply_influence_change`],
//! so anything they change (route invalidation in particular) is visible to
//! the caller as soon as the call returns. Listeners must not call back into
//! the manager for the territory being updated.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use frontline_events::EventBus;
use frontline_graph::TerritoryDirectory;
use frontline_types::sync::{lock, read, write};
use frontline_types::{
    Clock, FactionId, FrontlineEvent, InfluenceCause, Point, TerritorialState, TerritorialUpdate,
    Territory, TerritoryControl, TerritoryId, elapsed_secs,
};

use crate::config::InfluenceConfig;
use crate::control::{
    ControlRules, MEASURABLE_INFLUENCE, clamp_influence, derive_control, ranked_factions,
};
use crate::decay::{lambda_from_half_life, relax};
use crate::error::TerritoryError;
use crate::snapshot::{TerritorySnapshot, WorldSnapshot};
use crate::traits::{ControlView, InfluenceSink, StampedControl, WorldView};

/// Decayed influence below this is dropped when relaxing toward zero.
const DECAY_PRUNE_FLOOR: f64 = 1e-3;

type StateHandle = Arc<Mutex<TerritorialState>>;

/// Outcome of one decay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecayReport {
    /// Seconds of decay applied.
    pub elapsed_secs: f64,
    /// Territories whose influence moved.
    pub territories_decayed: usize,
    /// Territories whose dominant faction or contested flag changed.
    pub control_changes: usize,
}

/// Authority for reading and writing territorial state.
pub struct TerritorialStateManager {
    config: InfluenceConfig,
    rules: ControlRules,
    directory: Arc<dyn TerritoryDirectory>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    states: RwLock<BTreeMap<TerritoryId, StateHandle>>,
    history: Mutex<VecDeque<TerritorialUpdate>>,
    sequence: AtomicU64,
    last_decay: Mutex<DateTime<Utc>>,
}

impl TerritorialStateManager {
    /// Create a manager with a neutral state for every territory in the
    /// directory.
    pub fn new(
        config: InfluenceConfig,
        directory: Arc<dyn TerritoryDirectory>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        let default_lambda = lambda_from_half_life(config.decay_half_life_secs);
        let states = directory
            .all_territories()
            .iter()
            .map(|t| {
                let state = TerritorialState::new(t.id, territory_lambda(t, default_lambda), now);
                (t.id, Arc::new(Mutex::new(state)))
            })
            .collect();
        let rules = ControlRules {
            majority_threshold: config.majority_threshold,
            contest_margin: config.contest_margin,
        };
        let capacity = config.recent_history_capacity;
        Self {
            config,
            rules,
            directory,
            bus,
            clock,
            states: RwLock::new(states),
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            sequence: AtomicU64::new(0),
            last_decay: Mutex::new(now),
        }
    }

    /// The active influence configuration.
    pub const fn config(&self) -> &InfluenceConfig {
        &self.config
    }

    // -------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------

    /// Apply an influence delta for one faction in one territory.
    ///
    /// The new influence is clamped to `[0, 100]`; out-of-range deltas are
    /// clamped, not rejected. Dominance and contested status are recomputed
    /// and events are published in this order: `InfluenceChanged`, then
    /// `TerritorialControlChanged` if the dominant faction changed, then
    /// `TerritoryContested`/`TerritoryUncontested` if the flag flipped.
    ///
    /// # Errors
    ///
    /// Returns [`TerritoryError::TerritoryNotFound`] for an unknown id and
    /// [`TerritoryError::InvalidArgument`] for a NaN delta. Nothing changes
    /// and nothing is published on error.
    pub fn apply_influence_change(
        &self,
        territory: TerritoryId,
        faction: FactionId,
        delta: f64,
        cause: InfluenceCause,
    ) -> Result<TerritorialUpdate, TerritoryError> {
        if delta.is_nan() {
            return Err(TerritoryError::InvalidArgument(format!(
                "influence delta for territory {territory} is NaN"
            )));
        }
        let handle = self.handle(territory)?;
        let mut state = lock(&handle);

        let previous = state.control();
        let clamped = clamp_influence(state.influence_of(faction) + delta);
        let resulting = if clamped > MEASURABLE_INFLUENCE {
            state.influence.insert(faction, clamped);
            clamped
        } else {
            state.influence.remove(&faction);
            0.0
        };
        let control = derive_control(&state.influence, self.rules);
        let now = self.clock.now();
        state.dominant = control.dominant;
        state.contested = control.contested;
        state.last_updated = now;

        let update = TerritorialUpdate {
            sequence: self.next_sequence(),
            territory_id: territory,
            faction_id: faction,
            delta,
            cause,
            resulting_influence: resulting,
            control_changed: previous.dominant != control.dominant,
            dominant: control.dominant,
            contested: control.contested,
            timestamp: now,
        };
        tracing::debug!(
            territory = %territory,
            faction = %faction,
            delta,
            resulting,
            cause = %update.cause,
            "influence changed"
        );
        state.last_sequence = update.sequence;
        self.record(&update);
        self.publish_transition(&state, previous, &update);
        drop(state);
        Ok(update)
    }

    /// Relax every faction's influence in every territory toward the
    /// configured equilibrium over `elapsed` seconds. Factions absent from a
    /// territory stay absent.
    ///
    /// Only territories whose control status changes produce events; the
    /// update record names the faction whose influence moved most.
    ///
    /// # Errors
    ///
    /// Returns [`TerritoryError::InvalidArgument`] for a negative or
    /// non-finite elapsed time.
    pub fn apply_decay(&self, elapsed: f64) -> Result<DecayReport, TerritoryError> {
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(TerritoryError::InvalidArgument(format!(
                "decay elapsed time must be finite and non-negative, got {elapsed}"
            )));
        }
        let mut report = DecayReport {
            elapsed_secs: elapsed,
            ..DecayReport::default()
        };
        if elapsed <= 0.0 {
            return Ok(report);
        }

        let equilibrium = clamp_influence(self.config.equilibrium);
        for handle in self.handles() {
            let mut state = lock(&handle);
            if state.influence.is_empty() {
                continue;
            }
            let previous = state.control();
            let lambda = state.decay_rate;

            let mut biggest: Option<(FactionId, f64)> = None;
            let mut relaxed = BTreeMap::new();
            for (faction, value) in &state.influence {
                let next = clamp_influence(relax(*value, equilibrium, lambda, elapsed));
                let change = next - *value;
                if biggest.is_none_or(|(_, c)| change.abs() > c.abs()) {
                    biggest = Some((*faction, change));
                }
                let prunable = equilibrium <= MEASURABLE_INFLUENCE && next < DECAY_PRUNE_FLOOR;
                if !prunable {
                    relaxed.insert(*faction, next);
                }
            }
            state.influence = relaxed;
            report.territories_decayed = report.territories_decayed.saturating_add(1);

            let control = derive_control(&state.influence, self.rules);
            state.dominant = control.dominant;
            state.contested = control.contested;
            if control == previous {
                continue;
            }

            let now = self.clock.now();
            state.last_updated = now;
            report.control_changes = report.control_changes.saturating_add(1);
            let Some((faction, change)) = biggest else {
                continue;
            };
            let resulting = state.influence_of(faction);
            let update = TerritorialUpdate {
                sequence: self.next_sequence(),
                territory_id: state.territory_id,
                faction_id: faction,
                delta: change,
                cause: InfluenceCause::Decay,
                resulting_influence: resulting,
                control_changed: previous.dominant != control.dominant,
                dominant: control.dominant,
                contested: control.contested,
                timestamp: now,
            };
            state.last_sequence = update.sequence;
            self.record(&update);
            self.publish_transition(&state, previous, &update);
        }

        if report.control_changes > 0 {
            tracing::info!(
                elapsed_secs = elapsed,
                control_changes = report.control_changes,
                "decay pass changed territorial control"
            );
        }
        Ok(report)
    }

    /// Run decay for the time elapsed since the previous tick.
    ///
    /// Safe to call with nothing to decay; a second call at the same
    /// instant applies zero elapsed time.
    pub fn decay_tick(&self) -> Result<DecayReport, TerritoryError> {
        let now = self.clock.now();
        let elapsed = {
            let mut last = lock(&self.last_decay);
            let elapsed = elapsed_secs(*last, now);
            *last = now;
            elapsed
        };
        self.apply_decay(elapsed)
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    /// Copy of a territory's state.
    pub fn get_state(&self, territory: TerritoryId) -> Result<TerritorialState, TerritoryError> {
        let handle = self.handle(territory)?;
        let state = lock(&handle).clone();
        Ok(state)
    }

    /// The whole recent-update buffer, most recent first.
    pub fn get_recent_updates(&self) -> Vec<TerritorialUpdate> {
        lock(&self.history).iter().cloned().collect()
    }

    /// Dominant faction of a territory.
    pub fn get_dominant_faction(
        &self,
        territory: TerritoryId,
    ) -> Result<Option<FactionId>, TerritoryError> {
        Ok(self.get_state(territory)?.dominant)
    }

    /// Influence of a faction in a territory, zero when it has none.
    pub fn get_faction_influence(
        &self,
        territory: TerritoryId,
        faction: FactionId,
    ) -> Result<f64, TerritoryError> {
        Ok(self.get_state(territory)?.influence_of(faction))
    }

    /// Factions with measurable influence in a territory, strongest first.
    pub fn contesting_factions(
        &self,
        territory: TerritoryId,
    ) -> Result<Vec<FactionId>, TerritoryError> {
        let state = self.get_state(territory)?;
        Ok(ranked_factions(&state.influence)
            .into_iter()
            .map(|(faction, _)| faction)
            .collect())
    }

    /// Definition and state of one territory.
    pub fn get_territory_info(
        &self,
        territory: TerritoryId,
    ) -> Result<TerritorySnapshot, TerritoryError> {
        let definition = self
            .directory
            .territory(territory)
            .ok_or(TerritoryError::TerritoryNotFound(territory))?;
        self.snapshot_of(definition)
    }

    /// Territories intersecting a circle, nearest first, with their state.
    ///
    /// # Errors
    ///
    /// Returns a graph error for a negative or non-finite radius.
    pub fn get_territories_in_radius(
        &self,
        center: Point,
        radius: f64,
    ) -> Result<Vec<TerritorySnapshot>, TerritoryError> {
        self.directory
            .territories_in_radius(center, radius)?
            .into_iter()
            .map(|t| self.snapshot_of(t))
            .collect()
    }

    /// Territories currently dominated by a faction.
    pub fn territories_controlled_by(&self, faction: FactionId) -> Vec<TerritoryId> {
        self.handles()
            .iter()
            .filter_map(|handle| {
                let state = lock(handle);
                (state.dominant == Some(faction)).then_some(state.territory_id)
            })
            .collect()
    }

    /// Copy of every territory's definition and state.
    pub fn snapshot(&self) -> WorldSnapshot {
        let territories = self
            .directory
            .all_territories()
            .into_iter()
            .filter_map(|t| self.snapshot_of(t).ok())
            .map(|entry| (entry.id(), entry))
            .collect();
        WorldSnapshot {
            taken_at: self.clock.now(),
            territories,
        }
    }

    /// Number of territories with tracked state.
    pub fn territory_count(&self) -> usize {
        read(&self.states).len()
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn snapshot_of(&self, territory: Territory) -> Result<TerritorySnapshot, TerritoryError> {
        let state = self.get_state(territory.id)?;
        Ok(TerritorySnapshot { territory, state })
    }

    /// Handle for a territory, creating state for territories added to the
    /// graph after start-up.
    fn handle(&self, territory: TerritoryId) -> Result<StateHandle, TerritoryError> {
        if let Some(handle) = read(&self.states).get(&territory) {
            return Ok(Arc::clone(handle));
        }
        let definition = self
            .directory
            .territory(territory)
            .ok_or(TerritoryError::TerritoryNotFound(territory))?;
        let lambda = territory_lambda(
            &definition,
            lambda_from_half_life(self.config.decay_half_life_secs),
        );
        let now = self.clock.now();
        let mut states = write(&self.states);
        let handle = states
            .entry(territory)
            .or_insert_with(|| Arc::new(Mutex::new(TerritorialState::new(territory, lambda, now))));
        Ok(Arc::clone(handle))
    }

    fn handles(&self) -> Vec<StateHandle> {
        read(&self.states).values().cloned().collect()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    fn record(&self, update: &TerritorialUpdate) {
        let capacity = self.config.recent_history_capacity;
        if capacity == 0 {
            return;
        }
        let mut history = lock(&self.history);
        history.push_front(update.clone());
        history.truncate(capacity);
    }

    /// Publish the events for one accepted update. Called with the
    /// territory's mutex held.
    fn publish_transition(
        &self,
        state: &TerritorialState,
        previous: TerritoryControl,
        update: &TerritorialUpdate,
    ) {
        let territory = state.territory_id;
        self.bus.publish(FrontlineEvent::InfluenceChanged {
            update: update.clone(),
        });

        if previous.dominant != state.dominant {
            tracing::info!(
                territory = %territory,
                old_faction = ?previous.dominant,
                new_faction = ?state.dominant,
                cause = %update.cause,
                "territorial control changed"
            );
            self.bus.publish(FrontlineEvent::TerritorialControlChanged {
                territory_id: territory,
                old_faction: previous.dominant,
                new_faction: state.dominant,
            });
        }

        if previous.contested != state.contested {
            if state.contested {
                let contesting_factions = ranked_factions(&state.influence)
                    .into_iter()
                    .map(|(faction, _)| faction)
                    .collect::<Vec<_>>();
                tracing::info!(territory = %territory, factions = ?contesting_factions, "territory contested");
                self.bus.publish(FrontlineEvent::TerritoryContested {
                    territory_id: territory,
                    contesting_factions,
                });
            } else {
                tracing::info!(territory = %territory, "territory no longer contested");
                self.bus.publish(FrontlineEvent::TerritoryUncontested {
                    territory_id: territory,
                });
            }
        }
    }
}

fn territory_lambda(territory: &Territory, default_lambda: f64) -> f64 {
    territory
        .decay_half_life_secs
        .map_or(default_lambda, lambda_from_half_life)
}

impl core::fmt::Debug for TerritorialStateManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TerritorialStateManager")
            .field("territories", &self.territory_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Service trait implementations
// ---------------------------------------------------------------------------

impl ControlView for TerritorialStateManager {
    fn control_of(&self, id: TerritoryId) -> Option<TerritoryControl> {
        let handle = read(&self.states).get(&id).cloned()?;
        let control = lock(&handle).control();
        Some(control)
    }

    fn control_snapshot(&self) -> BTreeMap<TerritoryId, TerritoryControl> {
        self.handles()
            .iter()
            .map(|handle| {
                let state = lock(handle);
                (state.territory_id, state.control())
            })
            .collect()
    }

    fn stamped_control_snapshot(&self) -> BTreeMap<TerritoryId, StampedControl> {
        self.handles()
            .iter()
            .map(|handle| {
                let state = lock(handle);
                let stamped = StampedControl {
                    control: state.control(),
                    sequence: state.last_sequence,
                };
                (state.territory_id, stamped)
            })
            .collect()
    }
}

impl InfluenceSink for TerritorialStateManager {
    fn apply_influence_change(
        &self,
        territory: TerritoryId,
        faction: FactionId,
        delta: f64,
        cause: InfluenceCause,
    ) -> Result<TerritorialUpdate, TerritoryError> {
        Self::apply_influence_change(self, territory, faction, delta, cause)
    }
}

impl WorldView for TerritorialStateManager {
    fn world_snapshot(&self) -> WorldSnapshot {
        self.snapshot()
    }

    fn recent_updates(&self, limit: usize) -> Vec<TerritorialUpdate> {
        lock(&self.history).iter().take(limit).cloned().collect()
    }
}
