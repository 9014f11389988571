//! One siege encounter.
//!
//! [`SiegeInstance`] is plain state plus the transition rules; it never
//! publishes anything. The manager turns its results into events.

use chrono::{DateTime, Utc};
use frontline_types::{
    FactionId, SiegeId, SiegePhase, SiegeResolution, SiegeSide, TerritoryId, secs_delta,
};
use serde::{Deserialize, Serialize};

use crate::config::SiegeConfig;
use crate::meter::DominanceMeter;
use crate::tickets::TicketPools;

/// State of one attacker-versus-defender encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiegeInstance {
    /// Siege identifier.
    pub id: SiegeId,
    /// Besieged territory.
    pub territory_id: TerritoryId,
    /// Attacking faction.
    pub attacker: FactionId,
    /// Defending faction, if any.
    pub defender: Option<FactionId>,
    /// Current phase.
    pub phase: SiegePhase,
    /// Progress made in the current phase.
    pub phase_progress: f64,
    /// Dominance meter.
    pub meter: DominanceMeter,
    /// Ticket pools.
    pub tickets: TicketPools,
    /// Whether the attacking side is still engaged.
    pub attacker_active: bool,
    /// Whether the defending side is still engaged.
    pub defender_active: bool,
    /// When the siege began.
    pub started_at: DateTime<Utc>,
    /// When the current phase began.
    pub phase_entered_at: DateTime<Utc>,
    /// When the Locked phase ends.
    pub lock_expires_at: Option<DateTime<Utc>>,
    /// Last dominance or ticket activity.
    pub last_activity: DateTime<Utc>,
    /// Meter relaxation has been applied up to here.
    pub decayed_until: DateTime<Utc>,
    /// Bumped on every change; replicas ignore older snapshots.
    pub revision: u64,
}

/// How an instance wants to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ending {
    /// Winning side, `None` when nobody won.
    pub winner: Option<SiegeSide>,
    /// Why it ended.
    pub resolution: SiegeResolution,
}

impl SiegeInstance {
    /// A fresh siege in the Probe phase.
    pub fn new(
        territory_id: TerritoryId,
        attacker: FactionId,
        defender: Option<FactionId>,
        config: &SiegeConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SiegeId::new(),
            territory_id,
            attacker,
            defender,
            phase: SiegePhase::Probe,
            phase_progress: 0.0,
            meter: DominanceMeter::new(config.neutral_dominance, &config.notification_thresholds),
            tickets: TicketPools::new(
                config.attacker_tickets,
                config.defender_tickets,
                config.allow_negative_tickets,
            ),
            attacker_active: true,
            defender_active: true,
            started_at: now,
            phase_entered_at: now,
            lock_expires_at: None,
            last_activity: now,
            decayed_until: now,
            revision: 1,
        }
    }

    /// Current dominance value.
    pub const fn dominance(&self) -> f64 {
        self.meter.value()
    }

    /// Faction fighting on a side.
    pub const fn faction_of(&self, side: SiegeSide) -> Option<FactionId> {
        match side {
            SiegeSide::Attacker => Some(self.attacker),
            SiegeSide::Defender => self.defender,
        }
    }

    /// Progress the current phase requires while it has not reached it;
    /// `None` once it may advance, and always for Locked.
    pub fn missing_progress(&self, config: &SiegeConfig) -> Option<f64> {
        let required = config.phase_thresholds.for_phase(self.phase)?;
        (self.phase_progress < required).then_some(required)
    }

    /// Whether the phase has reached its threshold.
    pub fn ready_to_advance(&self, config: &SiegeConfig) -> bool {
        config
            .phase_thresholds
            .for_phase(self.phase)
            .is_some_and(|required| self.phase_progress >= required)
    }

    /// Move to the next phase, resetting progress and re-arming the meter's
    /// thresholds. Entering Locked starts the lock timer. Returns
    /// `(old, new)`.
    pub fn advance(&mut self, config: &SiegeConfig, now: DateTime<Utc>) -> Option<(SiegePhase, SiegePhase)> {
        let old = self.phase;
        let new = old.next()?;
        self.phase = new;
        self.phase_progress = 0.0;
        self.phase_entered_at = now;
        self.meter.rearm();
        if new == SiegePhase::Locked {
            self.lock_expires_at = now.checked_add_signed(secs_delta(config.lock_duration_secs));
        }
        Some((old, new))
    }

    /// Add phase progress. Negative contributions are floored at zero.
    pub fn add_progress(&mut self, delta: f64) {
        self.phase_progress = (self.phase_progress + delta).max(0.0);
    }

    /// Record activity from either side.
    pub const fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Mark a new revision.
    pub const fn bump(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }

    /// How the siege ends right now, if it does.
    ///
    /// Ticket exhaustion overrides everything else, then a decisive meter,
    /// then lock expiry (won by whichever side the meter favours), then
    /// both sides disengaging.
    pub fn ending(&self, now: DateTime<Utc>) -> Option<Ending> {
        if let Some(loser) = self.tickets.exhausted() {
            return Some(Ending {
                winner: Some(loser.opponent()),
                resolution: SiegeResolution::TicketsExhausted,
            });
        }
        if let Some(winner) = self.meter.decisive_side() {
            return Some(Ending {
                winner: Some(winner),
                resolution: SiegeResolution::DominanceDecisive,
            });
        }
        if self.phase == SiegePhase::Locked && self.lock_expires_at.is_some_and(|at| now >= at) {
            let winner = if self.meter.value() >= self.meter.neutral() {
                SiegeSide::Attacker
            } else {
                SiegeSide::Defender
            };
            return Some(Ending {
                winner: Some(winner),
                resolution: SiegeResolution::LockExpired,
            });
        }
        if !self.attacker_active && !self.defender_active {
            return Some(Ending {
                winner: None,
                resolution: SiegeResolution::Abandoned,
            });
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn instance(config: &SiegeConfig) -> SiegeInstance {
        SiegeInstance::new(TerritoryId(7), FactionId(1), Some(FactionId(2)), config, DateTime::default())
    }

    #[test]
    fn advancing_resets_progress_and_arms_the_lock() {
        let config = SiegeConfig::default();
        let mut siege = instance(&config);
        let now = DateTime::<Utc>::default();

        siege.add_progress(1.0);
        assert!(siege.ready_to_advance(&config));
        assert_eq!(siege.advance(&config, now), Some((SiegePhase::Probe, SiegePhase::Interdict)));
        assert!(siege.phase_progress.abs() < f64::EPSILON);
        assert!(!siege.ready_to_advance(&config));

        siege.advance(&config, now);
        siege.advance(&config, now);
        assert_eq!(siege.phase, SiegePhase::Locked);
        assert_eq!(siege.lock_expires_at, now.checked_add_signed(secs_delta(300)));
        assert_eq!(siege.advance(&config, now), None);
        assert_eq!(siege.missing_progress(&config), None);
    }

    #[test]
    fn entering_a_phase_rearms_the_meter() {
        let config = SiegeConfig::default();
        let mut siege = instance(&config);
        assert_eq!(siege.meter.apply(0.4375).len(), 2);
        siege.meter.apply(-0.4375);
        assert!(siege.meter.apply(0.4375).is_empty());

        siege.advance(&config, DateTime::default());
        siege.meter.apply(-0.4375);
        assert_eq!(siege.meter.apply(0.4375).len(), 2);
    }

    #[test]
    fn ticket_exhaustion_beats_every_other_ending() {
        let config = SiegeConfig::default();
        let mut siege = instance(&config);
        siege.meter.apply(1.0);
        siege.tickets.consume(SiegeSide::Attacker, 500);

        let ending = siege.ending(DateTime::default()).unwrap();
        assert_eq!(ending.resolution, SiegeResolution::TicketsExhausted);
        assert_eq!(ending.winner, Some(SiegeSide::Defender));
    }

    #[test]
    fn lock_expiry_goes_to_the_favoured_side() {
        let config = SiegeConfig::default();
        let mut siege = instance(&config);
        let start = DateTime::<Utc>::default();
        for _ in 0..3 {
            siege.advance(&config, start);
        }
        siege.meter.apply(-0.1);

        assert_eq!(siege.ending(start), None);
        let later = start.checked_add_signed(secs_delta(300)).unwrap();
        let ending = siege.ending(later).unwrap();
        assert_eq!(ending.resolution, SiegeResolution::LockExpired);
        assert_eq!(ending.winner, Some(SiegeSide::Defender));
    }

    #[test]
    fn disengaged_sides_abandon_the_siege() {
        let config = SiegeConfig::default();
        let mut siege = instance(&config);
        siege.attacker_active = false;
        assert_eq!(siege.ending(DateTime::default()), None);
        siege.defender_active = false;
        assert_eq!(
            siege.ending(DateTime::default()).map(|e| e.resolution),
            Some(SiegeResolution::Abandoned)
        );
    }
}
