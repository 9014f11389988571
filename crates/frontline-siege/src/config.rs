//! Siege tuning, loaded from the `siege` section of the config file.

use frontline_types::SiegePhase;
use serde::{Deserialize, Serialize};

/// Siege encounter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiegeConfig {
    /// Progress each phase needs before it may advance.
    #[serde(default)]
    pub phase_thresholds: PhaseThresholds,

    /// Dominance value the meter relaxes toward when activity stops.
    #[serde(default = "default_neutral_dominance")]
    pub neutral_dominance: f64,

    /// Half-life of the meter's relaxation toward neutral, in seconds.
    #[serde(default = "default_dominance_half_life_secs")]
    pub dominance_half_life_secs: f64,

    /// Seconds without dominance or ticket activity before the meter
    /// starts relaxing.
    #[serde(default = "default_idle_grace_secs")]
    pub idle_grace_secs: u64,

    /// Meter values that fire `DominanceThresholdReached` when crossed.
    #[serde(default = "default_notification_thresholds")]
    pub notification_thresholds: Vec<f64>,

    /// Phase progress gained each time the meter rises through a
    /// notification threshold.
    #[serde(default = "default_progress_per_crossing")]
    pub progress_per_crossing: f64,

    /// Initial attacker ticket pool.
    #[serde(default = "default_tickets")]
    pub attacker_tickets: i64,

    /// Initial defender ticket pool.
    #[serde(default = "default_tickets")]
    pub defender_tickets: i64,

    /// Let pools go below zero instead of stopping at zero.
    #[serde(default)]
    pub allow_negative_tickets: bool,

    /// Seconds the Locked phase lasts before the siege resolves.
    #[serde(default = "default_lock_duration_secs")]
    pub lock_duration_secs: u64,

    /// Influence granted to the winner (and removed from the loser) when a
    /// siege is won.
    #[serde(default = "default_victory_influence")]
    pub victory_influence: f64,

    /// Advance automatically once a phase's progress threshold is reached.
    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,

    /// Seconds between siege ticks (meter decay, lock expiry).
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

impl Default for SiegeConfig {
    fn default() -> Self {
        Self {
            phase_thresholds: PhaseThresholds::default(),
            neutral_dominance: default_neutral_dominance(),
            dominance_half_life_secs: default_dominance_half_life_secs(),
            idle_grace_secs: default_idle_grace_secs(),
            notification_thresholds: default_notification_thresholds(),
            progress_per_crossing: default_progress_per_crossing(),
            attacker_tickets: default_tickets(),
            defender_tickets: default_tickets(),
            allow_negative_tickets: false,
            lock_duration_secs: default_lock_duration_secs(),
            victory_influence: default_victory_influence(),
            auto_advance: default_auto_advance(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

/// Progress required to leave each phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    /// Progress needed to leave Probe.
    #[serde(default = "default_phase_threshold")]
    pub probe: f64,
    /// Progress needed to leave Interdict.
    #[serde(default = "default_phase_threshold")]
    pub interdict: f64,
    /// Progress needed to leave Dominate.
    #[serde(default = "default_phase_threshold")]
    pub dominate: f64,
}

impl PhaseThresholds {
    /// Threshold for a phase; `None` for Locked, which only ends by
    /// resolution.
    pub const fn for_phase(&self, phase: SiegePhase) -> Option<f64> {
        match phase {
            SiegePhase::Probe => Some(self.probe),
            SiegePhase::Interdict => Some(self.interdict),
            SiegePhase::Dominate => Some(self.dominate),
            SiegePhase::Locked => None,
        }
    }
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            probe: default_phase_threshold(),
            interdict: default_phase_threshold(),
            dominate: default_phase_threshold(),
        }
    }
}

const fn default_phase_threshold() -> f64 {
    1.0
}

const fn default_neutral_dominance() -> f64 {
    0.5
}

const fn default_dominance_half_life_secs() -> f64 {
    120.0
}

const fn default_idle_grace_secs() -> u64 {
    30
}

fn default_notification_thresholds() -> Vec<f64> {
    vec![0.25, 0.5, 0.75, 0.9]
}

const fn default_progress_per_crossing() -> f64 {
    0.5
}

const fn default_tickets() -> i64 {
    100
}

const fn default_lock_duration_secs() -> u64 {
    300
}

const fn default_victory_influence() -> f64 {
    25.0
}

const fn default_auto_advance() -> bool {
    true
}

const fn default_tick_interval_secs() -> u64 {
    1
}
