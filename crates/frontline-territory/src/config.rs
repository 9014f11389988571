//! Influence tuning, loaded from the `influence` section of the config file.

use serde::{Deserialize, Serialize};

/// Influence and decay configuration.
///
/// The numeric defaults are a starting point for tuning, not invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceConfig {
    /// Influence a faction must exceed to be dominant.
    #[serde(default = "default_majority_threshold")]
    pub majority_threshold: f64,

    /// Minimum lead over the runner-up for dominance.
    #[serde(default = "default_contest_margin")]
    pub contest_margin: f64,

    /// Decay half-life in seconds for territories without an override.
    #[serde(default = "default_decay_half_life_secs")]
    pub decay_half_life_secs: f64,

    /// Value influence relaxes toward. Decay only moves factions already
    /// present in a territory, so validated configs keep this at `0`.
    #[serde(default)]
    pub equilibrium: f64,

    /// Seconds between background decay passes.
    #[serde(default = "default_decay_interval_secs")]
    pub decay_interval_secs: u64,

    /// Size of the recent-update buffer.
    #[serde(default = "default_recent_history_capacity")]
    pub recent_history_capacity: usize,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            majority_threshold: default_majority_threshold(),
            contest_margin: default_contest_margin(),
            decay_half_life_secs: default_decay_half_life_secs(),
            equilibrium: 0.0,
            decay_interval_secs: default_decay_interval_secs(),
            recent_history_capacity: default_recent_history_capacity(),
        }
    }
}

const fn default_majority_threshold() -> f64 {
    50.0
}

const fn default_contest_margin() -> f64 {
    10.0
}

const fn default_decay_half_life_secs() -> f64 {
    3600.0
}

const fn default_decay_interval_secs() -> u64 {
    60
}

const fn default_recent_history_capacity() -> usize {
    200
}
