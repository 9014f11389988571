//! AI tuning and the faction roster, loaded from the `ai` section of the
//! config file.

use std::collections::BTreeMap;

use frontline_types::{FactionId, ResourceType, StrategyKind};
use serde::{Deserialize, Serialize};

/// Faction AI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Seconds between strategic planning passes.
    #[serde(default = "default_strategic_interval_secs")]
    pub strategic_interval_secs: u64,

    /// Seconds between tactical planning passes.
    #[serde(default = "default_tactical_interval_secs")]
    pub tactical_interval_secs: u64,

    /// Seconds between threat-response passes.
    #[serde(default = "default_threat_interval_secs")]
    pub threat_interval_secs: u64,

    /// Seconds between decision execution passes.
    #[serde(default = "default_execution_interval_secs")]
    pub execution_interval_secs: u64,

    /// Decisions the queue holds before dropping the lowest priority.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Decisions applied per execution pass.
    #[serde(default = "default_max_executions_per_tick")]
    pub max_executions_per_tick: usize,

    /// Influence a fully committed Expand decision applies.
    #[serde(default = "default_base_effort")]
    pub base_effort: f64,

    /// Threats below this severity are ignored.
    #[serde(default = "default_threat_severity_floor")]
    pub threat_severity_floor: f64,

    /// Recent updates scanned per threat analysis.
    #[serde(default = "default_threat_window")]
    pub threat_window: usize,

    /// Upper bound of the random delay added to each decision, in seconds.
    #[serde(default = "default_max_delay_jitter_secs")]
    pub max_delay_jitter_secs: u64,

    /// The factions driven by the engine.
    #[serde(default)]
    pub factions: Vec<FactionProfile>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            strategic_interval_secs: default_strategic_interval_secs(),
            tactical_interval_secs: default_tactical_interval_secs(),
            threat_interval_secs: default_threat_interval_secs(),
            execution_interval_secs: default_execution_interval_secs(),
            queue_capacity: default_queue_capacity(),
            max_executions_per_tick: default_max_executions_per_tick(),
            base_effort: default_base_effort(),
            threat_severity_floor: default_threat_severity_floor(),
            threat_window: default_threat_window(),
            max_delay_jitter_secs: default_max_delay_jitter_secs(),
            factions: Vec::new(),
        }
    }
}

/// One AI-driven faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionProfile {
    /// Faction id.
    pub id: FactionId,
    /// Display name.
    pub name: String,
    /// Built-in strategy driving the faction.
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Appetite for risk in `[0, 1]`.
    #[serde(default = "default_aggression")]
    pub aggression: f64,
    /// Multipliers applied to a territory's value by resource type.
    /// Unlisted resources weigh `1.0`.
    #[serde(default)]
    pub resource_weights: BTreeMap<ResourceType, f64>,
}

impl FactionProfile {
    /// A profile with default aggression and no resource preferences.
    pub fn new(id: FactionId, name: impl Into<String>, strategy: StrategyKind) -> Self {
        Self {
            id,
            name: name.into(),
            strategy,
            aggression: default_aggression(),
            resource_weights: BTreeMap::new(),
        }
    }

    /// Weight for a resource type.
    pub fn resource_weight(&self, resource: ResourceType) -> f64 {
        self.resource_weights.get(&resource).copied().unwrap_or(1.0)
    }

    /// Aggression clamped to `[0, 1]`.
    pub fn aggression(&self) -> f64 {
        self.aggression.clamp(0.0, 1.0)
    }
}

const fn default_strategic_interval_secs() -> u64 {
    300
}

const fn default_tactical_interval_secs() -> u64 {
    60
}

const fn default_threat_interval_secs() -> u64 {
    5
}

const fn default_execution_interval_secs() -> u64 {
    1
}

const fn default_queue_capacity() -> usize {
    256
}

const fn default_max_executions_per_tick() -> usize {
    16
}

const fn default_base_effort() -> f64 {
    10.0
}

const fn default_threat_severity_floor() -> f64 {
    0.1
}

const fn default_threat_window() -> usize {
    100
}

const fn default_max_delay_jitter_secs() -> u64 {
    5
}

const fn default_aggression() -> f64 {
    0.5
}
