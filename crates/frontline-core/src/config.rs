//! Configuration loading and typed config structures for Frontline.
//!
//! The canonical configuration lives in `frontline-config.yaml`. Each
//! component owns its own section type; this module stitches them together
//! and adds the world, observer, and logging sections. Every field has a
//! default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use frontline_ai::AiConfig;
use frontline_graph::GraphError;
use frontline_routes::RouteConfig;
use frontline_siege::SiegeConfig;
use frontline_territory::InfluenceConfig;
use serde::{Deserialize, Serialize};

/// Environment variable overriding `observer.port`.
pub const ENV_OBSERVER_PORT: &str = "FRONTLINE_OBSERVER_PORT";

/// Environment variable overriding `world.territories_file`.
pub const ENV_TERRITORIES_FILE: &str = "FRONTLINE_TERRITORIES_FILE";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The territory catalog could not be loaded.
    #[error("failed to load territory catalog: {source}")]
    Catalog {
        /// The underlying graph error.
        #[from]
        source: GraphError,
    },

    /// One or more values are out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `frontline-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontlineConfig {
    /// World name and territory catalog.
    #[serde(default)]
    pub world: WorldConfig,

    /// Influence, control, and decay.
    #[serde(default)]
    pub influence: InfluenceConfig,

    /// Route planner.
    #[serde(default)]
    pub routes: RouteConfig,

    /// Siege encounters.
    #[serde(default)]
    pub siege: SiegeConfig,

    /// Faction AI and the faction roster.
    #[serde(default)]
    pub ai: AiConfig,

    /// Observer HTTP server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FrontlineConfig {
    /// Load configuration from a YAML file.
    ///
    /// Environment variables override YAML values:
    /// - `FRONTLINE_OBSERVER_PORT` overrides `observer.port`
    /// - `FRONTLINE_TERRITORIES_FILE` overrides `world.territories_file`
    ///
    /// The result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, and
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment overrides,
    /// and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML and
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `FRONTLINE_OBSERVER_PORT` is not
    /// a port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the port override is not a port
    /// number.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = lookup(ENV_OBSERVER_PORT) {
            self.observer.port = port.trim().parse().map_err(|err| {
                ConfigError::Invalid(format!("{ENV_OBSERVER_PORT}={port}: {err}"))
            })?;
        }
        if let Some(path) = lookup(ENV_TERRITORIES_FILE)
            && !path.trim().is_empty()
        {
            self.world.territories_file = Some(PathBuf::from(path.trim()));
        }
        Ok(())
    }

    /// Reject values no component can work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        self.check_influence(&mut problems);
        self.check_routes(&mut problems);
        self.check_siege(&mut problems);
        self.check_ai(&mut problems);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems.join("; ")))
        }
    }

    fn check_influence(&self, problems: &mut Vec<String>) {
        let influence = &self.influence;
        if !(influence.decay_half_life_secs.is_finite() && influence.decay_half_life_secs > 0.0) {
            problems.push(String::from("influence.decay_half_life_secs must be positive"));
        }
        if influence.contest_margin.is_nan() || influence.contest_margin < 0.0 {
            problems.push(String::from("influence.contest_margin must not be negative"));
        }
        if !(0.0..=100.0).contains(&influence.majority_threshold) {
            problems.push(String::from("influence.majority_threshold must be within [0, 100]"));
        }
        // Decay never adds a faction that is absent from a territory.
        if influence.equilibrium.is_nan() || influence.equilibrium.abs() > f64::EPSILON {
            problems.push(String::from("influence.equilibrium must be 0"));
        }
        require_positive(problems, "influence.decay_interval_secs", influence.decay_interval_secs);
        if influence.recent_history_capacity == 0 {
            problems.push(String::from("influence.recent_history_capacity must be positive"));
        }
    }

    fn check_routes(&self, problems: &mut Vec<String>) {
        let routes = &self.routes;
        if routes.max_routes_per_faction == 0 {
            problems.push(String::from("routes.max_routes_per_faction must be positive"));
        }
        if routes.default_max_hops == 0 {
            problems.push(String::from("routes.default_max_hops must be positive"));
        }
        for (name, value) in [
            ("routes.default_min_security", routes.default_min_security),
            ("routes.min_security_threshold", routes.min_security_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                problems.push(format!("{name} must be within [0, 1]"));
            }
        }
        if !(routes.adjacency_factor > 0.0 && routes.connection_factor > 0.0) {
            problems.push(String::from("routes adjacency and connection factors must be positive"));
        }
        if routes.regeneration_batch_size == 0 || routes.maintenance_batch_size == 0 {
            problems.push(String::from("routes batch sizes must be positive"));
        }
        require_positive(problems, "routes.maintenance_interval_secs", routes.maintenance_interval_secs);
        require_positive(
            problems,
            "routes.security_refresh_interval_secs",
            routes.security_refresh_interval_secs,
        );
    }

    fn check_siege(&self, problems: &mut Vec<String>) {
        let siege = &self.siege;
        if !(siege.neutral_dominance > 0.0 && siege.neutral_dominance < 1.0) {
            problems.push(String::from("siege.neutral_dominance must be within (0, 1)"));
        }
        if siege
            .notification_thresholds
            .iter()
            .any(|t| !(*t > 0.0 && *t < 1.0))
        {
            problems.push(String::from("siege.notification_thresholds must be within (0, 1)"));
        }
        if !(siege.dominance_half_life_secs.is_finite() && siege.dominance_half_life_secs > 0.0) {
            problems.push(String::from("siege.dominance_half_life_secs must be positive"));
        }
        if siege.attacker_tickets <= 0 || siege.defender_tickets <= 0 {
            problems.push(String::from("siege ticket pools must start positive"));
        }
        require_positive(problems, "siege.tick_interval_secs", siege.tick_interval_secs);
    }

    fn check_ai(&self, problems: &mut Vec<String>) {
        let ai = &self.ai;
        require_positive(problems, "ai.strategic_interval_secs", ai.strategic_interval_secs);
        require_positive(problems, "ai.tactical_interval_secs", ai.tactical_interval_secs);
        require_positive(problems, "ai.threat_interval_secs", ai.threat_interval_secs);
        require_positive(problems, "ai.execution_interval_secs", ai.execution_interval_secs);
        if ai.queue_capacity == 0 {
            problems.push(String::from("ai.queue_capacity must be positive"));
        }
        if !(0.0..=1.0).contains(&ai.threat_severity_floor) {
            problems.push(String::from("ai.threat_severity_floor must be within [0, 1]"));
        }
        let mut seen = std::collections::BTreeSet::new();
        for profile in &ai.factions {
            if !seen.insert(profile.id) {
                problems.push(format!("ai.factions lists faction {} twice", profile.id));
            }
            if !(0.0..=1.0).contains(&profile.aggression) {
                problems.push(format!("ai faction {} aggression must be within [0, 1]", profile.id));
            }
        }
    }
}

fn require_positive(problems: &mut Vec<String>, name: &str, value: u64) {
    if value == 0 {
        problems.push(format!("{name} must be positive"));
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Human-readable world name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// YAML territory catalog. The built-in frontier map is used when unset.
    #[serde(default)]
    pub territories_file: Option<PathBuf>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            territories_file: None,
        }
    }
}

/// Observer HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_world_name() -> String {
    String::from("Frontier")
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    String::from("info")
}
