//! Route planner tuning, loaded from the `routes` section of the config file.

use frontline_types::TerritoryControl;
use serde::{Deserialize, Serialize};

/// Route planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Active routes a faction may hold at once.
    #[serde(default = "default_max_routes_per_faction")]
    pub max_routes_per_faction: usize,

    /// Two same-level territories are directly adjacent when their centers
    /// are within this multiple of their summed radii.
    #[serde(default = "default_adjacency_factor")]
    pub adjacency_factor: f64,

    /// Same-level territories within this multiple of their summed radii are
    /// connected at all (directly or by a longer overland leg).
    #[serde(default = "default_connection_factor")]
    pub connection_factor: f64,

    /// Cost multiplier for entering territory held by another faction.
    #[serde(default = "default_hostile_penalty")]
    pub hostile_penalty: f64,

    /// Cost multiplier for legs wholly inside the requester's territory.
    #[serde(default = "default_friendly_bonus")]
    pub friendly_bonus: f64,

    /// Seconds an invalidated route is kept before being purged.
    #[serde(default = "default_inactive_ttl_secs")]
    pub inactive_ttl_secs: u64,

    /// Active routes older than this are re-scored during maintenance.
    #[serde(default = "default_revalidation_window_secs")]
    pub revalidation_window_secs: u64,

    /// Re-scored routes below this security are deactivated.
    #[serde(default = "default_min_security_threshold")]
    pub min_security_threshold: f64,

    /// Route pairs generated per regeneration call; the rest are deferred.
    #[serde(default = "default_regeneration_batch_size")]
    pub regeneration_batch_size: usize,

    /// Routes re-scored per maintenance pass.
    #[serde(default = "default_maintenance_batch_size")]
    pub maintenance_batch_size: usize,

    /// Seconds between maintenance passes.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,

    /// Seconds between connection security refreshes.
    #[serde(default = "default_security_refresh_interval_secs")]
    pub security_refresh_interval_secs: u64,

    /// Minimum security used for bulk-regenerated routes.
    #[serde(default = "default_min_security")]
    pub default_min_security: f64,

    /// Hop limit used for bulk-regenerated routes.
    #[serde(default = "default_max_hops")]
    pub default_max_hops: u32,

    /// Edge security model.
    #[serde(default)]
    pub security: SecurityModel,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            max_routes_per_faction: default_max_routes_per_faction(),
            adjacency_factor: default_adjacency_factor(),
            connection_factor: default_connection_factor(),
            hostile_penalty: default_hostile_penalty(),
            friendly_bonus: default_friendly_bonus(),
            inactive_ttl_secs: default_inactive_ttl_secs(),
            revalidation_window_secs: default_revalidation_window_secs(),
            min_security_threshold: default_min_security_threshold(),
            regeneration_batch_size: default_regeneration_batch_size(),
            maintenance_batch_size: default_maintenance_batch_size(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
            security_refresh_interval_secs: default_security_refresh_interval_secs(),
            default_min_security: default_min_security(),
            default_max_hops: default_max_hops(),
            security: SecurityModel::default(),
        }
    }
}

/// How edge security is derived from the control status of its endpoints.
///
/// Start from `base`; each contested endpoint subtracts `contested_penalty`,
/// each held endpoint adds `controlled_bonus`; endpoints held by the same
/// faction add `shared_owner_bonus`, endpoints held by different factions
/// subtract `hostile_border_penalty`. The result is clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecurityModel {
    /// Security of an edge between two neutral territories.
    #[serde(default = "default_base_security")]
    pub base: f64,
    /// Subtracted per contested endpoint.
    #[serde(default = "default_contested_penalty")]
    pub contested_penalty: f64,
    /// Added per endpoint with a dominant faction.
    #[serde(default = "default_controlled_bonus")]
    pub controlled_bonus: f64,
    /// Added when both endpoints share a dominant faction.
    #[serde(default = "default_shared_owner_bonus")]
    pub shared_owner_bonus: f64,
    /// Subtracted when the endpoints are held by different factions.
    #[serde(default = "default_hostile_border_penalty")]
    pub hostile_border_penalty: f64,
}

impl Default for SecurityModel {
    fn default() -> Self {
        Self {
            base: default_base_security(),
            contested_penalty: default_contested_penalty(),
            controlled_bonus: default_controlled_bonus(),
            shared_owner_bonus: default_shared_owner_bonus(),
            hostile_border_penalty: default_hostile_border_penalty(),
        }
    }
}

impl SecurityModel {
    /// Security of an edge between territories with the given control.
    pub fn edge_security(&self, a: TerritoryControl, b: TerritoryControl) -> f64 {
        let mut security = self.base;
        for end in [a, b] {
            if end.contested {
                security -= self.contested_penalty;
            } else if end.dominant.is_some() {
                security += self.controlled_bonus;
            }
        }
        if let (Some(owner_a), Some(owner_b)) = (a.dominant, b.dominant) {
            if owner_a == owner_b {
                security += self.shared_owner_bonus;
            } else {
                security -= self.hostile_border_penalty;
            }
        }
        security.clamp(0.0, 1.0)
    }
}

const fn default_max_routes_per_faction() -> usize {
    32
}

const fn default_adjacency_factor() -> f64 {
    1.25
}

const fn default_connection_factor() -> f64 {
    2.5
}

const fn default_hostile_penalty() -> f64 {
    3.0
}

const fn default_friendly_bonus() -> f64 {
    0.1
}

const fn default_inactive_ttl_secs() -> u64 {
    300
}

const fn default_revalidation_window_secs() -> u64 {
    600
}

const fn default_min_security_threshold() -> f64 {
    0.25
}

const fn default_regeneration_batch_size() -> usize {
    16
}

const fn default_maintenance_batch_size() -> usize {
    64
}

const fn default_maintenance_interval_secs() -> u64 {
    30
}

const fn default_security_refresh_interval_secs() -> u64 {
    15
}

const fn default_min_security() -> f64 {
    0.3
}

const fn default_max_hops() -> u32 {
    12
}

const fn default_base_security() -> f64 {
    0.5
}

const fn default_contested_penalty() -> f64 {
    0.2
}

const fn default_controlled_bonus() -> f64 {
    0.1
}

const fn default_shared_owner_bonus() -> f64 {
    0.2
}

const fn default_hostile_border_penalty() -> f64 {
    0.2
}

#[cfg(test)]
mod tests {
    use frontline_types::FactionId;

    use super::*;

    fn held(faction: u32) -> TerritoryControl {
        TerritoryControl {
            dominant: Some(FactionId(faction)),
            contested: false,
        }
    }

    const CONTESTED: TerritoryControl = TerritoryControl {
        dominant: None,
        contested: true,
    };

    #[test]
    fn security_follows_control() {
        let model = SecurityModel::default();
        let neutral = TerritoryControl::default();
        assert!((model.edge_security(neutral, neutral) - 0.5).abs() < 1e-12);
        assert!((model.edge_security(held(1), held(1)) - 0.9).abs() < 1e-12);
        assert!((model.edge_security(held(1), neutral) - 0.6).abs() < 1e-12);
        assert!((model.edge_security(held(1), held(2)) - 0.5).abs() < 1e-12);
        assert!((model.edge_security(CONTESTED, neutral) - 0.3).abs() < 1e-12);
        assert!((model.edge_security(CONTESTED, CONTESTED) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn security_is_clamped() {
        let model = SecurityModel {
            base: 0.9,
            controlled_bonus: 0.5,
            ..SecurityModel::default()
        };
        assert!((model.edge_security(held(1), held(1)) - 1.0).abs() < f64::EPSILON);
    }
}
