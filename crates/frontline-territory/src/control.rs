//! Dominance and contested-status derivation.
//!
//! A faction is dominant when its influence exceeds the majority threshold
//! and leads the runner-up by at least the contest margin. Anything else
//! with measurable influence is contested. Ties are always contested. A
//! territory where nobody holds measurable influence is neutral: neither
//! dominant nor contested.

use std::collections::BTreeMap;

use frontline_types::{FactionId, TerritoryControl};

/// Lower bound of a faction's influence.
pub const INFLUENCE_MIN: f64 = 0.0;

/// Upper bound of a faction's influence.
pub const INFLUENCE_MAX: f64 = 100.0;

/// Influence at or below this is treated as absent.
pub const MEASURABLE_INFLUENCE: f64 = 1e-6;

/// Thresholds used to derive control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRules {
    /// Influence a faction must exceed to be dominant.
    pub majority_threshold: f64,
    /// Minimum lead over the runner-up.
    pub contest_margin: f64,
}

/// Factions with measurable influence, strongest first (ties by id).
pub fn ranked_factions(influence: &BTreeMap<FactionId, f64>) -> Vec<(FactionId, f64)> {
    let mut ranked: Vec<(FactionId, f64)> = influence
        .iter()
        .filter(|(_, value)| **value > MEASURABLE_INFLUENCE)
        .map(|(faction, value)| (*faction, *value))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}

/// Derive the dominant faction and contested flag from raw influence.
pub fn derive_control(influence: &BTreeMap<FactionId, f64>, rules: ControlRules) -> TerritoryControl {
    let ranked = ranked_factions(influence);
    let mut iter = ranked.iter();
    let Some(&(leader, top)) = iter.next() else {
        return TerritoryControl::default();
    };
    let runner_up = iter.next().map_or(INFLUENCE_MIN, |(_, value)| *value);
    let lead = top - runner_up;

    if top > rules.majority_threshold && lead >= rules.contest_margin && lead > 0.0 {
        TerritoryControl {
            dominant: Some(leader),
            contested: false,
        }
    } else {
        TerritoryControl {
            dominant: None,
            contested: true,
        }
    }
}

/// Clamp an influence value into `[0, 100]`.
pub fn clamp_influence(value: f64) -> f64 {
    value.clamp(INFLUENCE_MIN, INFLUENCE_MAX)
}
