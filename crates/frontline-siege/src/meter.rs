//! The dominance meter.
//!
//! A scalar in `[0, 1]`: `0` is total defender control, `1` total attacker
//! control. Each configured threshold fires at most once per direction
//! until the meter is re-armed, so oscillating around a threshold produces
//! one rising and one falling notification, not one per wobble. The siege
//! re-arms its meter on every phase entry.

use std::collections::BTreeSet;

use frontline_territory::decay::relax;
use frontline_types::{CrossingDirection, SiegeSide};
use serde::{Deserialize, Serialize};

/// A threshold crossing produced by a meter movement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
    /// The threshold crossed.
    pub threshold: f64,
    /// Which way the meter moved through it.
    pub direction: CrossingDirection,
}

/// Dominance value plus the bookkeeping for threshold notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominanceMeter {
    value: f64,
    neutral: f64,
    thresholds: Vec<f64>,
    /// `(index into thresholds, direction)` pairs already notified.
    triggered: BTreeSet<(usize, CrossingDirection)>,
}

impl DominanceMeter {
    /// A meter at `neutral` with the given notification thresholds.
    /// Thresholds outside `(0, 1)` or non-finite are ignored.
    pub fn new(neutral: f64, thresholds: &[f64]) -> Self {
        let mut thresholds: Vec<f64> = thresholds
            .iter()
            .copied()
            .filter(|t| t.is_finite() && *t > 0.0 && *t < 1.0)
            .collect();
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup_by(|a, b| (*a - *b).abs() < f64::EPSILON);
        Self {
            value: neutral.clamp(0.0, 1.0),
            neutral: neutral.clamp(0.0, 1.0),
            thresholds,
            triggered: BTreeSet::new(),
        }
    }

    /// Current value.
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Value the meter relaxes toward.
    pub const fn neutral(&self) -> f64 {
        self.neutral
    }

    /// Move the meter by `delta`, clamped to `[0, 1]`. Returns the
    /// crossings that have not fired before.
    pub fn apply(&mut self, delta: f64) -> Vec<Crossing> {
        self.move_to((self.value + delta).clamp(0.0, 1.0))
    }

    /// Relax toward neutral over `elapsed_secs` with decay constant
    /// `lambda`.
    pub fn relax(&mut self, lambda: f64, elapsed_secs: f64) -> Vec<Crossing> {
        let target = relax(self.value, self.neutral, lambda, elapsed_secs).clamp(0.0, 1.0);
        self.move_to(target)
    }

    /// Arm every threshold again without moving the meter.
    pub fn rearm(&mut self) {
        self.triggered.clear();
    }

    /// The side the meter has decided for, if it sits at either end.
    pub fn decisive_side(&self) -> Option<SiegeSide> {
        if self.value >= 1.0 {
            Some(SiegeSide::Attacker)
        } else if self.value <= 0.0 {
            Some(SiegeSide::Defender)
        } else {
            None
        }
    }

    fn move_to(&mut self, next: f64) -> Vec<Crossing> {
        let previous = self.value;
        self.value = next;
        let mut crossings = Vec::new();
        for (index, threshold) in self.thresholds.iter().enumerate() {
            let direction = if previous < *threshold && next >= *threshold {
                CrossingDirection::Rising
            } else if previous >= *threshold && next < *threshold {
                CrossingDirection::Falling
            } else {
                continue;
            };
            if self.triggered.insert((index, direction)) {
                crossings.push(Crossing {
                    threshold: *threshold,
                    direction,
                });
            }
        }
        if next < previous {
            crossings.reverse();
        }
        crossings
    }
}

#[cfg(test)]
mod tests {
    use frontline_territory::decay::lambda_from_half_life;

    use super::*;

    fn meter_at(value: f64) -> DominanceMeter {
        let mut meter = DominanceMeter::new(0.5, &[0.25, 0.5, 0.75, 0.9]);
        meter.apply(value - 0.5);
        meter.rearm();
        meter
    }

    #[test]
    fn oscillation_fires_once_per_direction() {
        let mut meter = meter_at(0.2);
        let fired: usize = [meter.apply(0.1), meter.apply(-0.1), meter.apply(0.1)]
            .iter()
            .map(Vec::len)
            .sum();
        assert_eq!(fired, 2);
    }

    #[test]
    fn rearming_keeps_the_value_and_fires_again() {
        let mut meter = meter_at(0.2);
        assert_eq!(meter.apply(0.1).len(), 1);
        meter.apply(-0.1);
        assert!(meter.apply(0.1).is_empty());

        meter.rearm();
        assert!((meter.value() - 0.3).abs() < 1e-9);
        meter.apply(-0.1);
        assert_eq!(meter.apply(0.1).len(), 1);
    }

    #[test]
    fn a_large_jump_crosses_several_thresholds_in_order() {
        let mut meter = meter_at(0.1);
        let up: Vec<f64> = meter.apply(0.85).iter().map(|c| c.threshold).collect();
        assert_eq!(up, vec![0.25, 0.5, 0.75, 0.9]);

        let down = meter.apply(-0.9);
        let thresholds: Vec<f64> = down.iter().map(|c| c.threshold).collect();
        assert_eq!(thresholds, vec![0.9, 0.75, 0.5, 0.25]);
        assert!(down.iter().all(|c| c.direction == CrossingDirection::Falling));
    }

    #[test]
    fn value_is_clamped_and_ends_are_decisive() {
        let mut meter = meter_at(0.8);
        meter.apply(5.0);
        assert!((meter.value() - 1.0).abs() < f64::EPSILON);
        assert_eq!(meter.decisive_side(), Some(SiegeSide::Attacker));
        meter.apply(-5.0);
        assert_eq!(meter.decisive_side(), Some(SiegeSide::Defender));
        meter.apply(0.3);
        assert_eq!(meter.decisive_side(), None);
    }

    #[test]
    fn relaxation_moves_toward_neutral() {
        let mut meter = meter_at(0.9);
        let lambda = lambda_from_half_life(60.0);
        meter.relax(lambda, 60.0);
        assert!((meter.value() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_thresholds_are_ignored() {
        let mut meter = DominanceMeter::new(0.0, &[0.0, 1.0, f64::NAN, 0.6, 0.6]);
        assert_eq!(meter.apply(1.0).len(), 1);
    }
}
