//! Exponential relaxation of influence toward an equilibrium.
//!
//! `I(t + d) = Eq + (I(t) - Eq) * exp(-lambda * d)` with
//! `lambda = ln(2) / half_life`. Composing two steps of `d1` and `d2` gives
//! exactly one step of `d1 + d2`, so the result does not depend on how often
//! the background timer fires.

use core::f64::consts::LN_2;

/// Decay constant for a half-life in seconds. Non-positive or non-finite
/// half-lives disable decay.
pub fn lambda_from_half_life(half_life_secs: f64) -> f64 {
    if half_life_secs.is_finite() && half_life_secs > 0.0 {
        LN_2 / half_life_secs
    } else {
        0.0
    }
}

/// Relax `value` toward `equilibrium` over `elapsed_secs`.
pub fn relax(value: f64, equilibrium: f64, lambda: f64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 || lambda <= 0.0 {
        return value;
    }
    equilibrium + (value - equilibrium) * (-lambda * elapsed_secs).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_half_life_halves_distance_to_equilibrium() {
        let lambda = lambda_from_half_life(3600.0);
        assert!((relax(80.0, 0.0, lambda, 3600.0) - 40.0).abs() < 1e-9);
        assert!((relax(80.0, 20.0, lambda, 3600.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn many_small_steps_match_one_large_step() {
        let lambda = lambda_from_half_life(3600.0);
        let mut value = 80.0;
        for _ in 0..360 {
            value = relax(value, 0.0, lambda, 10.0);
        }
        assert!((value - 40.0).abs() < 1e-9);
    }

    #[test]
    fn disabled_decay_leaves_value() {
        assert!((relax(80.0, 0.0, lambda_from_half_life(0.0), 1e6) - 80.0).abs() < f64::EPSILON);
        assert!((relax(80.0, 0.0, lambda_from_half_life(60.0), 0.0) - 80.0).abs() < f64::EPSILON);
    }
}
