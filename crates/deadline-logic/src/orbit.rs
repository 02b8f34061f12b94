//! Orbital approximations used to estimate travel time between planets.
//!
//! Both functions are pure: they take orbital periods (seconds) or orbit
//! radii (metres) and return seconds.

use std::f64::consts::PI;

use crate::error::{DeadlineError, Result};

/// Gravitational parameter of the stock star, in m³/s².
pub const DEFAULT_STAR_GRAV_PARAM: f64 = 1.172_332_8e18;

/// Average time between two transfer windows of planets with the given
/// orbital periods.
///
/// Returns 0 when the periods are equal: the bodies never drift apart, so a
/// window is treated as always open.
pub fn synodic_period(period_a: f64, period_b: f64) -> Result<f64> {
    if !(period_a > 0.0 && period_a.is_finite()) || !(period_b > 0.0 && period_b.is_finite()) {
        return Err(DeadlineError::InvalidOrbit(format!(
            "periods must be positive, got {} and {}",
            period_a, period_b
        )));
    }

    let (p_min, p_max) = if period_a < period_b {
        (period_a, period_b)
    } else {
        (period_b, period_a)
    };
    if p_min == p_max {
        return Ok(0.0);
    }
    Ok(p_min / (1.0 - p_min / p_max))
}

/// Duration of a half-ellipse Hohmann transfer between two circular orbits
/// of radii `radius_a` and `radius_b` around a body with gravitational
/// parameter `grav_param`.
pub fn hohmann_transfer_time(radius_a: f64, radius_b: f64, grav_param: f64) -> Result<f64> {
    let sum = radius_a + radius_b;
    if !(sum > 0.0 && sum.is_finite()) || radius_a < 0.0 || radius_b < 0.0 {
        return Err(DeadlineError::InvalidOrbit(format!(
            "orbit radii must be non-negative with a positive sum, got {} and {}",
            radius_a, radius_b
        )));
    }
    if !(grav_param > 0.0 && grav_param.is_finite()) {
        return Err(DeadlineError::InvalidOrbit(format!(
            "gravitational parameter must be positive, got {}",
            grav_param
        )));
    }
    Ok(PI * (sum.powi(3) / (8.0 * grav_param)).sqrt())
}
