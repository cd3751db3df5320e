//! Standard normal distribution utilities.

use statrs::distribution::{ContinuousCDF, Normal};

fn standard() -> Normal {
    // N(0, 1) parameters are always valid.
    Normal::standard()
}

/// CDF of the standard normal at `x`.
pub fn cdf(x: f64) -> f64 {
    standard().cdf(x)
}

/// Survival function `1 - Φ(x)` of the standard normal, accurate in the upper tail.
pub fn sf(x: f64) -> f64 {
    standard().sf(x)
}

/// Two-sided tail probability `2 * Φ̄(|x|)`.
pub fn two_sided_p(x: f64) -> f64 {
    (2.0 * sf(x.abs())).min(1.0)
}
