//! Student-t distribution utilities.

use ab_core::{Error, Result};
use statrs::distribution::{Continuous, ContinuousCDF, StudentsT};

const NEWTON_STEPS: usize = 4;

fn dist(df: f64) -> Result<StudentsT> {
    if !df.is_finite() || df <= 0.0 {
        return Err(Error::Validation(format!("df must be finite and > 0, got {}", df)));
    }
    StudentsT::new(0.0, 1.0, df).map_err(|e| Error::Computation(e.to_string()))
}

/// CDF of Student's t(df) at `x`.
pub fn cdf(x: f64, df: f64) -> Result<f64> {
    Ok(dist(df)?.cdf(x))
}

/// Inverse survival function: the `t` with `P(T > t) = p`.
///
/// The `statrs` quantile drifts below the normal quantile at large `df`; it
/// is used as the starting point for Newton steps on `sf(t) - p`.
pub fn isf(p: f64, df: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(Error::Validation(format!("p must be in (0, 1), got {}", p)));
    }
    let d = dist(df)?;
    let mut x = d.inverse_cdf(1.0 - p);
    if !x.is_finite() {
        return Err(Error::Computation(format!("t quantile diverged (p = {p}, df = {df})")));
    }
    for _ in 0..NEWTON_STEPS {
        let density = d.pdf(x);
        if !(density > 0.0 && density.is_finite()) {
            break;
        }
        let step = (d.sf(x) - p) / density;
        x += step;
        if step.abs() <= 1e-15 * x.abs().max(1.0) {
            break;
        }
    }
    Ok(x)
}
