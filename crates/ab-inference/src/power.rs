//! Power of the two-sided, two-sample t-test with equal allocation.
//!
//! With `nobs1` observations per arm and standardized effect `d`:
//!
//! ```text
//! df      = 2·nobs1 − 2
//! nc      = d · sqrt(nobs1 / 2)
//! t_crit  = t⁻¹(1 − α/2; df)
//! power   = P(T' > t_crit) + P(T' < −t_crit),   T' ~ nct(df, nc)
//! ```

use ab_core::{Error, Result};
use ab_prob::{noncentral_t, student_t};
use serde::Serialize;
use tracing::{debug, warn};

const NOBS1_MIN: f64 = 2.0;
const NOBS1_MAX: f64 = 1e10;
const BISECT_MAX_ITER: usize = 200;
const BISECT_REL_TOL: f64 = 1e-10;

fn validate_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::Validation(format!("alpha must be in (0, 1), got {alpha}")));
    }
    Ok(())
}

fn validate_rate(name: &str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(Error::Validation(format!("{name} must be in [0, 1], got {p}")));
    }
    Ok(())
}

/// Standardized difference of two proportions,
/// `|t − c| / sqrt((c(1−c) + t(1−t)) / 2)`.
pub fn effect_size(control_rate: f64, treatment_rate: f64) -> Result<f64> {
    validate_rate("control_rate", control_rate)?;
    validate_rate("treatment_rate", treatment_rate)?;
    let pooled_var =
        (control_rate * (1.0 - control_rate) + treatment_rate * (1.0 - treatment_rate)) / 2.0;
    if pooled_var <= 0.0 {
        return Err(Error::Computation("zero pooled variance in effect size".into()));
    }
    Ok((treatment_rate - control_rate).abs() / pooled_var.sqrt())
}

/// Power of the two-sided two-sample t-test at `nobs1` observations per arm.
pub fn ttest_ind_power(effect_size: f64, nobs1: f64, alpha: f64) -> Result<f64> {
    validate_alpha(alpha)?;
    if !effect_size.is_finite() {
        return Err(Error::Validation(format!("effect_size must be finite, got {effect_size}")));
    }
    if !nobs1.is_finite() || nobs1 <= 1.0 {
        return Err(Error::Validation(format!("nobs1 must be finite and > 1, got {nobs1}")));
    }
    if effect_size == 0.0 {
        return Ok(alpha);
    }
    let df = 2.0 * nobs1 - 2.0;
    let nc = effect_size * (nobs1 / 2.0).sqrt();
    let crit = student_t::isf(alpha / 2.0, df)?;
    let upper = noncentral_t::sf(crit, df, nc)?;
    let lower = noncentral_t::cdf(-crit, df, nc)?;
    Ok((upper + lower).min(1.0))
}

/// Per-arm sample size at which [`ttest_ind_power`] reaches `target_power`.
///
/// Returns `None` for a zero effect, where no sample size suffices. When the
/// smallest admissible size (two per arm) already reaches the target, that
/// size is returned.
pub fn ttest_ind_solve_nobs1(effect_size: f64, target_power: f64, alpha: f64) -> Result<Option<f64>> {
    validate_alpha(alpha)?;
    if !(target_power > 0.0 && target_power < 1.0) {
        return Err(Error::Validation(format!(
            "target_power must be in (0, 1), got {target_power}"
        )));
    }
    if target_power <= alpha {
        return Err(Error::Validation(format!(
            "target_power ({target_power}) must exceed alpha ({alpha})"
        )));
    }
    if effect_size == 0.0 {
        return Ok(None);
    }

    let gap = |n: f64| -> Result<f64> { Ok(ttest_ind_power(effect_size, n, alpha)? - target_power) };

    let mut lo = NOBS1_MIN;
    if gap(lo)? >= 0.0 {
        return Ok(Some(lo));
    }
    let mut hi = 2.0 * lo;
    while gap(hi)? < 0.0 {
        lo = hi;
        hi *= 2.0;
        if hi > NOBS1_MAX {
            return Err(Error::Computation(format!(
                "required sample exceeds {NOBS1_MAX:e} per arm (effect size {effect_size})"
            )));
        }
    }

    for _ in 0..BISECT_MAX_ITER {
        let mid = 0.5 * (lo + hi);
        if gap(mid)? < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= BISECT_REL_TOL * hi {
            break;
        }
    }
    Ok(Some(0.5 * (lo + hi)))
}

/// Achieved power of the experiment and, if short of the target, the sample
/// size that would reach it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerAnalysis {
    /// Observed control rate.
    pub control_rate: f64,
    /// Observed treatment rate.
    pub treatment_rate: f64,
    /// Total observations across both arms.
    pub total_sample: u64,
    /// Observations per arm used for the calculation.
    pub nobs1: f64,
    /// Standardized effect size.
    pub effect_size: f64,
    /// Significance level.
    pub alpha: f64,
    /// Desired power.
    pub target_power: f64,
    /// Achieved power.
    pub power: f64,
    /// `power > target_power`
    pub sufficiently_powered: bool,
    /// Per-arm size reaching the target, when computed.
    pub required_nobs1: Option<f64>,
    /// `floor(2 · required_nobs1)`
    pub required_total: Option<u64>,
}

/// Power analysis from observed rates and total sample size.
pub fn power_analysis(
    control_rate: f64,
    treatment_rate: f64,
    total_sample: u64,
    alpha: f64,
    target_power: f64,
) -> Result<PowerAnalysis> {
    let d = effect_size(control_rate, treatment_rate)?;
    let nobs1 = total_sample as f64 / 2.0;
    let power = ttest_ind_power(d, nobs1, alpha)?;
    debug!(effect_size = d, nobs1, power, "achieved power");

    let mut out = PowerAnalysis {
        control_rate,
        treatment_rate,
        total_sample,
        nobs1,
        effect_size: d,
        alpha,
        target_power,
        power,
        sufficiently_powered: power > target_power,
        required_nobs1: None,
        required_total: None,
    };

    if power < target_power {
        match ttest_ind_solve_nobs1(d, target_power, alpha)? {
            Some(n) => {
                out.required_nobs1 = Some(n);
                out.required_total = Some((2.0 * n).floor() as u64);
            }
            None => warn!("zero effect size: no sample size reaches the target power"),
        }
    }
    Ok(out)
}
