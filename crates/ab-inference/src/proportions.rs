//! Two-sample test for binomial proportions with pooled variance.

use std::fmt;
use std::str::FromStr;

use ab_core::{Error, Result};
use ab_prob::normal;
use serde::{Deserialize, Serialize};

/// Alternative hypothesis, stated for sample 1 relative to sample 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    /// `p1 ≠ p2`
    #[default]
    TwoSided,
    /// `p1 > p2`
    Larger,
    /// `p1 < p2`
    Smaller,
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Alternative::TwoSided => "two-sided",
            Alternative::Larger => "larger",
            Alternative::Smaller => "smaller",
        })
    }
}

impl FromStr for Alternative {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "two-sided" | "two_sided" => Ok(Alternative::TwoSided),
            "larger" => Ok(Alternative::Larger),
            "smaller" => Ok(Alternative::Smaller),
            other => Err(Error::Validation(format!("unknown alternative '{other}'"))),
        }
    }
}

/// Result of [`two_proportion_ztest`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZTestResult {
    /// Test statistic.
    pub z: f64,
    /// P-value under `alternative`.
    pub p_value: f64,
    /// Alternative the p-value refers to.
    pub alternative: Alternative,
    /// `x1 / n1`
    pub rate1: f64,
    /// `x2 / n2`
    pub rate2: f64,
    /// `(x1 + x2) / (n1 + n2)`
    pub pooled_rate: f64,
    /// Pooled standard error of `rate1 - rate2`.
    pub std_err: f64,
}

/// Pooled two-proportion z-test of sample 1 (`x1` of `n1`) against sample 2.
pub fn two_proportion_ztest(
    x1: u64,
    n1: u64,
    x2: u64,
    n2: u64,
    alternative: Alternative,
) -> Result<ZTestResult> {
    if n1 == 0 || n2 == 0 {
        return Err(Error::Validation(format!("empty sample (n1 = {n1}, n2 = {n2})")));
    }
    if x1 > n1 || x2 > n2 {
        return Err(Error::Validation(format!(
            "successes exceed trials (x1 = {x1}/{n1}, x2 = {x2}/{n2})"
        )));
    }

    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let rate1 = x1 as f64 / n1f;
    let rate2 = x2 as f64 / n2f;
    let pooled_rate = (x1 + x2) as f64 / (n1f + n2f);
    let var = pooled_rate * (1.0 - pooled_rate) * (1.0 / n1f + 1.0 / n2f);
    if var <= 0.0 {
        return Err(Error::Computation(format!(
            "zero pooled variance (pooled rate = {pooled_rate})"
        )));
    }
    let std_err = var.sqrt();
    let z = (rate1 - rate2) / std_err;
    let p_value = match alternative {
        Alternative::TwoSided => normal::two_sided_p(z),
        Alternative::Larger => normal::sf(z),
        Alternative::Smaller => normal::cdf(z),
    };

    Ok(ZTestResult { z, p_value, alternative, rate1, rate2, pooled_rate, std_err })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_reference_values() {
        let r = two_proportion_ztest(45, 100, 30, 100, Alternative::Larger).unwrap();
        assert_abs_diff_eq!(r.z, 2.190_890_230_020_664_6, epsilon = 1e-9);
        assert_abs_diff_eq!(r.p_value, 0.014_229_868_458_155_2, epsilon = 1e-8);
        assert_abs_diff_eq!(r.pooled_rate, 0.375, epsilon = 1e-15);

        let two = two_proportion_ztest(45, 100, 30, 100, Alternative::TwoSided).unwrap();
        assert_abs_diff_eq!(two.p_value, 2.0 * r.p_value, epsilon = 1e-12);

        let small = two_proportion_ztest(45, 100, 30, 100, Alternative::Smaller).unwrap();
        assert_abs_diff_eq!(small.p_value, 1.0 - r.p_value, epsilon = 1e-12);
    }

    #[test]
    fn test_swapping_samples_flips_sign() {
        let a = two_proportion_ztest(120, 1000, 100, 1000, Alternative::TwoSided).unwrap();
        let b = two_proportion_ztest(100, 1000, 120, 1000, Alternative::TwoSided).unwrap();
        assert_abs_diff_eq!(a.z, -b.z, epsilon = 1e-12);
        assert_abs_diff_eq!(a.p_value, b.p_value, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(two_proportion_ztest(0, 0, 1, 10, Alternative::Larger).is_err());
        assert!(two_proportion_ztest(11, 10, 1, 10, Alternative::Larger).is_err());
        assert!(matches!(
            two_proportion_ztest(0, 10, 0, 10, Alternative::Larger),
            Err(Error::Computation(_))
        ));
        assert!(two_proportion_ztest(10, 10, 10, 10, Alternative::Larger).is_err());
    }
}
