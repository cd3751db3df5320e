//! Chi-squared distribution utilities.

use ab_core::{Error, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Upper-tail probability `P(X > x)` for `X ~ χ²(df)`.
pub fn sf(x: f64, df: f64) -> Result<f64> {
    if !df.is_finite() || df <= 0.0 {
        return Err(Error::Validation(format!("df must be finite and > 0, got {}", df)));
    }
    if x.is_nan() {
        return Err(Error::Validation("chi-squared statistic is NaN".into()));
    }
    if x <= 0.0 {
        return Ok(1.0);
    }
    let dist = ChiSquared::new(df).map_err(|e| Error::Computation(e.to_string()))?;
    Ok(dist.sf(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_critical_value_df1() {
        assert_abs_diff_eq!(sf(3.841_458_820_694_124, 1.0).unwrap(), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_df2_is_exponential() {
        // χ²(2) tail is exp(-x/2).
        for x in [0.5, 3.0, 15.0] {
            assert_abs_diff_eq!(sf(x, 2.0).unwrap(), (-x / 2.0).exp(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invalid_df() {
        assert!(sf(1.0, 0.0).is_err());
        assert!(sf(1.0, f64::NAN).is_err());
    }
}
