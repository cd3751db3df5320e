use std::fmt;
use std::str::FromStr;

use ab_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Multiple comparisons correction method.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    /// No correction.
    #[default]
    None,
    /// Bonferroni correction (conservative).
    Bonferroni,
    /// Benjamini-Hochberg False Discovery Rate.
    #[serde(alias = "bh", alias = "fdr")]
    BenjaminiHochberg,
}

impl CorrectionMethod {
    /// Short label used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionMethod::None => "none",
            CorrectionMethod::Bonferroni => "bonferroni",
            CorrectionMethod::BenjaminiHochberg => "bh",
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrectionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CorrectionMethod::None),
            "bonferroni" => Ok(CorrectionMethod::Bonferroni),
            "bh" | "fdr" | "benjamini-hochberg" | "benjamini_hochberg" => {
                Ok(CorrectionMethod::BenjaminiHochberg)
            }
            other => Err(Error::Validation(format!(
                "unknown correction '{other}' (expected none, bonferroni or bh)"
            ))),
        }
    }
}

/// Adjust raw p-values; the output is aligned with the input.
pub fn adjust_p_values(p_values: &[f64], method: CorrectionMethod) -> Vec<f64> {
    let m = p_values.len();
    match method {
        CorrectionMethod::None => p_values.to_vec(),
        CorrectionMethod::Bonferroni => p_values.iter().map(|p| (p * m as f64).min(1.0)).collect(),
        CorrectionMethod::BenjaminiHochberg => {
            let mut order: Vec<usize> = (0..m).collect();
            order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

            let mut adjusted = vec![0.0_f64; m];
            for (rank0, &idx) in order.iter().enumerate() {
                adjusted[idx] = (p_values[idx] * m as f64 / (rank0 + 1) as f64).min(1.0);
            }
            // Step-up: adjusted values are non-decreasing in rank.
            let mut running_min = 1.0_f64;
            for &idx in order.iter().rev() {
                adjusted[idx] = adjusted[idx].min(running_min);
                running_min = adjusted[idx];
            }
            adjusted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bonferroni_caps_at_one() {
        let adj = adjust_p_values(&[0.01, 0.2, 0.6], CorrectionMethod::Bonferroni);
        assert_abs_diff_eq!(adj[0], 0.03, epsilon = 1e-15);
        assert_abs_diff_eq!(adj[1], 0.6, epsilon = 1e-15);
        assert_abs_diff_eq!(adj[2], 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_benjamini_hochberg_known_values() {
        // Sorted p·m/rank = [0.04, 0.06, 0.0533, 0.2]; step-up pulls 0.06 down.
        let adj = adjust_p_values(&[0.01, 0.04, 0.03, 0.2], CorrectionMethod::BenjaminiHochberg);
        assert_abs_diff_eq!(adj[0], 0.04, epsilon = 1e-12);
        assert_abs_diff_eq!(adj[1], 0.16 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(adj[2], 0.16 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(adj[3], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_none_is_identity() {
        let p = [0.3, 0.001];
        assert_eq!(adjust_p_values(&p, CorrectionMethod::None), p.to_vec());
    }

    #[test]
    fn test_parse() {
        assert_eq!("bh".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::BenjaminiHochberg);
        assert_eq!("Bonferroni".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::Bonferroni);
        assert!("holm".parse::<CorrectionMethod>().is_err());
    }
}
