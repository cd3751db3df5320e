//! Pearson chi-square test of independence for r × c tables.

use ab_core::{Error, Result};
use ab_prob::chi_squared;
use serde::Serialize;

/// Observed counts with row and column labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    /// One label per row.
    pub row_labels: Vec<String>,
    /// One label per column.
    pub col_labels: Vec<String>,
    /// Row-major counts.
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    /// Build a table, checking that `counts` matches the label dimensions.
    pub fn new(row_labels: Vec<String>, col_labels: Vec<String>, counts: Vec<Vec<u64>>) -> Result<Self> {
        if row_labels.is_empty() || col_labels.is_empty() {
            return Err(Error::Validation("contingency table needs at least one row and column".into()));
        }
        if counts.len() != row_labels.len() {
            return Err(Error::Validation(format!(
                "expected {} rows, got {}",
                row_labels.len(),
                counts.len()
            )));
        }
        if let Some((i, row)) = counts.iter().enumerate().find(|(_, r)| r.len() != col_labels.len()) {
            return Err(Error::Validation(format!(
                "row {i} has {} columns, expected {}",
                row.len(),
                col_labels.len()
            )));
        }
        Ok(Self { row_labels, col_labels, counts })
    }

    /// Unlabelled table.
    pub fn from_counts(counts: Vec<Vec<u64>>) -> Result<Self> {
        let rows = (0..counts.len()).map(|i| i.to_string()).collect();
        let cols = (0..counts.first().map_or(0, |r| r.len())).map(|j| j.to_string()).collect();
        Self::new(rows, cols, counts)
    }

    /// Sum of each row.
    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|r| r.iter().sum()).collect()
    }

    /// Sum of each column.
    pub fn col_totals(&self) -> Vec<u64> {
        (0..self.col_labels.len())
            .map(|j| self.counts.iter().map(|r| r[j]).sum())
            .collect()
    }

    /// Grand total.
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Degrees of freedom `(r − 1)(c − 1)`.
    pub fn dof(&self) -> usize {
        (self.row_labels.len() - 1) * (self.col_labels.len() - 1)
    }
}

/// Result of [`chi2_contingency`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chi2Result {
    /// Pearson statistic.
    pub statistic: f64,
    /// Upper-tail probability of `statistic`.
    pub p_value: f64,
    /// Degrees of freedom.
    pub dof: usize,
    /// Expected counts under independence, same shape as the table.
    pub expected: Vec<Vec<f64>>,
    /// Whether Yates' continuity correction was applied.
    pub yates: bool,
}

/// Chi-square test of independence.
///
/// With `correction` set, Yates' continuity correction is applied when the
/// table has exactly one degree of freedom: each `|O − E|` is reduced by
/// `min(0.5, |O − E|)`.
pub fn chi2_contingency(table: &ContingencyTable, correction: bool) -> Result<Chi2Result> {
    let total = table.total();
    if total == 0 {
        return Err(Error::Validation("contingency table has no observations".into()));
    }
    let rows = table.row_totals();
    let cols = table.col_totals();
    let n = total as f64;

    let expected: Vec<Vec<f64>> = rows
        .iter()
        .map(|&r| cols.iter().map(|&c| r as f64 * c as f64 / n).collect())
        .collect();

    for (i, row) in expected.iter().enumerate() {
        if let Some(j) = row.iter().position(|&e| e == 0.0) {
            return Err(Error::Computation(format!(
                "zero expected count at ({}, {})",
                table.row_labels[i], table.col_labels[j]
            )));
        }
    }

    let dof = table.dof();
    if dof == 0 {
        return Ok(Chi2Result { statistic: 0.0, p_value: 1.0, dof, expected, yates: false });
    }

    let yates = correction && dof == 1;
    let mut statistic = 0.0;
    for (obs_row, exp_row) in table.counts.iter().zip(&expected) {
        for (&o, &e) in obs_row.iter().zip(exp_row) {
            let mut diff = (o as f64 - e).abs();
            if yates {
                diff -= diff.min(0.5);
            }
            statistic += diff * diff / e;
        }
    }
    let p_value = chi_squared::sf(statistic, dof as f64)?;

    Ok(Chi2Result { statistic, p_value, dof, expected, yates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_2x2_with_and_without_yates() {
        let t = ContingencyTable::from_counts(vec![vec![10, 20], vec![20, 10]]).unwrap();
        let corrected = chi2_contingency(&t, true).unwrap();
        assert!(corrected.yates);
        assert_eq!(corrected.dof, 1);
        assert_abs_diff_eq!(corrected.statistic, 5.4, epsilon = 1e-12);
        assert_abs_diff_eq!(corrected.p_value, 0.020_136_751_550_346_98, epsilon = 1e-9);
        assert_abs_diff_eq!(corrected.expected[0][1], 15.0, epsilon = 1e-12);

        let raw = chi2_contingency(&t, false).unwrap();
        assert!(!raw.yates);
        assert_abs_diff_eq!(raw.statistic, 20.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(raw.p_value, 0.009_823_274_507_519_247, epsilon = 1e-9);
    }

    #[test]
    fn test_yates_skipped_above_one_dof() {
        let t = ContingencyTable::from_counts(vec![vec![10, 10], vec![10, 10], vec![20, 0]]).unwrap();
        let r = chi2_contingency(&t, true).unwrap();
        assert!(!r.yates);
        assert_eq!(r.dof, 2);
        assert_abs_diff_eq!(r.statistic, 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.p_value, (-7.5f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_yates_never_overcorrects() {
        // Every |O − E| is 0.5 and is absorbed entirely.
        let t = ContingencyTable::from_counts(vec![vec![5, 6], vec![6, 5]]).unwrap();
        let r = chi2_contingency(&t, true).unwrap();
        assert_abs_diff_eq!(r.statistic, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(r.p_value, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_single_row_has_zero_dof() {
        let t = ContingencyTable::from_counts(vec![vec![7, 3]]).unwrap();
        let r = chi2_contingency(&t, true).unwrap();
        assert_eq!(r.dof, 0);
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_zero_expected_is_error() {
        let t = ContingencyTable::from_counts(vec![vec![4, 0], vec![6, 0]]).unwrap();
        assert!(matches!(chi2_contingency(&t, true), Err(Error::Computation(_))));
    }

    #[test]
    fn test_shape_validation() {
        assert!(ContingencyTable::from_counts(vec![vec![1, 2], vec![3]]).is_err());
        assert!(ContingencyTable::from_counts(vec![]).is_err());
        let t = ContingencyTable::from_counts(vec![vec![0, 0], vec![0, 0]]).unwrap();
        assert!(chi2_contingency(&t, true).is_err());
    }
}
