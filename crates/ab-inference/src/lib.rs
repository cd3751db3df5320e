//! # ab-inference
//!
//! Statistics over the cleaned, joined experiment data:
//!
//! - [`descriptive`]: conversion rates overall, by arm, by country, by arm × country
//! - [`proportions`]: two-proportion z-test
//! - [`contingency`]: chi-square test of independence
//! - [`interaction`]: per-country arm comparison with optional p-value correction
//! - [`power`]: two-sample t-test power and sample-size solving
//! - [`hypothesis`]: the three experiment tests plus power, wired together
//!
//! Everything here is a pure function of its inputs.

#![warn(missing_docs)]

/// Chi-square test of independence on contingency tables.
pub mod contingency;
/// Multiple-comparisons corrections.
pub mod correction;
/// Grouped conversion rates.
pub mod descriptive;
/// Experiment-level tests.
pub mod hypothesis;
/// Per-country treatment effects.
pub mod interaction;
/// Power analysis for the two-sample t-test.
pub mod power;
/// Two-proportion z-test.
pub mod proportions;

pub use contingency::{Chi2Result, ContingencyTable, chi2_contingency};
pub use correction::{CorrectionMethod, adjust_p_values};
pub use descriptive::{ConversionSummary, Lift, RateSummary, conversion_summary};
pub use hypothesis::{
    CountryEffectTest, DEFAULT_ALPHA, DEFAULT_TARGET_POWER, PrimaryTest, TestConfig, TestSuite,
    country_effect_test, primary_test, run_tests,
};
pub use interaction::{CountryEffect, per_country_effects};
pub use power::{PowerAnalysis, power_analysis, ttest_ind_power, ttest_ind_solve_nobs1};
pub use proportions::{Alternative, ZTestResult, two_proportion_ztest};
