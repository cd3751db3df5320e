//! The experiment's hypothesis tests and power analysis.

use std::collections::BTreeMap;

use ab_core::{Arm, Error, JoinedRecord, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contingency::{Chi2Result, ContingencyTable, chi2_contingency};
use crate::correction::CorrectionMethod;
use crate::descriptive::{RateSummary, conversion_summary};
use crate::interaction::{CountryEffect, per_country_effects};
use crate::power::{PowerAnalysis, power_analysis};
use crate::proportions::{Alternative, two_proportion_ztest};

/// Default significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;
/// Default power target.
pub const DEFAULT_TARGET_POWER: f64 = 0.8;

/// Test settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Significance level shared by all tests.
    pub alpha: f64,
    /// Power the experiment should have reached.
    pub target_power: f64,
    /// Correction applied to the per-country p-values.
    pub correction: CorrectionMethod,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            target_power: DEFAULT_TARGET_POWER,
            correction: CorrectionMethod::None,
        }
    }
}

impl TestConfig {
    /// Check that `alpha` and `target_power` are probabilities.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::Validation(format!("alpha must be in (0, 1), got {}", self.alpha)));
        }
        if !(self.target_power > 0.0 && self.target_power < 1.0) {
            return Err(Error::Validation(format!(
                "target_power must be in (0, 1), got {}",
                self.target_power
            )));
        }
        Ok(())
    }
}

/// One-sided test that treatment converts better than control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryTest {
    /// Control counts and rate.
    pub control: RateSummary,
    /// Treatment counts and rate.
    pub treatment: RateSummary,
    /// z statistic of treatment versus control.
    pub z: f64,
    /// One-sided p-value (alternative: treatment larger).
    pub p_value: f64,
    /// Significance level.
    pub alpha: f64,
    /// `p_value < alpha`
    pub reject_null: bool,
}

/// Chi-square test of country against conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryEffectTest {
    /// Countries × {not converted, converted}.
    pub table: ContingencyTable,
    /// Statistic, p-value, dof and expected counts.
    #[serde(flatten)]
    pub result: Chi2Result,
    /// Significance level.
    pub alpha: f64,
    /// `p_value < alpha`
    pub significant: bool,
}

/// All experiment tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSuite {
    /// Settings used.
    pub config: TestConfig,
    /// Treatment versus control.
    pub primary: PrimaryTest,
    /// Country versus conversion.
    pub country_effect: CountryEffectTest,
    /// Treatment versus control within each country.
    pub per_country: BTreeMap<String, CountryEffect>,
    /// Power of the primary comparison.
    pub power: PowerAnalysis,
}

fn arm_counts(records: &[JoinedRecord]) -> [RateSummary; 2] {
    let mut n = [0u64; 2];
    let mut x = [0u64; 2];
    for r in records {
        let a = r.arm() as usize;
        n[a] += 1;
        x[a] += r.converted() as u64;
    }
    Arm::ALL.map(|arm| {
        let i = arm as usize;
        let rate = if n[i] == 0 { 0.0 } else { x[i] as f64 / n[i] as f64 };
        RateSummary { n: n[i], conversions: x[i], rate }
    })
}

/// Two-proportion z-test, alternative "treatment rate is larger".
pub fn primary_test(records: &[JoinedRecord], alpha: f64) -> Result<PrimaryTest> {
    let [control, treatment] = arm_counts(records);
    let t = two_proportion_ztest(
        treatment.conversions,
        treatment.n,
        control.conversions,
        control.n,
        Alternative::Larger,
    )?;
    debug!(z = t.z, p = t.p_value, "primary test");
    Ok(PrimaryTest {
        control,
        treatment,
        z: t.z,
        p_value: t.p_value,
        alpha,
        reject_null: t.p_value < alpha,
    })
}

/// Country × converted contingency table; rows sorted, columns `0`, `1`.
pub fn country_conversion_table(records: &[JoinedRecord]) -> Result<ContingencyTable> {
    let mut counts: BTreeMap<&str, [u64; 2]> = BTreeMap::new();
    for r in records {
        counts.entry(r.country.as_str()).or_default()[r.converted() as usize] += 1;
    }
    let rows = counts.keys().map(|c| c.to_string()).collect();
    let cells = counts.values().map(|c| c.to_vec()).collect();
    ContingencyTable::new(rows, vec!["0".into(), "1".into()], cells)
}

/// Chi-square test of independence between country and conversion.
pub fn country_effect_test(records: &[JoinedRecord], alpha: f64) -> Result<CountryEffectTest> {
    let table = country_conversion_table(records)?;
    let result = chi2_contingency(&table, true)?;
    debug!(statistic = result.statistic, p = result.p_value, dof = result.dof, "country effect test");
    let significant = result.p_value < alpha;
    Ok(CountryEffectTest { table, result, alpha, significant })
}

/// Run the primary, country-effect and per-country tests and the power analysis.
pub fn run_tests(records: &[JoinedRecord], config: &TestConfig) -> Result<TestSuite> {
    config.validate()?;
    let summary = conversion_summary(records)?;

    let primary = primary_test(records, config.alpha)?;
    let country_effect = country_effect_test(records, config.alpha)?;
    let per_country = per_country_effects(records, config.alpha, config.correction)?;

    let control_rate = summary.arm(Arm::Control).map_or(0.0, |s| s.rate);
    let treatment_rate = summary.arm(Arm::Treatment).map_or(0.0, |s| s.rate);
    let power = power_analysis(
        control_rate,
        treatment_rate,
        summary.overall.n,
        config.alpha,
        config.target_power,
    )?;

    info!(
        primary_p = primary.p_value,
        country_p = country_effect.result.p_value,
        power = power.power,
        "tests complete"
    );
    Ok(TestSuite { config: *config, primary, country_effect, per_country, power })
}
