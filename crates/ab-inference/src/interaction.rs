//! Treatment effect within each country.

use std::collections::BTreeMap;

use ab_core::{Arm, Error, JoinedRecord, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::correction::{CorrectionMethod, adjust_p_values};
use crate::proportions::{Alternative, two_proportion_ztest};

/// Arm comparison restricted to one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryEffect {
    /// Control rows in the country.
    pub n_control: u64,
    /// Treatment rows in the country.
    pub n_treatment: u64,
    /// Control conversion rate.
    pub control_rate: f64,
    /// Treatment conversion rate.
    pub treatment_rate: f64,
    /// `treatment_rate − control_rate`
    pub difference: f64,
    /// Two-sided z statistic, treatment versus control.
    pub z: f64,
    /// Raw two-sided p-value.
    pub p_value: f64,
    /// P-value after the requested correction.
    pub p_adjusted: f64,
    /// `p_adjusted < alpha`
    pub significant: bool,
}

/// Two-sided two-proportion test of treatment versus control in every country.
///
/// A country where both arms convert at the same degenerate rate (all 0 or
/// all 1) has no pooled variance; it is reported with `z = 0` and `p = 1`.
/// A country missing one of the arms is an error.
pub fn per_country_effects(
    records: &[JoinedRecord],
    alpha: f64,
    correction: CorrectionMethod,
) -> Result<BTreeMap<String, CountryEffect>> {
    // country → [(n, conversions) per arm]
    let mut counts: BTreeMap<&str, [(u64, u64); 2]> = BTreeMap::new();
    for r in records {
        let cell = &mut counts.entry(r.country.as_str()).or_default()[r.arm() as usize];
        cell.0 += 1;
        cell.1 += r.converted() as u64;
    }
    if counts.is_empty() {
        return Err(Error::Validation("no records for per-country tests".into()));
    }

    let mut effects = BTreeMap::new();
    for (country, arms) in counts {
        let (n_c, x_c) = arms[Arm::Control as usize];
        let (n_t, x_t) = arms[Arm::Treatment as usize];
        if n_c == 0 || n_t == 0 {
            return Err(Error::Validation(format!(
                "country {country} lacks an arm (control n = {n_c}, treatment n = {n_t})"
            )));
        }
        let control_rate = x_c as f64 / n_c as f64;
        let treatment_rate = x_t as f64 / n_t as f64;
        let (z, p_value) = match two_proportion_ztest(x_t, n_t, x_c, n_c, Alternative::TwoSided) {
            Ok(t) => (t.z, t.p_value),
            Err(Error::Computation(msg)) => {
                warn!(country, %msg, "degenerate country; reporting z = 0, p = 1");
                (0.0, 1.0)
            }
            Err(e) => return Err(e),
        };
        debug!(country, z, p_value, "per-country test");
        effects.insert(
            country.to_string(),
            CountryEffect {
                n_control: n_c,
                n_treatment: n_t,
                control_rate,
                treatment_rate,
                difference: treatment_rate - control_rate,
                z,
                p_value,
                p_adjusted: p_value,
                significant: false,
            },
        );
    }

    let raw: Vec<f64> = effects.values().map(|e| e.p_value).collect();
    let adjusted = adjust_p_values(&raw, correction);
    for (effect, p_adj) in effects.values_mut().zip(adjusted) {
        effect.p_adjusted = p_adj;
        effect.significant = p_adj < alpha;
    }

    Ok(effects)
}
