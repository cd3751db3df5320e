use std::collections::BTreeMap;

use ab_core::{Arm, Error, JoinedRecord, Result};
use serde::Serialize;

/// Count, conversions and mean conversion of a group of rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSummary {
    /// Rows in the group.
    pub n: u64,
    /// Converted rows.
    pub conversions: u64,
    /// `conversions / n`
    pub rate: f64,
}

impl RateSummary {
    fn from_counts(n: u64, conversions: u64) -> Self {
        let rate = if n == 0 { 0.0 } else { conversions as f64 / n as f64 };
        Self { n, conversions, rate }
    }
}

/// Rate of one arm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmRate {
    /// Arm.
    pub arm: Arm,
    /// Its rate.
    #[serde(flatten)]
    pub summary: RateSummary,
}

/// Rate of one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRate {
    /// Country code.
    pub country: String,
    /// Its rate.
    #[serde(flatten)]
    pub summary: RateSummary,
}

/// Rate of one (arm, country) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmCountryRate {
    /// Arm.
    pub arm: Arm,
    /// Country code.
    pub country: String,
    /// Its rate.
    #[serde(flatten)]
    pub summary: RateSummary,
}

/// Difference between treatment and control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Lift {
    /// `treatment_rate − control_rate`
    pub absolute: f64,
    /// `absolute / control_rate`; `None` when the control rate is zero.
    pub relative: Option<f64>,
}

/// Grouped conversion rates of a joined dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionSummary {
    /// All rows.
    pub overall: RateSummary,
    /// Arms present, control first.
    pub by_arm: Vec<ArmRate>,
    /// Countries present, sorted.
    pub by_country: Vec<CountryRate>,
    /// Arm-major, then country.
    pub by_arm_country: Vec<ArmCountryRate>,
}

impl ConversionSummary {
    /// Rate of `arm`, if present.
    pub fn arm(&self, arm: Arm) -> Option<&RateSummary> {
        self.by_arm.iter().find(|a| a.arm == arm).map(|a| &a.summary)
    }

    /// Rate of `(arm, country)`, if present.
    pub fn cell(&self, arm: Arm, country: &str) -> Option<&RateSummary> {
        self.by_arm_country
            .iter()
            .find(|c| c.arm == arm && c.country == country)
            .map(|c| &c.summary)
    }

    /// Treatment minus control; `None` unless both arms are present.
    pub fn lift(&self) -> Option<Lift> {
        let control = self.arm(Arm::Control)?;
        let treatment = self.arm(Arm::Treatment)?;
        let absolute = treatment.rate - control.rate;
        let relative = (control.rate > 0.0).then(|| absolute / control.rate);
        Some(Lift { absolute, relative })
    }

    /// Countries in sorted order.
    pub fn countries(&self) -> Vec<&str> {
        self.by_country.iter().map(|c| c.country.as_str()).collect()
    }
}

#[derive(Default, Clone, Copy)]
struct Tally {
    n: u64,
    conversions: u64,
}

impl Tally {
    fn add(&mut self, converted: bool) {
        self.n += 1;
        self.conversions += converted as u64;
    }

    fn summary(self) -> RateSummary {
        RateSummary::from_counts(self.n, self.conversions)
    }
}

/// Aggregate conversion overall, by arm, by country and by arm × country.
pub fn conversion_summary(records: &[JoinedRecord]) -> Result<ConversionSummary> {
    if records.is_empty() {
        return Err(Error::Validation("no records to summarise".into()));
    }

    let mut overall = Tally::default();
    let mut by_arm: BTreeMap<Arm, Tally> = BTreeMap::new();
    let mut by_country: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut by_cell: BTreeMap<(Arm, &str), Tally> = BTreeMap::new();

    for r in records {
        let converted = r.converted();
        overall.add(converted);
        by_arm.entry(r.arm()).or_default().add(converted);
        by_country.entry(r.country.as_str()).or_default().add(converted);
        by_cell.entry((r.arm(), r.country.as_str())).or_default().add(converted);
    }

    Ok(ConversionSummary {
        overall: overall.summary(),
        by_arm: by_arm
            .into_iter()
            .map(|(arm, t)| ArmRate { arm, summary: t.summary() })
            .collect(),
        by_country: by_country
            .into_iter()
            .map(|(c, t)| CountryRate { country: c.to_string(), summary: t.summary() })
            .collect(),
        by_arm_country: by_cell
            .into_iter()
            .map(|((arm, c), t)| ArmCountryRate { arm, country: c.to_string(), summary: t.summary() })
            .collect(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use ab_core::{Arm, InteractionRecord, JoinedRecord};

    /// `(arm, country, n, conversions)` cells expanded into joined rows.
    pub fn joined(cells: &[(Arm, &str, u64, u64)]) -> Vec<JoinedRecord> {
        let mut out = Vec::new();
        let mut user_id = 1;
        for &(arm, country, n, conv) in cells {
            for i in 0..n {
                out.push(JoinedRecord {
                    interaction: InteractionRecord {
                        user_id,
                        timestamp: Default::default(),
                        group: arm,
                        landing_page: arm.expected_variant(),
                        converted: i < conv,
                    },
                    country: country.to_string(),
                });
                user_id += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::joined;
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> Vec<JoinedRecord> {
        joined(&[
            (Arm::Treatment, "US", 50, 6),
            (Arm::Control, "UK", 20, 3),
            (Arm::Control, "US", 50, 5),
            (Arm::Treatment, "CA", 10, 2),
            (Arm::Treatment, "UK", 20, 2),
        ])
    }

    #[test]
    fn test_grouped_counts_and_order() {
        let s = conversion_summary(&sample()).unwrap();
        assert_eq!(s.overall.n, 150);
        assert_eq!(s.overall.conversions, 18);
        assert_abs_diff_eq!(s.overall.rate, 0.12, epsilon = 1e-15);

        assert_eq!(s.by_arm.iter().map(|a| a.arm).collect::<Vec<_>>(), Arm::ALL.to_vec());
        assert_eq!(s.countries(), vec!["CA", "UK", "US"]);
        let cells: Vec<(Arm, &str)> =
            s.by_arm_country.iter().map(|c| (c.arm, c.country.as_str())).collect();
        assert_eq!(
            cells,
            vec![
                (Arm::Control, "UK"),
                (Arm::Control, "US"),
                (Arm::Treatment, "CA"),
                (Arm::Treatment, "UK"),
                (Arm::Treatment, "US"),
            ]
        );
        assert_abs_diff_eq!(s.cell(Arm::Treatment, "CA").unwrap().rate, 0.2, epsilon = 1e-15);
    }

    #[test]
    fn test_partitions_sum_to_overall() {
        let s = conversion_summary(&sample()).unwrap();
        assert_eq!(s.by_arm.iter().map(|a| a.summary.n).sum::<u64>(), s.overall.n);
        assert_eq!(s.by_country.iter().map(|c| c.summary.n).sum::<u64>(), s.overall.n);
        assert_eq!(s.by_arm_country.iter().map(|c| c.summary.conversions).sum::<u64>(), 18);
    }

    #[test]
    fn test_lift() {
        let s = conversion_summary(&sample()).unwrap();
        let lift = s.lift().unwrap();
        // control 8/70, treatment 10/80
        assert_abs_diff_eq!(lift.absolute, 10.0 / 80.0 - 8.0 / 70.0, epsilon = 1e-15);
        assert_abs_diff_eq!(lift.relative.unwrap(), lift.absolute / (8.0 / 70.0), epsilon = 1e-15);

        let only_control = conversion_summary(&joined(&[(Arm::Control, "US", 5, 1)])).unwrap();
        assert!(only_control.lift().is_none());
        assert!(only_control.arm(Arm::Treatment).is_none());
    }

    #[test]
    fn test_empty_is_error() {
        assert!(conversion_summary(&[]).is_err());
    }
}
