//! Deterministic synthetic A/B interaction logs.
//!
//! The generator mimics the shape of a real landing-page experiment:
//! a small share of rows shows the wrong page for its arm, some users come
//! back under the other arm, and some users have no country mapping. Output
//! is fully determined by [`SyntheticConfig::seed`].

use std::fs::File;
use std::io::Write;
use std::path::Path;

use ab_core::{Arm, CountryRecord, Error, InteractionRecord, PageVariant, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Timestamp layout used when writing logs.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Configuration for [`generate`].
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Distinct users to generate.
    pub n_users: usize,
    /// Share of users assigned to treatment (0.0–1.0).
    pub treatment_fraction: f64,
    /// Conversion probability under control.
    pub control_rate: f64,
    /// Conversion probability under treatment.
    pub treatment_rate: f64,
    /// Probability that a row shows the page of the other arm.
    pub mismatch_rate: f64,
    /// Probability that a user returns under the other arm.
    pub repeat_rate: f64,
    /// Country codes with sampling weights.
    pub countries: Vec<(String, f64)>,
    /// Probability that a user has no country row.
    pub missing_country_rate: f64,
    /// First user id.
    pub first_user_id: u64,
    /// Start of the experiment window.
    pub start: NaiveDateTime,
    /// Length of the experiment window in days.
    pub days: i64,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_users: 5000,
            treatment_fraction: 0.5,
            control_rate: 0.120,
            treatment_rate: 0.119,
            mismatch_rate: 0.013,
            repeat_rate: 0.004,
            countries: vec![("US".into(), 0.70), ("UK".into(), 0.25), ("CA".into(), 0.05)],
            missing_country_rate: 0.0,
            first_user_id: 630_000,
            start: NaiveDate::from_ymd_opt(2017, 1, 2)
                .and_then(|d| d.and_hms_opt(13, 42, 5))
                .unwrap_or_default(),
            days: 22,
            seed: 42,
        }
    }
}

/// Generated interaction log and country mapping.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    /// Interaction rows, one or two per user.
    pub interactions: Vec<InteractionRecord>,
    /// At most one country row per user.
    pub countries: Vec<CountryRecord>,
}

fn validate(config: &SyntheticConfig) -> Result<()> {
    if config.n_users == 0 {
        return Err(Error::Validation("n_users must be > 0".into()));
    }
    let probs = [
        ("treatment_fraction", config.treatment_fraction),
        ("control_rate", config.control_rate),
        ("treatment_rate", config.treatment_rate),
        ("mismatch_rate", config.mismatch_rate),
        ("repeat_rate", config.repeat_rate),
        ("missing_country_rate", config.missing_country_rate),
    ];
    for (name, p) in probs {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::Validation(format!("{name} must be in [0, 1], got {p}")));
        }
    }
    if config.countries.is_empty() {
        return Err(Error::Validation("countries must not be empty".into()));
    }
    if config.countries.iter().any(|(_, w)| !w.is_finite() || *w < 0.0) {
        return Err(Error::Validation("country weights must be finite and >= 0".into()));
    }
    if config.countries.iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
        return Err(Error::Validation("country weights must not all be zero".into()));
    }
    if config.days <= 0 {
        return Err(Error::Validation("days must be > 0".into()));
    }
    Ok(())
}

fn pick_country<'a>(rng: &mut StdRng, countries: &'a [(String, f64)], total: f64) -> &'a str {
    let mut u = rng.random::<f64>() * total;
    for (code, w) in countries {
        if u < *w {
            return code;
        }
        u -= w;
    }
    // Rounding can leave `u` a hair above the last weight.
    &countries[countries.len() - 1].0
}

fn make_row(
    rng: &mut StdRng,
    config: &SyntheticConfig,
    user_id: u64,
    group: Arm,
    timestamp: NaiveDateTime,
) -> InteractionRecord {
    let mismatched = rng.random::<f64>() < config.mismatch_rate;
    let landing_page = match (group, mismatched) {
        (Arm::Control, false) | (Arm::Treatment, true) => PageVariant::OldPage,
        (Arm::Treatment, false) | (Arm::Control, true) => PageVariant::NewPage,
    };
    let rate = match group {
        Arm::Control => config.control_rate,
        Arm::Treatment => config.treatment_rate,
    };
    InteractionRecord {
        user_id,
        timestamp,
        group,
        landing_page,
        converted: rng.random::<f64>() < rate,
    }
}

/// Generate a synthetic experiment.
pub fn generate(config: &SyntheticConfig) -> Result<SyntheticDataset> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let window_us = config.days * 86_400 * 1_000_000;
    let weight_total: f64 = config.countries.iter().map(|(_, w)| w).sum();

    let mut interactions = Vec::with_capacity(config.n_users + config.n_users / 100);
    let mut countries = Vec::with_capacity(config.n_users);

    for i in 0..config.n_users {
        let user_id = config.first_user_id + i as u64;
        let group = if rng.random::<f64>() < config.treatment_fraction {
            Arm::Treatment
        } else {
            Arm::Control
        };
        let offset = rng.random_range(0..window_us);
        let ts = config.start + Duration::microseconds(offset);
        interactions.push(make_row(&mut rng, config, user_id, group, ts));

        if rng.random::<f64>() < config.repeat_rate {
            let other = match group {
                Arm::Control => Arm::Treatment,
                Arm::Treatment => Arm::Control,
            };
            let later = ts + Duration::microseconds(rng.random_range(1..=86_400_000_000));
            interactions.push(make_row(&mut rng, config, user_id, other, later));
        }

        if rng.random::<f64>() >= config.missing_country_rate {
            let code = pick_country(&mut rng, &config.countries, weight_total);
            countries.push(CountryRecord { user_id, country: code.to_string() });
        }
    }

    Ok(SyntheticDataset { interactions, countries })
}

/// Write interaction rows as CSV with the standard header.
pub fn write_interactions<W: Write>(writer: W, records: &[InteractionRecord]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(["user_id", "timestamp", "group", "landing_page", "converted"])?;
    for r in records {
        w.write_record([
            r.user_id.to_string(),
            r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            r.group.as_str().to_string(),
            r.landing_page.as_str().to_string(),
            if r.converted { "1".to_string() } else { "0".to_string() },
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Write country rows as CSV with the standard header.
pub fn write_countries<W: Write>(writer: W, records: &[CountryRecord]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(["user_id", "country"])?;
    for r in records {
        w.write_record([r.user_id.to_string(), r.country.clone()])?;
    }
    w.flush()?;
    Ok(())
}

impl SyntheticDataset {
    /// Write both tables to `interactions_path` and `countries_path`.
    pub fn write_csv(&self, interactions_path: &Path, countries_path: &Path) -> Result<()> {
        write_interactions(File::create(interactions_path)?, &self.interactions)?;
        write_countries(File::create(countries_path)?, &self.countries)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::{read_countries, read_interactions};

    #[test]
    fn test_deterministic_for_seed() {
        let cfg = SyntheticConfig { n_users: 500, ..Default::default() };
        let a = generate(&cfg).unwrap();
        let b = generate(&cfg).unwrap();
        assert_eq!(a.interactions, b.interactions);
        assert_eq!(a.countries, b.countries);

        let c = generate(&SyntheticConfig { seed: 7, ..cfg }).unwrap();
        assert_ne!(a.interactions, c.interactions);
    }

    #[test]
    fn test_shape_follows_config() {
        let cfg = SyntheticConfig {
            n_users: 2000,
            mismatch_rate: 0.0,
            repeat_rate: 0.0,
            missing_country_rate: 0.0,
            ..Default::default()
        };
        let d = generate(&cfg).unwrap();
        assert_eq!(d.interactions.len(), 2000);
        assert_eq!(d.countries.len(), 2000);
        assert!(d.interactions.iter().all(|r| r.is_consistent()));
        let treated = d.interactions.iter().filter(|r| r.group == Arm::Treatment).count();
        assert!((800..1200).contains(&treated), "treated = {treated}");
        let window_end = cfg.start + Duration::days(cfg.days);
        assert!(d.interactions.iter().all(|r| r.timestamp >= cfg.start && r.timestamp < window_end));
    }

    #[test]
    fn test_repeats_use_the_other_arm() {
        let cfg = SyntheticConfig { n_users: 300, repeat_rate: 1.0, ..Default::default() };
        let d = generate(&cfg).unwrap();
        assert_eq!(d.interactions.len(), 600);
        for pair in d.interactions.chunks(2) {
            assert_eq!(pair[0].user_id, pair[1].user_id);
            assert_ne!(pair[0].group, pair[1].group);
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
    }

    #[test]
    fn test_csv_round_trip_through_loader() {
        let d = generate(&SyntheticConfig { n_users: 50, ..Default::default() }).unwrap();
        let mut buf = Vec::new();
        write_interactions(&mut buf, &d.interactions).unwrap();
        let loaded = read_interactions(buf.as_slice(), b',').unwrap();
        assert_eq!(loaded.records, d.interactions);

        let mut buf = Vec::new();
        write_countries(&mut buf, &d.countries).unwrap();
        let loaded = read_countries(buf.as_slice(), b',').unwrap();
        assert_eq!(loaded.records, d.countries);
    }

    #[test]
    fn test_invalid_config() {
        assert!(generate(&SyntheticConfig { n_users: 0, ..Default::default() }).is_err());
        assert!(generate(&SyntheticConfig { control_rate: 1.5, ..Default::default() }).is_err());
        assert!(generate(&SyntheticConfig { countries: vec![], ..Default::default() }).is_err());
        assert!(
            generate(&SyntheticConfig { countries: vec![("US".into(), 0.0)], ..Default::default() })
                .is_err()
        );
    }
}
