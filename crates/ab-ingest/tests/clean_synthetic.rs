//! Cleaning invariants on synthetic experiments.

use std::collections::{BTreeSet, HashMap};

use ab_core::Arm;
use ab_ingest::{
    DuplicatePolicy, SyntheticConfig, clean_and_join, clean_loaded, generate, read_countries,
    read_interactions,
};
use ab_ingest::synthetic::{write_countries, write_interactions};

fn messy_config() -> SyntheticConfig {
    SyntheticConfig {
        n_users: 4000,
        mismatch_rate: 0.05,
        repeat_rate: 0.05,
        missing_country_rate: 0.02,
        seed: 2017,
        ..Default::default()
    }
}

#[test]
fn cleaned_rows_are_consistent_single_arm_and_mapped() {
    let data = generate(&messy_config()).unwrap();
    let out = clean_and_join(&data.interactions, &data.countries, DuplicatePolicy::CrossArm);

    assert!(out.records.iter().all(|r| r.interaction.is_consistent()));

    let mut arm_of: HashMap<u64, Arm> = HashMap::new();
    for r in &out.records {
        let prev = arm_of.insert(r.interaction.user_id, r.arm());
        assert!(prev.is_none() || prev == Some(r.arm()), "user {} in both arms", r.interaction.user_id);
    }

    let known: BTreeSet<&str> = data.countries.iter().map(|c| c.country.as_str()).collect();
    assert!(out.records.iter().all(|r| known.contains(r.country.as_str())));
}

#[test]
fn report_counts_add_up() {
    let data = generate(&messy_config()).unwrap();
    let out = clean_and_join(&data.interactions, &data.countries, DuplicatePolicy::CrossArm);
    let r = &out.report;

    assert_eq!(r.raw_rows, data.interactions.len());
    assert_eq!(r.raw_rows, r.after_consistency + r.control_with_new + r.treatment_with_old);
    assert!(r.after_dedup <= r.after_consistency);
    assert_eq!(r.after_dedup, r.joined_rows + r.unmatched_country);
    assert_eq!(r.joined_rows, out.records.len());
    assert!(r.multi_arm_users > 0);
    assert_eq!(r.multi_arm_sample.len(), r.multi_arm_users.min(5));
    // With mismatches removed, each multi-arm user loses exactly its later rows.
    assert!(r.after_consistency - r.after_dedup >= r.multi_arm_users);
}

#[test]
fn broader_policy_never_keeps_more_rows() {
    let data = generate(&messy_config()).unwrap();
    let narrow = clean_and_join(&data.interactions, &data.countries, DuplicatePolicy::CrossArm);
    let broad =
        clean_and_join(&data.interactions, &data.countries, DuplicatePolicy::KeepFirstPerUser);
    assert!(broad.report.after_dedup <= narrow.report.after_dedup);

    let mut seen = BTreeSet::new();
    for r in &broad.records {
        assert!(seen.insert(r.interaction.user_id), "user {} kept twice", r.interaction.user_id);
    }
}

#[test]
fn loaded_tables_carry_raw_counts() {
    let data = generate(&SyntheticConfig { n_users: 300, ..messy_config() }).unwrap();
    let mut log = Vec::new();
    write_interactions(&mut log, &data.interactions).unwrap();
    log.extend_from_slice(b"999999,2017-01-10 00:00:00,,old_page,0\n");
    let mut ctry = Vec::new();
    write_countries(&mut ctry, &data.countries).unwrap();

    let interactions = read_interactions(log.as_slice(), b',').unwrap();
    let countries = read_countries(ctry.as_slice(), b',').unwrap();
    let out = clean_loaded(&interactions, &countries, DuplicatePolicy::CrossArm);

    assert_eq!(out.report.raw_rows, data.interactions.len() + 1);
    assert_eq!(out.report.incomplete_rows, 1);
}
