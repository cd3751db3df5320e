use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use ab_core::{Arm, CountryRecord, Error, InteractionRecord, JoinedRecord, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::load::LoadedTable;

/// How many multi-arm keys are echoed in the report.
const MULTI_ARM_SAMPLE: usize = 5;

/// Rule applied to users that show up more than once after the consistency filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Only users seen under both arms are reduced to their earliest record.
    #[default]
    CrossArm,
    /// If any user is seen under both arms, every repeated user is reduced to
    /// its earliest record.
    KeepFirstPerUser,
}

impl DuplicatePolicy {
    /// CLI / config spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::CrossArm => "cross-arm",
            DuplicatePolicy::KeepFirstPerUser => "keep-first-per-user",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cross-arm" | "cross_arm" => Ok(DuplicatePolicy::CrossArm),
            "keep-first-per-user" | "keep_first_per_user" => Ok(DuplicatePolicy::KeepFirstPerUser),
            other => Err(Error::Validation(format!(
                "unknown duplicate policy '{other}' (expected cross-arm or keep-first-per-user)"
            ))),
        }
    }
}

/// Row counts after each cleaning step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    /// Policy that produced this report.
    pub policy: DuplicatePolicy,
    /// Interaction rows read from the source.
    pub raw_rows: usize,
    /// Rows dropped at load time for empty fields.
    pub incomplete_rows: usize,
    /// Control rows shown the new page (removed).
    pub control_with_new: usize,
    /// Treatment rows shown the old page (removed).
    pub treatment_with_old: usize,
    /// Rows left after the consistency filter.
    pub after_consistency: usize,
    /// Users seen under both arms after the consistency filter.
    pub multi_arm_users: usize,
    /// First few such users, in order of first appearance.
    pub multi_arm_sample: Vec<u64>,
    /// Rows left after duplicate resolution.
    pub after_dedup: usize,
    /// Rows without a country mapping (removed).
    pub unmatched_country: usize,
    /// Rows in the joined dataset.
    pub joined_rows: usize,
}

/// Output of [`clean_and_join`].
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    /// Joined rows in input order.
    pub records: Vec<JoinedRecord>,
    /// Step-by-step counts.
    pub report: CleaningReport,
}

/// Keep only rows whose landing page matches their arm.
///
/// Returns the kept rows and the two mismatch counts
/// `(control_with_new, treatment_with_old)`.
pub fn remove_inconsistent(records: &[InteractionRecord]) -> (Vec<InteractionRecord>, usize, usize) {
    let mut kept = Vec::with_capacity(records.len());
    let mut control_with_new = 0;
    let mut treatment_with_old = 0;
    for r in records {
        if r.is_consistent() {
            kept.push(r.clone());
        } else {
            match r.group {
                Arm::Control => control_with_new += 1,
                Arm::Treatment => treatment_with_old += 1,
            }
        }
    }
    (kept, control_with_new, treatment_with_old)
}

/// Users that appear under both arms, in order of first appearance.
pub fn multi_arm_users(records: &[InteractionRecord]) -> Vec<u64> {
    let mut arms: HashMap<u64, (usize, [bool; 2])> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        let entry = arms.entry(r.user_id).or_insert((i, [false; 2]));
        entry.1[r.group as usize] = true;
    }
    let mut multi: Vec<(usize, u64)> = arms
        .into_iter()
        .filter(|(_, (_, seen))| seen[0] && seen[1])
        .map(|(user, (first, _))| (first, user))
        .collect();
    multi.sort_unstable();
    multi.into_iter().map(|(_, user)| user).collect()
}

/// Index of each user's earliest record; ties go to the earlier row.
fn earliest_index(records: &[InteractionRecord]) -> HashMap<u64, usize> {
    let mut best: HashMap<u64, usize> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        best.entry(r.user_id)
            .and_modify(|j| {
                if r.timestamp < records[*j].timestamp {
                    *j = i;
                }
            })
            .or_insert(i);
    }
    best
}

/// Resolve repeated users according to `policy`. Kept rows stay in input order.
pub fn resolve_duplicates(
    records: Vec<InteractionRecord>,
    multi: &[u64],
    policy: DuplicatePolicy,
) -> Vec<InteractionRecord> {
    if multi.is_empty() {
        return records;
    }
    let earliest = earliest_index(&records);
    let multi: HashSet<u64> = multi.iter().copied().collect();
    records
        .into_iter()
        .enumerate()
        .filter(|(i, r)| {
            let reduce = match policy {
                DuplicatePolicy::CrossArm => multi.contains(&r.user_id),
                DuplicatePolicy::KeepFirstPerUser => true,
            };
            !reduce || earliest.get(&r.user_id) == Some(i)
        })
        .map(|(_, r)| r)
        .collect()
}

/// Attach each row's country; the first mapping seen for a user wins.
///
/// Returns the joined rows and the number of rows without a mapping.
pub fn join_countries(
    records: Vec<InteractionRecord>,
    countries: &[CountryRecord],
) -> (Vec<JoinedRecord>, usize) {
    let mut lookup: HashMap<u64, &str> = HashMap::with_capacity(countries.len());
    for c in countries {
        lookup.entry(c.user_id).or_insert(c.country.as_str());
    }
    let mut unmatched = 0;
    let mut joined = Vec::with_capacity(records.len());
    for r in records {
        match lookup.get(&r.user_id) {
            Some(country) => joined.push(JoinedRecord { country: (*country).to_string(), interaction: r }),
            None => unmatched += 1,
        }
    }
    (joined, unmatched)
}

/// Apply the cleaning policy to parsed records and join the country mapping.
pub fn clean_and_join(
    interactions: &[InteractionRecord],
    countries: &[CountryRecord],
    policy: DuplicatePolicy,
) -> CleanedDataset {
    let mut report = CleaningReport { policy, raw_rows: interactions.len(), ..Default::default() };

    let (consistent, control_with_new, treatment_with_old) = remove_inconsistent(interactions);
    report.control_with_new = control_with_new;
    report.treatment_with_old = treatment_with_old;
    report.after_consistency = consistent.len();
    info!(
        dropped = control_with_new + treatment_with_old,
        kept = consistent.len(),
        "removed rows with mismatched arm and landing page"
    );

    let multi = multi_arm_users(&consistent);
    report.multi_arm_users = multi.len();
    report.multi_arm_sample = multi.iter().take(MULTI_ARM_SAMPLE).copied().collect();
    if !multi.is_empty() {
        debug!(users = multi.len(), sample = ?report.multi_arm_sample, "users seen under both arms");
    }

    let deduped = resolve_duplicates(consistent, &multi, policy);
    report.after_dedup = deduped.len();
    info!(policy = %policy, kept = deduped.len(), "resolved repeated users");

    let (records, unmatched) = join_countries(deduped, countries);
    report.unmatched_country = unmatched;
    report.joined_rows = records.len();
    if unmatched > 0 {
        warn!(rows = unmatched, "dropping rows without a country mapping");
    }
    info!(rows = records.len(), "joined interactions with countries");

    CleanedDataset { records, report }
}

/// [`clean_and_join`] over loaded tables, carrying raw and incomplete row counts.
pub fn clean_loaded(
    interactions: &LoadedTable<InteractionRecord>,
    countries: &LoadedTable<CountryRecord>,
    policy: DuplicatePolicy,
) -> CleanedDataset {
    let mut out = clean_and_join(&interactions.records, &countries.records, policy);
    out.report.raw_rows = interactions.diagnostics.rows;
    out.report.incomplete_rows = interactions.diagnostics.incomplete_rows;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_core::PageVariant;
    use chrono::NaiveDateTime;

    fn rec(user_id: u64, ts: &str, group: Arm, page: PageVariant, converted: bool) -> InteractionRecord {
        InteractionRecord {
            user_id,
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
            group,
            landing_page: page,
            converted,
        }
    }

    fn country(user_id: u64, c: &str) -> CountryRecord {
        CountryRecord { user_id, country: c.to_string() }
    }

    use ab_core::Arm::{Control as C, Treatment as T};
    use ab_core::PageVariant::{NewPage as NEW, OldPage as OLD};

    fn fixture() -> (Vec<InteractionRecord>, Vec<CountryRecord>) {
        let interactions = vec![
            rec(1, "2017-01-05 10:00:00", C, OLD, false),
            rec(2, "2017-01-05 11:00:00", T, NEW, true),
            rec(3, "2017-01-06 09:00:00", C, NEW, true), // mismatch
            rec(4, "2017-01-07 09:00:00", T, OLD, false), // mismatch
            rec(5, "2017-01-08 12:00:00", T, NEW, false),
            rec(5, "2017-01-03 12:00:00", C, OLD, true), // earlier, wins
            rec(6, "2017-01-09 12:00:00", C, OLD, false),
            rec(6, "2017-01-10 12:00:00", C, OLD, true), // same-arm repeat
            rec(7, "2017-01-11 12:00:00", T, NEW, false),
        ];
        let countries = vec![
            country(1, "US"),
            country(2, "UK"),
            country(3, "US"),
            country(4, "CA"),
            country(5, "CA"),
            country(6, "US"),
            country(6, "UK"),
        ];
        (interactions, countries)
    }

    #[test]
    fn test_cross_arm_policy() {
        let (i, c) = fixture();
        let out = clean_and_join(&i, &c, DuplicatePolicy::CrossArm);
        let r = &out.report;
        assert_eq!(r.raw_rows, 9);
        assert_eq!(r.control_with_new, 1);
        assert_eq!(r.treatment_with_old, 1);
        assert_eq!(r.after_consistency, 7);
        assert_eq!(r.multi_arm_users, 1);
        assert_eq!(r.multi_arm_sample, vec![5]);
        assert_eq!(r.after_dedup, 6);
        assert_eq!(r.unmatched_country, 1); // user 7
        assert_eq!(r.joined_rows, 5);

        let user5: Vec<_> = out.records.iter().filter(|j| j.interaction.user_id == 5).collect();
        assert_eq!(user5.len(), 1);
        assert_eq!(user5[0].arm(), Arm::Control);
        // Same-arm repeats survive the default policy.
        assert_eq!(out.records.iter().filter(|j| j.interaction.user_id == 6).count(), 2);
    }

    #[test]
    fn test_keep_first_per_user_policy() {
        let (i, c) = fixture();
        let out = clean_and_join(&i, &c, DuplicatePolicy::KeepFirstPerUser);
        assert_eq!(out.report.after_dedup, 5);
        let user6: Vec<_> = out.records.iter().filter(|j| j.interaction.user_id == 6).collect();
        assert_eq!(user6.len(), 1);
        assert!(!user6[0].converted());
    }

    #[test]
    fn test_keep_first_is_noop_without_cross_arm_users() {
        let i = vec![
            rec(1, "2017-01-05 10:00:00", C, OLD, false),
            rec(1, "2017-01-04 10:00:00", C, OLD, true),
        ];
        let c = vec![country(1, "US")];
        let out = clean_and_join(&i, &c, DuplicatePolicy::KeepFirstPerUser);
        assert_eq!(out.report.joined_rows, 2);
    }

    #[test]
    fn test_cleaned_rows_satisfy_invariants() {
        let (i, c) = fixture();
        let out = clean_and_join(&i, &c, DuplicatePolicy::CrossArm);
        assert!(out.records.iter().all(|j| j.interaction.is_consistent()));
        let mut arms: HashMap<u64, Arm> = HashMap::new();
        for j in &out.records {
            let prev = arms.insert(j.interaction.user_id, j.arm());
            assert!(prev.is_none() || prev == Some(j.arm()));
        }
        assert!(out.records.iter().all(|j| ["US", "UK", "CA"].contains(&j.country.as_str())));
    }

    #[test]
    fn test_first_country_mapping_wins() {
        let (i, c) = fixture();
        let out = clean_and_join(&i, &c, DuplicatePolicy::CrossArm);
        assert!(out.records.iter().filter(|j| j.interaction.user_id == 6).all(|j| j.country == "US"));
    }

    #[test]
    fn test_ties_resolved_by_input_order() {
        let i = vec![
            rec(9, "2017-01-05 10:00:00", T, NEW, true),
            rec(9, "2017-01-05 10:00:00", C, OLD, false),
        ];
        let kept = resolve_duplicates(i.clone(), &multi_arm_users(&i), DuplicatePolicy::CrossArm);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].group, Arm::Treatment);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("cross-arm".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::CrossArm);
        assert_eq!(
            "keep-first-per-user".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::KeepFirstPerUser
        );
        assert!("newest".parse::<DuplicatePolicy>().is_err());
    }
}
