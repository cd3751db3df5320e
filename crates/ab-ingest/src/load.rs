use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use ab_core::{Arm, CountryRecord, InteractionRecord, PageVariant, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::IngestError;

type RowResult<T> = std::result::Result<T, IngestError>;

/// Required interaction-log headers; `user_id` must stay first.
pub const INTERACTION_COLUMNS: [&str; 5] =
    ["user_id", "timestamp", "group", "landing_page", "converted"];
/// Required country-mapping headers; `user_id` must stay first.
pub const COUNTRY_COLUMNS: [&str; 2] = ["user_id", "country"];

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Missing-value count for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMissing {
    /// Header name.
    pub column: String,
    /// Number of empty fields.
    pub missing: usize,
}

/// Data-quality summary of one source table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDiagnostics {
    /// Data rows read (header excluded).
    pub rows: usize,
    /// Header names in file order.
    pub columns: Vec<String>,
    /// Empty-field counts, one entry per column.
    pub missing: Vec<ColumnMissing>,
    /// Rows whose raw text equals an earlier row.
    pub duplicate_rows: usize,
    /// Rows whose `user_id` appeared in an earlier row.
    pub duplicate_keys: usize,
    /// Rows dropped because a required field was empty.
    pub incomplete_rows: usize,
    /// Country codes in order of first appearance (country table only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_countries: Option<Vec<String>>,
    /// Number of distinct country codes (country table only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_countries: Option<usize>,
}

impl TableDiagnostics {
    /// Sum of empty fields over all columns.
    pub fn total_missing(&self) -> usize {
        self.missing.iter().map(|c| c.missing).sum()
    }
}

/// Typed records of a table together with its diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedTable<T> {
    /// Complete, parsed rows in file order.
    pub records: Vec<T>,
    /// Quality summary computed over all raw rows.
    pub diagnostics: TableDiagnostics,
}

/// Field delimiter implied by a file extension (`.tsv` ⇒ tab, otherwise comma).
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

fn row_err(row: usize, column: &str, message: impl Into<String>) -> IngestError {
    IngestError::RowError { row, column: column.to_string(), message: message.into() }
}

fn read_table<R, T, F>(
    reader: R,
    delimiter: u8,
    required: &[&str],
    mut parse: F,
) -> Result<LoadedTable<T>>
where
    R: Read,
    F: FnMut(&[&str], usize) -> RowResult<T>,
{
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if columns.iter().all(|h| h.is_empty()) {
        return Err(IngestError::EmptyData.into());
    }

    let mut idx = Vec::with_capacity(required.len());
    for &col in required {
        let j = columns
            .iter()
            .position(|h| h == col)
            .ok_or_else(|| IngestError::MissingColumn(col.to_string()))?;
        idx.push(j);
    }
    let key_col = idx[0];

    let mut missing = vec![0usize; columns.len()];
    let mut seen_rows: HashSet<String> = HashSet::new();
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut diag = TableDiagnostics { columns: columns.clone(), ..Default::default() };
    let mut records = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 1;
        diag.rows += 1;

        for (j, field) in record.iter().enumerate() {
            if j < missing.len() && field.trim().is_empty() {
                missing[j] += 1;
            }
        }
        let raw = record.iter().collect::<Vec<_>>().join("\u{1f}");
        if !seen_rows.insert(raw) {
            diag.duplicate_rows += 1;
        }
        let key = record.get(key_col).unwrap_or("").trim();
        if !seen_keys.contains(key) {
            seen_keys.insert(key.to_string());
        } else {
            diag.duplicate_keys += 1;
        }

        let fields: Vec<&str> = idx.iter().map(|&j| record.get(j).unwrap_or("").trim()).collect();
        if fields.iter().any(|f| f.is_empty()) {
            diag.incomplete_rows += 1;
            continue;
        }
        records.push(parse(&fields, row)?);
    }

    if diag.rows == 0 {
        return Err(IngestError::EmptyData.into());
    }
    if diag.incomplete_rows > 0 {
        warn!(
            rows = diag.incomplete_rows,
            "dropping rows with empty required fields"
        );
    }

    diag.missing = columns
        .into_iter()
        .zip(missing)
        .map(|(column, missing)| ColumnMissing { column, missing })
        .collect();

    Ok(LoadedTable { records, diagnostics: diag })
}

fn parse_user_id(s: &str, row: usize) -> RowResult<u64> {
    s.parse::<u64>()
        .map_err(|_| row_err(row, "user_id", format!("'{s}' is not a non-negative integer")))
}

fn parse_timestamp(s: &str, row: usize) -> RowResult<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| row_err(row, "timestamp", format!("'{s}' is not a valid timestamp")))
}

fn parse_interaction(f: &[&str], row: usize) -> RowResult<InteractionRecord> {
    let group = f[2]
        .parse::<Arm>()
        .map_err(|_| row_err(row, "group", format!("unknown group label '{}'", f[2])))?;
    let landing_page = f[3].parse::<PageVariant>().map_err(|_| {
        row_err(row, "landing_page", format!("unknown landing_page label '{}'", f[3]))
    })?;
    let converted = match f[4] {
        "0" => false,
        "1" => true,
        other => return Err(row_err(row, "converted", format!("expected 0 or 1, got '{other}'"))),
    };
    Ok(InteractionRecord {
        user_id: parse_user_id(f[0], row)?,
        timestamp: parse_timestamp(f[1], row)?,
        group,
        landing_page,
        converted,
    })
}

/// Read an interaction log from any reader.
pub fn read_interactions<R: Read>(reader: R, delimiter: u8) -> Result<LoadedTable<InteractionRecord>> {
    read_table(reader, delimiter, &INTERACTION_COLUMNS, parse_interaction)
}

/// Read a user → country mapping from any reader.
pub fn read_countries<R: Read>(reader: R, delimiter: u8) -> Result<LoadedTable<CountryRecord>> {
    let mut table = read_table(reader, delimiter, &COUNTRY_COLUMNS, |f, row| {
        Ok(CountryRecord { user_id: parse_user_id(f[0], row)?, country: f[1].to_string() })
    })?;

    let mut distinct: Vec<String> = Vec::new();
    for r in &table.records {
        if !distinct.contains(&r.country) {
            distinct.push(r.country.clone());
        }
    }
    table.diagnostics.n_countries = Some(distinct.len());
    table.diagnostics.distinct_countries = Some(distinct);
    Ok(table)
}

/// Load the interaction log at `path`.
pub fn load_interactions(path: &Path) -> Result<LoadedTable<InteractionRecord>> {
    let file = File::open(path)?;
    let table = read_interactions(file, delimiter_for(path))?;
    info!(
        path = %path.display(),
        rows = table.diagnostics.rows,
        kept = table.records.len(),
        "loaded interaction log"
    );
    Ok(table)
}

/// Load the country mapping at `path`.
pub fn load_countries(path: &Path) -> Result<LoadedTable<CountryRecord>> {
    let file = File::open(path)?;
    let table = read_countries(file, delimiter_for(path))?;
    info!(
        path = %path.display(),
        rows = table.diagnostics.rows,
        countries = table.diagnostics.n_countries.unwrap_or(0),
        "loaded country mapping"
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Page / group consistency
// ---------------------------------------------------------------------------

/// Count of one (group, landing_page) combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyCell {
    /// Assigned arm.
    pub group: Arm,
    /// Page shown.
    pub landing_page: PageVariant,
    /// Rows with this combination.
    pub count: usize,
}

/// Crosstab of group against landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// All four combinations, control first then old page first.
    pub cells: Vec<ConsistencyCell>,
    /// Control users shown the new page.
    pub control_with_new: usize,
    /// Treatment users shown the old page.
    pub treatment_with_old: usize,
}

impl ConsistencyReport {
    /// Total rows violating the arm ⇔ page correspondence.
    pub fn mismatched(&self) -> usize {
        self.control_with_new + self.treatment_with_old
    }
}

/// Tabulate (group, landing_page) pairs.
pub fn page_group_consistency(records: &[InteractionRecord]) -> ConsistencyReport {
    let mut counts = [[0usize; 2]; 2];
    for r in records {
        let g = r.group as usize;
        let p = r.landing_page as usize;
        counts[g][p] += 1;
    }
    let mut cells = Vec::with_capacity(4);
    for group in Arm::ALL {
        for landing_page in [PageVariant::OldPage, PageVariant::NewPage] {
            cells.push(ConsistencyCell {
                group,
                landing_page,
                count: counts[group as usize][landing_page as usize],
            });
        }
    }
    ConsistencyReport {
        cells,
        control_with_new: counts[Arm::Control as usize][PageVariant::NewPage as usize],
        treatment_with_old: counts[Arm::Treatment as usize][PageVariant::OldPage as usize],
    }
}
