//! Console text for `analyze`, `inspect` and `power`, and the
//! reproducibility bundle.

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use ab_inference::{PowerAnalysis, RateSummary, TestSuite};
use ab_ingest::{CleaningReport, ConsistencyReport, TableDiagnostics};

use crate::analyze::AnalysisReport;

fn pct(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn rate_row(out: &mut String, label: &str, s: &RateSummary) -> std::fmt::Result {
    writeln!(out, "  {label:<22} {:>10} {:>10} {:>9}", s.n, s.conversions, pct(s.rate))
}

fn write_table(out: &mut String, name: &str, d: &TableDiagnostics) -> std::fmt::Result {
    writeln!(out, "{name}: {} rows, columns [{}]", d.rows, d.columns.join(", "))?;
    let missing: Vec<String> =
        d.missing.iter().map(|c| format!("{}={}", c.column, c.missing)).collect();
    writeln!(out, "  missing values:  {} ({})", d.total_missing(), missing.join(", "))?;
    writeln!(out, "  duplicate rows:  {}", d.duplicate_rows)?;
    writeln!(out, "  duplicate keys:  {}", d.duplicate_keys)?;
    if d.incomplete_rows > 0 {
        writeln!(out, "  incomplete rows: {} (dropped)", d.incomplete_rows)?;
    }
    if let (Some(n), Some(codes)) = (d.n_countries, &d.distinct_countries) {
        writeln!(out, "  countries:       {n} [{}]", codes.join(", "))?;
    }
    Ok(())
}

fn write_consistency(out: &mut String, c: &ConsistencyReport) -> std::fmt::Result {
    writeln!(out, "group / landing_page:")?;
    for cell in &c.cells {
        writeln!(
            out,
            "  {:<10} {:<9} {:>10}",
            cell.group.as_str(),
            cell.landing_page.as_str(),
            cell.count
        )?;
    }
    writeln!(
        out,
        "  mismatched: {} (control/new_page {}, treatment/old_page {})",
        c.mismatched(),
        c.control_with_new,
        c.treatment_with_old
    )
}

fn write_cleaning(out: &mut String, c: &CleaningReport) -> std::fmt::Result {
    writeln!(out, "Cleaning (policy: {})", c.policy)?;
    writeln!(out, "  raw rows:               {}", c.raw_rows)?;
    if c.incomplete_rows > 0 {
        writeln!(out, "  incomplete (dropped):   {}", c.incomplete_rows)?;
    }
    writeln!(out, "  after consistency:      {}", c.after_consistency)?;
    writeln!(out, "  users in both arms:     {}", c.multi_arm_users)?;
    if !c.multi_arm_sample.is_empty() {
        let sample: Vec<String> = c.multi_arm_sample.iter().map(u64::to_string).collect();
        writeln!(out, "    e.g. {}", sample.join(", "))?;
    }
    writeln!(out, "  after dedup:            {}", c.after_dedup)?;
    writeln!(out, "  without country:        {}", c.unmatched_country)?;
    writeln!(out, "  joined rows:            {}", c.joined_rows)
}

fn write_tests(out: &mut String, t: &TestSuite) -> std::fmt::Result {
    let p = &t.primary;
    writeln!(out, "Primary test (treatment > control, two-proportion z)")?;
    writeln!(out, "  z = {:.4}, p = {:.4}, alpha = {}", p.z, p.p_value, p.alpha)?;
    writeln!(out, "  reject null: {}", yes_no(p.reject_null))?;
    writeln!(out)?;

    let c = &t.country_effect;
    writeln!(out, "Country effect (chi-square, country x converted)")?;
    writeln!(
        out,
        "  chi2 = {:.4}, dof = {}, p = {:.4}{}",
        c.result.statistic,
        c.result.dof,
        c.result.p_value,
        if c.result.yates { " (Yates)" } else { "" }
    )?;
    writeln!(out, "  significant: {}", yes_no(c.significant))?;
    writeln!(out)?;

    writeln!(out, "Per-country treatment effect (two-sided, correction: {})", t.config.correction)?;
    writeln!(
        out,
        "  {:<8} {:>9} {:>9} {:>9} {:>8} {:>8} {:>8}  sig",
        "country", "control", "treatm.", "diff", "z", "p", "p_adj"
    )?;
    for (country, e) in &t.per_country {
        writeln!(
            out,
            "  {country:<8} {:>9} {:>9} {:>9} {:>8.3} {:>8.4} {:>8.4}  {}",
            pct(e.control_rate),
            pct(e.treatment_rate),
            pct(e.difference),
            e.z,
            e.p_value,
            e.p_adjusted,
            yes_no(e.significant)
        )?;
    }
    Ok(())
}

fn write_power(out: &mut String, pa: &PowerAnalysis) -> std::fmt::Result {
    writeln!(out, "Power (two-sample t-test, alpha = {})", pa.alpha)?;
    writeln!(out, "  control rate:   {}", pct(pa.control_rate))?;
    writeln!(out, "  treatment rate: {}", pct(pa.treatment_rate))?;
    writeln!(out, "  effect size:    {:.6}", pa.effect_size)?;
    writeln!(out, "  total sample:   {} ({} per arm)", pa.total_sample, pa.nobs1)?;
    writeln!(out, "  power:          {:.4} (target {})", pa.power, pa.target_power)?;
    match (pa.sufficiently_powered, pa.required_total) {
        (true, _) => writeln!(out, "  sufficiently powered"),
        (false, Some(total)) => {
            writeln!(out, "  required total sample for target power: {total}")
        }
        (false, None) => {
            writeln!(out, "  no sample size reaches the target power (zero effect)")
        }
    }
}

pub fn format_report(r: &AnalysisReport) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "abstat {}", r.tool_version)?;
    writeln!(out)?;
    write_table(&mut out, "Interactions", &r.diagnostics.interactions)?;
    write_table(&mut out, "Countries", &r.diagnostics.countries)?;
    writeln!(out)?;
    write_consistency(&mut out, &r.consistency)?;
    writeln!(out)?;
    write_cleaning(&mut out, &r.cleaning)?;
    writeln!(out)?;

    let s = &r.summary;
    writeln!(out, "Conversion")?;
    writeln!(out, "  {:<22} {:>10} {:>10} {:>9}", "", "n", "converted", "rate")?;
    rate_row(&mut out, "overall", &s.overall)?;
    for a in &s.by_arm {
        rate_row(&mut out, a.arm.as_str(), &a.summary)?;
    }
    for c in &s.by_country {
        rate_row(&mut out, &c.country, &c.summary)?;
    }
    for c in &s.by_arm_country {
        rate_row(&mut out, &format!("{} / {}", c.arm, c.country), &c.summary)?;
    }
    if let Some(lift) = &r.lift {
        let relative = lift.relative.map_or_else(|| "n/a".to_string(), pct);
        writeln!(out, "  lift: {} absolute, {} relative", pct(lift.absolute), relative)?;
    }
    writeln!(out)?;

    write_tests(&mut out, &r.tests)?;
    writeln!(out)?;
    write_power(&mut out, &r.tests.power)?;

    if !r.charts.is_empty() {
        writeln!(out)?;
        writeln!(out, "Charts")?;
        for c in &r.charts {
            match &c.error {
                None => writeln!(out, "  {}", c.path)?,
                Some(e) => writeln!(out, "  {} FAILED: {e}", c.path)?,
            }
        }
    }
    Ok(out)
}

pub fn format_inspection(
    interactions: &TableDiagnostics,
    countries: &TableDiagnostics,
    consistency: &ConsistencyReport,
) -> Result<String> {
    let mut out = String::new();
    write_table(&mut out, "Interactions", interactions)?;
    write_table(&mut out, "Countries", countries)?;
    writeln!(out)?;
    write_consistency(&mut out, consistency)?;
    Ok(out)
}

pub fn format_power(pa: &PowerAnalysis) -> Result<String> {
    let mut out = String::new();
    write_power(&mut out, pa)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BundleMeta {
    pub tool: String,
    pub tool_version: String,
    pub created_unix_ms: u128,
    pub command: String,
    pub args: serde_json::Value,
    pub inputs: Vec<BundleInputMeta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleInputMeta {
    pub name: String,
    pub original_path: String,
    pub bundle_path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
struct Manifest {
    bundle_version: u32,
    files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, Serialize)]
struct ManifestFile {
    path: String,
    bytes: u64,
    sha256: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut s = String::with_capacity(64);
    for b in digest {
        // Writing to a String cannot fail.
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn ensure_empty_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            anyhow::bail!("bundle path exists but is not a directory: {}", dir.display());
        }
        if dir.read_dir()?.next().is_some() {
            anyhow::bail!("bundle directory must be empty: {}", dir.display());
        }
    } else {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn manifest_entry(bundle_dir: &Path, rel: &str) -> Result<ManifestFile> {
    let bytes = std::fs::read(bundle_dir.join(rel))?;
    Ok(ManifestFile { path: rel.to_string(), bytes: bytes.len() as u64, sha256: sha256_hex(&bytes) })
}

/// Write `meta.json`, copies of the inputs, `outputs/result.json` and a
/// `manifest.json` hashing all of them. `dir` must be empty or absent.
pub fn write_bundle(
    bundle_dir: &Path,
    command: &str,
    args: serde_json::Value,
    inputs: &[(&str, &Path)],
    output_value: &serde_json::Value,
) -> Result<()> {
    ensure_empty_dir(bundle_dir)?;

    let inputs_dir = bundle_dir.join("inputs");
    let outputs_dir = bundle_dir.join("outputs");
    std::fs::create_dir_all(&inputs_dir)?;
    std::fs::create_dir_all(&outputs_dir)?;

    let mut input_meta = Vec::with_capacity(inputs.len());
    for &(name, path) in inputs {
        let bytes = std::fs::read(path)?;
        let file_name = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{name}.{ext}"),
            None => name.to_string(),
        };
        let rel = format!("inputs/{file_name}");
        std::fs::write(bundle_dir.join(&rel), &bytes)?;
        input_meta.push(BundleInputMeta {
            name: name.to_string(),
            original_path: path.display().to_string(),
            bundle_path: rel,
            sha256: sha256_hex(&bytes),
        });
    }

    let created_unix_ms = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
    let meta = BundleMeta {
        tool: "abstat".to_string(),
        tool_version: ab_core::VERSION.to_string(),
        created_unix_ms,
        command: command.to_string(),
        args,
        inputs: input_meta,
    };
    std::fs::write(bundle_dir.join("meta.json"), serde_json::to_string_pretty(&meta)?)?;
    std::fs::write(outputs_dir.join("result.json"), serde_json::to_string_pretty(output_value)?)?;

    let mut files = vec![manifest_entry(bundle_dir, "meta.json")?];
    for input in &meta.inputs {
        files.push(manifest_entry(bundle_dir, &input.bundle_path)?);
    }
    files.push(manifest_entry(bundle_dir, "outputs/result.json")?);

    let manifest = Manifest { bundle_version: 1, files };
    std::fs::write(bundle_dir.join("manifest.json"), serde_json::to_string_pretty(&manifest)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_inference::power_analysis;

    fn tmp_dir(prefix: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        std::env::temp_dir().join(format!("{prefix}_{}_{nanos}", std::process::id()))
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn power_text_reports_required_sample() {
        let pa = power_analysis(0.1204, 0.1188, 290_584, 0.05, 0.8).unwrap();
        let text = format_power(&pa).unwrap();
        assert!(text.contains("required total sample"));
        assert!(text.contains("12.04%"));

        let pa = power_analysis(0.10, 0.20, 2_000, 0.05, 0.8).unwrap();
        assert!(format_power(&pa).unwrap().contains("sufficiently powered"));
    }

    #[test]
    fn bundle_layout_and_manifest() {
        let root = tmp_dir("abstat_bundle_unit");
        std::fs::create_dir_all(&root).unwrap();
        let input = root.join("data.csv");
        std::fs::write(&input, "user_id,country\n1,US\n").unwrap();

        let bundle = root.join("bundle");
        let result = serde_json::json!({"ok": true});
        write_bundle(&bundle, "analyze", serde_json::json!({}), &[("countries", input.as_path())], &result)
            .unwrap();

        assert!(bundle.join("inputs/countries.csv").exists());
        assert!(bundle.join("outputs/result.json").exists());
        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(bundle.join("manifest.json")).unwrap())
                .unwrap();
        let paths: Vec<&str> = manifest["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["meta.json", "inputs/countries.csv", "outputs/result.json"]);
        let meta: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(bundle.join("meta.json")).unwrap()).unwrap();
        assert_eq!(
            meta["inputs"][0]["sha256"].as_str().unwrap(),
            sha256_hex(&std::fs::read(&input).unwrap())
        );

        let again = write_bundle(&bundle, "analyze", serde_json::json!({}), &[], &result);
        assert!(again.is_err());
        std::fs::remove_dir_all(&root).ok();
    }
}
