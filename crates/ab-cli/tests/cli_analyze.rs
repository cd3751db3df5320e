use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_abstat"))
}

fn tmp_dir(suffix: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("abstat_cli_{}_{}_{}", std::process::id(), nanos, suffix));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
}

fn s(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Synthetic inputs in a fresh directory.
fn fixture(suffix: &str) -> (PathBuf, PathBuf, PathBuf) {
    let dir = tmp_dir(suffix);
    let out = run(&["generate-data", "--out-dir", &s(&dir), "--users", "3000", "--seed", "7"]);
    assert_success(&out, "generate-data");
    let interactions = dir.join("ab_data.csv");
    let countries = dir.join("countries.csv");
    assert!(interactions.exists() && countries.exists());
    (dir, interactions, countries)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let out = Sha256::digest(bytes);
    let mut s = String::with_capacity(64);
    for b in out {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[test]
fn analyze_prints_text_report_and_writes_charts() {
    let (dir, interactions, countries) = fixture("text");
    let charts = dir.join("charts");
    let out = run(&[
        "analyze",
        "--interactions",
        &s(&interactions),
        "--countries",
        &s(&countries),
        "--charts-dir",
        &s(&charts),
    ]);
    assert_success(&out, "analyze");
    let stdout = String::from_utf8_lossy(&out.stdout);
    for needle in ["Cleaning (policy: cross-arm)", "Primary test", "Country effect", "Power"] {
        assert!(stdout.contains(needle), "missing '{needle}' in:\n{stdout}");
    }
    for name in ["conversion_by_group", "conversion_by_country", "conversion_by_group_country"] {
        let svg = std::fs::read_to_string(charts.join(format!("{name}.svg"))).unwrap();
        assert!(svg.starts_with("<svg"), "{name} is not svg");
    }
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn analyze_json_is_consistent() {
    let (dir, interactions, countries) = fixture("json");
    let result = dir.join("result.json");
    let out = run(&[
        "analyze",
        "--interactions",
        &s(&interactions),
        "--countries",
        &s(&countries),
        "--no-charts",
        "--json",
        "-o",
        &s(&result),
    ]);
    assert_success(&out, "analyze --json");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout should be JSON");
    let file: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&result).unwrap()).unwrap();
    assert_eq!(v, file);

    assert_eq!(v["schema_version"], "abstat_analysis_report_v0");
    let joined = v["cleaning"]["joined_rows"].as_u64().unwrap();
    assert_eq!(v["summary"]["overall"]["n"].as_u64().unwrap(), joined);
    let arm_total: u64 =
        v["summary"]["by_arm"].as_array().unwrap().iter().map(|a| a["n"].as_u64().unwrap()).sum();
    assert_eq!(arm_total, joined);

    let per_country = v["tests"]["per_country"].as_object().unwrap();
    let countries: Vec<&str> = v["summary"]["by_country"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["country"].as_str().unwrap())
        .collect();
    assert_eq!(per_country.keys().map(String::as_str).collect::<Vec<_>>(), countries);
    for e in per_country.values() {
        let diff = e["treatment_rate"].as_f64().unwrap() - e["control_rate"].as_f64().unwrap();
        assert!((diff - e["difference"].as_f64().unwrap()).abs() < 1e-12);
    }
    assert!(v["charts"].as_array().unwrap().is_empty());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn analyze_writes_bundle_and_refuses_non_empty_dir() {
    let (dir, interactions, countries) = fixture("bundle");
    let bundle = dir.join("bundle");
    let args = [
        "analyze",
        "--interactions",
        &s(&interactions),
        "--countries",
        &s(&countries),
        "--no-charts",
        "--bundle",
        &s(&bundle),
    ];
    let out = run(&args);
    assert_success(&out, "analyze --bundle");

    for rel in [
        "meta.json",
        "manifest.json",
        "inputs/interactions.csv",
        "inputs/countries.csv",
        "outputs/result.json",
    ] {
        assert!(bundle.join(rel).exists(), "expected bundle file: {rel}");
    }
    let meta: serde_json::Value =
        serde_json::from_slice(&std::fs::read(bundle.join("meta.json")).unwrap()).unwrap();
    assert_eq!(meta["tool"], "abstat");
    assert_eq!(meta["command"], "analyze");
    assert_eq!(
        meta["inputs"][0]["sha256"].as_str().unwrap(),
        sha256_hex(&std::fs::read(&interactions).unwrap())
    );

    let manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(bundle.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["bundle_version"], 1);
    for f in manifest["files"].as_array().unwrap() {
        let bytes = std::fs::read(bundle.join(f["path"].as_str().unwrap())).unwrap();
        assert_eq!(f["bytes"].as_u64().unwrap(), bytes.len() as u64);
        assert_eq!(f["sha256"].as_str().unwrap(), sha256_hex(&bytes));
    }

    let again = run(&args);
    assert!(!again.status.success(), "second bundle into the same dir must fail");
    assert!(String::from_utf8_lossy(&again.stderr).contains("must be empty"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn analyze_reads_yaml_config() {
    let (dir, _, _) = fixture("config");
    let config = dir.join("analysis.yaml");
    std::fs::write(
        &config,
        "schema_version: abstat_analysis_spec_v0\n\
         inputs:\n  interactions: ab_data.csv\n  countries: countries.csv\n\
         cleaning:\n  duplicate_policy: keep-first-per-user\n\
         tests:\n  alpha: 0.01\n  correction: bonferroni\n\
         charts:\n  out_dir: figs\n  theme: minimal\n",
    )
    .unwrap();

    let out = run(&["analyze", "--config", &s(&config), "--json"]);
    assert_success(&out, "analyze --config");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["plan"]["duplicate_policy"], "keep-first-per-user");
    assert_eq!(v["tests"]["config"]["alpha"].as_f64().unwrap(), 0.01);
    assert_eq!(v["tests"]["config"]["correction"], "bonferroni");
    assert_eq!(v["plan"]["charts"]["viz"]["theme"], "minimal");
    assert!(dir.join("figs/conversion_by_group.svg").exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn inspect_reports_diagnostics() {
    let (dir, interactions, countries) = fixture("inspect");
    let out = run(&[
        "inspect",
        "--interactions",
        &s(&interactions),
        "--countries",
        &s(&countries),
        "--json",
    ]);
    assert_success(&out, "inspect");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(v["interactions"]["rows"].as_u64().unwrap() >= 3000);
    assert_eq!(v["countries"]["n_countries"].as_u64().unwrap(), 3);
    assert_eq!(v["consistency"]["cells"].as_array().unwrap().len(), 4);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn power_command_text_and_json() {
    let base = ["power", "--control-rate", "0.1204", "--treatment-rate", "0.1188"];
    let mut args = base.to_vec();
    args.extend(["--total-sample", "290584"]);
    let out = run(&args);
    assert_success(&out, "power");
    assert!(String::from_utf8_lossy(&out.stdout).contains("required total sample"));

    args.push("--json");
    let out = run(&args);
    assert_success(&out, "power --json");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let power = v["power"].as_f64().unwrap();
    assert!(power > 0.0 && power < 0.8);
    assert!(v["required_total"].as_u64().unwrap() > 290_584);
}

#[test]
fn version_and_failures() {
    let out = run(&["version"]);
    assert_success(&out, "version");
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("abstat "));

    let dir = tmp_dir("missing");
    let out = run(&[
        "analyze",
        "--interactions",
        &s(&dir.join("nope.csv")),
        "--countries",
        &s(&dir.join("nope_either.csv")),
        "--no-charts",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to load interaction log"));

    let out = run(&[
        "power",
        "--control-rate",
        "0.1",
        "--treatment-rate",
        "0.2",
        "--total-sample",
        "100",
        "--alpha",
        "2",
    ]);
    assert!(!out.status.success());
}
