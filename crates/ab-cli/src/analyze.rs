//! `abstat analyze`: load, clean, summarise, chart and test.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use ab_inference::{
    ConversionSummary, CorrectionMethod, DEFAULT_ALPHA, DEFAULT_TARGET_POWER, Lift, TestConfig,
    TestSuite, conversion_summary, run_tests,
};
use ab_ingest::{
    CleaningReport, ConsistencyReport, DuplicatePolicy, TableDiagnostics, clean_loaded,
    load_countries, load_interactions, page_group_consistency,
};
use ab_viz::BarChartArtifact;
use ab_viz_render::config::{VizConfig, resolve_config};

use crate::analysis_spec::AnalysisSpecV0;
use crate::report;

pub const DEFAULT_INTERACTIONS: &str = "ab_data.csv";
pub const DEFAULT_COUNTRIES: &str = "countries.csv";
pub const DEFAULT_CHARTS_DIR: &str = "charts";

pub const REPORT_SCHEMA_VERSION: &str = "abstat_analysis_report_v0";

#[derive(Debug, Clone, clap::Args)]
pub struct AnalyzeArgs {
    /// Interaction log (CSV or TSV) [default: ab_data.csv]
    #[arg(long)]
    pub interactions: Option<PathBuf>,

    /// User to country mapping (CSV or TSV) [default: countries.csv]
    #[arg(long)]
    pub countries: Option<PathBuf>,

    /// Analysis spec (YAML, schema abstat_analysis_spec_v0)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Significance level [default: 0.05]
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Desired power [default: 0.8]
    #[arg(long)]
    pub target_power: Option<f64>,

    /// Repeated-user rule: cross-arm | keep-first-per-user
    #[arg(long)]
    pub duplicate_policy: Option<DuplicatePolicy>,

    /// Per-country p-value correction: none | bonferroni | bh
    #[arg(long)]
    pub correction: Option<CorrectionMethod>,

    /// Chart output directory [default: charts]
    #[arg(long)]
    pub charts_dir: Option<PathBuf>,

    /// Chart format: svg | png | pdf [default: svg]
    #[arg(long)]
    pub format: Option<String>,

    /// Chart theme: abstat | minimal
    #[arg(long)]
    pub theme: Option<String>,

    /// Skip chart rendering.
    #[arg(long)]
    pub no_charts: bool,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON result to this file.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Write a reproducibility bundle to this (empty) directory.
    #[arg(long)]
    pub bundle: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartPlan {
    pub out_dir: PathBuf,
    pub format: String,
    pub viz: VizConfig,
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisPlan {
    pub interactions: PathBuf,
    pub countries: PathBuf,
    pub duplicate_policy: DuplicatePolicy,
    pub tests: TestConfig,
    pub charts: Option<ChartPlan>,
}

impl AnalysisPlan {
    /// Merge flags over the optional spec file over defaults.
    pub fn resolve(args: &AnalyzeArgs) -> Result<Self> {
        let spec = args.config.as_deref().map(AnalysisSpecV0::read).transpose()?;
        let spec_inputs = spec.as_ref().map(|s| &s.inputs);
        let spec_tests = spec.as_ref().map(|s| &s.tests);
        let spec_charts = spec.as_ref().map(|s| &s.charts);

        let interactions = args
            .interactions
            .clone()
            .or_else(|| spec_inputs.and_then(|i| i.interactions.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INTERACTIONS));
        let countries = args
            .countries
            .clone()
            .or_else(|| spec_inputs.and_then(|i| i.countries.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COUNTRIES));

        let duplicate_policy = args
            .duplicate_policy
            .or_else(|| spec.as_ref().and_then(|s| s.cleaning.duplicate_policy))
            .unwrap_or_default();

        let tests = TestConfig {
            alpha: args.alpha.or_else(|| spec_tests.and_then(|t| t.alpha)).unwrap_or(DEFAULT_ALPHA),
            target_power: args
                .target_power
                .or_else(|| spec_tests.and_then(|t| t.target_power))
                .unwrap_or(DEFAULT_TARGET_POWER),
            correction: args
                .correction
                .or_else(|| spec_tests.and_then(|t| t.correction))
                .unwrap_or_default(),
        };
        tests.validate()?;

        let charts_enabled = !args.no_charts && spec_charts.and_then(|c| c.enabled).unwrap_or(true);
        let charts = if charts_enabled {
            let theme = args.theme.clone().or_else(|| spec_charts.and_then(|c| c.theme.clone()));
            let viz_yaml = spec.as_ref().map(AnalysisSpecV0::viz_yaml).transpose()?.flatten();
            let viz = resolve_config(theme.as_deref(), viz_yaml.as_deref())
                .context("invalid chart configuration")?;
            // flag > charts.format > charts.viz.output.format
            let format = args
                .format
                .clone()
                .or_else(|| spec_charts.and_then(|c| c.format.clone()))
                .unwrap_or_else(|| viz.output.format.clone())
                .to_ascii_lowercase();
            let supported = ab_viz_render::supported_formats();
            if !supported.contains(&format.as_str()) {
                anyhow::bail!(
                    "unsupported chart format '{format}' (this build supports: {})",
                    supported.join(", ")
                );
            }
            let out_dir = args
                .charts_dir
                .clone()
                .or_else(|| spec_charts.and_then(|c| c.out_dir.clone()))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHARTS_DIR));
            Some(ChartPlan { out_dir, format, viz })
        } else {
            None
        };

        Ok(Self { interactions, countries, duplicate_policy, tests, charts })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InputDiagnostics {
    pub interactions: TableDiagnostics,
    pub countries: TableDiagnostics,
}

/// One rendered (or failed) chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartOutput {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything `analyze` computed, as written by `--json` and `-o`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub schema_version: String,
    pub tool_version: String,
    pub plan: AnalysisPlan,
    pub diagnostics: InputDiagnostics,
    pub consistency: ConsistencyReport,
    pub cleaning: CleaningReport,
    pub summary: ConversionSummary,
    pub lift: Option<Lift>,
    pub tests: TestSuite,
    pub charts: Vec<ChartOutput>,
}

fn chart_artifacts(summary: &ConversionSummary) -> [(&'static str, BarChartArtifact); 3] {
    [
        ("conversion_by_group", ab_viz::conversion_by_arm(summary)),
        ("conversion_by_country", ab_viz::conversion_by_country(summary)),
        ("conversion_by_group_country", ab_viz::conversion_by_arm_country(summary)),
    ]
}

/// Render the three conversion charts. A chart that fails is logged and
/// recorded; the run continues.
fn render_charts(summary: &ConversionSummary, plan: &ChartPlan) -> Result<Vec<ChartOutput>> {
    std::fs::create_dir_all(&plan.out_dir)
        .with_context(|| format!("failed to create chart directory {}", plan.out_dir.display()))?;

    let mut out = Vec::new();
    for (name, artifact) in chart_artifacts(summary) {
        let path = plan.out_dir.join(format!("{name}.{}", plan.format));
        let error = match ab_viz_render::render_to_file(&artifact, &path, &plan.viz) {
            Ok(()) => None,
            Err(e) => {
                warn!(chart = name, error = %e, "chart rendering failed");
                Some(e.to_string())
            }
        };
        out.push(ChartOutput { name: name.to_string(), path: path.display().to_string(), error });
    }
    info!(dir = %plan.out_dir.display(), charts = out.len(), "charts written");
    Ok(out)
}

/// Run the pipeline described by `plan`.
pub fn run_analysis(plan: &AnalysisPlan) -> Result<AnalysisReport> {
    let interactions = load_interactions(&plan.interactions).with_context(|| {
        format!("failed to load interaction log {}", plan.interactions.display())
    })?;
    let countries = load_countries(&plan.countries)
        .with_context(|| format!("failed to load country mapping {}", plan.countries.display()))?;
    info!(
        interactions = interactions.diagnostics.rows,
        countries = countries.diagnostics.rows,
        "inputs loaded"
    );

    let consistency = page_group_consistency(&interactions.records);
    let cleaned = clean_loaded(&interactions, &countries, plan.duplicate_policy);
    if cleaned.records.is_empty() {
        anyhow::bail!("no rows left after cleaning and joining the inputs");
    }

    let summary = conversion_summary(&cleaned.records)?;
    let lift = summary.lift();
    let tests = run_tests(&cleaned.records, &plan.tests)?;
    if !tests.power.sufficiently_powered {
        warn!(
            power = tests.power.power,
            target = tests.power.target_power,
            required_total = ?tests.power.required_total,
            "experiment is under-powered"
        );
    }

    let charts = match &plan.charts {
        Some(charts) => render_charts(&summary, charts)?,
        None => Vec::new(),
    };

    Ok(AnalysisReport {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        tool_version: ab_core::VERSION.to_string(),
        plan: plan.clone(),
        diagnostics: InputDiagnostics {
            interactions: interactions.diagnostics,
            countries: countries.diagnostics,
        },
        consistency,
        cleaning: cleaned.report,
        summary,
        lift,
        tests,
        charts,
    })
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn cmd_analyze(args: &AnalyzeArgs) -> Result<()> {
    let plan = AnalysisPlan::resolve(args)?;
    let result = run_analysis(&plan)?;
    let value = serde_json::to_value(&result)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", report::format_report(&result)?);
    }

    if let Some(path) = &args.output {
        write_json(path, &value)?;
    }
    if let Some(dir) = &args.bundle {
        report::write_bundle(
            dir,
            "analyze",
            serde_json::to_value(&plan)?,
            &[("interactions", plan.interactions.as_path()), ("countries", plan.countries.as_path())],
            &value,
        )?;
        info!(dir = %dir.display(), "bundle written");
    }
    Ok(())
}
