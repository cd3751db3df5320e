//! Analysis spec v0 (YAML): inputs, cleaning policy, test settings and chart
//! options for `abstat analyze --config`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use ab_inference::CorrectionMethod;
use ab_ingest::DuplicatePolicy;

pub const SPEC_V0: &str = "abstat_analysis_spec_v0";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSpecV0 {
    pub schema_version: String,
    #[serde(default)]
    pub inputs: Inputs,
    #[serde(default)]
    pub cleaning: Cleaning,
    #[serde(default)]
    pub tests: Tests,
    #[serde(default)]
    pub charts: Charts,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inputs {
    pub interactions: Option<PathBuf>,
    pub countries: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cleaning {
    pub duplicate_policy: Option<DuplicatePolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tests {
    pub alpha: Option<f64>,
    pub target_power: Option<f64>,
    pub correction: Option<CorrectionMethod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Charts {
    pub enabled: Option<bool>,
    pub out_dir: Option<PathBuf>,
    pub format: Option<String>,
    pub theme: Option<String>,
    /// Inline `VizConfig` overrides.
    pub viz: Option<serde_yaml_ng::Value>,
}

fn resolve_path(base_dir: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() { p.to_path_buf() } else { base_dir.join(p) }
}

impl AnalysisSpecV0 {
    pub fn parse(text: &str) -> Result<Self> {
        let probe: serde_yaml_ng::Value = serde_yaml_ng::from_str(text)?;
        let schema_version = probe.get("schema_version").and_then(|v| v.as_str());
        if schema_version != Some(SPEC_V0) {
            anyhow::bail!(
                "unsupported schema_version for analysis spec: got={} expected={}",
                schema_version.unwrap_or("<missing>"),
                SPEC_V0
            );
        }
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Read a spec file; relative paths are taken relative to its directory.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read analysis spec {}", path.display()))?;
        let mut spec = Self::parse(&text)
            .with_context(|| format!("invalid analysis spec {}", path.display()))?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        for p in [&mut spec.inputs.interactions, &mut spec.inputs.countries, &mut spec.charts.out_dir]
            .into_iter()
            .flatten()
        {
            *p = resolve_path(base_dir, p);
        }
        Ok(spec)
    }

    /// Chart overrides re-encoded as YAML for `ab_viz_render::config::resolve_config`.
    pub fn viz_yaml(&self) -> Result<Option<String>> {
        self.charts.viz.as_ref().map(serde_yaml_ng::to_string).transpose().map_err(Into::into)
    }
}
