//! # ab-viz-render
//!
//! Renders `ab-viz` bar chart artifacts to SVG, and to PNG or PDF behind the
//! `png` / `pdf` features.

pub mod canvas;
pub mod color;
pub mod config;
pub mod header;
pub mod layout;
pub mod output;
pub mod plots;
pub mod primitives;
pub mod text;
pub mod theme;

use std::path::Path;

use ab_viz::BarChartArtifact;
use ab_viz::bars::SCHEMA_VERSION;
use config::VizConfig;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown output format: {0}")]
    UnknownFormat(String),
    #[error("unsupported artifact schema: {0}")]
    Schema(String),
    #[error("deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("layout error: {0}")]
    Layout(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "png")]
    #[error("PNG encoding error: {0}")]
    Png(String),
    #[cfg(feature = "pdf")]
    #[error("PDF conversion error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Output formats compiled into this build.
pub fn supported_formats() -> Vec<&'static str> {
    let mut formats = vec!["svg"];
    if cfg!(feature = "png") {
        formats.push("png");
    }
    if cfg!(feature = "pdf") {
        formats.push("pdf");
    }
    formats
}

/// Render a bar chart artifact to an SVG string.
pub fn render_svg(artifact: &BarChartArtifact, config: &VizConfig) -> Result<String> {
    if artifact.schema_version != SCHEMA_VERSION {
        return Err(RenderError::Schema(artifact.schema_version.clone()));
    }
    plots::bars::render(artifact, config)
}

/// Render an artifact given as JSON.
pub fn render_json_svg(artifact_json: &str, config: &VizConfig) -> Result<String> {
    let artifact: BarChartArtifact = serde_json::from_str(artifact_json)?;
    render_svg(&artifact, config)
}

/// Render an artifact to bytes in `format` (`svg`, `png`, `pdf`).
pub fn render_to_bytes(
    artifact: &BarChartArtifact,
    format: &str,
    config: &VizConfig,
) -> Result<Vec<u8>> {
    let svg = render_svg(artifact, config)?;
    match format {
        "svg" => Ok(svg.into_bytes()),
        #[cfg(feature = "png")]
        "png" => output::png::svg_to_png(&svg, config.output.dpi),
        #[cfg(feature = "pdf")]
        "pdf" => output::pdf::svg_to_pdf(&svg),
        other => Err(RenderError::UnknownFormat(other.to_string())),
    }
}

/// Render an artifact to a file, format inferred from the extension.
pub fn render_to_file(artifact: &BarChartArtifact, path: &Path, config: &VizConfig) -> Result<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("svg");
    let bytes = render_to_bytes(artifact, &ext.to_ascii_lowercase(), config)?;
    std::fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "chart written");
    Ok(())
}
