//! # ab-viz
//!
//! Visualization data artifacts for abstat.
//!
//! Artifacts are plain serde structures (arrays instead of nested objects)
//! that `ab-viz-render` turns into SVG, PNG or PDF.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Conversion-rate bar charts.
pub mod bars;

pub use bars::{
    BarChartArtifact, BarSeries, conversion_by_arm, conversion_by_arm_country,
    conversion_by_country,
};
