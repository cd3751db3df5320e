//! Bar chart artifacts of conversion rates.
//!
//! One artifact per chart: categories along x, one series per hue level.
//! Heights are point estimates in `[0, 1]`; there are no error bars.

use ab_core::Arm;
use ab_inference::ConversionSummary;
use serde::{Deserialize, Serialize};

/// Schema tag written into every artifact.
pub const SCHEMA_VERSION: &str = "abstat_bar_chart_v0";

/// Default upper end of the y-axis.
pub const DEFAULT_Y_MAX: f64 = 0.15;

const Y_STEP: f64 = 0.05;

/// One hue level: a value per category (`None` where the cell is empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    /// Legend label.
    pub name: String,
    /// Values aligned with [`BarChartArtifact::categories`].
    pub values: Vec<Option<f64>>,
}

/// Grouped bar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChartArtifact {
    /// Always [`SCHEMA_VERSION`].
    pub schema_version: String,
    /// Chart title.
    pub title: String,
    /// Category axis label.
    pub x_label: String,
    /// Value axis label.
    pub y_label: String,
    /// Lower end of the value axis.
    pub y_min: f64,
    /// Upper end of the value axis.
    pub y_max: f64,
    /// Render values and ticks as percentages.
    pub percent: bool,
    /// Legend heading; no legend when `None`.
    pub legend_title: Option<String>,
    /// Category labels along x.
    pub categories: Vec<String>,
    /// One entry per hue level.
    pub series: Vec<BarSeries>,
}

impl BarChartArtifact {
    /// Largest plotted value.
    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten())
            .copied()
            .fold(0.0, f64::max)
    }
}

/// `DEFAULT_Y_MAX`, or the next multiple of 0.05 above the data with 10 % headroom.
fn y_upper(max_value: f64) -> f64 {
    if max_value <= DEFAULT_Y_MAX {
        return DEFAULT_Y_MAX;
    }
    ((max_value * 1.1) / Y_STEP).ceil() * Y_STEP
}

fn chart(
    title: &str,
    x_label: &str,
    legend_title: Option<&str>,
    categories: Vec<String>,
    series: Vec<BarSeries>,
) -> BarChartArtifact {
    let mut art = BarChartArtifact {
        schema_version: SCHEMA_VERSION.to_string(),
        title: title.to_string(),
        x_label: x_label.to_string(),
        y_label: "Conversion rate".to_string(),
        y_min: 0.0,
        y_max: DEFAULT_Y_MAX,
        percent: true,
        legend_title: legend_title.map(str::to_string),
        categories,
        series,
    };
    art.y_max = y_upper(art.max_value());
    art
}

/// Conversion rate of each arm.
pub fn conversion_by_arm(summary: &ConversionSummary) -> BarChartArtifact {
    let categories = summary.by_arm.iter().map(|a| a.arm.to_string()).collect();
    let values = summary.by_arm.iter().map(|a| Some(a.summary.rate)).collect();
    chart(
        "Conversion rate by group",
        "Group",
        None,
        categories,
        vec![BarSeries { name: "conversion".into(), values }],
    )
}

/// Conversion rate of each country.
pub fn conversion_by_country(summary: &ConversionSummary) -> BarChartArtifact {
    let categories = summary.by_country.iter().map(|c| c.country.clone()).collect();
    let values = summary.by_country.iter().map(|c| Some(c.summary.rate)).collect();
    chart(
        "Conversion rate by country",
        "Country",
        None,
        categories,
        vec![BarSeries { name: "conversion".into(), values }],
    )
}

/// Conversion rate by country with one series per arm.
pub fn conversion_by_arm_country(summary: &ConversionSummary) -> BarChartArtifact {
    let countries: Vec<String> = summary.countries().into_iter().map(str::to_string).collect();
    let series = Arm::ALL
        .iter()
        .filter(|&&arm| summary.arm(arm).is_some())
        .map(|&arm| BarSeries {
            name: arm.to_string(),
            values: countries.iter().map(|c| summary.cell(arm, c).map(|s| s.rate)).collect(),
        })
        .collect();
    chart(
        "Conversion rate by country and group",
        "Country",
        Some("Group"),
        countries,
        series,
    )
}
