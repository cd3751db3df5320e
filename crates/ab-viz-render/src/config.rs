use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

use crate::RenderError;
use crate::color::Color;
use crate::theme::BuiltinTheme;

/// Top-level visualization configuration (YAML or programmatic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub theme: String,
    pub figure: FigureConfig,
    pub font: FontConfig,
    pub axes: AxesConfig,
    pub grid: GridConfig,
    pub palette: String,
    pub bars: BarsConfig,
    pub legend: LegendConfig,
    pub output: OutputConfig,
}

impl Default for VizConfig {
    fn default() -> Self {
        BuiltinTheme::Abstat.base_config()
    }
}

impl VizConfig {
    pub fn palette_colors(&self) -> Vec<Color> {
        crate::color::palette_colors(&self.palette)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: 518.4,  // 7.2" * 72
            height: 345.6, // 4.8" * 72
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub family: String,
    pub size: f64,
    pub title_size: f64,
    pub label_size: f64,
    pub tick_size: f64,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: crate::canvas::DEFAULT_FONT_FAMILY.into(),
            size: 10.0,
            title_size: 12.0,
            label_size: 11.0,
            tick_size: 9.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    /// `in` or `out`.
    pub tick_direction: String,
    pub tick_length: f64,
    /// Draw the top and right spines too.
    pub frame: bool,
    /// Approximate number of y ticks.
    pub y_ticks: usize,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self { tick_direction: "out".into(), tick_length: 4.0, frame: false, y_ticks: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub show: bool,
    pub color: Color,
    pub alpha: f64,
    /// SVG dash pattern; empty for solid lines.
    pub dash: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { show: true, color: Color::hex("#b0b0b0"), alpha: 0.8, dash: "3 3".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarsConfig {
    /// Share of each category slot covered by its bars.
    pub width_fraction: f64,
    pub show_values: bool,
    pub value_decimals: usize,
    pub edge_color: Color,
}

impl Default for BarsConfig {
    fn default() -> Self {
        Self {
            width_fraction: 0.8,
            show_values: true,
            value_decimals: 1,
            edge_color: Color::rgb(255, 255, 255),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    pub show: bool,
    pub frame: bool,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self { show: true, frame: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
    pub dpi: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: "svg".into(), dpi: 220 }
    }
}

fn config_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Config(e.to_string())
}

/// Overlay `user` onto `base`, recursing into mappings. `null` keeps the base value.
fn merge(base: &mut Value, user: Value) {
    match (base, user) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(user)) => {
            for (key, value) in user {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Resolve a VizConfig from an optional theme name and optional YAML overrides.
///
/// The theme is `theme`, else the `theme:` key of the YAML, else `abstat`.
/// Keys present in the YAML override the theme's values.
pub fn resolve_config(theme: Option<&str>, user_yaml: Option<&str>) -> crate::Result<VizConfig> {
    let user: Value = match user_yaml {
        Some(yaml) => serde_yaml_ng::from_str(yaml).map_err(config_err)?,
        None => Value::Null,
    };
    if !matches!(user, Value::Null | Value::Mapping(_)) {
        return Err(RenderError::Config("viz config must be a mapping".into()));
    }

    let theme_name = theme.or_else(|| user.get("theme").and_then(Value::as_str));
    let theme = match theme_name {
        Some(name) => BuiltinTheme::parse(name)
            .ok_or_else(|| RenderError::Config(format!("unknown theme '{name}'")))?,
        None => BuiltinTheme::Abstat,
    };

    let mut merged = serde_yaml_ng::to_value(theme.base_config()).map_err(config_err)?;
    merge(&mut merged, user);
    let mut config: VizConfig = serde_yaml_ng::from_value(merged).map_err(config_err)?;
    config.theme = theme.name().to_string();
    validate(&config)?;
    Ok(config)
}

fn validate(config: &VizConfig) -> crate::Result<()> {
    if !(config.figure.width > 0.0 && config.figure.height > 0.0) {
        return Err(RenderError::Config("figure width and height must be positive".into()));
    }
    if !(config.bars.width_fraction > 0.0 && config.bars.width_fraction <= 1.0) {
        return Err(RenderError::Config("bars.width_fraction must be in (0, 1]".into()));
    }
    if !matches!(config.axes.tick_direction.as_str(), "in" | "out") {
        return Err(RenderError::Config(format!(
            "axes.tick_direction must be 'in' or 'out', got '{}'",
            config.axes.tick_direction
        )));
    }
    if config.output.dpi == 0 {
        return Err(RenderError::Config("output.dpi must be positive".into()));
    }
    Ok(())
}
