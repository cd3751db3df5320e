use crate::color::Color;
use crate::config::*;

/// Built-in theme presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTheme {
    /// seaborn-like: Set2 palette, dashed horizontal grid, open frame.
    Abstat,
    /// No grid, boxed frame, inward ticks.
    Minimal,
}

impl BuiltinTheme {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "abstat" | "default" => Some(Self::Abstat),
            "minimal" => Some(Self::Minimal),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Abstat => "abstat",
            Self::Minimal => "minimal",
        }
    }

    pub fn base_config(self) -> VizConfig {
        match self {
            Self::Abstat => abstat(),
            Self::Minimal => minimal(),
        }
    }
}

fn abstat() -> VizConfig {
    VizConfig {
        theme: "abstat".into(),
        figure: FigureConfig::default(),
        font: FontConfig::default(),
        axes: AxesConfig::default(),
        grid: GridConfig::default(),
        palette: "set2".into(),
        bars: BarsConfig::default(),
        legend: LegendConfig::default(),
        output: OutputConfig::default(),
    }
}

fn minimal() -> VizConfig {
    VizConfig {
        theme: "minimal".into(),
        figure: FigureConfig { width: 432.0, height: 302.4 },
        font: FontConfig { size: 9.0, title_size: 11.0, label_size: 10.0, tick_size: 8.0, ..FontConfig::default() },
        axes: AxesConfig { tick_direction: "in".into(), tick_length: 3.0, frame: true, y_ticks: 4 },
        grid: GridConfig { show: false, ..GridConfig::default() },
        palette: "tableau10".into(),
        bars: BarsConfig { edge_color: Color::rgb(60, 60, 60), ..BarsConfig::default() },
        legend: LegendConfig { show: true, frame: false },
        ..abstat()
    }
}
