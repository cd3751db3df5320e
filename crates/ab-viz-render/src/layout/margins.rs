use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::primitives::TextStyle;

/// Rectangular plot area within the canvas.
#[derive(Debug, Clone, Copy)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Width reserved left of the frame for y tick labels and the tick marks.
    pub fn y_tick_band(canvas: &Canvas, y_axis: &Axis, config: &VizConfig) -> f64 {
        let tick_style = TextStyle { size: config.font.tick_size, ..Default::default() };
        let max_tick_w = y_axis
            .tick_labels
            .iter()
            .map(|l| canvas.measure_text(l, &tick_style).width)
            .fold(0.0_f64, f64::max);
        max_tick_w + 4.0 + outward_tick(config)
    }

    /// Compute auto-margins from axis labels, title and config.
    pub fn auto(
        canvas: &Canvas,
        y_axis: &Axis,
        has_x_label: bool,
        has_title: bool,
        config: &VizConfig,
    ) -> Self {
        let mut left = 12.0 + Self::y_tick_band(canvas, y_axis, config);
        if !y_axis.label.is_empty() {
            left += config.font.label_size + 6.0; // rotated label
        }

        let mut bottom = 12.0 + config.font.tick_size + 4.0 + outward_tick(config);
        if has_x_label {
            bottom += config.font.label_size + 6.0;
        }

        let top = if has_title { config.font.title_size * 1.3 + 14.0 } else { 12.0 };
        let right = 15.0;

        let width = canvas.width - left - right;
        let height = canvas.height - top - bottom;

        Self { left, top, width: width.max(50.0), height: height.max(50.0) }
    }
}

fn outward_tick(config: &VizConfig) -> f64 {
    if config.axes.tick_direction == "out" { config.axes.tick_length } else { 0.0 }
}
