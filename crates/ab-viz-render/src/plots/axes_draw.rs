use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

const FRAME_COLOR: Color = Color::rgb(0, 0, 0);

/// Dashed horizontal grid at the y ticks. Drawn before the data.
pub fn draw_grid(canvas: &mut Canvas, area: &PlotArea, y_axis: &Axis, config: &VizConfig) {
    if !config.grid.show {
        return;
    }
    let style = LineStyle::dashed(config.grid.color.with_alpha(config.grid.alpha), 0.5, &config.grid.dash);
    for &val in &y_axis.tick_positions {
        let py = y_axis.data_to_pixel(val, area.bottom(), area.top);
        canvas.line(area.left, py, area.right(), py, &style);
    }
}

/// Spines, y ticks with labels, and the rotated y label.
pub fn draw_value_axis(canvas: &mut Canvas, area: &PlotArea, y_axis: &Axis, config: &VizConfig) {
    let frame_style = LineStyle::solid(FRAME_COLOR, 0.8);
    let tick_style = LineStyle::solid(FRAME_COLOR, 0.6);
    let inward = config.axes.tick_direction == "in";
    let tl = config.axes.tick_length;

    canvas.line(area.left, area.top, area.left, area.bottom(), &frame_style);
    canvas.line(area.left, area.bottom(), area.right(), area.bottom(), &frame_style);
    if config.axes.frame {
        canvas.line(area.left, area.top, area.right(), area.top, &frame_style);
        canvas.line(area.right(), area.top, area.right(), area.bottom(), &frame_style);
    }

    let label_style = TextStyle {
        size: config.font.tick_size,
        color: FRAME_COLOR,
        anchor: TextAnchor::End,
        baseline: TextBaseline::Central,
        ..Default::default()
    };
    for (i, &val) in y_axis.tick_positions.iter().enumerate() {
        let py = y_axis.data_to_pixel(val, area.bottom(), area.top);
        if inward {
            canvas.line(area.left, py, area.left + tl, py, &tick_style);
        } else {
            canvas.line(area.left, py, area.left - tl, py, &tick_style);
        }
        if let Some(label) = y_axis.tick_labels.get(i) {
            let label_x = if inward { area.left - 4.0 } else { area.left - tl - 4.0 };
            canvas.text(label_x, py, label, &label_style);
        }
    }

    if !y_axis.label.is_empty() {
        let style = TextStyle {
            size: config.font.label_size,
            color: FRAME_COLOR,
            anchor: TextAnchor::Middle,
            baseline: TextBaseline::Central,
            ..Default::default()
        };
        let band = PlotArea::y_tick_band(canvas, y_axis, config);
        let label_x = area.left - band - 4.0 - config.font.label_size / 2.0;
        let label_y = area.top + area.height / 2.0;
        canvas.text_rotated(label_x, label_y, &y_axis.label, &style, -90.0);
    }
}

/// Category ticks and labels at `centers`, plus the x label.
pub fn draw_category_axis(
    canvas: &mut Canvas,
    area: &PlotArea,
    centers: &[(f64, &str)],
    x_label: &str,
    config: &VizConfig,
) {
    let tick_style = LineStyle::solid(FRAME_COLOR, 0.6);
    let inward = config.axes.tick_direction == "in";
    let tl = config.axes.tick_length;

    let label_style = TextStyle {
        size: config.font.tick_size,
        color: FRAME_COLOR,
        anchor: TextAnchor::Middle,
        baseline: TextBaseline::Hanging,
        ..Default::default()
    };
    for &(px, label) in centers {
        if inward {
            canvas.line(px, area.bottom(), px, area.bottom() - tl, &tick_style);
        } else {
            canvas.line(px, area.bottom(), px, area.bottom() + tl, &tick_style);
        }
        let label_y = if inward { area.bottom() + 3.0 } else { area.bottom() + tl + 3.0 };
        canvas.text(px, label_y, label, &label_style);
    }

    if !x_label.is_empty() {
        let style = TextStyle {
            size: config.font.label_size,
            color: FRAME_COLOR,
            anchor: TextAnchor::Middle,
            ..Default::default()
        };
        let outward = if inward { 0.0 } else { tl };
        let label_y = area.bottom() + outward + config.font.tick_size + 16.0;
        canvas.text(area.left + area.width / 2.0, label_y, x_label, &style);
    }
}
