use crate::canvas::Canvas;
use crate::color::Color;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

pub struct LegendEntry {
    pub label: String,
    pub color: Color,
}

/// Draw a swatch legend in the top-right corner of the plot area.
pub fn draw_legend(
    canvas: &mut Canvas,
    area: &PlotArea,
    title: Option<&str>,
    entries: &[LegendEntry],
    font_size: f64,
    frame: bool,
) {
    if entries.is_empty() {
        return;
    }

    let row_height = font_size + 4.0;
    let swatch_w = 14.0;
    let swatch_h = font_size - 2.0;
    let gap = 6.0;
    let padding = 6.0;

    let text_style = TextStyle {
        size: font_size * 0.85,
        baseline: TextBaseline::Central,
        ..Default::default()
    };
    let title_style = TextStyle { weight: FontWeight::Bold, ..text_style.clone() };

    let entries_w = entries
        .iter()
        .map(|e| canvas.measure_text(&e.label, &text_style).width)
        .fold(0.0_f64, f64::max)
        + swatch_w
        + gap;
    let title_w = title.map_or(0.0, |t| canvas.measure_text(t, &title_style).width);
    let title_rows = if title.is_some() { 1.0 } else { 0.0 };

    let legend_w = padding + entries_w.max(title_w) + padding;
    let legend_h = padding + (entries.len() as f64 + title_rows) * row_height + padding;

    let lx = area.right() - legend_w - 5.0;
    let ly = area.top + 5.0;

    let bg_style = Style {
        fill: Some(Color::rgba(255, 255, 255, 0.9)),
        stroke: if frame { Some(Color::rgb(200, 200, 200)) } else { None },
        stroke_width: 0.5,
        opacity: 1.0,
    };
    canvas.rect(lx, ly, legend_w, legend_h, &bg_style);

    if let Some(t) = title {
        let ty = ly + padding + row_height / 2.0;
        canvas.text(lx + padding, ty, t, &title_style);
    }

    for (i, entry) in entries.iter().enumerate() {
        let ey = ly + padding + (i as f64 + title_rows) * row_height + row_height / 2.0;
        let sx = lx + padding;
        canvas.rect(sx, ey - swatch_h / 2.0, swatch_w, swatch_h, &Style::filled(entry.color));
        canvas.text(sx + swatch_w + gap, ey, &entry.label, &text_style);
    }
}
