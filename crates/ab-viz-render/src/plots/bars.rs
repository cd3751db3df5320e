use ab_viz::BarChartArtifact;

use crate::RenderError;
use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::header::draw_title;
use crate::layout::axes::Axis;
use crate::layout::legend::{LegendEntry, draw_legend};
use crate::layout::margins::PlotArea;
use crate::plots::axes_draw::{draw_category_axis, draw_grid, draw_value_axis};
use crate::primitives::*;

/// Bar value label: `12.0%` for percent charts, `0.120` otherwise.
pub fn format_value(value: f64, percent: bool, decimals: usize) -> String {
    if percent {
        format!("{:.decimals$}%", value * 100.0)
    } else {
        format!("{value:.decimals$}")
    }
}

fn check(artifact: &BarChartArtifact) -> crate::Result<()> {
    if artifact.categories.is_empty() || artifact.series.is_empty() {
        return Err(RenderError::Layout("bar chart has no categories or no series".into()));
    }
    if let Some(s) = artifact.series.iter().find(|s| s.values.len() != artifact.categories.len()) {
        return Err(RenderError::Layout(format!(
            "series '{}' has {} values for {} categories",
            s.name,
            s.values.len(),
            artifact.categories.len()
        )));
    }
    if !(artifact.y_min.is_finite() && artifact.y_max.is_finite() && artifact.y_max > artifact.y_min) {
        return Err(RenderError::Layout(format!(
            "invalid y range [{}, {}]",
            artifact.y_min, artifact.y_max
        )));
    }
    Ok(())
}

/// Grouped vertical bars: one slot per category, one bar per series.
///
/// A single series is coloured per category; several series get one palette
/// colour each and a legend.
pub fn render(artifact: &BarChartArtifact, config: &VizConfig) -> crate::Result<String> {
    check(artifact)?;

    let mut canvas = Canvas::new(config.figure.width, config.figure.height)?
        .with_font_family(&config.font.family);
    let y_axis = Axis::bounded(artifact.y_min, artifact.y_max, config.axes.y_ticks, artifact.percent)
        .with_label(artifact.y_label.as_str());
    let area = PlotArea::auto(
        &canvas,
        &y_axis,
        !artifact.x_label.is_empty(),
        !artifact.title.is_empty(),
        config,
    );

    draw_title(&mut canvas, &area, &artifact.title, config);
    draw_grid(&mut canvas, &area, &y_axis, config);

    let palette = config.palette_colors();
    let multi = artifact.series.len() > 1;
    let slot = area.width / artifact.categories.len() as f64;
    let group_w = slot * config.bars.width_fraction;
    let bar_w = group_w / artifact.series.len() as f64;

    let value_style = TextStyle {
        size: config.font.tick_size * 0.9,
        anchor: TextAnchor::Middle,
        baseline: TextBaseline::Alphabetic,
        ..Default::default()
    };

    let mut centers = Vec::with_capacity(artifact.categories.len());
    for (ci, category) in artifact.categories.iter().enumerate() {
        let cx = area.left + (ci as f64 + 0.5) * slot;
        centers.push((cx, category.as_str()));

        for (si, series) in artifact.series.iter().enumerate() {
            let Some(value) = series.values[ci] else { continue };
            let hue = if multi { si } else { ci };
            let color = palette[hue % palette.len()];
            let shown = value.clamp(artifact.y_min, artifact.y_max);
            let x = cx - group_w / 2.0 + si as f64 * bar_w;
            let top = y_axis.data_to_pixel(shown, area.bottom(), area.top);
            let base = y_axis.data_to_pixel(artifact.y_min, area.bottom(), area.top);
            let style = Style {
                fill: Some(color),
                stroke: Some(config.bars.edge_color),
                stroke_width: 0.6,
                opacity: 1.0,
            };
            canvas.rect(x, top, bar_w, base - top, &style);

            if config.bars.show_values {
                let label = format_value(value, artifact.percent, config.bars.value_decimals);
                canvas.text(x + bar_w / 2.0, top - 3.0, &label, &value_style);
            }
        }
    }

    draw_value_axis(&mut canvas, &area, &y_axis, config);
    draw_category_axis(&mut canvas, &area, &centers, &artifact.x_label, config);

    if multi && config.legend.show {
        let entries: Vec<LegendEntry> = artifact
            .series
            .iter()
            .enumerate()
            .map(|(si, s)| LegendEntry { label: s.name.clone(), color: palette[si % palette.len()] })
            .collect();
        draw_legend(
            &mut canvas,
            &area,
            artifact.legend_title.as_deref(),
            &entries,
            config.font.size,
            config.legend.frame,
        );
    }

    canvas.finish_svg()
}
