use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

/// Draw the chart title centred above the plot area.
pub fn draw_title(canvas: &mut Canvas, area: &PlotArea, title: &str, config: &VizConfig) {
    if title.is_empty() {
        return;
    }
    let style = TextStyle {
        size: config.font.title_size,
        weight: FontWeight::Bold,
        anchor: TextAnchor::Middle,
        baseline: TextBaseline::Alphabetic,
        ..Default::default()
    };
    canvas.text(area.left + area.width / 2.0, area.top - 10.0, title, &style);
}
