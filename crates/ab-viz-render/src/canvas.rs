use std::fmt::{self, Write as FmtWrite};

use crate::RenderError;
use crate::primitives::*;
use crate::text::{TextMetrics, measure_styled};

pub const DEFAULT_FONT_FAMILY: &str = "DejaVu Sans, Inter, Arial, sans-serif";

/// An SVG element stored for deferred rendering.
#[derive(Debug, Clone)]
enum SvgElement {
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        style: Style,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        style: LineStyle,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        style: TextStyle,
        rotate: Option<f64>,
    },
}

/// Immediate-mode SVG canvas. Coordinates in points (1pt = 1/72").
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    font_family: String,
    elements: Vec<SvgElement>,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> crate::Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(RenderError::Layout(format!("invalid canvas size {width} x {height}")));
        }
        Ok(Self { width, height, font_family: DEFAULT_FONT_FAMILY.to_string(), elements: Vec::new() })
    }

    pub fn with_font_family(mut self, family: &str) -> Self {
        if !family.trim().is_empty() {
            self.font_family = family.trim().to_string();
        }
        self
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: &Style) {
        self.elements.push(SvgElement::Rect { x, y, w, h, style: style.clone() });
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: &LineStyle) {
        self.elements.push(SvgElement::Line { x1, y1, x2, y2, style: style.clone() });
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle) {
        self.elements.push(SvgElement::Text {
            x,
            y,
            content: content.to_string(),
            style: style.clone(),
            rotate: None,
        });
    }

    pub fn text_rotated(&mut self, x: f64, y: f64, content: &str, style: &TextStyle, angle: f64) {
        self.elements.push(SvgElement::Text {
            x,
            y,
            content: content.to_string(),
            style: style.clone(),
            rotate: Some(angle),
        });
    }

    pub fn measure_text(&self, content: &str, style: &TextStyle) -> TextMetrics {
        measure_styled(content, style)
    }

    pub fn finish_svg(&self) -> crate::Result<String> {
        let mut out = String::with_capacity(16 * 1024);
        self.write_svg(&mut out)
            .map_err(|e| RenderError::Layout(format!("SVG serialisation failed: {e}")))?;
        Ok(out)
    }

    fn write_svg(&self, out: &mut String) -> fmt::Result {
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        )?;
        writeln!(out, r#"<rect width="{}" height="{}" fill="white" />"#, self.width, self.height)?;
        for elem in &self.elements {
            self.write_element(out, elem)?;
        }
        out.push_str("</svg>\n");
        Ok(())
    }

    fn write_element(&self, out: &mut String, elem: &SvgElement) -> fmt::Result {
        match elem {
            SvgElement::Rect { x, y, w, h, style } => {
                write!(out, r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}""#)?;
                write_style_attrs(out, style)?;
                out.push_str(" />\n");
            }
            SvgElement::Line { x1, y1, x2, y2, style } => {
                write!(out, r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}""#)?;
                write_line_attrs(out, style)?;
                out.push_str(" />\n");
            }
            SvgElement::Text { x, y, content, style, rotate } => {
                write!(out, r#"<text x="{x:.2}" y="{y:.2}""#)?;
                write!(out, r#" font-family="{}" font-size="{:.1}""#, self.font_family, style.size)?;
                write!(out, r#" fill="{}""#, style.color.to_svg_fill())?;
                write!(out, r#" text-anchor="{}""#, style.anchor.as_str())?;
                write!(out, r#" dominant-baseline="{}""#, style.baseline.as_str())?;
                if style.weight == FontWeight::Bold {
                    out.push_str(r#" font-weight="bold""#);
                }
                if let Some(angle) = rotate {
                    write!(out, r#" transform="rotate({angle:.1},{x:.2},{y:.2})""#)?;
                }
                out.push('>');
                push_escaped(out, content);
                out.push_str("</text>\n");
            }
        }
        Ok(())
    }
}

fn push_escaped(out: &mut String, content: &str) {
    for ch in content.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn write_style_attrs(out: &mut String, style: &Style) -> fmt::Result {
    match &style.fill {
        Some(fill) => write!(out, r#" fill="{}""#, fill.to_svg_fill())?,
        None => out.push_str(r#" fill="none""#),
    }
    if let Some(stroke) = &style.stroke {
        write!(out, r#" stroke="{}""#, stroke.to_svg_fill())?;
        write!(out, r#" stroke-width="{:.2}""#, style.stroke_width)?;
    }
    if (style.opacity - 1.0).abs() > 1e-4 {
        write!(out, r#" opacity="{:.3}""#, style.opacity)?;
    }
    Ok(())
}

fn write_line_attrs(out: &mut String, style: &LineStyle) -> fmt::Result {
    write!(out, r#" stroke="{}""#, style.color.to_svg_fill())?;
    write!(out, r#" stroke-width="{:.2}""#, style.width)?;
    if let Some(dash) = &style.dash {
        write!(out, r#" stroke-dasharray="{dash}""#)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn empty_canvas() {
        let svg = Canvas::new(100.0, 50.0).unwrap().finish_svg().unwrap();
        assert!(svg.contains("width=\"100\""));
        assert!(svg.contains("height=\"50\""));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn invalid_size() {
        assert!(Canvas::new(0.0, 50.0).is_err());
        assert!(Canvas::new(f64::NAN, 50.0).is_err());
    }

    #[test]
    fn rect_and_dashed_line() {
        let mut c = Canvas::new(200.0, 100.0).unwrap();
        c.rect(10.0, 20.0, 50.0, 30.0, &Style::filled(Color::hex("#66c2a5")));
        c.line(0.0, 5.0, 200.0, 5.0, &LineStyle::dashed(Color::rgb(0, 0, 0), 0.5, "3 3"));
        let svg = c.finish_svg().unwrap();
        assert!(svg.contains(r##"fill="#66c2a5""##));
        assert!(svg.contains("width=\"50.00\""));
        assert!(svg.contains(r#"stroke-dasharray="3 3""#));
    }

    #[test]
    fn text_is_escaped() {
        let mut c = Canvas::new(200.0, 100.0).unwrap().with_font_family("Inter, sans-serif");
        c.text(10.0, 20.0, "A & B <test>", &TextStyle::default());
        let svg = c.finish_svg().unwrap();
        assert!(svg.contains("A &amp; B &lt;test&gt;"));
        assert!(svg.contains("font-family=\"Inter, sans-serif\""));
    }
}
