//! Text metrics without font files.
//!
//! Widths come from per-character advance estimates for a humanist sans
//! (DejaVu Sans / Inter proportions). They are only used for margins and
//! legend boxes, so a few percent of error is harmless.

use crate::primitives::{FontWeight, TextStyle};

const ASCENT_EM: f64 = 0.93;
const DESCENT_EM: f64 = 0.24;
const BOLD_WIDTH_FACTOR: f64 = 1.07;

#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub ascent: f64,
}

/// Advance of `ch` in em.
fn advance_em(ch: char) -> f64 {
    match ch {
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' | 'I' => 0.28,
        'f' | 't' | 'r' | ' ' | '(' | ')' | '-' | '/' => 0.36,
        'm' | 'w' | 'M' | 'W' | '%' => 0.86,
        '0'..='9' => 0.56,
        'A'..='Z' => 0.66,
        _ => 0.54,
    }
}

/// Estimated metrics of `text` at `size_pt`.
pub fn measure_text(text: &str, size_pt: f64, weight: FontWeight) -> TextMetrics {
    let mut width: f64 = text.chars().map(advance_em).sum::<f64>() * size_pt;
    if weight == FontWeight::Bold {
        width *= BOLD_WIDTH_FACTOR;
    }
    TextMetrics {
        width,
        height: (ASCENT_EM + DESCENT_EM) * size_pt,
        ascent: ASCENT_EM * size_pt,
    }
}

pub fn measure_styled(text: &str, style: &TextStyle) -> TextMetrics {
    measure_text(text, style.size, style.weight)
}
