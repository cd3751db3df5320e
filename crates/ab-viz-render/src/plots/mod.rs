pub mod bars;

mod axes_draw;
