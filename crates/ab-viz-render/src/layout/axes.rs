/// Value axis with tick generation and data→pixel mapping.
#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub label: String,
    pub percent: bool,
    pub tick_positions: Vec<f64>,
    pub tick_labels: Vec<String>,
}

impl Axis {
    /// Linear axis over exactly `[min, max]` with "nice number" ticks inside it.
    pub fn bounded(min: f64, max: f64, target_ticks: usize, percent: bool) -> Self {
        let mut ticks = Vec::new();
        let mut labels = Vec::new();
        if max > min {
            let step = nice_step((max - min) / (target_ticks.max(2) - 1) as f64);
            let first = (min / step - 1e-9).ceil();
            let mut i = 0.0;
            loop {
                let v = (first + i) * step;
                if v > max + step * 1e-9 {
                    break;
                }
                ticks.push(v);
                labels.push(format_tick(v, step, percent));
                i += 1.0;
            }
        }
        Self { min, max, label: String::new(), percent, tick_positions: ticks, tick_labels: labels }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Map a data value to pixel coordinate.
    pub fn data_to_pixel(&self, value: f64, px_min: f64, px_max: f64) -> f64 {
        let frac = (value - self.min) / (self.max - self.min);
        px_min + frac * (px_max - px_min)
    }
}

fn nice_step(rough: f64) -> f64 {
    let exp = rough.abs().log10().floor();
    let frac = rough / 10.0_f64.powf(exp);
    let nice_frac = if frac <= 1.5 {
        1.0
    } else if frac <= 3.5 {
        2.0
    } else if frac <= 7.5 {
        5.0
    } else {
        10.0
    };
    nice_frac * 10.0_f64.powf(exp)
}

fn format_tick(value: f64, step: f64, percent: bool) -> String {
    let (value, step, suffix) = if percent { (value * 100.0, step * 100.0, "%") } else { (value, step, "") };
    let decimals = if step >= 1.0 - 1e-9 { 0 } else { (-(step.log10().floor())) as usize };
    // Avoid "-0"
    let value = if value.abs() < step * 1e-6 { 0.0 } else { value };
    format!("{value:.decimals$}{suffix}")
}
