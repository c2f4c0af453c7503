//! SVG polyline generation for the dashboard charts.

use crate::utils::round_half_away;

pub const DEFAULT_PADDING: f64 = 10.0;

/// Chart viewport in SVG user units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartBox {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl ChartBox {
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            padding: DEFAULT_PADDING,
        }
    }

    pub fn path(&self, values: &[f64]) -> String {
        line_path(values, self.width, self.height, self.padding)
    }
}

/// Min-max scale `values` into the box and emit `M x y L x y ...`.
///
/// Larger values plot higher. A flat series has its range taken as 1, so
/// every point lands on `height - padding`. Fewer than two values give an
/// empty path.
pub fn line_path(values: &[f64], width: f64, height: f64, padding: f64) -> String {
    if values.len() < 2 {
        return String::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max - min == 0.0 { 1.0 } else { max - min };

    let plot_width = width - padding * 2.0;
    let plot_height = height - padding * 2.0;
    let step = plot_width / (values.len() - 1) as f64;

    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let x = round_half_away(padding + i as f64 * step, 2);
            let y = round_half_away(height - padding - ((value - min) / range) * plot_height, 2);
            let cmd = if i == 0 { "M" } else { "L" };
            format!("{cmd} {x:.2} {y:.2}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}
