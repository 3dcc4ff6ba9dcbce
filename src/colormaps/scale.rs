//! Continuous color scale over a numeric domain.
//!
//! A [`ColorScale`] is the one object both the cell renderer and the legend
//! read colors from. It maps `[min, max]` linearly onto `[0, 1]` and hands
//! the position to its colormap.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::colormap::{Color, Colormap};

/// Domain used when no layer is selected
pub const DEFAULT_DOMAIN: [f64; 2] = [0.0, 10.0];

/// Number of gradient stops drawn in the legend
pub const LEGEND_STOPS: usize = 11;

/// One stop of a sampled gradient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradientStop {
    /// Position along the bar, `"0%"` to `"100%"`
    pub offset: String,
    /// Position as a fraction
    pub t: f64,
    pub color: Color,
}

#[derive(Clone)]
pub struct ColorScale {
    domain: [f64; 2],
    colormap: Arc<dyn Colormap>,
}

impl ColorScale {
    pub fn new(domain: [f64; 2], colormap: Arc<dyn Colormap>) -> Self {
        Self { domain, colormap }
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub fn colormap_name(&self) -> &str {
        self.colormap.name()
    }

    /// Position of `value` within the domain, clamped to `[0, 1]`.
    /// A degenerate domain maps everything to the middle.
    pub fn normalize(&self, value: f64) -> f64 {
        let [d0, d1] = self.domain;
        if d0 == d1 {
            return 0.5;
        }
        ((value - d0) / (d1 - d0)).clamp(0.0, 1.0)
    }

    /// Color for a data value
    pub fn apply(&self, value: f64) -> Color {
        if !value.is_finite() {
            return Color::TRANSPARENT;
        }
        self.colormap.map_normalized(self.normalize(value))
    }

    /// Color at a position of the underlying interpolator, independent of the domain
    pub fn interpolator(&self, t: f64) -> Color {
        self.colormap.map_normalized(t)
    }

    /// Sample the gradient at `steps` evenly spaced positions from 0 to 1 inclusive
    pub fn sample_gradient(&self, steps: usize) -> Vec<GradientStop> {
        let denominator = steps.saturating_sub(1).max(1) as f64;
        (0..steps)
            .map(|i| {
                let t = i as f64 / denominator;
                GradientStop {
                    offset: format_offset(t),
                    t,
                    color: self.interpolator(t),
                }
            })
            .collect()
    }
}

impl fmt::Debug for ColorScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorScale")
            .field("domain", &self.domain)
            .field("colormap", &self.colormap.name())
            .finish()
    }
}

/// Percentage with at most two decimals: `0%`, `10%`, `16.67%`
fn format_offset(t: f64) -> String {
    let percent = (t * 10000.0).round() / 100.0;
    format!("{}%", percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormaps::get_colormap;
    use pretty_assertions::assert_eq;

    fn viridis_scale(domain: [f64; 2]) -> ColorScale {
        ColorScale::new(domain, get_colormap("viridis").unwrap())
    }

    #[test]
    fn test_endpoints_and_midpoint() {
        for domain in [[0.0, 10.0], [-2.0, 30.0], [1000.0, 1013.25], [5.0, -5.0]] {
            let scale = viridis_scale(domain);
            let [a, b] = domain;
            assert_eq!(scale.apply(a), scale.interpolator(0.0));
            assert_eq!(scale.apply(b), scale.interpolator(1.0));
            assert_eq!(scale.apply((a + b) / 2.0), scale.interpolator(0.5));
        }
    }

    #[test]
    fn test_out_of_domain_values_clamp() {
        let scale = viridis_scale([0.0, 10.0]);
        assert_eq!(scale.apply(-50.0), scale.interpolator(0.0));
        assert_eq!(scale.apply(50.0), scale.interpolator(1.0));
        assert_eq!(scale.apply(f64::NAN), Color::TRANSPARENT);
    }

    #[test]
    fn test_degenerate_domain() {
        let scale = viridis_scale([3.0, 3.0]);
        assert_eq!(scale.apply(3.0), scale.interpolator(0.5));
        assert_eq!(scale.apply(100.0), scale.interpolator(0.5));
    }

    #[test]
    fn test_sample_gradient_eleven_stops() {
        let scale = viridis_scale([0.0, 10.0]);
        let stops = scale.sample_gradient(LEGEND_STOPS);

        let offsets: Vec<&str> = stops.iter().map(|s| s.offset.as_str()).collect();
        assert_eq!(
            offsets,
            vec!["0%", "10%", "20%", "30%", "40%", "50%", "60%", "70%", "80%", "90%", "100%"]
        );

        for (i, stop) in stops.iter().enumerate() {
            assert_eq!(stop.color, scale.apply(i as f64));
        }
    }

    #[test]
    fn test_sample_gradient_small_counts() {
        let scale = viridis_scale([0.0, 1.0]);
        assert!(scale.sample_gradient(0).is_empty());

        let single = scale.sample_gradient(1);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].offset, "0%");

        let seven = scale.sample_gradient(7);
        assert_eq!(seven[1].offset, "16.67%");
        assert_eq!(seven[6].offset, "100%");
    }
}
