//! Gradient legend for a color scale.
//!
//! A legend is a horizontal bar filled with gradient stops sampled from the
//! scale's interpolator, plus a numeric axis below it whose domain is the
//! scale's domain and whose pixel range is the bar's drawable width.

use serde::Serialize;
use std::fmt::Write;

use crate::colormaps::{ColorScale, GradientStop, LEGEND_STOPS};
use crate::error::{HexlayerError, Result};
use crate::logging::generate_request_id;

/// Horizontal pixels per axis tick
pub const PIXELS_PER_TICK: f64 = 60.0;

/// Length of the tick marks
pub const TICK_SIZE: f64 = 10.0;

/// Largest accepted legend width or height
pub const MAX_LEGEND_DIMENSION: u32 = 4096;

/// Size and margins of a legend, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegendLayout {
    pub width: u32,
    pub height: u32,
    pub margin_top: u32,
    pub margin_right: u32,
    pub margin_bottom: u32,
    pub margin_left: u32,
}

impl Default for LegendLayout {
    fn default() -> Self {
        Self {
            width: 200,
            height: 50,
            margin_top: 10,
            margin_right: 10,
            margin_bottom: 20,
            margin_left: 10,
        }
    }
}

impl LegendLayout {
    /// Layout of the given size with default margins
    pub fn sized(width: u32, height: u32) -> Result<Self> {
        let layout = Self {
            width,
            height,
            ..Self::default()
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value > MAX_LEGEND_DIMENSION {
                return Err(HexlayerError::invalid_param(
                    name,
                    format!("Must be at most {}, got {}", MAX_LEGEND_DIMENSION, value),
                ));
            }
        }
        if self.width <= self.margin_left + self.margin_right {
            return Err(HexlayerError::invalid_param(
                "width",
                format!(
                    "Legend width must exceed its horizontal margins ({})",
                    self.margin_left + self.margin_right
                ),
            ));
        }
        if self.height <= self.margin_top + self.margin_bottom {
            return Err(HexlayerError::invalid_param(
                "height",
                format!(
                    "Legend height must exceed its vertical margins ({})",
                    self.margin_top + self.margin_bottom
                ),
            ));
        }
        Ok(())
    }

    /// Axis pixel range: left and right edge of the bar
    pub fn range(&self) -> [f64; 2] {
        [
            self.margin_left as f64,
            (self.width - self.margin_right) as f64,
        ]
    }
}

/// The gradient rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One labelled axis tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: f64,
    pub label: String,
    /// Horizontal pixel position
    pub x: f64,
}

/// A legend computed from one color scale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub domain: [f64; 2],
    pub colormap: String,
    pub layout: LegendLayout,
    pub bar: Bar,
    pub stops: Vec<GradientStop>,
    pub ticks: Vec<Tick>,
}

impl Legend {
    pub fn build(scale: &ColorScale, layout: LegendLayout) -> Self {
        let domain = scale.domain();
        let [r0, r1] = layout.range();

        let bar = Bar {
            x: r0,
            y: layout.margin_top as f64,
            width: r1 - r0,
            height: (layout.height - layout.margin_top - layout.margin_bottom) as f64,
        };

        let count = layout.width as f64 / PIXELS_PER_TICK;
        let (values, step) = ticks(domain[0], domain[1], count);
        let ticks = values
            .into_iter()
            .map(|value| Tick {
                value,
                label: format_tick(value, step),
                x: scale_linear(value, domain, [r0, r1]),
            })
            .collect();

        Self {
            domain,
            colormap: scale.colormap_name().to_string(),
            layout,
            bar,
            stops: scale.sample_gradient(LEGEND_STOPS),
            ticks,
        }
    }

    /// Standalone SVG document
    pub fn to_svg(&self) -> String {
        // Each document gets its own gradient id so several legends can share a page
        let gradient_id = format!("legend-gradient-{}", &generate_request_id()[..8]);
        let axis_y = (self.layout.height - self.layout.margin_bottom) as f64;

        let mut svg = String::new();
        // Writing to a String cannot fail
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" style="overflow: visible">"#,
            self.layout.width, self.layout.height
        );
        let _ = write!(svg, r#"<defs><linearGradient id="{}">"#, gradient_id);
        for stop in &self.stops {
            let _ = write!(
                svg,
                r#"<stop offset="{}" stop-color="{}"/>"#,
                stop.offset, stop.color
            );
        }
        svg.push_str("</linearGradient></defs>");

        let _ = write!(
            svg,
            r##"<rect x="{}" y="{}" width="{}" height="{}" fill="url(#{})" stroke="#ccc" stroke-width="1"/>"##,
            self.bar.x, self.bar.y, self.bar.width, self.bar.height, gradient_id
        );

        let _ = write!(
            svg,
            r#"<g transform="translate(0, {})" font-size="12" text-anchor="middle">"#,
            axis_y
        );
        for tick in &self.ticks {
            let _ = write!(
                svg,
                r##"<g class="tick" transform="translate({}, 0)"><line y2="{}" stroke="currentColor"/><text y="{}" dy="0.71em" fill="#333">{}</text></g>"##,
                tick.x,
                TICK_SIZE,
                TICK_SIZE + 3.0,
                tick.label
            );
        }
        svg.push_str("</g></svg>");
        svg
    }
}

/// Map `value` from `domain` onto `range` linearly
pub fn scale_linear(value: f64, domain: [f64; 2], range: [f64; 2]) -> f64 {
    let [d0, d1] = domain;
    let [r0, r1] = range;
    if d0 == d1 {
        return (r0 + r1) / 2.0;
    }
    r0 + (value - d0) / (d1 - d0) * (r1 - r0)
}

/// Human-friendly tick values spanning `[start, stop]`, roughly `count` of them,
/// at steps of 1, 2 or 5 times a power of ten. Returns the values and the step.
pub fn ticks(start: f64, stop: f64, count: f64) -> (Vec<f64>, f64) {
    if count.is_nan() || count <= 0.0 || !start.is_finite() || !stop.is_finite() {
        return (Vec::new(), 0.0);
    }
    if start == stop {
        return (vec![start], 0.0);
    }

    let reverse = stop < start;
    let (lo, hi) = if reverse { (stop, start) } else { (start, stop) };

    let Some((i1, i2, inc)) = tick_spec(lo, hi, count) else {
        return (Vec::new(), 0.0);
    };
    if i2 < i1 {
        return (Vec::new(), 0.0);
    }

    let n = (i2 - i1 + 1.0) as usize;
    let mut values: Vec<f64> = (0..n)
        .map(|i| {
            let k = i1 + i as f64;
            if inc < 0.0 {
                k / -inc
            } else {
                k * inc
            }
        })
        .collect();
    if reverse {
        values.reverse();
    }

    let step = if inc < 0.0 { 1.0 / -inc } else { inc };
    (values, step)
}

/// Integer tick bounds and increment; a negative increment means "divide by"
fn tick_spec(start: f64, stop: f64, count: f64) -> Option<(f64, f64, f64)> {
    const E10: f64 = 7.0710678118654755; // sqrt(50)
    const E5: f64 = 3.1622776601683795; // sqrt(10)
    const E2: f64 = std::f64::consts::SQRT_2;

    let step = (stop - start) / count.max(0.0);
    if !step.is_finite() || step <= 0.0 {
        return None;
    }
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let scale = 10f64.powf(-power) / factor;
        i1 = (start * scale).round();
        i2 = (stop * scale).round();
        if i1 / scale < start {
            i1 += 1.0;
        }
        if i2 / scale > stop {
            i2 -= 1.0;
        }
        inc = -scale;
    } else {
        let step = 10f64.powf(power) * factor;
        i1 = (start / step).round();
        i2 = (stop / step).round();
        if i1 * step < start {
            i1 += 1.0;
        }
        if i2 * step > stop {
            i2 -= 1.0;
        }
        inc = step;
    }

    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    Some((i1, i2, inc))
}

/// Label a tick with as many decimals as the step needs
fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step > 0.0 && step < 1.0 {
        (-step.log10().floor()).max(0.0) as usize
    } else {
        0
    };
    // Adding zero turns -0.0 into 0.0
    format!("{:.*}", decimals, value + 0.0)
}
