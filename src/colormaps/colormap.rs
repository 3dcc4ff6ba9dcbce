//! Colormap trait and utilities.
//!
//! This module defines the common interface for all colormaps and the ramp
//! type the named presets are built on.

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use crate::error::{HexlayerError, Result};

/// Number of samples taken from a gradient when building a ramp
pub const RAMP_SAMPLES: usize = 256;

/// An 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Fully transparent black, used for values that cannot be mapped
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// The RGB triple used for cell fills
    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// CSS hex notation, `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Trait for color mapping implementations
pub trait Colormap: Send + Sync {
    /// Map a normalized value (0.0 to 1.0) to a color; inputs are clamped
    fn map_normalized(&self, t: f64) -> Color;

    /// Get the name of this colormap
    fn name(&self) -> &str;
}

/// A colormap backed by evenly spaced samples of a continuous gradient
#[derive(Debug, Clone)]
pub struct ColorRamp {
    name: String,
    samples: Vec<[f64; 4]>,
}

impl ColorRamp {
    /// Sample a `colorgrad` gradient over its domain
    pub fn from_gradient(name: &str, gradient: &colorgrad::Gradient) -> Self {
        let (dmin, dmax) = gradient.domain();
        let samples = (0..RAMP_SAMPLES)
            .map(|i| {
                let t = i as f64 / (RAMP_SAMPLES - 1) as f64;
                let c = gradient.at(dmin + t * (dmax - dmin));
                [c.r, c.g, c.b, c.a]
            })
            .collect();
        Self {
            name: name.to_string(),
            samples,
        }
    }
}

impl Colormap for ColorRamp {
    fn map_normalized(&self, t: f64) -> Color {
        if t.is_nan() {
            return Color::TRANSPARENT;
        }
        let position = t.clamp(0.0, 1.0) * (self.samples.len() - 1) as f64;
        let index = position.floor() as usize;
        if index >= self.samples.len() - 1 {
            return to_color(self.samples[self.samples.len() - 1]);
        }

        let frac = position - index as f64;
        to_color(lerp(self.samples[index], self.samples[index + 1], frac))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn lerp(c1: [f64; 4], c2: [f64; 4], t: f64) -> [f64; 4] {
    [
        c1[0] + (c2[0] - c1[0]) * t,
        c1[1] + (c2[1] - c1[1]) * t,
        c1[2] + (c2[2] - c1[2]) * t,
        c1[3] + (c2[3] - c1[3]) * t,
    ]
}

fn to_color(c: [f64; 4]) -> Color {
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color {
        r: channel(c[0]),
        g: channel(c[1]),
        b: channel(c[2]),
        a: channel(c[3]),
    }
}

/// Every name accepted by [`get_colormap`]
pub const COLORMAP_NAMES: &[&str] = &[
    "viridis", "plasma", "inferno", "magma", "cividis", "turbo", "rdbu", "spectral", "coolwarm",
];

/// Get a colormap by name
pub fn get_colormap(name: &str) -> Result<Arc<dyn Colormap>> {
    use super::{diverging, sequential};

    let ramp = match name.to_lowercase().as_str() {
        "viridis" => sequential::viridis(),
        "plasma" => sequential::plasma(),
        "inferno" => sequential::inferno(),
        "magma" => sequential::magma(),
        "cividis" => sequential::cividis(),
        "turbo" => sequential::turbo(),
        "rdbu" => diverging::rdbu(),
        "spectral" => diverging::spectral(),
        "coolwarm" => diverging::coolwarm()?,
        _ => {
            return Err(HexlayerError::InvalidParameter {
                param: "colormap".to_string(),
                message: format!("Unknown colormap: {}", name),
            })
        }
    };
    Ok(Arc::new(ramp))
}
