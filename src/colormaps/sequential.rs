//! Sequential colormaps (single-hue progression).
//!
//! These colormaps are suitable for data that progresses from low to high.
//! Viridis is the default: perceptually uniform and colorblind-friendly.

use super::colormap::ColorRamp;

pub fn viridis() -> ColorRamp {
    ColorRamp::from_gradient("viridis", &colorgrad::viridis())
}

pub fn plasma() -> ColorRamp {
    ColorRamp::from_gradient("plasma", &colorgrad::plasma())
}

pub fn inferno() -> ColorRamp {
    ColorRamp::from_gradient("inferno", &colorgrad::inferno())
}

pub fn magma() -> ColorRamp {
    ColorRamp::from_gradient("magma", &colorgrad::magma())
}

/// Colorblind-friendly alternative to viridis
pub fn cividis() -> ColorRamp {
    ColorRamp::from_gradient("cividis", &colorgrad::cividis())
}

pub fn turbo() -> ColorRamp {
    ColorRamp::from_gradient("turbo", &colorgrad::turbo())
}
