//! Diverging colormaps (two-hue progression with center).
//!
//! These colormaps are suitable for data that diverges from a central value.

use super::colormap::ColorRamp;
use crate::error::{HexlayerError, Result};

/// Anchor colors of the coolwarm map: dark blue, neutral gray, dark red
const COOLWARM_ANCHORS: [&str; 3] = ["#3b4cc0", "#dddddd", "#c0282f"];

/// Red to blue through white
pub fn rdbu() -> ColorRamp {
    ColorRamp::from_gradient("rdbu", &colorgrad::rd_bu())
}

pub fn spectral() -> ColorRamp {
    ColorRamp::from_gradient("spectral", &colorgrad::spectral())
}

/// Blue to red through light gray
pub fn coolwarm() -> Result<ColorRamp> {
    let gradient = colorgrad::CustomGradient::new()
        .html_colors(&COOLWARM_ANCHORS)
        .build()
        .map_err(|e| HexlayerError::Config {
            message: format!("Failed to build coolwarm gradient: {}", e),
        })?;
    Ok(ColorRamp::from_gradient("coolwarm", &gradient))
}
