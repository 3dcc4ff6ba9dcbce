//! Colormap implementations and the color scale built on them.
//!
//! Named colormaps are sampled from `colorgrad` gradients; [`ColorScale`]
//! maps a layer's numeric domain onto one of them.

pub mod colormap;
pub mod diverging;
pub mod scale;
pub mod sequential;

pub use colormap::{get_colormap, Color, ColorRamp, Colormap, COLORMAP_NAMES};
pub use scale::{ColorScale, GradientStop, DEFAULT_DOMAIN, LEGEND_STOPS};
