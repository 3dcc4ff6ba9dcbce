//! Geographic utility functions: bounding boxes and longitude handling.

use serde::Serialize;
use std::str::FromStr;

use crate::error::{HexlayerError, Result};

/// A longitude/latitude bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bbox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bbox {
    pub const WORLD: Bbox = Bbox {
        min_lon: -180.0,
        min_lat: -90.0,
        max_lon: 180.0,
        max_lat: 90.0,
    };

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Equirectangular projection of a point to fractional pixel coordinates
    pub fn project(&self, lon: f64, lat: f64, width: u32, height: u32) -> (f64, f64) {
        let x = (lon - self.min_lon) / self.width() * width as f64;
        let y = (self.max_lat - lat) / self.height() * height as f64;
        (x, y)
    }
}

impl FromStr for Bbox {
    type Err = HexlayerError;

    /// Parse `"min_lon,min_lat,max_lon,max_lat"`
    fn from_str(bbox: &str) -> Result<Self> {
        let parts: Vec<&str> = bbox.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(HexlayerError::invalid_param(
                "bbox",
                "Bounding box must be in format 'min_lon,min_lat,max_lon,max_lat'",
            ));
        }

        let parse = |name: &str, raw: &str| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| HexlayerError::invalid_param("bbox", format!("Invalid {}: {}", name, raw)))
        };

        let min_lon = parse("min_lon", parts[0])?;
        let min_lat = parse("min_lat", parts[1])?;
        let max_lon = parse("max_lon", parts[2])?;
        let max_lat = parse("max_lat", parts[3])?;

        if min_lat >= max_lat {
            return Err(HexlayerError::invalid_param(
                "bbox",
                format!("min_lat ({}) must be < max_lat ({})", min_lat, max_lat),
            ));
        }

        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(HexlayerError::invalid_param(
                "bbox",
                "Latitude must be in the range -90 to 90",
            ));
        }

        if min_lon >= max_lon {
            return Err(HexlayerError::invalid_param(
                "bbox",
                "Bounding box crosses the dateline; use longitudes beyond 180 instead",
            ));
        }

        Ok(Bbox {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }
}

/// Make a ring that straddles the antimeridian contiguous by shifting its
/// western vertices east by 360 degrees. Returns whether a shift happened.
pub fn unwrap_ring(ring: &mut [[f64; 2]]) -> bool {
    let (min_lon, max_lon) = ring.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        (lo.min(p[0]), hi.max(p[0]))
    });
    if max_lon - min_lon <= 180.0 {
        return false;
    }
    for point in ring.iter_mut() {
        if point[0] < 0.0 {
            point[0] += 360.0;
        }
    }
    true
}
