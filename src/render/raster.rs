//! PNG/JPEG rasterization of a cell layer.
//!
//! Cells are projected equirectangularly into the requested bounding box
//! and filled with a scanline polygon fill sampled at pixel centers.
//! Pixels not covered by any cell stay transparent.

use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use std::io::Cursor;
use std::str::FromStr;

use super::cells::CellLayer;
use super::geo::Bbox;
use crate::error::{HexlayerError, Result};

/// Output encodings for rendered images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = HexlayerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            _ => Err(HexlayerError::invalid_param(
                "format",
                "Format must be 'png' or 'jpeg'",
            )),
        }
    }
}

/// Draw every cell of the layer into a `width` x `height` image covering `bbox`
pub fn rasterize(layer: &CellLayer, bbox: &Bbox, width: u32, height: u32) -> RgbaImage {
    let mut img: RgbaImage = ImageBuffer::new(width, height);

    for cell in &layer.cells {
        let color = Rgba([cell.fill[0], cell.fill[1], cell.fill[2], 255]);
        fill_ring(&mut img, &cell.boundary, bbox, color, 0.0);

        // Unwrapped antimeridian cells also show up on the western edge
        if cell.boundary.iter().any(|p| p[0] > 180.0) {
            fill_ring(&mut img, &cell.boundary, bbox, color, -360.0);
        }
    }

    img
}

fn fill_ring(img: &mut RgbaImage, ring: &[[f64; 2]], bbox: &Bbox, color: Rgba<u8>, lon_shift: f64) {
    if ring.len() < 3 {
        return;
    }
    let (width, height) = img.dimensions();
    let points: Vec<(f64, f64)> = ring
        .iter()
        .map(|p| bbox.project(p[0] + lon_shift, p[1], width, height))
        .collect();

    let min_y = points.iter().map(|p| p.1).fold(f64::MAX, f64::min);
    let max_y = points.iter().map(|p| p.1).fold(f64::MIN, f64::max);
    if max_y < 0.0 || min_y >= height as f64 {
        return;
    }

    let row_start = min_y.floor().max(0.0) as u32;
    let row_end = (max_y.ceil().max(0.0) as u32).min(height);

    let mut crossings = Vec::with_capacity(points.len());
    for row in row_start..row_end {
        let sample_y = row as f64 + 0.5;
        crossings.clear();

        for i in 0..points.len() {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % points.len()];
            if (y1 <= sample_y && y2 > sample_y) || (y2 <= sample_y && y1 > sample_y) {
                crossings.push(x1 + (sample_y - y1) * (x2 - x1) / (y2 - y1));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for pair in crossings.chunks_exact(2) {
            // Pixel columns whose centers fall inside [pair[0], pair[1])
            let start = (pair[0] - 0.5).ceil().max(0.0);
            let end = (pair[1] - 0.5).ceil().min(width as f64);
            if start >= end {
                continue;
            }
            for col in start as u32..end as u32 {
                img.put_pixel(col, row, color);
            }
        }
    }
}

/// Encode an image for an HTTP response
pub fn encode(img: RgbaImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        ImageFormat::Png => img
            .write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| HexlayerError::ImageGeneration {
                message: format!("Failed to encode PNG: {}", e),
            })?,
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .write_to(&mut buffer, image::ImageFormat::Jpeg)
            .map_err(|e| HexlayerError::ImageGeneration {
                message: format!("Failed to encode JPEG: {}", e),
            })?,
    }
    Ok(buffer.into_inner())
}
