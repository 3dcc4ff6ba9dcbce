//! Image generation endpoint handler.
//!
//! Rasterizes the current cell layer over a bounding box as PNG or JPEG.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::error_response;
use crate::error::{HexlayerError, Result};
use crate::logging::{generate_request_id, log_timed_operation};
use crate::render::{encode, rasterize, Bbox, ImageFormat};
use crate::state::AppState;

/// Default image dimensions
const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 400;

/// Upper bound on either image dimension
const MAX_DIMENSION: u32 = 4096;

/// Query parameters for image endpoint
#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    /// Bounding box as "min_lon,min_lat,max_lon,max_lat"
    pub bbox: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Output format (png or jpeg)
    pub format: Option<String>,
}

/// Handle GET /image requests
pub async fn image_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImageQuery>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/image",
        request_id = %request_id,
        bbox = ?params.bbox,
        width = ?params.width,
        height = ?params.height,
        format = ?params.format,
        "Processing image request"
    );

    match generate_image_response(&state, &params) {
        Ok(response) => {
            info!(
                endpoint = "/image",
                request_id = %request_id,
                bbox = params.bbox.as_deref().unwrap_or("world"),
                width = params.width.unwrap_or(DEFAULT_WIDTH),
                height = params.height.unwrap_or(DEFAULT_HEIGHT),
                duration_ms = start_time.elapsed().as_millis() as u64,
                "Image generation successful"
            );
            response
        }
        Err(error) => {
            let query = format!("{:?}", params);
            error_response(&error, "/image", &request_id, Some(&query))
        }
    }
}

fn generate_image_response(state: &AppState, params: &ImageQuery) -> Result<Response> {
    let width = params.width.unwrap_or(DEFAULT_WIDTH);
    let height = params.height.unwrap_or(DEFAULT_HEIGHT);
    check_dimension("width", width)?;
    check_dimension("height", height)?;

    let bbox = match &params.bbox {
        Some(raw) => raw.parse::<Bbox>()?,
        None => Bbox::WORLD,
    };
    let format = match &params.format {
        Some(raw) => raw.parse::<ImageFormat>()?,
        None => ImageFormat::Png,
    };

    let snapshot = state.controller.snapshot();
    let layer = state.renderer.render(&snapshot);
    let img = log_timed_operation("rasterize", || rasterize(&layer, &bbox, width, height));
    let buffer = encode(img, format)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(format.content_type()),
    );
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-store"));

    Ok((StatusCode::OK, headers, buffer).into_response())
}

fn check_dimension(param: &str, value: u32) -> Result<()> {
    if value == 0 || value > MAX_DIMENSION {
        return Err(HexlayerError::invalid_param(
            param,
            format!("Must be between 1 and {}, got {}", MAX_DIMENSION, value),
        ));
    }
    Ok(())
}
