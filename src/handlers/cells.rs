//! Cell layer endpoint.
//!
//! Returns the colored cells of the current render snapshot, either as a
//! GeoJSON FeatureCollection or as the plain cell list.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::error_response;
use crate::error::HexlayerError;
use crate::logging::generate_request_id;
use crate::state::AppState;

/// Query parameters for the cells endpoint
#[derive(Debug, Deserialize)]
pub struct CellsQuery {
    /// `geojson` (default) or `json`
    pub format: Option<String>,
}

/// Handle GET /cells requests
pub async fn cells_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CellsQuery>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();
    let format = params.format.as_deref().unwrap_or("geojson");

    debug!(endpoint = "/cells", request_id = %request_id, format = format, "Processing cells request");

    let snapshot = state.controller.snapshot();
    let layer = state.renderer.render(&snapshot);

    let body = match format {
        "geojson" => layer.to_geojson(),
        "json" => serde_json::json!({
            "generation": snapshot.generation,
            "dataset_key": snapshot.dataset_key.as_ref().map(|k| k.to_string()),
            "domain": snapshot.scale.domain(),
            "colormap": snapshot.scale.colormap_name(),
            "skipped": layer.skipped,
            "cells": layer.cells,
        }),
        other => {
            let error = HexlayerError::invalid_param(
                "format",
                format!("Unknown format '{}', expected 'geojson' or 'json'", other),
            );
            return error_response(&error, "/cells", &request_id, Some(other));
        }
    };

    info!(
        endpoint = "/cells",
        request_id = %request_id,
        generation = snapshot.generation,
        cells = layer.len(),
        duration_ms = start_time.elapsed().as_millis() as u64,
        "Cells request successful"
    );

    Json(body).into_response()
}
