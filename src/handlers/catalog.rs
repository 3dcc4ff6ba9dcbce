//! Catalog and month listing endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::LayerDescriptor;
use crate::state::AppState;

/// One entry of the month picker
#[derive(Debug, Serialize)]
pub struct MonthOption {
    pub value: String,
    pub label: String,
}

/// Handle GET /layers requests
pub async fn layers_handler(State(state): State<Arc<AppState>>) -> Json<Vec<LayerDescriptor>> {
    let layers = state.controller.catalog().layers().to_vec();
    debug!(endpoint = "/layers", layer_count = layers.len(), "Listing layers");
    Json(layers)
}

/// Handle GET /months requests
pub async fn months_handler(State(state): State<Arc<AppState>>) -> Json<Vec<MonthOption>> {
    let months = state
        .controller
        .months()
        .iter()
        .map(|month| MonthOption {
            value: month.to_string(),
            label: month.label(),
        })
        .collect();
    Json(months)
}
