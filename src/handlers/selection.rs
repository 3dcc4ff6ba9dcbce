//! Selection endpoints.
//!
//! `POST /selection` applies a partial change and waits for the resulting
//! fetch, so the response reflects what the renderer will draw next.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::error_response;
use crate::controller::{Completion, SelectionStatus};
use crate::logging::generate_request_id;
use crate::selection::SelectionChange;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub status: SelectionStatus,
    /// `None` when the change did not alter the dataset key
    pub completion: Option<Completion>,
}

/// Handle GET /selection requests
pub async fn get_selection_handler(State(state): State<Arc<AppState>>) -> Json<SelectionStatus> {
    Json(state.controller.status())
}

/// Handle POST /selection requests
pub async fn post_selection_handler(
    State(state): State<Arc<AppState>>,
    Json(change): Json<SelectionChange>,
) -> Response {
    let request_id = generate_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/selection",
        request_id = %request_id,
        layer = ?change.layer,
        month = ?change.month,
        depth = ?change.depth,
        "Processing selection change"
    );

    let params = format!("{:?}", change);
    let completion = match state.controller.apply(change).await {
        Ok(completion) => completion,
        Err(error) => return error_response(&error, "/selection", &request_id, Some(&params)),
    };

    let status = state.controller.status();
    info!(
        endpoint = "/selection",
        request_id = %request_id,
        key = ?status.key,
        completion = ?completion,
        duration_ms = start_time.elapsed().as_millis() as u64,
        "Selection applied"
    );

    let code = match &completion {
        Some(Completion::Failed { .. }) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    };
    (code, Json(SelectionResponse { status, completion })).into_response()
}
