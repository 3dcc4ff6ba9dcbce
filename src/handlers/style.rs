//! Map style passthrough.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error_response;
use crate::logging::generate_request_id;
use crate::state::AppState;

/// Handle GET /style.json requests; the document is served byte for byte
pub async fn style_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.style().await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response(),
        Err(error) => {
            let request_id = generate_request_id();
            error_response(&error, "/style.json", &request_id, None)
        }
    }
}
