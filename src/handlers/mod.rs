//! HTTP request handlers for the hexlayer API.

pub mod catalog;
pub mod cells;
pub mod heartbeat;
pub mod image;
pub mod legend;
pub mod selection;
pub mod style;

pub use catalog::{layers_handler, months_handler};
pub use cells::cells_handler;
pub use heartbeat::heartbeat_handler;
pub use image::image_handler;
pub use legend::{legend_json_handler, legend_svg_handler};
pub use selection::{get_selection_handler, post_selection_handler};
pub use style::style_handler;

use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::HexlayerError;
use crate::logging::log_request_error;

/// Log a failed request and turn the error into a JSON response
pub(crate) fn error_response(
    error: &HexlayerError,
    endpoint: &str,
    request_id: &str,
    params: Option<&str>,
) -> Response {
    log_request_error(error, endpoint, request_id, params);

    (
        error.status_code(),
        Json(serde_json::json!({
            "error": error.to_string(),
            "request_id": request_id
        })),
    )
        .into_response()
}
