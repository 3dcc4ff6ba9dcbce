//! Logging utilities for the hexlayer server.
//!
//! Structured `tracing` helpers shared by the fetch pipeline, the HTTP
//! handlers and startup.

use std::time::Instant;
use tracing::{debug, error, info, warn, Level};

use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use uuid::Uuid;

use crate::error::HexlayerError;

/// Creates the tracing layer for HTTP request/response logging
pub fn create_http_trace_layer() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
    DefaultMakeSpan,
    DefaultOnRequest,
    DefaultOnResponse,
> {
    let on_response = DefaultOnResponse::new()
        .level(Level::DEBUG)
        .latency_unit(LatencyUnit::Micros);

    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(on_response)
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    match details {
        Some(details) => info!(operation = operation, details = details, "Starting operation"),
        None => info!(operation = operation, "Starting operation"),
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    if success {
        info!(operation = operation, duration_ms = duration_ms, "Operation completed");
    } else {
        warn!(operation = operation, duration_ms = duration_ms, "Operation failed");
    }
}

/// Run `f` and log how long it took
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let result = f();

    debug!(
        operation = operation,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log what a dataset fetch produced
pub fn log_dataset_stats(
    key: &str,
    resource: &str,
    byte_count: usize,
    record_count: usize,
    start: Instant,
) {
    info!(
        operation = "dataset_fetch",
        key = key,
        resource = resource,
        bytes = byte_count,
        records = record_count,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Dataset loaded"
    );
}

/// Log an error with context
pub fn log_error(error: &HexlayerError, context: &str) {
    error!(
        error = %error,
        context = context,
        status = error.status_code().as_u16(),
        "Error occurred"
    );
}

/// Log an error that occurred during request processing
pub fn log_request_error(
    error: &HexlayerError,
    endpoint: &str,
    request_id: &str,
    params: Option<&str>,
) {
    let status = error.status_code();
    if status.is_client_error() {
        warn!(
            error = %error,
            endpoint = endpoint,
            request_id = request_id,
            params = params.unwrap_or("none"),
            status = status.as_u16(),
            "Rejected request"
        );
    } else {
        error!(
            error = %error,
            endpoint = endpoint,
            request_id = request_id,
            params = params.unwrap_or("none"),
            status = status.as_u16(),
            "Request processing error"
        );
    }
}

/// Generate a unique request ID
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
