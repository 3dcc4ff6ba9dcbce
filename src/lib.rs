//! # hexlayer
//!
//! An H3 hexagon data-layer server.
//!
//! A static catalog lists the selectable layers. Choosing a layer, month and
//! depth fetches one dataset of `{h3, value}` records (gzip or plain JSON,
//! detected from the bytes), which is colored through a layer-specific
//! color scale and served as GeoJSON, a raster image and a gradient legend.
//!
//! ## Architecture
//!
//! - **Sources**: [`source`] reads resources from a directory or an HTTP base URL
//! - **Catalog**: [`catalog`] loads the layer manifest
//! - **Fetching**: [`fetcher`] resolves dataset keys and decodes payloads
//! - **Selection**: [`controller`] orders concurrent fetches by generation
//! - **Rendering**: [`colormaps`], [`render`] and [`legend`] turn records into pixels

pub mod catalog;
pub mod colormaps;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod handlers;
pub mod legend;
pub mod logging;
pub mod render;
pub mod selection;
pub mod source;
pub mod state;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

pub use catalog::{Catalog, LayerDescriptor};
pub use config::Config;
pub use controller::{Completion, FetchTicket, RenderSnapshot, SelectionController};
pub use error::{HexlayerError, Result};
pub use logging::{
    create_http_trace_layer, generate_request_id, init_tracing, log_dataset_stats, log_error,
    log_operation_end, log_operation_start, log_request_error, log_timed_operation,
};
pub use selection::{DatasetKey, Month, Selection, SelectionChange};
pub use state::AppState;

/// Build the HTTP router over shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/layers", get(handlers::layers_handler))
        .route("/months", get(handlers::months_handler))
        .route(
            "/selection",
            get(handlers::get_selection_handler).post(handlers::post_selection_handler),
        )
        .route("/cells", get(handlers::cells_handler))
        .route("/image", get(handlers::image_handler))
        .route("/legend", get(handlers::legend_svg_handler))
        .route("/legend.json", get(handlers::legend_json_handler))
        .route("/style.json", get(handlers::style_handler))
        .route("/heartbeat", get(handlers::heartbeat_handler))
        .layer(
            ServiceBuilder::new()
                .layer(create_http_trace_layer())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
