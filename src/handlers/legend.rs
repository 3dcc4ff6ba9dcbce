//! Legend endpoints: an SVG rendering and its JSON description.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::error_response;
use crate::error::Result;
use crate::legend::{Legend, LegendLayout};
use crate::logging::generate_request_id;
use crate::state::AppState;

/// Query parameters for the legend endpoints
#[derive(Debug, Default, Deserialize)]
pub struct LegendQuery {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl LegendQuery {
    fn layout(&self) -> Result<LegendLayout> {
        let defaults = LegendLayout::default();
        LegendLayout::sized(
            self.width.unwrap_or(defaults.width),
            self.height.unwrap_or(defaults.height),
        )
    }
}

fn build_legend(state: &AppState, params: &LegendQuery) -> Result<Legend> {
    let layout = params.layout()?;
    let snapshot = state.controller.snapshot();
    Ok(Legend::build(&snapshot.scale, layout))
}

/// Handle GET /legend requests
pub async fn legend_svg_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LegendQuery>,
) -> Response {
    let request_id = generate_request_id();
    match build_legend(&state, &params) {
        Ok(legend) => {
            debug!(
                endpoint = "/legend",
                request_id = %request_id,
                domain = ?legend.domain,
                ticks = legend.ticks.len(),
                "Rendering legend"
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "image/svg+xml")],
                legend.to_svg(),
            )
                .into_response()
        }
        Err(error) => error_response(&error, "/legend", &request_id, Some(&format!("{:?}", params))),
    }
}

/// Handle GET /legend.json requests
pub async fn legend_json_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LegendQuery>,
) -> Response {
    let request_id = generate_request_id();
    match build_legend(&state, &params) {
        Ok(legend) => Json(legend).into_response(),
        Err(error) => {
            error_response(&error, "/legend.json", &request_id, Some(&format!("{:?}", params)))
        }
    }
}
