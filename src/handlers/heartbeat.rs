//! Heartbeat endpoint handler.
//!
//! Returns server status: uptime, memory usage and a summary of what is
//! currently selected and loaded.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::controller::{Phase, SelectionStatus};
use crate::state::AppState;

/// Unique per process
static SERVER_ID: once_cell::sync::Lazy<String> =
    once_cell::sync::Lazy::new(|| Uuid::new_v4().to_string());

static START_TIME: once_cell::sync::Lazy<SystemTime> = once_cell::sync::Lazy::new(SystemTime::now);

/// Heartbeat response structure
#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub server_id: String,
    /// ISO 8601
    pub timestamp: String,
    pub uptime_seconds: u64,
    /// Process resident memory in bytes
    pub memory_usage_bytes: Option<u64>,
    pub dataset: DatasetSummary,
    pub status: String,
}

/// What the renderer is drawing right now
#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub source: String,
    pub layer_count: usize,
    pub selected_key: Option<String>,
    pub loaded_key: Option<String>,
    pub record_count: usize,
    pub fetching: bool,
    pub last_error: Option<String>,
}

impl DatasetSummary {
    fn from_status(source: String, layer_count: usize, status: SelectionStatus) -> Self {
        Self {
            source,
            layer_count,
            selected_key: status.key,
            loaded_key: status.dataset_key,
            record_count: status.record_count,
            fetching: matches!(status.phase, Phase::Fetching { .. }),
            last_error: status.last_error,
        }
    }

    /// Healthy unless the last fetch failed
    fn health(&self) -> &'static str {
        if self.last_error.is_some() {
            "degraded"
        } else {
            "healthy"
        }
    }
}

/// Handle GET /heartbeat requests
pub async fn heartbeat_handler(State(state): State<Arc<AppState>>) -> Json<HeartbeatResponse> {
    let now = SystemTime::now();
    let timestamp = chrono::DateTime::<chrono::Utc>::from(now)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let uptime = now.duration_since(*START_TIME).unwrap_or(Duration::ZERO);

    let dataset = DatasetSummary::from_status(
        state.source.describe(),
        state.controller.catalog().len(),
        state.controller.status(),
    );

    Json(HeartbeatResponse {
        server_id: SERVER_ID.clone(),
        timestamp,
        uptime_seconds: uptime.as_secs(),
        memory_usage_bytes: get_memory_usage(),
        status: dataset.health().to_string(),
        dataset,
    })
}

/// Resident set size of this process, where the platform exposes it
fn get_memory_usage() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        // Second field of statm is RSS in pages
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(pages * 4096)
    }

    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("ps")
            .args(["-o", "rss=", "-p", &std::process::id().to_string()])
            .output()
            .ok()?;
        let rss_kb: u64 = String::from_utf8_lossy(&output.stdout).trim().parse().ok()?;
        Some(rss_kb * 1024)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}
