/// Application and system details
///
/// ```text
/// GET /info
/// ```
///
/// ```json
/// {
///   "name": "task-service-api",
///   "version": "0.1.0",
///   "availableProcessors": 8,
///   "uptimeSeconds": 42
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub available_processors: usize,
    pub uptime_seconds: u64,
}

pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    let available_processors = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    Json(InfoResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        available_processors,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
