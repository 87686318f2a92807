use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use fundamenta_types::{ApiHealthSnapshot, MonitorError};
use serde::Serialize;

use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthOverview {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub apis: BTreeMap<String, ApiHealthSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealthResponse {
    pub api_name: String,
    #[serde(flatten)]
    pub snapshot: ApiHealthSnapshot,
}

pub async fn get_all_health(State(state): State<AppState>) -> Json<HealthOverview> {
    Json(HealthOverview {
        status: "ok",
        timestamp: Utc::now(),
        apis: state.registry().snapshots(),
    })
}

pub async fn get_api_health(
    State(state): State<AppState>,
    Path(api_name): Path<String>,
) -> ApiResult<Json<ApiHealthResponse>> {
    let snapshot = state
        .registry()
        .snapshot(&api_name)
        .ok_or_else(|| MonitorError::NotMonitored { api: api_name.clone() })?;
    Ok(Json(ApiHealthResponse { api_name, snapshot }))
}

/// Probe now instead of waiting for the next tick.
pub async fn force_check(
    State(state): State<AppState>,
    Path(api_name): Path<String>,
) -> ApiResult<Json<ApiHealthResponse>> {
    let registry = state.registry();
    if !registry.is_monitored(&api_name) {
        return Err(MonitorError::NotMonitored { api: api_name }.into());
    }

    registry.force_check(&api_name).await;
    // Stopped while the probe ran
    let snapshot = registry
        .snapshot(&api_name)
        .ok_or_else(|| MonitorError::NotMonitored { api: api_name.clone() })?;
    Ok(Json(ApiHealthResponse { api_name, snapshot }))
}
