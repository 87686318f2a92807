use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use fundamenta_core::ApiMonitor;
use fundamenta_types::{ApiMonitorStatus, MonitorError};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RateLimitOverview {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub apis: BTreeMap<String, ApiMonitorStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReportRequest {
    #[serde(default)]
    pub retry_after_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireResponse {
    pub api_name: String,
    pub allowed: bool,
}

fn monitor_for<'a>(state: &'a AppState, api_name: &str) -> ApiResult<&'a Arc<ApiMonitor>> {
    state
        .monitor(api_name)
        .ok_or_else(|| MonitorError::UnknownApi { api: api_name.to_string() }.into())
}

pub async fn list_rate_limits(State(state): State<AppState>) -> Json<RateLimitOverview> {
    Json(RateLimitOverview {
        status: "ok",
        timestamp: Utc::now(),
        apis: state.monitors().statuses(),
    })
}

pub async fn get_rate_limit(
    State(state): State<AppState>,
    Path(api_name): Path<String>,
) -> ApiResult<Json<ApiMonitorStatus>> {
    Ok(Json(monitor_for(&state, &api_name)?.get_status()))
}

impl ReportRequest {
    /// An empty body means "no hint". Anything else must be a valid request.
    fn from_body(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

/// A caller hit a quota error on this upstream. The body is optional.
pub async fn report_rate_limit(
    State(state): State<AppState>,
    Path(api_name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ApiMonitorStatus>> {
    let monitor = monitor_for(&state, &api_name)?;
    let request = ReportRequest::from_body(&body)?;
    monitor.handle_rate_limit_error(request.retry_after_seconds);
    Ok(Json(monitor.get_status()))
}

/// Ask before calling the upstream: 200 when allowed, 429 while rate limited.
pub async fn acquire(
    State(state): State<AppState>,
    Path(api_name): Path<String>,
) -> ApiResult<Json<AcquireResponse>> {
    monitor_for(&state, &api_name)?.ensure_available()?;
    Ok(Json(AcquireResponse { api_name, allowed: true }))
}
