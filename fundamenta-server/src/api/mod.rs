//! API Routes
//!
//! Health and rate-limit status for every monitored upstream.

mod error;
mod health;
mod rate_limits;


use error::ErrorBody;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::get_all_health))
        .route("/health/:api_name", get(health::get_api_health))
        .route("/health/:api_name/check", post(health::force_check))
        // Rate limits
        .route("/rate-limits", get(rate_limits::list_rate_limits))
        .route("/rate-limits/:api_name", get(rate_limits::get_rate_limit))
        .route("/rate-limits/:api_name/report", post(rate_limits::report_rate_limit))
        .route("/rate-limits/:api_name/acquire", post(rate_limits::acquire))
        // API fallback: return 404 for unknown API endpoints
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found")))
}
