use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use fundamenta_types::MonitorError;
use serde::Serialize;
use thiserror::Error;

/// JSON error body shared by every route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { status: "error", message: message.into(), retry_after_seconds: None }
    }
}

/// Handler error rendered as a JSON body with the matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after_seconds) = match &self {
            Self::Monitor(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let retry = match err {
                    MonitorError::RateLimited { retry_after_secs, .. } => *retry_after_secs,
                    _ => None,
                };
                (status, retry)
            }
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
        };

        let body = ErrorBody { retry_after_seconds, ..ErrorBody::new(self.to_string()) };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after_seconds {
            response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
