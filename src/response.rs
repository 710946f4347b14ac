use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::LimiterError;

/// Errors surfaced by the HTTP API.
#[derive(Debug, Clone, Serialize)]
pub enum ApiError {
    InvalidKey(String),
    /// Carries an upper bound, in seconds, on how long the key stays blocked.
    RateLimitExceeded { retry_after: u64 },
    StoreUnavailable(String),
}

impl ApiError {
    pub fn from_limiter(err: LimiterError, cooldown_seconds: u64) -> Self {
        match err {
            LimiterError::Blocked => ApiError::RateLimitExceeded {
                retry_after: cooldown_seconds,
            },
            LimiterError::Store(e) => ApiError::StoreUnavailable(e.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
            ApiError::RateLimitExceeded { .. } => write!(f, "Rate limit exceeded"),
            ApiError::StoreUnavailable(msg) => write!(f, "Counter store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_api_error(err: &ApiError) -> Self {
        let code = err.status().as_u16();
        match err {
            ApiError::InvalidKey(msg) => Self::new("bad_request", msg, code),
            ApiError::RateLimitExceeded { .. } => {
                Self::new("rate_limit_exceeded", "Too many attempts, try again later", code)
            }
            ApiError::StoreUnavailable(msg) => Self::new("service_unavailable", msg, code),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response =
            (self.status(), Json(ErrorResponse::from_api_error(&self))).into_response();

        if let ApiError::RateLimitExceeded { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }

        response
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub key: String,
    pub allowed: bool,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub key: String,
    pub exceeded: bool,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: String,
    pub message: String,
    pub key: String,
}

impl ResetResponse {
    pub fn cleared(key: String) -> Self {
        Self {
            status: "success".to_string(),
            message: "Rate limit state cleared".to_string(),
            key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub store_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn healthy(uptime_seconds: u64) -> Self {
        Self::build("healthy", uptime_seconds, None)
    }

    pub fn unhealthy(uptime_seconds: u64, error: String) -> Self {
        Self::build("unhealthy", uptime_seconds, Some(error))
    }

    fn build(status: &str, uptime_seconds: u64, error: Option<String>) -> Self {
        Self {
            status: status.to_string(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds,
            store_connected: error.is_none(),
            error,
        }
    }
}
