use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::warn;

use crate::rate_limiter::Limiter;
use crate::response::{ApiError, AttemptResponse, HealthResponse, ResetResponse, StatusResponse};
use crate::validation::KeyValidator;

/// Shared application state
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub limiter: Arc<dyn Limiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(limiter: Arc<dyn Limiter>) -> Self {
        Self {
            limiter,
            started_at: Instant::now(),
        }
    }
}

/// Record one attempt for a key
pub async fn record_attempt(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key = KeyValidator::validate_key(&key)?;
    let policy = *state.limiter.policy();

    state
        .limiter
        .run(&key)
        .await
        .map_err(|e| ApiError::from_limiter(e, policy.cooldown_seconds))?;

    Ok(Json(AttemptResponse {
        key,
        allowed: true,
        limit: policy.attempts,
    }))
}

/// Report whether a key is over its limit
pub async fn get_status(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key = KeyValidator::validate_key(&key)?;
    let exceeded = state.limiter.rate_limit_exceeded(&key).await;

    Ok(Json(StatusResponse {
        key,
        exceeded,
        limit: state.limiter.policy().attempts,
    }))
}

/// Clear the counter for a key
pub async fn reset_key(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key = KeyValidator::validate_key(&key)?;
    let cooldown_seconds = state.limiter.policy().cooldown_seconds;

    state
        .limiter
        .reset(&key)
        .await
        .map_err(|e| ApiError::from_limiter(e, cooldown_seconds))?;

    Ok(Json(ResetResponse::cleared(key)))
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let uptime = state.started_at.elapsed().as_secs();

    match state.limiter.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::healthy(uptime))),
        Err(e) => {
            warn!(error = %e, "counter store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::unhealthy(uptime, e.to_string())),
            )
        }
    }
}
