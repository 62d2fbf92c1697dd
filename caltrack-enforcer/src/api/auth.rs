//! Shared-secret gate for the manual trigger endpoints
//!
//! Callers present the secret in the `X-Trigger-Secret` header. The value
//! must match exactly. With no secret configured every request is refused.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub const TRIGGER_SECRET_HEADER: &str = "x-trigger-secret";

/// Authentication middleware for protected routes
///
/// Rejects with 401 before the handler runs, so a refused request never
/// touches equipment or sends mail.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.trigger_secret.as_deref() else {
        warn!(path = %request.uri().path(), "Manual trigger refused: no trigger secret configured");
        return Err(ApiError::Unauthorized("protected routes are disabled".to_string()));
    };

    let provided = request
        .headers()
        .get(TRIGGER_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(provided) if secrets_match(provided, expected) => Ok(next.run(request).await),
        Some(_) => {
            warn!(path = %request.uri().path(), "Manual trigger refused: wrong secret");
            Err(ApiError::Unauthorized("invalid trigger secret".to_string()))
        }
        None => {
            warn!(path = %request.uri().path(), "Manual trigger refused: missing secret header");
            Err(ApiError::Unauthorized("missing X-Trigger-Secret header".to_string()))
        }
    }
}

/// Exact comparison that does not exit early on the first differing byte
fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
