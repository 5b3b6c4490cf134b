use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Server API key not configured.")]
    NotConfigured,

    #[error("Forbidden")]
    Forbidden,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Shared-secret gate for privileged routes. Fails closed when the server has
/// no key configured.
pub fn require_api_key(headers: &HeaderMap, configured: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = configured.filter(|key| !key.trim().is_empty()) else {
        error!("API key is not configured, refusing privileged request");
        return Err(AuthError::NotConfigured);
    };

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .unwrap_or("");

    if provided != expected {
        warn!("API key validation failed");
        return Err(AuthError::Forbidden);
    }

    Ok(())
}
