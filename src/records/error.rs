use crate::auth::AuthError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("Name, email, Project Type, and message are required.")]
    MissingContactFields,

    #[error("Invalid id")]
    InvalidId,

    #[error("Message not found")]
    MessageNotFound,

    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl RecordsError {
    pub fn status(&self) -> StatusCode {
        match self {
            RecordsError::MissingContactFields | RecordsError::InvalidId => StatusCode::BAD_REQUEST,
            RecordsError::MessageNotFound => StatusCode::NOT_FOUND,
            RecordsError::InvalidBody { status, .. } => *status,
            RecordsError::Auth(e) => e.status(),
            RecordsError::Io(_) | RecordsError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for RecordsError {
    fn from(rejection: JsonRejection) -> Self {
        RecordsError::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for RecordsError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Records request failed: {}", self);
        }
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
