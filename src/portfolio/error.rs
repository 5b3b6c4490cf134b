use crate::auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("{0}")]
    InvalidCategory(&'static str),

    #[error("Invalid folder name.")]
    InvalidFolderName,

    #[error("Invalid file name.")]
    InvalidFileName,

    #[error("Invalid upload path.")]
    InvalidUploadPath,

    #[error("Both 'after' and 'before' files are required.")]
    MissingRequiredFiles,

    #[error("Only one '{0}' file is allowed.")]
    DuplicateField(String),

    #[error("{message}")]
    Rejected {
        message: String,
        details: Vec<String>,
    },

    #[error("{message}")]
    Multipart { status: StatusCode, message: String },

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Target is not a folder.")]
    NotAFolder,

    #[error("Destination category already contains folder '{0}'.")]
    FolderConflict(String),

    #[error("Failed to store uploaded files.")]
    StorageFailed(#[source] std::io::Error),

    #[error("Permission denied. Cannot delete files.")]
    PermissionDenied(#[source] std::io::Error),

    #[error("Failed to delete portfolio item: {0}")]
    DeleteFailed(#[source] std::io::Error),

    #[error("Files deleted but failed to remove folder")]
    PartialDelete {
        deleted_files: usize,
        failed_files: Vec<String>,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<axum::extract::multipart::MultipartError> for PortfolioError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        PortfolioError::Multipart {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl PortfolioError {
    pub fn status(&self) -> StatusCode {
        match self {
            PortfolioError::InvalidCategory(_)
            | PortfolioError::InvalidFolderName
            | PortfolioError::InvalidFileName
            | PortfolioError::InvalidUploadPath
            | PortfolioError::MissingRequiredFiles
            | PortfolioError::DuplicateField(_)
            | PortfolioError::Rejected { .. }
            | PortfolioError::NotAFolder => StatusCode::BAD_REQUEST,
            PortfolioError::Multipart { status, .. } => *status,
            PortfolioError::NotFound(_) => StatusCode::NOT_FOUND,
            PortfolioError::FolderConflict(_) => StatusCode::CONFLICT,
            PortfolioError::StorageFailed(_)
            | PortfolioError::PermissionDenied(_)
            | PortfolioError::DeleteFailed(_)
            | PortfolioError::PartialDelete { .. }
            | PortfolioError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PortfolioError::Auth(e) => e.status(),
        }
    }
}

impl IntoResponse for PortfolioError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Portfolio request failed: {:?}", self);
        }

        let mut body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });

        match self {
            PortfolioError::Rejected { details, .. } if details.len() > 1 => {
                body["details"] = serde_json::json!(details);
            }
            PortfolioError::PartialDelete {
                deleted_files,
                failed_files,
            } => {
                body["deletedFiles"] = serde_json::json!(deleted_files);
                body["failedFiles"] = serde_json::json!(failed_files);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
