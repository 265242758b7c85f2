use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::StoreError;

/// Response for an error
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    /// Stable machine-readable error kind, e.g. `DOCUMENT_EXPIRED`
    pub kind: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn reply(status: StatusCode, kind: &str, error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        (status, Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            kind: kind.to_string(),
            error: error.into(),
        }))
    }
}

/// Failures of document operations
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("Session '{0}' does not exist")]
    SessionNotFound(i64),

    #[error("Document '{0}' not found")]
    DocumentNotFound(String),

    #[error("Document '{0}' has expired")]
    DocumentExpired(String),

    #[error("Content of {size} bytes exceeds the {limit} byte limit")]
    ContentTooLarge { size: usize, limit: usize },

    #[error("Document '{0}' is no longer active")]
    DocumentInactive(String),

    #[error("Stale version {actual}, document is at version {expected}")]
    VersionConflict { expected: i64, actual: i64 },

    #[error("Access to session '{0}' denied")]
    Forbidden(i64),

    #[error("Session lookup failed: {0}")]
    SessionLookup(String),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),
}

impl DocError {
    pub fn status(&self) -> StatusCode {
        match self {
            DocError::SessionNotFound(_) | DocError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            DocError::DocumentExpired(_) => StatusCode::GONE,
            DocError::ContentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DocError::DocumentInactive(_) | DocError::VersionConflict { .. } => StatusCode::CONFLICT,
            DocError::Forbidden(_) => StatusCode::FORBIDDEN,
            DocError::SessionLookup(_) | DocError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DocError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            DocError::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            DocError::DocumentExpired(_) => "DOCUMENT_EXPIRED",
            DocError::ContentTooLarge { .. } => "CONTENT_TOO_LARGE",
            DocError::DocumentInactive(_) => "DOCUMENT_INACTIVE",
            DocError::VersionConflict { .. } => "VERSION_CONFLICT",
            DocError::Forbidden(_) => "FORBIDDEN",
            DocError::SessionLookup(_) => "SESSION_SERVICE_UNAVAILABLE",
            DocError::Store(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Only transient infrastructure failures are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DocError::SessionLookup(_) | DocError::Store(StoreError::Database(_) | StoreError::Unavailable(_))
        )
    }
}

impl From<DocError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: DocError) -> Self {
        if err.is_retryable() {
            tracing::error!("Request failed on a dependency: {}", err);
        }
        ErrorResponse::reply(err.status(), err.kind(), err.to_string())
    }
}
