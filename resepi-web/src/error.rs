//! Error types for resepi-web
//!
//! [`ApiError`] renders the JSON error envelope used by `/api/*`;
//! [`PageError`] wraps the same error for HTML page handlers.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use resepi_drafts::DraftError;
use serde_json::json;
use thiserror::Error;

use crate::render;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request or failed validation (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Sign-in required (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signed in but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict (409), e.g. duplicate email
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upload over the configured size limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// resepi-common error
    #[error(transparent)]
    Common(#[from] resepi_common::Error),

    /// Draft generation error
    #[error(transparent)]
    Drafts(#[from] DraftError),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(resepi_common::Error::Database(err))
    }
}

fn common_status(err: &resepi_common::Error) -> (StatusCode, &'static str) {
    use resepi_common::Error;
    match err {
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        Error::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        e if e.is_unique_violation() => (StatusCode::CONFLICT, "CONFLICT"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl ApiError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            ApiError::Common(err) => common_status(err),
            ApiError::Drafts(err) => match err {
                DraftError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                DraftError::MissingApiKey => (StatusCode::BAD_REQUEST, "LLM_NOT_CONFIGURED"),
                DraftError::Common(inner) => common_status(inner),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "LLM_ERROR"),
            },
        }
    }

    /// Message safe to show to the client
    ///
    /// Database and IO details stay in the log.
    pub fn public_message(&self) -> String {
        let (status, _) = self.status_and_code();
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg) => msg.clone(),
            ApiError::Common(resepi_common::Error::NotFound(msg))
            | ApiError::Common(resepi_common::Error::InvalidInput(msg))
            | ApiError::Common(resepi_common::Error::Conflict(msg)) => msg.clone(),
            ApiError::Drafts(err) if status != StatusCode::INTERNAL_SERVER_ERROR => err.to_string(),
            ApiError::Drafts(err) => format!("Draft generation failed: {}", err),
            _ if status == StatusCode::CONFLICT => "Already exists".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    fn log(&self, status: StatusCode) {
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        self.log(status);

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.public_message(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned from HTML page handlers; renders an error page
#[derive(Debug)]
pub struct PageError(pub ApiError);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, _) = self.0.status_and_code();
        self.0.log(status);

        let title = match status {
            StatusCode::NOT_FOUND => "Halaman tidak dijumpai",
            StatusCode::FORBIDDEN => "Akses ditolak",
            s if s.is_client_error() => "Permintaan tidak sah",
            _ => "Ralat pelayan",
        };

        (status, Html(render::error_page(status.as_u16(), title, &self.0.public_message()))).into_response()
    }
}

macro_rules! page_error_from {
    ($($source:ty),+) => {
        $(
            impl From<$source> for PageError {
                fn from(err: $source) -> Self {
                    PageError(ApiError::from(err))
                }
            }
        )+
    };
}

page_error_from!(resepi_common::Error, DraftError, sqlx::Error, std::io::Error);

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        PageError(err)
    }
}

/// Result type for page handlers
pub type PageResult<T> = Result<T, PageError>;
