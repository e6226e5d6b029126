//! Error types for resepi-drafts

use thiserror::Error;

/// Draft generation errors
#[derive(Debug, Error)]
pub enum DraftError {
    /// No usable API key in database, environment or TOML
    #[error("LLM API key not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Model output could not be turned into a recipe draft
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Common(#[from] resepi_common::Error),
}

impl From<sqlx::Error> for DraftError {
    fn from(err: sqlx::Error) -> Self {
        DraftError::Common(resepi_common::Error::Database(err))
    }
}

pub type DraftResult<T> = Result<T, DraftError>;
