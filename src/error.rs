//! Error taxonomy of the ingestion core.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The operation referenced a conversation or location that does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The location has switched off the channel the request came in on.
    #[error("{0} is disabled for this location")]
    ChannelDisabled(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no completion credential configured")]
    NotConfigured,

    /// Transport failure, including the request timeout.
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion service responded {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("completion response could not be parsed: {0}")]
    Malformed(String),

    #[error("completion response had empty content")]
    Empty,
}

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("CRM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("CRM responded {0}")]
    Status(StatusCode),
}
