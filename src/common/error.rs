//! Error types for replog

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Log Errors ===
    #[error("Out-of-sequence append: expected id {expected}, got {actual}")]
    OutOfSequence { expected: u64, actual: u64 },

    #[error("Replication entry carries no id")]
    MissingId,

    #[error("Entry {id} already holds a different payload")]
    PayloadConflict { id: u64 },

    // === Replication Errors ===
    #[error("Invalid write concern {0}: must be between 1 and {max}", max = crate::common::NODE_COUNT)]
    InvalidWriteConcern(u8),

    #[error("Write concern not satisfied: need {required}, acknowledged by {acknowledged}")]
    QuorumNotReached { required: u8, acknowledged: u8 },

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from {node}: {reason}")]
    UnexpectedResponse { node: String, reason: String },

    // === Config Errors ===
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> StatusCode {
        match self {
            Error::InvalidWriteConcern(_) | Error::MissingId => StatusCode::BAD_REQUEST,
            Error::PayloadConflict { .. } => StatusCode::CONFLICT,
            Error::QuorumNotReached { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Http(_) | Error::UnexpectedResponse { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_http_status();
        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            Error::InvalidWriteConcern(7).to_http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::QuorumNotReached {
                required: 3,
                acknowledged: 2
            }
            .to_http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::PayloadConflict { id: 0 }.to_http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::Internal("boom".into()).to_http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_includes_counts() {
        let err = Error::QuorumNotReached {
            required: 3,
            acknowledged: 1,
        };
        assert_eq!(
            err.to_string(),
            "Write concern not satisfied: need 3, acknowledged by 1"
        );
    }
}
