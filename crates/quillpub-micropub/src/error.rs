//! Micropub endpoint errors.
//!
//! Protocol errors (`invalid_request`, `unauthorized`, `forbidden`,
//! `insufficient_scope`) are answered with the Micropub JSON error body.
//! Storage and upstream failures propagate to the gateway, which turns them
//! into `500 {"error": ...}`.

use http::{Response, StatusCode};
use quillpub_http::{DelegateOutcome, ResponseBody, json_response};
use quillpub_store::StoreError;

/// Errors raised while serving a Micropub or media request.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The request is malformed or names something that does not exist.
    #[error("{0}")]
    InvalidRequest(String),

    /// No access token was supplied.
    #[error("{0}")]
    Unauthorized(String),

    /// The token was rejected or belongs to a different identity.
    #[error("{0}")]
    Forbidden(String),

    /// The token lacks the scope the action needs.
    #[error("{0}")]
    InsufficientScope(String),

    /// The token endpoint could not be reached or answered unexpectedly.
    #[error("token endpoint error: {0}")]
    TokenEndpoint(String),

    /// A content store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EndpointError {
    /// The Micropub error code, for protocol errors.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidRequest(_) => Some("invalid_request"),
            Self::Unauthorized(_) => Some("unauthorized"),
            Self::Forbidden(_) => Some("forbidden"),
            Self::InsufficientScope(_) => Some("insufficient_scope"),
            Self::TokenEndpoint(_) | Self::Store(_) => None,
        }
    }

    /// HTTP status for the error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) | Self::InsufficientScope(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::TokenEndpoint(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The Micropub JSON error response, for protocol errors.
    #[must_use]
    pub fn to_response(&self) -> Option<Response<ResponseBody>> {
        let code = self.code()?;
        Some(json_response(
            self.status(),
            &serde_json::json!({
                "error": code,
                "error_description": self.to_string(),
            }),
        ))
    }

    /// Answer protocol errors in-band and propagate everything else.
    pub fn into_outcome(self) -> anyhow::Result<DelegateOutcome> {
        match self.to_response() {
            Some(response) => Ok(DelegateOutcome::new(response)),
            None => Err(self.into()),
        }
    }
}

/// Result alias for endpoint operations.
pub type EndpointResult<T> = Result<T, EndpointError>;
