//! Content store error types.

/// Errors produced by a [`ContentStore`](crate::ContentStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file does not exist.
    #[error("file not found: {path}")]
    NotFound {
        /// Repository path that was requested.
        path: String,
    },

    /// A create was attempted on a path that already holds a file.
    #[error("file already exists: {path}")]
    AlreadyExists {
        /// Repository path that was requested.
        path: String,
    },

    /// The revision handle supplied with an update or delete is stale.
    #[error("revision mismatch for {path}: {sha} is no longer current")]
    Conflict {
        /// Repository path that was requested.
        path: String,
        /// The revision handle the caller supplied.
        sha: String,
    },

    /// The file exists but its content was not returned inline.
    #[error("content of {path} is not available inline (encoding {encoding})")]
    ContentUnavailable {
        /// Repository path that was requested.
        path: String,
        /// The `encoding` the API reported.
        encoding: String,
    },

    /// The upstream API answered with an unexpected status.
    #[error("content store request failed with status {status}: {message}")]
    Upstream {
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The upstream response could not be decoded.
    #[error("malformed content store response: {0}")]
    Decode(String),

    /// Transport failure talking to the upstream API.
    #[error("content store transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Convenience result type for content store operations.
pub type StoreResult<T> = Result<T, StoreError>;
