//! Webmention sync errors.

/// Errors raised by a sync pass.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The sitemap could not be loaded.
    #[error("couldn't load sitemap: {status}")]
    Sitemap {
        /// HTTP status of the sitemap response.
        status: u16,
    },

    /// The mentions API answered with a non-success status.
    #[error("webmention API error {status} for {target}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Target URL being queried.
        target: String,
    },

    /// A request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A URL could not be parsed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A cache file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cache file could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
