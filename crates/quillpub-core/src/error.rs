//! Error types for quillpub core.

/// Core error type for quillpub infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum QuillError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for quillpub core operations.
pub type QuillResult<T> = Result<T, QuillError>;
