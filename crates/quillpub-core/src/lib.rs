//! Configuration and shared error types for quillpub.
//!
//! Every other crate in the workspace reads its settings from
//! [`QuillConfig`], which is loaded once from the environment and then
//! shared immutably.

mod config;
mod error;

pub use config::{QuillConfig, REQUIRED_ENV};
pub use error::{QuillError, QuillResult};
