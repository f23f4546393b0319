//! The Micropub delegate seam.
//!
//! The gateway hands every gated request to a [`MicropubDelegate`]. The
//! delegate is built once at start-up and shared; it reports the slug of any
//! post it created in the returned [`DelegateOutcome`], so the gateway can
//! normalize that post and rewrite its location without shared state.

use std::future::Future;

use async_trait::async_trait;
use http::{Response, StatusCode};
use tracing::error;

use crate::body::ResponseBody;
use crate::canonical::CanonicalRequest;
use crate::response::error_response;

/// Result of one delegate call.
#[derive(Debug)]
pub struct DelegateOutcome {
    /// Response produced by the delegate.
    pub response: Response<ResponseBody>,
    /// Slug of the post created by this request, if any.
    pub created_slug: Option<String>,
}

impl DelegateOutcome {
    /// An outcome that created nothing.
    #[must_use]
    pub fn new(response: Response<ResponseBody>) -> Self {
        Self {
            response,
            created_slug: None,
        }
    }

    /// An outcome that created the post `slug`.
    #[must_use]
    pub fn created(response: Response<ResponseBody>, slug: impl Into<String>) -> Self {
        Self {
            response,
            created_slug: Some(slug.into()),
        }
    }
}

/// A Micropub endpoint implementation.
#[async_trait]
pub trait MicropubDelegate: Send + Sync + std::fmt::Debug {
    /// Handle a request to the Micropub endpoint.
    async fn micropub(&self, req: CanonicalRequest) -> anyhow::Result<DelegateOutcome>;

    /// Handle a request to the media endpoint.
    async fn media(&self, req: CanonicalRequest) -> anyhow::Result<DelegateOutcome>;
}

/// Await a delegate call, turning any error into a `500 {"error": ...}` response.
pub async fn guarded<F>(call: F) -> DelegateOutcome
where
    F: Future<Output = anyhow::Result<DelegateOutcome>>,
{
    match call.await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %format!("{err:#}"), "micropub delegate failed");
            DelegateOutcome::new(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &err.to_string(),
            ))
        }
    }
}
