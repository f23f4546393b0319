//! The request pipeline in front of the Micropub delegate.
//!
//! ```text
//! InboundRequest
//!   -> CanonicalRequest (+ ResponseShape)
//!   -> q=config short-circuit
//!   -> environment gate
//!   -> MicropubDelegate (errors become 500)
//!   -> post-write normalization (best-effort)
//!   -> Location rewrite (best-effort)
//!   -> OutboundResponse in the caller's shape
//! ```

use std::sync::Arc;

use http::{Method, Response, StatusCode};
use quillpub_core::{QuillConfig, QuillResult};
use quillpub_store::ContentStore;
use tracing::{info, warn};

use crate::body::ResponseBody;
use crate::canonical::{CanonicalRequest, is_bodyless};
use crate::delegate::{MicropubDelegate, guarded};
use crate::fanout::{RequestHead, fan_out};
use crate::gate::{config_response, is_config_query, missing_env_response};
use crate::inbound::{InboundRequest, OutboundResponse};
use crate::multipart::{MultipartError, extract_boundary, parse_multipart};
use crate::response::error_response;
use crate::rewrite::LocationRewriter;

/// Which endpoint a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The Micropub endpoint.
    Micropub,
    /// The media endpoint.
    Media,
}

impl Endpoint {
    /// Map a request path to an endpoint.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/api/micropub" | "/micropub" => Some(Self::Micropub),
            "/api/media" | "/media" => Some(Self::Media),
            _ => None,
        }
    }

    /// Method assumed for legacy requests that name none.
    #[must_use]
    pub fn default_method(self) -> Method {
        match self {
            Self::Micropub => Method::GET,
            Self::Media => Method::POST,
        }
    }
}

/// The delegate and the store it writes to.
#[derive(Debug, Clone)]
pub struct Backend {
    /// Micropub implementation.
    pub delegate: Arc<dyn MicropubDelegate>,
    /// Content store used for post-write normalization.
    pub store: Arc<dyn ContentStore>,
}

/// Immutable request pipeline shared by every connection.
#[derive(Debug, Clone)]
pub struct Gateway {
    config: Arc<QuillConfig>,
    backend: Option<Backend>,
    rewriter: Arc<LocationRewriter>,
}

impl Gateway {
    /// Build a gateway. `backend` is `None` when configuration is incomplete.
    pub fn new(config: QuillConfig, backend: Option<Backend>) -> QuillResult<Self> {
        let rewriter = LocationRewriter::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            backend,
            rewriter: Arc::new(rewriter),
        })
    }

    /// The gateway's configuration.
    #[must_use]
    pub fn config(&self) -> &QuillConfig {
        &self.config
    }

    /// Handle a request in either shape and answer in the same shape.
    pub async fn handle(&self, endpoint: Endpoint, inbound: InboundRequest) -> OutboundResponse {
        let shape = inbound.shape();
        let req = inbound.into_canonical(&endpoint.default_method());
        let response = match endpoint {
            Endpoint::Micropub => self.micropub(req).await,
            Endpoint::Media => self.media(req).await,
        };
        shape.adapt(response).await
    }

    /// Handle a canonical Micropub request.
    pub async fn micropub(&self, req: CanonicalRequest) -> Response<ResponseBody> {
        info!(method = %req.method(), url = %req.url(), "micropub request");
        let backend = match self.admit(&req) {
            Ok(backend) => backend,
            Err(response) => return response,
        };

        let base = self.rewriter.base_for(req.url());
        let outcome = guarded(backend.delegate.micropub(req)).await;
        let mut response = outcome.response;

        if response.status() == StatusCode::CREATED {
            if let Some(slug) = outcome.created_slug.as_deref() {
                if let Err(e) = quillpub_post::normalize_post(
                    backend.store.as_ref(),
                    &self.config.content_dir,
                    slug,
                )
                .await
                {
                    warn!(%slug, error = %e, "post-write normalization failed");
                }
                response = self.rewriter.rewrite_post(response, slug, &base);
            }
        }
        response
    }

    /// Handle a canonical media request, fanning out multi-file uploads.
    pub async fn media(&self, mut req: CanonicalRequest) -> Response<ResponseBody> {
        info!(method = %req.method(), url = %req.url(), "media request");
        let backend = match self.admit(&req) {
            Ok(backend) => backend,
            Err(response) => return response,
        };
        let base = self.rewriter.base_for(req.url());

        if req.is_multipart() && !is_bodyless(req.method()) {
            let head = RequestHead::of(&req);
            let body = match req.read_body().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, "failed to read media upload body");
                    return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
                }
            };
            let form = req
                .header_str(http::header::CONTENT_TYPE.as_str())
                .ok_or(MultipartError::MissingBoundary)
                .and_then(extract_boundary)
                .and_then(|boundary| parse_multipart(&body, &boundary));
            match form {
                Ok(form) if form.file_count() > 1 => {
                    return fan_out(backend.delegate.as_ref(), &self.rewriter, &head, &form).await;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "unreadable multipart body, delegating as-is"),
            }
            req = req.with_buffered_body(body);
        }

        let outcome = guarded(backend.delegate.media(req)).await;
        self.rewriter.rewrite_media(outcome.response, &base)
    }

    /// Apply the config short-circuit and the environment gate.
    fn admit(&self, req: &CanonicalRequest) -> Result<&Backend, Response<ResponseBody>> {
        if is_config_query(req) {
            return Err(config_response(&self.config, req));
        }
        let missing = self.config.missing_required();
        if !missing.is_empty() {
            warn!(?missing, "rejecting request, configuration incomplete");
            return Err(missing_env_response(&missing));
        }
        self.backend.as_ref().ok_or_else(|| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Micropub not initialized",
            )
        })
    }
}
