//! `Location` rewriting into the public URL scheme.
//!
//! The endpoint reports locations inside the repository layout (media under
//! `/src/images/`, posts as repository paths). The site serves them elsewhere,
//! so `201` responses get their `Location` rewritten before they leave the
//! gateway. Rewriting is best-effort: on any failure the response is returned
//! unchanged.

use http::header::{HeaderValue, LOCATION};
use http::{Response, StatusCode};
use quillpub_core::{QuillConfig, QuillError, QuillResult};
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::body::ResponseBody;
use crate::response::location_of;

/// Header that lets cross-origin clients read `Location`.
pub const EXPOSE_HEADERS: &str = "access-control-expose-headers";

/// Rewrites `Location` headers from repository paths to public URLs.
#[derive(Debug, Clone)]
pub struct LocationRewriter {
    media_pattern: Regex,
    media_public_path: String,
    post_public_path: String,
    base: Option<Url>,
}

impl LocationRewriter {
    /// Build a rewriter from the media directory and public paths in `config`.
    pub fn new(config: &QuillConfig) -> QuillResult<Self> {
        let media_dir = config.media_dir.trim_matches('/');
        let pattern = format!(r"(https?://[^/]+)?/{}/", regex::escape(media_dir));
        let media_pattern = Regex::new(&pattern)
            .map_err(|e| QuillError::Config(format!("invalid media path pattern {pattern}: {e}")))?;
        Ok(Self {
            media_pattern,
            media_public_path: slash_wrapped(&config.media_public_path),
            post_public_path: slash_wrapped(&config.post_public_path),
            base: config.public_base(),
        })
    }

    /// The base public URLs resolve against: `MICROPUB_BASE`, or the request's origin.
    #[must_use]
    pub fn base_for(&self, request_url: &Url) -> Url {
        if let Some(base) = &self.base {
            return base.clone();
        }
        let mut origin = request_url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        origin
    }

    /// Public URL for a media location.
    #[must_use]
    pub fn media_location(&self, location: &str, base: &Url) -> Option<String> {
        let fixed = self
            .media_pattern
            .replace(location, regex::NoExpand(&self.media_public_path));
        base.join(&fixed).ok().map(String::from)
    }

    /// Public URL for a created post.
    #[must_use]
    pub fn post_location(&self, slug: &str, base: &Url) -> Option<String> {
        let slug = slug.trim_matches('/');
        base.join(&format!("{}{slug}/", self.post_public_path))
            .ok()
            .map(String::from)
    }

    /// Rewrite the `Location` of a `201` media response.
    #[must_use]
    pub fn rewrite_media(
        &self,
        response: Response<ResponseBody>,
        base: &Url,
    ) -> Response<ResponseBody> {
        if response.status() != StatusCode::CREATED {
            return response;
        }
        let Some(location) = location_of(&response).map(str::to_owned) else {
            return response;
        };
        match self.media_location(&location, base) {
            Some(public) => with_location(response, &public),
            None => {
                debug!(%location, "leaving unresolvable media location unchanged");
                response
            }
        }
    }

    /// Point the `Location` of a `201` create response at the public post URL.
    #[must_use]
    pub fn rewrite_post(
        &self,
        response: Response<ResponseBody>,
        slug: &str,
        base: &Url,
    ) -> Response<ResponseBody> {
        if response.status() != StatusCode::CREATED {
            return response;
        }
        match self.post_location(slug, base) {
            Some(public) => with_location(response, &public),
            None => {
                debug!(%slug, "leaving post location unchanged");
                response
            }
        }
    }
}

fn with_location(mut response: Response<ResponseBody>, location: &str) -> Response<ResponseBody> {
    let Ok(value) = HeaderValue::from_str(location) else {
        debug!(%location, "rewritten location is not a valid header value");
        return response;
    };
    let headers = response.headers_mut();
    headers.insert(LOCATION, value);
    headers.insert(EXPOSE_HEADERS, HeaderValue::from_static("Location"));
    response
}

fn slash_wrapped(path: &str) -> String {
    let inner = path.trim().trim_matches('/');
    if inner.is_empty() {
        "/".to_owned()
    } else {
        format!("/{inner}/")
    }
}
