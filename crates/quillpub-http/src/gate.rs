//! Environment gate and capability discovery.
//!
//! `GET ?q=config` is answered here, before any configuration check, so
//! clients can discover the media endpoint even on a half-configured
//! deployment. Every other request needs the full set of required values.

use http::{Method, Response, StatusCode};
use quillpub_core::QuillConfig;
use quillpub_post::PostType;
use serde::Serialize;
use url::Url;

use crate::body::ResponseBody;
use crate::canonical::CanonicalRequest;
use crate::response::json_response;

/// Path of the media endpoint, relative to the public base.
pub const MEDIA_ENDPOINT_PATH: &str = "/api/media";

/// Post types advertised to clients.
pub const ADVERTISED_POST_TYPES: [PostType; 2] = [PostType::Note, PostType::Article];

/// An entry of the `post-types` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvertisedType {
    /// Post type value.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Human-readable name.
    pub name: &'static str,
}

/// Body of the `q=config` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityConfig {
    /// Absolute media endpoint URL.
    #[serde(rename = "media-endpoint")]
    pub media_endpoint: String,
    /// Supported post types.
    #[serde(rename = "post-types")]
    pub post_types: Vec<AdvertisedType>,
}

impl CapabilityConfig {
    /// Capabilities for a public base such as `https://blog.example.com`.
    #[must_use]
    pub fn for_base(base: &str) -> Self {
        Self {
            media_endpoint: format!("{}{MEDIA_ENDPOINT_PATH}", base.trim_end_matches('/')),
            post_types: ADVERTISED_POST_TYPES
                .iter()
                .map(|t| AdvertisedType {
                    kind: t.as_str(),
                    name: display_name(*t),
                })
                .collect(),
        }
    }
}

fn display_name(post_type: PostType) -> &'static str {
    match post_type {
        PostType::Note => "Note",
        PostType::Article => "Article",
        PostType::Photo => "Photo",
        PostType::Bookmark => "Bookmark",
        PostType::Like => "Like",
        PostType::Repost => "Repost",
        PostType::Reply => "Reply",
    }
}

/// Whether the request is the capability discovery query.
#[must_use]
pub fn is_config_query(req: &CanonicalRequest) -> bool {
    *req.method() == Method::GET && req.query_param("q").as_deref() == Some("config")
}

/// `MICROPUB_BASE` when set, otherwise the request's scheme and host.
#[must_use]
pub fn public_origin(micropub_base: &str, request_url: &Url) -> String {
    let base = micropub_base.trim();
    if base.is_empty() {
        request_url.origin().ascii_serialization()
    } else {
        base.trim_end_matches('/').to_owned()
    }
}

/// The `q=config` response.
#[must_use]
pub fn config_response(config: &QuillConfig, req: &CanonicalRequest) -> Response<ResponseBody> {
    let capabilities = CapabilityConfig::for_base(&public_origin(&config.micropub_base, req.url()));
    let value = serde_json::to_value(&capabilities).unwrap_or_default();
    json_response(StatusCode::OK, &value)
}

/// The `500` response naming every missing configuration key.
#[must_use]
pub fn missing_env_response(missing: &[&str]) -> Response<ResponseBody> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &serde_json::json!({
            "error": "Missing environment variables",
            "missing": missing,
        }),
    )
}
