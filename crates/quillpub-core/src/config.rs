//! Environment-driven configuration.
//!
//! Provides [`QuillConfig`], loaded once at start-up and shared read-only by
//! every request handler. Write operations require the values listed in
//! [`REQUIRED_ENV`]; capability discovery works without any of them.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use url::Url;

use crate::error::{QuillError, QuillResult};

/// Environment variables that must be non-empty before posts or media can be written.
pub const REQUIRED_ENV: [&str; 6] = [
    "ME",
    "TOKEN_ENDPOINT",
    "GITHUB_TOKEN",
    "GITHUB_USER",
    "GITHUB_REPO",
    "MICROPUB_BASE",
];

/// Endpoint configuration.
///
/// # Examples
///
/// ```
/// use quillpub_core::QuillConfig;
///
/// let config = QuillConfig::default();
/// assert_eq!(config.github_branch, "main");
/// assert_eq!(config.missing_required().len(), 6);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct QuillConfig {
    /// Bind address for the HTTP server.
    #[builder(default = String::from("0.0.0.0:3000"))]
    pub gateway_listen: String,

    /// The site owner's IndieAuth identity URL (`ME`).
    #[builder(default)]
    pub me: String,

    /// IndieAuth token endpoint used to verify bearer tokens.
    #[builder(default)]
    pub token_endpoint: String,

    /// GitHub access token for the content repository.
    #[builder(default)]
    #[serde(skip_serializing)]
    pub github_token: String,

    /// Owner of the content repository.
    #[builder(default)]
    pub github_user: String,

    /// Name of the content repository.
    #[builder(default)]
    pub github_repo: String,

    /// Branch commits are written to.
    #[builder(default = String::from("main"))]
    pub github_branch: String,

    /// Public base URL of the site (`MICROPUB_BASE`).
    #[builder(default)]
    pub micropub_base: String,

    /// Repository directory posts are written to.
    #[builder(default = String::from("src/posts"))]
    pub content_dir: String,

    /// Repository directory uploaded media is written to.
    #[builder(default = String::from("src/images"))]
    pub media_dir: String,

    /// Public path prefix media is served from.
    #[builder(default = String::from("/images/"))]
    pub media_public_path: String,

    /// Public path prefix posts are served from.
    #[builder(default = String::from("/posts/"))]
    pub post_public_path: String,

    /// Log level filter string.
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl std::fmt::Debug for QuillConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuillConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("me", &self.me)
            .field("token_endpoint", &self.token_endpoint)
            .field(
                "github_token",
                &if self.github_token.is_empty() { "" } else { "***" },
            )
            .field("github_user", &self.github_user)
            .field("github_repo", &self.github_repo)
            .field("github_branch", &self.github_branch)
            .field("micropub_base", &self.micropub_base)
            .field("content_dir", &self.content_dir)
            .field("media_dir", &self.media_dir)
            .field("media_public_path", &self.media_public_path)
            .field("post_public_path", &self.post_public_path)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl QuillConfig {
    /// Load configuration from process environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:3000` |
    /// | `ME` | *(required)* |
    /// | `TOKEN_ENDPOINT` | *(required)* |
    /// | `GITHUB_TOKEN` | *(required)* |
    /// | `GITHUB_USER` | *(required)* |
    /// | `GITHUB_REPO` | *(required)* |
    /// | `GITHUB_BRANCH` | `main` |
    /// | `MICROPUB_BASE` | *(required)* |
    /// | `CONTENT_DIR` | `src/posts` |
    /// | `MEDIA_DIR` | `src/images` |
    /// | `MEDIA_PUBLIC_PATH` | `/images/` |
    /// | `POST_PUBLIC_PATH` | `/posts/` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults. Empty values for optional keys also keep
    /// their defaults; required keys keep whatever was provided so the gate can
    /// report them.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = optional("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("ME") {
            config.me = v;
        }
        if let Some(v) = lookup("TOKEN_ENDPOINT") {
            config.token_endpoint = v;
        }
        if let Some(v) = lookup("GITHUB_TOKEN") {
            config.github_token = v;
        }
        if let Some(v) = lookup("GITHUB_USER") {
            config.github_user = v;
        }
        if let Some(v) = lookup("GITHUB_REPO") {
            config.github_repo = v;
        }
        if let Some(v) = optional("GITHUB_BRANCH") {
            config.github_branch = v;
        }
        if let Some(v) = lookup("MICROPUB_BASE") {
            config.micropub_base = v;
        }
        if let Some(v) = optional("CONTENT_DIR") {
            config.content_dir = trim_slashes(&v);
        }
        if let Some(v) = optional("MEDIA_DIR") {
            config.media_dir = trim_slashes(&v);
        }
        if let Some(v) = optional("MEDIA_PUBLIC_PATH") {
            config.media_public_path = v;
        }
        if let Some(v) = optional("POST_PUBLIC_PATH") {
            config.post_public_path = v;
        }
        if let Some(v) = optional("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Required keys that are unset or blank, in [`REQUIRED_ENV`] order.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_ENV
            .into_iter()
            .filter(|key| self.required_value(key).trim().is_empty())
            .collect()
    }

    /// Whether every required value is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// The configured public base URL, if set and parsable.
    #[must_use]
    pub fn public_base(&self) -> Option<Url> {
        let raw = self.micropub_base.trim();
        if raw.is_empty() {
            return None;
        }
        match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(micropub_base = raw, error = %e, "ignoring unparsable MICROPUB_BASE");
                None
            }
        }
    }

    /// Parse the listen address.
    pub fn listen_addr(&self) -> QuillResult<SocketAddr> {
        self.gateway_listen.parse().map_err(|e| {
            QuillError::Config(format!("invalid bind address {}: {e}", self.gateway_listen))
        })
    }

    fn required_value(&self, key: &str) -> &str {
        match key {
            "ME" => &self.me,
            "TOKEN_ENDPOINT" => &self.token_endpoint,
            "GITHUB_TOKEN" => &self.github_token,
            "GITHUB_USER" => &self.github_user,
            "GITHUB_REPO" => &self.github_repo,
            "MICROPUB_BASE" => &self.micropub_base,
            _ => "",
        }
    }
}

fn trim_slashes(value: &str) -> String {
    value.trim().trim_matches('/').to_owned()
}
