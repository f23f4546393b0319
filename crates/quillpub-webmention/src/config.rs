//! Sync configuration.

use std::path::PathBuf;

use typed_builder::TypedBuilder;

use crate::error::{SyncError, SyncResult};

/// Default webmention.io JF2 endpoint.
pub const DEFAULT_API: &str = "https://webmention.io/api/mentions.jf2";

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "data/webmentions";

/// Configuration for a sync pass.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SyncConfig {
    /// Site whose sitemap is synced, e.g. `https://blog.example.com`.
    pub site_url: String,

    /// Directory the cache files are written to.
    #[builder(default = PathBuf::from(DEFAULT_CACHE_DIR))]
    pub cache_dir: PathBuf,

    /// Mentions API endpoint.
    #[builder(default = String::from(DEFAULT_API))]
    pub api: String,

    /// Log level filter string.
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl SyncConfig {
    /// Load configuration from process environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SITE_URL` | *(required)* |
    /// | `WEBMENTION_CACHE_DIR` | `data/webmentions` |
    /// | `WEBMENTION_API` | `https://webmention.io/api/mentions.jf2` |
    /// | `LOG_LEVEL` | `info` |
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SyncResult<Self> {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let site_url = value("SITE_URL")
            .ok_or_else(|| SyncError::Config("SITE_URL is required".into()))?;
        url::Url::parse(&site_url)?;

        Ok(Self {
            site_url: site_url.trim_end_matches('/').to_owned(),
            cache_dir: value("WEBMENTION_CACHE_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR), PathBuf::from),
            api: value("WEBMENTION_API").unwrap_or_else(|| DEFAULT_API.to_owned()),
            log_level: value("LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
        })
    }
}
