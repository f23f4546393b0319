//! Quillpub webmentions - refresh the site's webmention cache.
//!
//! Reads `<SITE_URL>/sitemap.xml`, collects mentions of every page from
//! webmention.io and writes `<WEBMENTION_CACHE_DIR>/<base64url>.json` files
//! plus an `index.json` of totals. Exits non-zero when the sitemap cannot be
//! loaded or the cache cannot be written; failing pages are skipped.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SITE_URL` | *(required)* | Site whose pages are synced |
//! | `WEBMENTION_CACHE_DIR` | `data/webmentions` | Cache directory |
//! | `WEBMENTION_API` | `https://webmention.io/api/mentions.jf2` | Mentions API |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result};
use quillpub_webmention::SyncConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = SyncConfig::from_env().context("invalid configuration")?;
    init_tracing(&config.log_level)?;

    info!(
        site_url = %config.site_url,
        cache_dir = %config.cache_dir.display(),
        api = %config.api,
        "starting webmention sync",
    );

    let report = quillpub_webmention::run(&config)
        .await
        .context("webmention sync failed")?;

    info!(
        synced = report.synced,
        skipped = report.skipped.len(),
        "webmention sync done"
    );
    Ok(())
}
