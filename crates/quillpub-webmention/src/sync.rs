//! A sync pass: collect mentions per page and write the JSON cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::api::{MentionApi, WebmentionIo, fetch_all};
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::mentions::{MentionCounts, dedup, summarize};
use crate::sitemap::fetch_page_urls;
use crate::target::{cache_file_name, canonical, variants};

/// Name of the totals index written next to the per-page files.
pub const INDEX_FILE: &str = "index.json";

/// Cached mentions of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Canonical page URL.
    pub target: String,
    /// Counts by kind.
    pub counts: MentionCounts,
    /// De-duplicated raw mentions.
    pub items: Vec<Value>,
    /// When the entry was fetched (RFC 3339).
    pub fetched_at: String,
}

/// Outcome of [`Syncer::sync_urls`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Pages whose cache file was written.
    pub synced: usize,
    /// Pages skipped because of an error.
    pub skipped: Vec<String>,
}

/// Writes mention caches for a list of pages.
#[derive(Debug, Clone)]
pub struct Syncer {
    api: Arc<dyn MentionApi>,
    cache_dir: PathBuf,
}

impl Syncer {
    /// Syncer writing into `cache_dir`.
    pub fn new(api: Arc<dyn MentionApi>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            cache_dir: cache_dir.into(),
        }
    }

    /// Sync every page, then rewrite the totals index.
    ///
    /// A page that fails is logged and skipped; only cache directory and
    /// index write failures abort the pass.
    pub async fn sync_urls(&self, urls: &[String]) -> SyncResult<SyncReport> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let mut report = SyncReport::default();
        for original in urls {
            match self.sync_page(original).await {
                Ok(entry) => {
                    info!(url = %entry.target, total = entry.counts.total, "synced mentions");
                    report.synced += 1;
                }
                Err(e) => {
                    warn!(url = %original, error = %e, "skipped page");
                    report.skipped.push(original.clone());
                }
            }
        }

        self.write_index(urls).await?;
        Ok(report)
    }

    /// Collect, count and cache the mentions of one page.
    pub async fn sync_page(&self, original: &str) -> SyncResult<CacheEntry> {
        let target = canonical(original);
        let items = self.collect(original).await?;
        let entry = CacheEntry {
            counts: summarize(&items),
            items,
            fetched_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            target,
        };
        let path = self.cache_dir.join(cache_file_name(&entry.target));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&entry)?).await?;
        Ok(entry)
    }

    /// Mentions of every variant of `original`, de-duplicated.
    ///
    /// Variants are fetched concurrently; a failing variant contributes nothing.
    pub async fn collect(&self, original: &str) -> SyncResult<Vec<Value>> {
        let targets = variants(original)?;
        let batches = futures::future::join_all(targets.iter().map(|target| async move {
            match fetch_all(self.api.as_ref(), target).await {
                Ok(items) => {
                    debug!(url = %target, items = items.len(), "fetched variant");
                    items
                }
                Err(e) => {
                    debug!(url = %target, error = %e, "variant fetch failed");
                    Vec::new()
                }
            }
        }))
        .await;
        Ok(dedup(batches.into_iter().flatten()))
    }

    async fn write_index(&self, urls: &[String]) -> SyncResult<()> {
        let mut totals = Map::new();
        for original in urls {
            let target = canonical(original);
            let counts = read_counts(&self.cache_dir.join(cache_file_name(&target)))
                .await
                .unwrap_or_else(|| json!({ "total": 0 }));
            totals.insert(target, counts);
        }
        let index = json!({ "totalsByUrl": totals });
        tokio::fs::write(
            self.cache_dir.join(INDEX_FILE),
            serde_json::to_vec_pretty(&index)?,
        )
        .await?;
        Ok(())
    }
}

async fn read_counts(path: &Path) -> Option<Value> {
    let raw = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice::<Value>(&raw) {
        Ok(mut entry) => entry.get_mut("counts").map(Value::take),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable cache file");
            None
        }
    }
}

/// Load the sitemap for `config.site_url` and sync every page in it.
///
/// Fails only when the sitemap cannot be loaded or the cache cannot be written.
pub async fn run(config: &SyncConfig) -> SyncResult<SyncReport> {
    let client = reqwest::Client::new();
    let urls = fetch_page_urls(&client, &config.site_url).await?;
    let api = WebmentionIo::new(client, &config.api)?;
    Syncer::new(Arc::new(api), config.cache_dir.clone())
        .sync_urls(&urls)
        .await
}
