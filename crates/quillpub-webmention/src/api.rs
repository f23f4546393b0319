//! Mentions API client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Page size requested from the API. A shorter page ends the listing.
pub const PER_PAGE: usize = 100;

/// Source of mentions for a target URL, one page at a time.
#[async_trait]
pub trait MentionApi: Send + Sync + std::fmt::Debug {
    /// Fetch page `page` (zero-based) of mentions of `target`.
    async fn page(&self, target: &str, page: usize) -> SyncResult<Vec<Value>>;
}

/// webmention.io JF2 client.
#[derive(Debug, Clone)]
pub struct WebmentionIo {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    children: Vec<Value>,
}

impl WebmentionIo {
    /// Client for the given `mentions.jf2` endpoint.
    pub fn new(client: reqwest::Client, endpoint: &str) -> SyncResult<Self> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }
}

#[async_trait]
impl MentionApi for WebmentionIo {
    async fn page(&self, target: &str, page: usize) -> SyncResult<Vec<Value>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("target", target)
            .append_pair("per-page", &PER_PAGE.to_string())
            .append_pair("page", &page.to_string());

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Api {
                status: status.as_u16(),
                target: target.to_owned(),
            });
        }
        let feed: Feed = resp.json().await?;
        debug!(url = target, page, items = feed.children.len(), "fetched mentions page");
        Ok(feed.children)
    }
}

/// Fetch every page of mentions of `target`.
pub async fn fetch_all(api: &dyn MentionApi, target: &str) -> SyncResult<Vec<Value>> {
    let mut out = Vec::new();
    let mut page = 0;
    loop {
        let items = api.page(target, page).await?;
        let last = items.len() < PER_PAGE;
        out.extend(items);
        if last {
            return Ok(out);
        }
        page += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    #[derive(Debug, Default)]
    struct Paged {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MentionApi for Paged {
        async fn page(&self, _target: &str, page: usize) -> SyncResult<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let len = if page < 2 { PER_PAGE } else { 7 };
            Ok((0..len).map(|i| json!({"wm-id": page * PER_PAGE + i})).collect())
        }
    }

    #[tokio::test]
    async fn test_should_page_until_short_page() {
        let api = Paged::default();
        let items = fetch_all(&api, "https://a.example/").await.expect("items");
        assert_eq!(items.len(), 2 * PER_PAGE + 7);
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_should_parse_feed_without_children() {
        let feed: Feed = serde_json::from_str(r#"{"type":"feed"}"#).expect("feed");
        assert!(feed.children.is_empty());
    }
}
