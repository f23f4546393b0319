//! Sitemap loading.

use std::sync::LazyLock;

use regex::Regex;
use tracing::info;
use url::Url;

use crate::error::{SyncError, SyncResult};

static LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<loc>([^<]+)</loc>").expect("valid regex"));

/// `<loc>` entries of a sitemap that belong to `site_url`.
#[must_use]
pub fn page_urls(xml: &str, site_url: &str) -> Vec<String> {
    LOC.captures_iter(xml)
        .map(|caps| caps[1].trim().to_owned())
        .filter(|loc| loc.starts_with(site_url))
        .collect()
}

/// Download `<site_url>/sitemap.xml` and return the site's page URLs.
pub async fn fetch_page_urls(client: &reqwest::Client, site_url: &str) -> SyncResult<Vec<String>> {
    let url = Url::parse(site_url)?.join("/sitemap.xml")?;
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SyncError::Sitemap {
            status: status.as_u16(),
        });
    }
    let urls = page_urls(&resp.text().await?, site_url);
    info!(site = site_url, pages = urls.len(), "loaded sitemap");
    Ok(urls)
}
