//! Target URL handling: cache keys and the URL variants a mention may point at.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use url::Url;

const SCHEMES: [&str; 2] = ["https", "http"];

/// Cache key for a page URL: fragment dropped, trailing slash added.
///
/// Unparseable input is kept as-is apart from the trailing slash.
#[must_use]
pub fn canonical(raw: &str) -> String {
    let normalized = match Url::parse(raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.to_owned(),
    };
    if normalized.ends_with('/') {
        normalized
    } else {
        format!("{normalized}/")
    }
}

/// Every spelling of `raw` a sender may have used as the mention target.
///
/// Covers both schemes, the `www.` and `blog.` host aliases, and the bare,
/// slash-terminated and `index.html` forms of the path. Order is stable and
/// duplicates are removed.
pub fn variants(raw: &str) -> Result<Vec<String>, url::ParseError> {
    let mut base = Url::parse(raw)?;
    base.set_fragment(None);
    let host = base.host_str().unwrap_or_default().to_owned();

    let mut hosts = vec![host.clone()];
    hosts.push(match host.strip_prefix("www.") {
        Some(bare) => bare.to_owned(),
        None => format!("www.{host}"),
    });
    hosts.push(match host.strip_prefix("blog.") {
        Some(bare) => bare.to_owned(),
        None => format!("blog.{host}"),
    });

    let trimmed = base.path().trim_end_matches('/').to_owned();
    let paths = [
        trimmed.clone(),
        format!("{trimmed}/"),
        format!("{trimmed}/index.html"),
    ];

    let mut out: Vec<String> = Vec::new();
    for scheme in SCHEMES {
        for host in &hosts {
            for path in &paths {
                let mut variant = base.clone();
                if variant.set_scheme(scheme).is_err() || variant.set_host(Some(host.as_str())).is_err() {
                    continue;
                }
                variant.set_path(path);
                let variant = variant.to_string();
                if !out.contains(&variant) {
                    out.push(variant);
                }
            }
        }
    }
    Ok(out)
}

/// Cache file name for a canonical target: URL-safe base64 plus `.json`.
#[must_use]
pub fn cache_file_name(canon: &str) -> String {
    format!("{}.json", URL_SAFE_NO_PAD.encode(canon))
}
