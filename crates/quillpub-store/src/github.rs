//! GitHub repository contents API backend.
//!
//! Maps the [`ContentStore`] protocol onto
//! `GET/PUT/DELETE /repos/{owner}/{repo}/contents/{path}`. File content
//! travels base64-encoded; the blob `sha` returned by GitHub is the revision
//! handle for updates and deletes.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use typed_builder::TypedBuilder;
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::{ContentStore, DirEntry, EntryKind, StoredFile, WriteReceipt};

/// Default GitHub REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// REST API version pinned in every request.
const API_VERSION: &str = "2022-11-28";

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Commit author attached to writes. Defaults to the token's user when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committer {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

/// Connection settings for [`GitHubStore`].
#[derive(Clone, TypedBuilder)]
pub struct GitHubStoreConfig {
    /// Access token sent as a bearer credential.
    #[builder(setter(into))]
    pub token: String,
    /// Repository owner.
    #[builder(setter(into))]
    pub user: String,
    /// Repository name.
    #[builder(setter(into))]
    pub repo: String,
    /// Branch to read from and commit to. `None` uses the repository default.
    #[builder(default, setter(strip_option, into))]
    pub branch: Option<String>,
    /// Commit author override.
    #[builder(default, setter(strip_option))]
    pub committer: Option<Committer>,
    /// API base URL, overridable for GitHub Enterprise.
    #[builder(default = DEFAULT_API_BASE.to_owned(), setter(into))]
    pub api_base: String,
}

impl std::fmt::Debug for GitHubStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubStoreConfig")
            .field("token", &"***")
            .field("user", &self.user)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("committer", &self.committer)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// [`ContentStore`] backed by a GitHub repository.
#[derive(Debug, Clone)]
pub struct GitHubStore {
    client: reqwest::Client,
    config: GitHubStoreConfig,
}

/// `PUT`/`DELETE` payload.
#[derive(Debug, Serialize)]
struct WritePayload<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    committer: Option<&'a Committer>,
}

#[derive(Debug, Deserialize)]
struct ContentsItem {
    name: String,
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    size: u64,
}

impl ContentsItem {
    /// Decoded file bytes.
    ///
    /// Files over 1 MB come back with `encoding: none` and an empty
    /// `content`; those are reported instead of read as empty files.
    fn file_content(&self) -> StoreResult<Bytes> {
        let encoded = self.content.as_deref().unwrap_or_default();
        let encoding = self.encoding.as_deref().unwrap_or("base64");
        if encoding != "base64" || (encoded.trim().is_empty() && self.size > 0) {
            return Err(StoreError::ContentUnavailable {
                path: self.path.clone(),
                encoding: encoding.to_owned(),
            });
        }
        decode_content(encoded)
    }
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: Option<WrittenContent>,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    path: String,
    sha: String,
}

impl GitHubStore {
    /// Create a store with a default HTTP client.
    #[must_use]
    pub fn new(config: GitHubStoreConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a store with a caller-supplied HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: GitHubStoreConfig) -> Self {
        Self { client, config }
    }

    /// The store's connection settings.
    #[must_use]
    pub fn config(&self) -> &GitHubStoreConfig {
        &self.config
    }

    /// Contents API URL for a repository path, with each segment percent-encoded.
    pub fn contents_url(&self, path: &str) -> StoreResult<Url> {
        let encoded: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| utf8_percent_encode(s, PATH_SEGMENT).to_string())
            .collect();
        let raw = format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            utf8_percent_encode(&self.config.user, PATH_SEGMENT),
            utf8_percent_encode(&self.config.repo, PATH_SEGMENT),
            encoded.join("/"),
        );
        Url::parse(&raw).map_err(|e| StoreError::Decode(format!("invalid contents URL {raw}: {e}")))
    }

    fn read_url(&self, path: &str) -> StoreResult<Url> {
        let mut url = self.contents_url(path)?;
        if let Some(branch) = &self.config.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(
                reqwest::header::USER_AGENT,
                concat!("quillpub/", env!("CARGO_PKG_VERSION")),
            )
    }

    async fn get_json(&self, path: &str) -> StoreResult<Option<serde_json::Value>> {
        let url = self.read_url(path)?;
        debug!(%url, "GET contents");
        let resp = self.request(Method::GET, url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(upstream_error(resp).await);
        }
        Ok(Some(resp.json().await?))
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        sha: Option<&str>,
        message: &str,
    ) -> StoreResult<WriteReceipt> {
        let url = self.contents_url(path)?;
        let payload = WritePayload {
            message,
            content: Some(STANDARD.encode(content)),
            sha,
            branch: self.config.branch.as_deref(),
            committer: self.config.committer.as_ref(),
        };
        debug!(%url, update = sha.is_some(), "PUT contents");
        let resp = self.request(Method::PUT, url).json(&payload).send().await?;

        match resp.status() {
            s if s.is_success() => {
                let body: WriteResponse = resp.json().await?;
                let written = body
                    .content
                    .ok_or_else(|| StoreError::Decode("write response without content".into()))?;
                Ok(WriteReceipt {
                    path: written.path,
                    sha: written.sha,
                })
            }
            StatusCode::CONFLICT => Err(StoreError::Conflict {
                path: path.to_owned(),
                sha: sha.unwrap_or_default().to_owned(),
            }),
            // A create without `sha` on an existing path is rejected as unprocessable.
            StatusCode::UNPROCESSABLE_ENTITY if sha.is_none() => Err(StoreError::AlreadyExists {
                path: path.to_owned(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY => Err(StoreError::Conflict {
                path: path.to_owned(),
                sha: sha.unwrap_or_default().to_owned(),
            }),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                path: path.to_owned(),
            }),
            _ => Err(upstream_error(resp).await),
        }
    }
}

#[async_trait]
impl ContentStore for GitHubStore {
    async fn get_file(&self, path: &str) -> StoreResult<Option<StoredFile>> {
        let Some(json) = self.get_json(path).await? else {
            return Ok(None);
        };
        if json.is_array() {
            warn!(%path, "expected a file but found a directory");
            return Ok(None);
        }
        let item: ContentsItem =
            serde_json::from_value(json).map_err(|e| StoreError::Decode(e.to_string()))?;
        let content = item.file_content()?;
        Ok(Some(StoredFile {
            path: item.path,
            content,
            sha: item.sha,
        }))
    }

    async fn create_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> StoreResult<WriteReceipt> {
        self.put(path, content, None, message).await
    }

    async fn update_file(
        &self,
        path: &str,
        content: &[u8],
        sha: &str,
        message: &str,
    ) -> StoreResult<WriteReceipt> {
        self.put(path, content, Some(sha), message).await
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> StoreResult<()> {
        let url = self.contents_url(path)?;
        let payload = WritePayload {
            message,
            content: None,
            sha: Some(sha),
            branch: self.config.branch.as_deref(),
            committer: self.config.committer.as_ref(),
        };
        debug!(%url, "DELETE contents");
        let resp = self
            .request(Method::DELETE, url)
            .json(&payload)
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => Err(StoreError::Conflict {
                path: path.to_owned(),
                sha: sha.to_owned(),
            }),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                path: path.to_owned(),
            }),
            _ => Err(upstream_error(resp).await),
        }
    }

    async fn list_directory(&self, dir: &str) -> StoreResult<Option<Vec<DirEntry>>> {
        let Some(json) = self.get_json(dir).await? else {
            return Ok(None);
        };
        if !json.is_array() {
            return Ok(None);
        }
        let items: Vec<ContentsItem> =
            serde_json::from_value(json).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Some(items.into_iter().map(into_dir_entry).collect()))
    }
}

fn into_dir_entry(item: ContentsItem) -> DirEntry {
    DirEntry {
        kind: if item.kind == "dir" {
            EntryKind::Dir
        } else {
            EntryKind::File
        },
        name: item.name,
        path: item.path,
        sha: item.sha,
    }
}

/// Decode the base64 `content` field, which GitHub wraps at 60 columns.
pub fn decode_content(encoded: &str) -> StoreResult<Bytes> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map(Bytes::from)
        .map_err(|e| StoreError::Decode(format!("invalid base64 content: {e}")))
}

async fn upstream_error(resp: reqwest::Response) -> StoreError {
    let status = resp.status().as_u16();
    let message = match resp.text().await {
        Ok(text) if !text.is_empty() => text,
        _ => StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unknown error")
            .to_owned(),
    };
    warn!(status, %message, "GitHub contents API error");
    StoreError::Upstream { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GitHubStore {
        GitHubStore::new(
            GitHubStoreConfig::builder()
                .token("123456")
                .user("user")
                .repo("repo")
                .branch("main")
                .build(),
        )
    }

    #[test]
    fn test_should_build_contents_url() {
        let url = store().contents_url("src/posts/hello.md").expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/user/repo/contents/src/posts/hello.md"
        );
    }

    #[test]
    fn test_should_percent_encode_path_segments() {
        let url = store().contents_url("/src/images/my photo#1.png").expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/user/repo/contents/src/images/my%20photo%231.png"
        );
    }

    #[test]
    fn test_should_add_branch_ref_to_reads() {
        let url = store().read_url("src/posts/a.md").expect("url");
        assert_eq!(url.query(), Some("ref=main"));
    }

    #[test]
    fn test_should_decode_wrapped_base64_content() {
        let decoded = decode_content("TG9yZW0gaXBzdW0g\nZG9sb3Igc2l0IGFtZXQ=\n").expect("decode");
        assert_eq!(decoded.as_ref(), b"Lorem ipsum dolor sit amet");
    }

    #[test]
    fn test_should_reject_invalid_base64_content() {
        let err = decode_content("***").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn test_should_report_content_not_returned_inline() {
        let item: ContentsItem = serde_json::from_str(
            r#"{"name":"big.md","path":"src/posts/big.md","sha":"1","type":"file",
                "size":2097152,"encoding":"none","content":""}"#,
        )
        .expect("parse");
        let err = item.file_content().unwrap_err();
        assert!(matches!(err, StoreError::ContentUnavailable { ref encoding, .. } if encoding == "none"));
    }

    #[test]
    fn test_should_read_empty_file_as_empty_content() {
        let item: ContentsItem = serde_json::from_str(
            r#"{"name":"e.md","path":"src/posts/e.md","sha":"1","type":"file",
                "size":0,"encoding":"base64","content":""}"#,
        )
        .expect("parse");
        assert!(item.file_content().expect("decode").is_empty());
    }

    #[test]
    fn test_should_serialize_update_payload_with_branch_and_sha() {
        let payload = WritePayload {
            message: "update: a.md",
            content: Some(STANDARD.encode(b"hi")),
            sha: Some("abc123"),
            branch: Some("main"),
            committer: None,
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["sha"], "abc123");
        assert_eq!(json["branch"], "main");
        assert_eq!(json["content"], "aGk=");
        assert!(json.get("committer").is_none());
    }

    #[test]
    fn test_should_map_directory_listing_items() {
        let items: Vec<ContentsItem> = serde_json::from_str(
            r#"[{"name":"a.md","path":"src/posts/a.md","sha":"1","type":"file"},
                {"name":"b","path":"src/posts/b","sha":"2","type":"dir"}]"#,
        )
        .expect("parse");
        let entries: Vec<DirEntry> = items.into_iter().map(into_dir_entry).collect();
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[1].kind, EntryKind::Dir);
        assert_eq!(entries[1].path, "src/posts/b");
    }

    #[test]
    fn test_should_redact_token_in_debug_output() {
        let debug_str = format!("{:?}", store());
        assert!(!debug_str.contains("123456"));
    }
}
