//! The Micropub endpoint.
//!
//! [`MicropubEndpoint`] implements [`MicropubDelegate`]: it authenticates the
//! request, parses the body, and reads or writes posts and media through the
//! [`ContentStore`]. Creates report the final slug in the returned
//! [`DelegateOutcome`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use http::header::{HeaderValue, LOCATION};
use http::{Method, Response, StatusCode};
use quillpub_core::QuillConfig;
use quillpub_http::gate::{CapabilityConfig, public_origin};
use quillpub_http::multipart::{extract_boundary, parse_multipart};
use quillpub_http::{
    CanonicalRequest, DelegateOutcome, MicropubDelegate, MultipartForm, MultipartPart,
    ResponseBody, empty_response, json_response,
};
use quillpub_post::{Document, PostType, candidate_paths};
use quillpub_store::{ContentStore, StoreError, StoredFile};
use serde_json::Value;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use url::Url;

use crate::auth::{Scope, TokenVerifier, authorize, bearer_token, check_identity};
use crate::error::{EndpointError, EndpointResult};
use crate::request::{
    CreateRequest, MicropubRequest, ParsedBody, UpdateRequest, parse_form, parse_json,
    parse_multipart_body,
};
use crate::translate::{apply_update, derive_slug, render_post, source_json};

/// Highest numeric suffix tried when a slug or file name is taken.
pub const MAX_SUFFIX: usize = 100;

/// Maps `(post type, slug)` to the slug used for the file name.
pub type SlugFormatter = Arc<dyn Fn(PostType, &str) -> String + Send + Sync>;

/// Endpoint options.
#[derive(Clone, TypedBuilder)]
pub struct EndpointOptions {
    /// The site owner's identity URL.
    pub me: String,

    /// Public base URL of the site, used for `q=config`.
    #[builder(default)]
    pub micropub_base: String,

    /// Repository directory for posts.
    #[builder(default = String::from("src/posts"))]
    pub content_dir: String,

    /// Repository directory for media.
    #[builder(default = String::from("src/images"))]
    pub media_dir: String,

    /// Map microformats names to front matter names.
    #[builder(default = true)]
    pub translate_props: bool,

    /// Optional slug formatter.
    #[builder(default, setter(strip_option))]
    pub format_slug: Option<SlugFormatter>,
}

impl std::fmt::Debug for EndpointOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointOptions")
            .field("me", &self.me)
            .field("micropub_base", &self.micropub_base)
            .field("content_dir", &self.content_dir)
            .field("media_dir", &self.media_dir)
            .field("translate_props", &self.translate_props)
            .field("format_slug", &self.format_slug.as_ref().map(|_| "..."))
            .finish()
    }
}

impl EndpointOptions {
    /// Options derived from the gateway configuration.
    #[must_use]
    pub fn from_config(config: &QuillConfig) -> Self {
        Self::builder()
            .me(config.me.clone())
            .micropub_base(config.micropub_base.clone())
            .content_dir(config.content_dir.clone())
            .media_dir(config.media_dir.clone())
            .build()
    }

    fn url_for(&self, dir: &str, name: &str) -> String {
        format!(
            "{}/{}/{name}",
            self.me.trim_end_matches('/'),
            dir.trim_matches('/')
        )
    }
}

/// A Micropub endpoint over a content store.
#[derive(Debug, Clone)]
pub struct MicropubEndpoint {
    store: Arc<dyn ContentStore>,
    verifier: Arc<dyn TokenVerifier>,
    options: EndpointOptions,
}

impl MicropubEndpoint {
    /// Create an endpoint.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContentStore>,
        verifier: Arc<dyn TokenVerifier>,
        options: EndpointOptions,
    ) -> Self {
        Self {
            store,
            verifier,
            options,
        }
    }

    /// The endpoint's options.
    #[must_use]
    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    async fn handle_micropub(&self, mut req: CanonicalRequest) -> EndpointResult<DelegateOutcome> {
        if *req.method() == Method::GET {
            let token = bearer_token(req.headers());
            return self
                .query(req.url().clone(), token)
                .await
                .map(DelegateOutcome::new);
        }
        if *req.method() != Method::POST {
            return Err(EndpointError::InvalidRequest(format!(
                "unsupported method {}",
                req.method()
            )));
        }

        let parsed = parse_body(&mut req).await?;
        let token = bearer_token(req.headers()).or(parsed.access_token);
        let info = match token {
            Some(token) => self.verifier.verify(&token).await?,
            None => return Err(EndpointError::Unauthorized("missing access token".into())),
        };

        match parsed.request {
            MicropubRequest::Create(create) => {
                authorize(&info, &self.options.me, Scope::Create)?;
                if !create.uploads.is_empty() {
                    authorize(&info, &self.options.me, Scope::Media)?;
                }
                self.create(create).await
            }
            MicropubRequest::Update(update) => {
                authorize(&info, &self.options.me, Scope::Update)?;
                self.update(update).await
            }
            MicropubRequest::Delete { url } => {
                authorize(&info, &self.options.me, Scope::Delete)?;
                self.delete(&url).await
            }
            MicropubRequest::Undelete { .. } => Err(EndpointError::InvalidRequest(
                "undelete is not supported".into(),
            )),
        }
    }

    /// Answer a `GET` query. Takes owned request parts: the request body is
    /// not `Sync`, so a borrowed request cannot live across an await.
    async fn query(
        &self,
        url: Url,
        header_token: Option<String>,
    ) -> EndpointResult<Response<ResponseBody>> {
        let query_param = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };
        let token = header_token
            .or_else(|| query_param("access_token"))
            .ok_or_else(|| EndpointError::Unauthorized("missing access token".into()))?;
        let info = self.verifier.verify(&token).await?;
        check_identity(&info, &self.options.me)?;

        match query_param("q").as_deref() {
            Some("config") => {
                let capabilities = CapabilityConfig::for_base(&public_origin(
                    &self.options.micropub_base,
                    &url,
                ));
                let mut value = serde_json::to_value(&capabilities).unwrap_or_default();
                value["syndicate-to"] = Value::Array(Vec::new());
                Ok(json_response(StatusCode::OK, &value))
            }
            Some("syndicate-to") => Ok(json_response(
                StatusCode::OK,
                &serde_json::json!({ "syndicate-to": [] }),
            )),
            Some("source") => {
                let post_url = query_param("url")
                    .ok_or_else(|| EndpointError::InvalidRequest("missing url".into()))?;
                let file = self.find_post(&post_url).await?;
                let only: Vec<String> = url
                    .query_pairs()
                    .filter(|(k, _)| k == "properties[]" || k == "properties")
                    .map(|(_, v)| v.into_owned())
                    .collect();
                let doc = Document::parse(&file.text());
                Ok(json_response(
                    StatusCode::OK,
                    &source_json(&doc, &only, self.options.translate_props),
                ))
            }
            Some(other) => Err(EndpointError::InvalidRequest(format!(
                "unsupported query: {other}"
            ))),
            None => Err(EndpointError::InvalidRequest("missing q parameter".into())),
        }
    }

    async fn create(&self, mut create: CreateRequest) -> EndpointResult<DelegateOutcome> {
        for (property, part) in std::mem::take(&mut create.uploads) {
            let url = self.upload(&part).await?;
            create.properties.push(&property, Value::String(url));
        }

        let now = Utc::now();
        let text = render_post(&create.properties, now, self.options.translate_props);
        let post_type = Document::parse(&text)
            .front_matter
            .as_ref()
            .map_or(PostType::Note, PostType::classify);
        let base = derive_slug(&create.properties, now);
        let slug = match &self.options.format_slug {
            Some(formatter) => formatter(post_type, &base),
            None => base,
        };

        let dir = self.options.content_dir.trim_matches('/');
        let (slug, path) = self
            .free_path(&slug, |candidate| format!("{dir}/{candidate}.md"))
            .await?;
        self.store
            .create_file(&path, text.as_bytes(), &format!("micropub: create {slug}"))
            .await?;
        info!(%path, %slug, %post_type, kind = %create.kind, "created post");

        let location = self.options.url_for(&self.options.content_dir, &slug);
        Ok(DelegateOutcome::created(
            with_location(StatusCode::CREATED, &location),
            slug,
        ))
    }

    async fn update(&self, update: UpdateRequest) -> EndpointResult<DelegateOutcome> {
        let file = self.find_post(&update.url).await?;
        let mut doc = Document::parse(&file.text());
        apply_update(
            &mut doc,
            &update.replace,
            &update.add,
            update.delete.as_ref(),
            self.options.translate_props,
        );
        let text = doc.render();
        if text == file.text() {
            debug!(path = %file.path, "update left post unchanged");
        } else {
            self.store
                .update_file(
                    &file.path,
                    text.as_bytes(),
                    &file.sha,
                    &format!("micropub: update {}", file.path),
                )
                .await?;
            info!(path = %file.path, "updated post");
        }
        Ok(DelegateOutcome::new(empty_response(StatusCode::NO_CONTENT)))
    }

    async fn delete(&self, url: &str) -> EndpointResult<DelegateOutcome> {
        let file = self.find_post(url).await?;
        self.store
            .delete_file(&file.path, &file.sha, &format!("micropub: delete {}", file.path))
            .await?;
        info!(path = %file.path, "deleted post");
        Ok(DelegateOutcome::new(empty_response(StatusCode::NO_CONTENT)))
    }

    async fn handle_media(&self, mut req: CanonicalRequest) -> EndpointResult<DelegateOutcome> {
        if *req.method() != Method::POST {
            return Err(EndpointError::InvalidRequest(
                "media uploads must use POST".into(),
            ));
        }
        if !req.is_multipart() {
            return Err(EndpointError::InvalidRequest(
                "media uploads must be multipart/form-data".into(),
            ));
        }
        let body = req
            .read_body()
            .await
            .map_err(|e| EndpointError::InvalidRequest(format!("unreadable body: {e}")))?;
        let form = multipart_form(&req, &body)?;

        let token = bearer_token(req.headers())
            .or_else(|| form.field_value("access_token"))
            .ok_or_else(|| EndpointError::Unauthorized("missing access token".into()))?;
        let info = self.verifier.verify(&token).await?;
        authorize(&info, &self.options.me, Scope::Media)?;

        let file = form
            .files()
            .find(|part| part.name == "file")
            .or_else(|| form.files().next())
            .ok_or_else(|| EndpointError::InvalidRequest("missing file".into()))?;
        let url = self.upload(file).await?;
        Ok(DelegateOutcome::new(with_location(StatusCode::CREATED, &url)))
    }

    /// Store an uploaded file under the media directory and return its URL.
    async fn upload(&self, part: &MultipartPart) -> EndpointResult<String> {
        let (stem, ext) = media_name(part.filename.as_deref().unwrap_or_default());
        let dir = self.options.media_dir.trim_matches('/');
        let (name, path) = self
            .free_path(&stem, |candidate| match &ext {
                Some(ext) => format!("{dir}/{candidate}.{ext}"),
                None => format!("{dir}/{candidate}"),
            })
            .await?;
        let file_name = path.rsplit('/').next().unwrap_or(&name).to_owned();
        self.store
            .create_file(&path, &part.data, &format!("micropub: upload {file_name}"))
            .await?;
        info!(%path, bytes = part.data.len(), "stored media");
        Ok(self.options.url_for(&self.options.media_dir, &file_name))
    }

    /// First `base`, `base-2`, `base-3`, ... whose path is free.
    async fn free_path(
        &self,
        base: &str,
        path_for: impl Fn(&str) -> String,
    ) -> EndpointResult<(String, String)> {
        for n in 1..=MAX_SUFFIX {
            let candidate = if n == 1 {
                base.to_owned()
            } else {
                format!("{base}-{n}")
            };
            let path = path_for(&candidate);
            if self.store.get_file(&path).await?.is_none() {
                return Ok((candidate, path));
            }
        }
        Err(EndpointError::Store(StoreError::AlreadyExists {
            path: path_for(base),
        }))
    }

    /// Locate the stored file for a post URL.
    async fn find_post(&self, url: &str) -> EndpointResult<StoredFile> {
        let slug = slug_from_url(url)
            .ok_or_else(|| EndpointError::InvalidRequest(format!("not a post URL: {url}")))?;
        for path in candidate_paths(&self.options.content_dir, &slug) {
            if let Some(file) = self.store.get_file(&path).await? {
                return Ok(file);
            }
        }
        warn!(%url, %slug, "no stored post for URL");
        Err(EndpointError::InvalidRequest(format!("post not found: {url}")))
    }
}

#[async_trait]
impl MicropubDelegate for MicropubEndpoint {
    async fn micropub(&self, req: CanonicalRequest) -> anyhow::Result<DelegateOutcome> {
        match self.handle_micropub(req).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                debug!(error = %err, "micropub request failed");
                err.into_outcome()
            }
        }
    }

    async fn media(&self, req: CanonicalRequest) -> anyhow::Result<DelegateOutcome> {
        match self.handle_media(req).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                debug!(error = %err, "media request failed");
                err.into_outcome()
            }
        }
    }
}

async fn parse_body(req: &mut CanonicalRequest) -> EndpointResult<ParsedBody> {
    let content_type = req.content_type();
    let body = req
        .read_body()
        .await
        .map_err(|e| EndpointError::InvalidRequest(format!("unreadable body: {e}")))?;

    match content_type {
        Some(ct) if ct.subtype() == mime::JSON || ct.suffix() == Some(mime::JSON) => {
            parse_json(&body)
        }
        Some(ct) if ct.type_() == mime::MULTIPART => {
            parse_multipart_body(multipart_form(req, &body)?)
        }
        _ => parse_form(&body),
    }
}

fn multipart_form(req: &CanonicalRequest, body: &[u8]) -> EndpointResult<MultipartForm> {
    let content_type = req.header_str("content-type").unwrap_or_default();
    extract_boundary(content_type)
        .and_then(|boundary| parse_multipart(body, &boundary))
        .map_err(|e| EndpointError::InvalidRequest(e.to_string()))
}

fn with_location(status: StatusCode, location: &str) -> Response<ResponseBody> {
    let mut response = empty_response(status);
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(LOCATION, value);
    }
    response
}

/// Slug named by a post URL: its last path segment without a Markdown extension.
#[must_use]
pub fn slug_from_url(url: &str) -> Option<String> {
    let path = Url::parse(url)
        .map(|u| u.path().to_owned())
        .unwrap_or_else(|_| url.to_owned());
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())?;
    let segment = if segment == "index.md" {
        path.trim_end_matches('/')
            .trim_end_matches("/index.md")
            .rsplit('/')
            .next()?
    } else {
        segment
    };
    let slug = [".md", ".mdx", ".markdown"]
        .iter()
        .find_map(|ext| segment.strip_suffix(ext))
        .unwrap_or(segment);
    (!slug.is_empty()).then(|| slug.to_owned())
}

/// Slugified file stem and lowercased extension for an uploaded file name.
#[must_use]
pub fn media_name(filename: &str) -> (String, Option<String>) {
    let filename = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (filename, None),
    };
    let stem = slug::slugify(stem);
    let stem = if stem.is_empty() {
        Utc::now().format("%Y%m%d%H%M%S").to_string()
    } else {
        stem
    };
    (stem, ext.filter(|e| !e.is_empty()))
}

#[cfg(test)]
mod tests {
    use http::HeaderMap;
    use http::header::{AUTHORIZATION, CONTENT_TYPE};
    use quillpub_http::full_body;
    use quillpub_http::multipart::{content_type_for, encode_multipart};
    use quillpub_store::MemoryStore;

    use super::*;
    use crate::auth::{StaticTokenVerifier, TokenInfo};

    const ME: &str = "https://me.example/";

    fn endpoint_with(scope: &str) -> (MicropubEndpoint, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let verifier = StaticTokenVerifier::new([("t".to_owned(), TokenInfo::new(ME, scope))]);
        let options = EndpointOptions::builder()
            .me(ME.to_owned())
            .micropub_base("https://blog.example.com".to_owned())
            .build();
        (
            MicropubEndpoint::new(store.clone(), Arc::new(verifier), options),
            store,
        )
    }

    fn endpoint() -> (MicropubEndpoint, Arc<MemoryStore>) {
        endpoint_with("create update delete media")
    }

    fn request(method: Method, url: &str, content_type: &str, body: impl Into<bytes::Bytes>) -> CanonicalRequest {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        if let Ok(ct) = HeaderValue::from_str(content_type) {
            headers.insert(CONTENT_TYPE, ct);
        }
        CanonicalRequest::new(
            method,
            Url::parse(url).expect("valid url"),
            headers,
            Some(full_body(body.into())),
        )
    }

    fn form_post(body: &'static str) -> CanonicalRequest {
        request(
            Method::POST,
            "https://blog.example.com/api/micropub",
            "application/x-www-form-urlencoded",
            body,
        )
    }

    fn json_post(body: &'static str) -> CanonicalRequest {
        request(
            Method::POST,
            "https://blog.example.com/api/micropub",
            "application/json",
            body,
        )
    }

    async fn json_body(resp: Response<ResponseBody>) -> Value {
        serde_json::from_slice(&resp.into_body().into_bytes().await).expect("json body")
    }

    #[tokio::test]
    async fn test_should_create_post_from_form() {
        let (ep, store) = endpoint();
        let outcome = ep
            .micropub(form_post("h=entry&name=Hello+World&content=First+post&category[]=rust"))
            .await
            .expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::CREATED);
        assert_eq!(outcome.created_slug.as_deref(), Some("hello-world"));
        assert_eq!(
            quillpub_http::response::location_of(&outcome.response),
            Some("https://me.example/src/posts/hello-world")
        );
        let text = store.text("src/posts/hello-world.md").expect("stored");
        assert!(text.starts_with("---\ntitle: \"Hello World\"\ntags: \"rust\"\ndate: \""));
        assert!(text.ends_with("---\nFirst post\n"));
    }

    #[tokio::test]
    async fn test_should_suffix_colliding_slugs() {
        let (ep, store) = endpoint();
        store.put("src/posts/hello.md", "taken");
        store.put("src/posts/hello-2.md", "taken");
        let outcome = ep
            .micropub(form_post("h=entry&mp-slug=hello&content=x"))
            .await
            .expect("outcome");
        assert_eq!(outcome.created_slug.as_deref(), Some("hello-3"));
        assert!(store.text("src/posts/hello-3.md").is_some());
    }

    #[tokio::test]
    async fn test_should_apply_slug_formatter() {
        let store = Arc::new(MemoryStore::new());
        let verifier = StaticTokenVerifier::new([("t".to_owned(), TokenInfo::new(ME, "create"))]);
        let format: SlugFormatter = Arc::new(|post_type: PostType, slug: &str| format!("{post_type}-{slug}"));
        let options = EndpointOptions::builder()
            .me(ME.to_owned())
            .format_slug(format)
            .build();
        let ep = MicropubEndpoint::new(store.clone(), Arc::new(verifier), options);
        let outcome = ep
            .micropub(form_post("h=entry&like-of=https%3A%2F%2Fx.example%2F&mp-slug=fav"))
            .await
            .expect("outcome");
        assert_eq!(outcome.created_slug.as_deref(), Some("like-fav"));
    }

    #[tokio::test]
    async fn test_should_reject_missing_token() {
        let (ep, store) = endpoint();
        let req = CanonicalRequest::new(
            Method::POST,
            Url::parse("https://blog.example.com/api/micropub").expect("valid url"),
            HeaderMap::new(),
            Some(full_body("h=entry&content=x")),
        );
        let outcome = ep.micropub(req).await.expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(outcome.response).await["error"], "unauthorized");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_should_accept_token_in_form_body() {
        let (ep, _) = endpoint();
        let req = CanonicalRequest::new(
            Method::POST,
            Url::parse("https://blog.example.com/api/micropub").expect("valid url"),
            HeaderMap::new(),
            Some(full_body("h=entry&content=x&access_token=t")),
        );
        let outcome = ep.micropub(req).await.expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_should_require_create_scope() {
        let (ep, _) = endpoint_with("update");
        let outcome = ep.micropub(form_post("h=entry&content=x")).await.expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(outcome.response).await["error"], "insufficient_scope");
    }

    #[tokio::test]
    async fn test_should_update_post_by_public_url() {
        let (ep, store) = endpoint();
        store.put("src/posts/hi.md", "---\ntitle: \"Hi\"\n---\nOld\n");
        let outcome = ep
            .micropub(json_post(
                r#"{"action":"update","url":"https://blog.example.com/posts/hi/","replace":{"content":["New"]},"add":{"category":["tag"]}}"#,
            ))
            .await
            .expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            store.text("src/posts/hi.md").as_deref(),
            Some("---\ntitle: \"Hi\"\ntags: \"tag\"\n---\nNew\n")
        );
    }

    #[tokio::test]
    async fn test_should_delete_post() {
        let (ep, store) = endpoint();
        store.put("src/posts/bye.md", "---\n---\nx");
        let outcome = ep
            .micropub(form_post("action=delete&url=https%3A%2F%2Fblog.example.com%2Fposts%2Fbye%2F"))
            .await
            .expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::NO_CONTENT);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_update_of_unknown_post() {
        let (ep, _) = endpoint();
        let outcome = ep
            .micropub(json_post(r#"{"action":"delete","url":"https://blog.example.com/posts/nope/"}"#))
            .await
            .expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_should_answer_source_query() {
        let (ep, store) = endpoint();
        store.put("src/posts/hi.md", "---\ntitle: \"Hi\"\ntype: article\n---\nBody\n");
        let req = request(
            Method::GET,
            "https://blog.example.com/api/micropub?q=source&url=https%3A%2F%2Fblog.example.com%2Fposts%2Fhi%2F",
            "",
            "",
        );
        let outcome = ep.micropub(req).await.expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::OK);
        let json = json_body(outcome.response).await;
        assert_eq!(json["properties"]["name"], serde_json::json!(["Hi"]));
        assert_eq!(json["properties"]["content"], serde_json::json!(["Body"]));
    }

    #[tokio::test]
    async fn test_should_answer_query_on_a_spawned_task() {
        let (ep, _) = endpoint();
        let req = CanonicalRequest::new(
            Method::GET,
            Url::parse("https://blog.example.com/api/micropub?q=config&access_token=t")
                .expect("valid url"),
            HeaderMap::new(),
            None,
        );
        let resp = tokio::spawn(async move { ep.handle_micropub(req).await })
            .await
            .expect("task")
            .expect("outcome")
            .response;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["syndicate-to"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_should_answer_syndicate_to_query() {
        let (ep, _) = endpoint();
        let req = request(
            Method::GET,
            "https://blog.example.com/api/micropub?q=syndicate-to",
            "",
            "",
        );
        let outcome = ep.micropub(req).await.expect("outcome");
        assert_eq!(json_body(outcome.response).await, serde_json::json!({ "syndicate-to": [] }));
    }

    #[tokio::test]
    async fn test_should_upload_media() {
        let (ep, store) = endpoint();
        let file = MultipartPart::file("file", "My Photo.JPG", Some("image/jpeg".into()), "JPEG");
        let req = request(
            Method::POST,
            "https://blog.example.com/api/media",
            &content_type_for("b1"),
            encode_multipart([&file], "b1"),
        );
        let outcome = ep.media(req).await.expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::CREATED);
        assert_eq!(
            quillpub_http::response::location_of(&outcome.response),
            Some("https://me.example/src/images/my-photo.jpg")
        );
        assert_eq!(
            store.content("src/images/my-photo.jpg").as_deref(),
            Some(&b"JPEG"[..])
        );
    }

    #[tokio::test]
    async fn test_should_upload_photos_attached_to_create() {
        let (ep, store) = endpoint();
        let parts = [
            MultipartPart::field("h", "entry"),
            MultipartPart::field("content", "Sunset"),
            MultipartPart::file("photo", "sun.png", Some("image/png".into()), "PNG"),
        ];
        let req = request(
            Method::POST,
            "https://blog.example.com/api/micropub",
            &content_type_for("b2"),
            encode_multipart(&parts, "b2"),
        );
        let outcome = ep.micropub(req).await.expect("outcome");
        assert_eq!(outcome.response.status(), StatusCode::CREATED);
        assert!(store.content("src/images/sun.png").is_some());
        let text = store.text("src/posts/sunset.md").expect("post stored");
        assert!(text.contains("photo: \"https://me.example/src/images/sun.png\""));
    }

    #[test]
    fn test_should_extract_slug_from_urls() {
        assert_eq!(slug_from_url("https://blog.example.com/posts/hi/").as_deref(), Some("hi"));
        assert_eq!(slug_from_url("https://me.example/src/posts/hi").as_deref(), Some("hi"));
        assert_eq!(slug_from_url("https://me.example/src/posts/hi.md").as_deref(), Some("hi"));
        assert_eq!(slug_from_url("https://me.example/src/posts/hi/index.md").as_deref(), Some("hi"));
        assert_eq!(slug_from_url("https://me.example/"), None);
    }

    #[test]
    fn test_should_sanitize_media_names() {
        assert_eq!(media_name("My Photo.JPG"), ("my-photo".to_owned(), Some("jpg".to_owned())));
        assert_eq!(media_name("../../etc/passwd"), ("passwd".to_owned(), None));
    }
}
