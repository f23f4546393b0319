//! The canonical request every handler works with.

use bytes::Bytes;
use http::{HeaderMap, Method};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use url::Url;

/// Boxed error carried by request bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Streaming request body.
pub type RequestBody = UnsyncBoxBody<Bytes, BoxError>;

/// Wrap buffered bytes as a [`RequestBody`].
#[must_use]
pub fn full_body(data: impl Into<Bytes>) -> RequestBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// A normalized inbound request.
///
/// Method, URL, and headers are fixed at construction. The body is attached
/// only for methods other than `GET` and `HEAD` and can be taken once.
pub struct CanonicalRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<RequestBody>,
}

impl std::fmt::Debug for CanonicalRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers.len())
            .field("body", &self.body.as_ref().map(|_| "..."))
            .finish()
    }
}

impl CanonicalRequest {
    /// Build a request. Any body passed with `GET` or `HEAD` is dropped.
    #[must_use]
    pub fn new(method: Method, url: Url, headers: HeaderMap, body: Option<RequestBody>) -> Self {
        let body = if is_bodyless(&method) { None } else { body };
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value as a string, if present and visible ASCII.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Parsed `Content-Type`, if present and valid.
    #[must_use]
    pub fn content_type(&self) -> Option<mime::Mime> {
        self.header_str(http::header::CONTENT_TYPE.as_str())
            .and_then(|v| v.parse().ok())
    }

    /// Whether the request is a `multipart/form-data` submission.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.content_type()
            .is_some_and(|m| m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA)
    }

    /// Whether a body is still attached.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Detach the body. Subsequent calls return `None`.
    pub fn take_body(&mut self) -> Option<RequestBody> {
        self.body.take()
    }

    /// Detach and buffer the body. Returns empty bytes when no body is attached.
    ///
    /// ```
    /// use http::{HeaderMap, Method};
    /// use quillpub_http::{CanonicalRequest, full_body};
    ///
    /// # tokio_test::block_on(async {
    /// let url = url::Url::parse("https://blog.example.com/api/micropub").unwrap();
    /// let mut req = CanonicalRequest::new(Method::POST, url, HeaderMap::new(), Some(full_body("h=entry")));
    /// assert_eq!(req.read_body().await.unwrap().as_ref(), b"h=entry");
    /// assert!(req.read_body().await.unwrap().is_empty());
    /// # });
    /// ```
    pub async fn read_body(&mut self) -> Result<Bytes, BoxError> {
        match self.body.take() {
            Some(body) => Ok(body.collect().await?.to_bytes()),
            None => Ok(Bytes::new()),
        }
    }

    /// Re-attach a buffered body, subject to the same method rule as [`Self::new`].
    #[must_use]
    pub fn with_buffered_body(self, data: Bytes) -> Self {
        Self::new(self.method, self.url, self.headers, Some(full_body(data)))
    }
}

/// Whether `method` never carries a request body.
#[must_use]
pub fn is_bodyless(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[test]
    fn test_should_drop_body_for_get_and_head() {
        for method in [Method::GET, Method::HEAD] {
            let req = CanonicalRequest::new(
                method,
                url("https://example.com/api/micropub"),
                HeaderMap::new(),
                Some(full_body("ignored")),
            );
            assert!(!req.has_body());
        }
    }

    #[tokio::test]
    async fn test_should_consume_body_once() {
        let mut req = CanonicalRequest::new(
            Method::POST,
            url("https://example.com/api/micropub"),
            HeaderMap::new(),
            Some(full_body("h=entry&content=hi")),
        );
        assert!(req.has_body());
        let body = req.read_body().await.expect("read body");
        assert_eq!(body.as_ref(), b"h=entry&content=hi");
        assert!(req.read_body().await.expect("second read").is_empty());
        assert!(req.take_body().is_none());
    }

    #[test]
    fn test_should_read_query_param() {
        let req = CanonicalRequest::new(
            Method::GET,
            url("https://example.com/api/micropub?q=config&x=1"),
            HeaderMap::new(),
            None,
        );
        assert_eq!(req.query_param("q").as_deref(), Some("config"));
        assert!(req.query_param("missing").is_none());
    }

    #[test]
    fn test_should_detect_multipart_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            "multipart/form-data; boundary=abc".parse().expect("header"),
        );
        let req = CanonicalRequest::new(
            Method::POST,
            url("https://example.com/api/media"),
            headers,
            None,
        );
        assert!(req.is_multipart());
    }
}
