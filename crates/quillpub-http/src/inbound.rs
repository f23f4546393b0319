//! Inbound request shapes and their normalization.
//!
//! Callers hand the gateway either a standard [`http::Request`] or a
//! [`LegacyRequest`]: a loose request/response pairing where headers are a
//! plain list of scalar-or-array values and the body is a raw byte stream.
//! Both become one [`CanonicalRequest`], and the [`ResponseShape`] remembers
//! which representation the response has to be adapted back into.

use std::sync::LazyLock;

use bytes::Bytes;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Response, StatusCode};
use http_body_util::{BodyExt, StreamBody};
use tracing::debug;
use url::Url;

use crate::body::ResponseBody;
use crate::canonical::{BoxError, CanonicalRequest, RequestBody};

/// Host assumed when a request carries no usable `Host` header.
pub const DEFAULT_HOST: &str = "localhost:3000";

static DEFAULT_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://localhost:3000/").expect("valid default url"));

/// Raw byte stream body of a legacy request.
pub type LegacyBody = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// A header value in a legacy request.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyHeaderValue {
    /// A single string value.
    Text(String),
    /// Repeated values, folded with `", "`.
    List(Vec<String>),
    /// A numeric value such as `content-length`.
    Number(i64),
    /// An explicitly unset value. Skipped.
    Null,
}

impl LegacyHeaderValue {
    /// The folded string value, or `None` for [`LegacyHeaderValue::Null`].
    #[must_use]
    pub fn fold(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::List(items) => Some(items.join(", ")),
            Self::Number(n) => Some(n.to_string()),
            Self::Null => None,
        }
    }
}

/// A request in the legacy paired representation.
#[derive(Default)]
pub struct LegacyRequest {
    /// Method name. Missing means the endpoint's default method.
    pub method: Option<String>,
    /// Raw URL, usually just a path and query.
    pub url: Option<String>,
    /// Header list in arrival order.
    pub headers: Vec<(String, LegacyHeaderValue)>,
    /// Raw body stream.
    pub body: Option<LegacyBody>,
}

impl std::fmt::Debug for LegacyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "..."))
            .finish()
    }
}

/// An inbound request, tagged by representation at the boundary.
#[derive(Debug)]
pub enum InboundRequest {
    /// A standard request object.
    Standard(http::Request<RequestBody>),
    /// A legacy request with loosely typed headers and a raw stream body.
    Legacy(LegacyRequest),
}

/// Which representation a response is returned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Return an [`http::Response`].
    Standard,
    /// Return a [`LegacyResponse`].
    Legacy,
}

impl InboundRequest {
    /// The response representation this request expects.
    #[must_use]
    pub fn shape(&self) -> ResponseShape {
        match self {
            Self::Standard(_) => ResponseShape::Standard,
            Self::Legacy(_) => ResponseShape::Legacy,
        }
    }

    /// Normalize into a [`CanonicalRequest`].
    ///
    /// `default_method` applies only to legacy requests that name no method.
    #[must_use]
    pub fn into_canonical(self, default_method: &Method) -> CanonicalRequest {
        match self {
            Self::Standard(req) => {
                let (parts, body) = req.into_parts();
                let raw = parts.uri.to_string();
                let host = parts
                    .headers
                    .get(http::header::HOST)
                    .and_then(|v| v.to_str().ok())
                    .or_else(|| parts.uri.authority().map(http::uri::Authority::as_str));
                let url = resolve_url(Some(&raw), host);
                CanonicalRequest::new(parts.method, url, parts.headers, Some(body))
            }
            Self::Legacy(req) => {
                let method = req
                    .method
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .and_then(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
                    .unwrap_or_else(|| default_method.clone());
                let headers = fold_headers(&req.headers);
                let host = headers
                    .get(http::header::HOST)
                    .and_then(|v| v.to_str().ok());
                let url = resolve_url(req.url.as_deref(), host);
                let body = req.body.map(stream_body);
                CanonicalRequest::new(method, url, headers, body)
            }
        }
    }
}

/// Resolve a request URL.
///
/// An absolute URL is used as-is. Anything else is treated as a path on the
/// given host (or [`DEFAULT_HOST`]), with `http` for local hosts and `https`
/// otherwise. Unparsable input falls back to the synthesized form.
#[must_use]
pub fn resolve_url(raw: Option<&str>, host: Option<&str>) -> Url {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty());
    if let Some(url) = raw.and_then(|r| Url::parse(r).ok()).filter(Url::has_host) {
        return url;
    }

    let host = host
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_HOST);
    let scheme = if host.contains("localhost") || host.starts_with("127.") {
        "http"
    } else {
        "https"
    };
    let path = match raw {
        Some(p) if p.starts_with('/') => p.to_owned(),
        Some(p) => format!("/{p}"),
        None => "/".to_owned(),
    };

    Url::parse(&format!("{scheme}://{host}{path}"))
        .or_else(|_| Url::parse(&format!("http://{DEFAULT_HOST}{path}")))
        .unwrap_or_else(|e| {
            debug!(%host, %path, error = %e, "falling back to default request url");
            DEFAULT_URL.clone()
        })
}

/// Fold legacy headers into a [`HeaderMap`]. Later duplicates replace earlier ones.
#[must_use]
pub fn fold_headers(headers: &[(String, LegacyHeaderValue)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let Some(value) = value.fold() else {
            continue;
        };
        match (
            HeaderName::from_bytes(name.trim().as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => debug!(header = %name, "skipping invalid legacy header"),
        }
    }
    map
}

fn stream_body(stream: LegacyBody) -> RequestBody {
    StreamBody::new(stream.map_ok(http_body::Frame::data).map_err(BoxError::from)).boxed_unsync()
}

/// A response in the legacy representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyResponse {
    /// Status code.
    pub status_code: u16,
    /// Headers in map order.
    pub headers: Vec<(String, String)>,
    /// Body bytes.
    pub body: Bytes,
}

impl LegacyResponse {
    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response in the representation the caller used.
#[derive(Debug)]
pub enum OutboundResponse {
    /// For [`InboundRequest::Standard`] callers.
    Standard(Response<ResponseBody>),
    /// For [`InboundRequest::Legacy`] callers.
    Legacy(LegacyResponse),
}

impl OutboundResponse {
    /// Status code of either representation.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Standard(resp) => resp.status(),
            Self::Legacy(resp) => {
                StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Convert into an [`http::Response`].
    #[must_use]
    pub fn into_http(self) -> Response<ResponseBody> {
        match self {
            Self::Standard(resp) => resp,
            Self::Legacy(legacy) => {
                let status = StatusCode::from_u16(legacy.status_code)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let mut resp = Response::new(if legacy.body.is_empty() {
                    ResponseBody::empty()
                } else {
                    ResponseBody::from_bytes(legacy.body)
                });
                *resp.status_mut() = status;
                for (name, value) in legacy.headers {
                    if let (Ok(name), Ok(value)) = (
                        HeaderName::from_bytes(name.as_bytes()),
                        HeaderValue::from_str(&value),
                    ) {
                        resp.headers_mut().append(name, value);
                    }
                }
                resp
            }
        }
    }
}

impl ResponseShape {
    /// Adapt a response into this shape.
    ///
    /// Status and every header are copied before the body is drained.
    pub async fn adapt(self, response: Response<ResponseBody>) -> OutboundResponse {
        match self {
            Self::Standard => OutboundResponse::Standard(response),
            Self::Legacy => {
                let (parts, body) = response.into_parts();
                let headers = parts
                    .headers
                    .iter()
                    .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_owned(), v.to_owned())))
                    .collect();
                OutboundResponse::Legacy(LegacyResponse {
                    status_code: parts.status.as_u16(),
                    headers,
                    body: body.into_bytes().await,
                })
            }
        }
    }
}
