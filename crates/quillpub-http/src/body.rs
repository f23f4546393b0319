//! Response body supporting buffered and empty modes.
//!
//! Micropub responses are small JSON documents or empty `201`/`204`
//! confirmations, so [`ResponseBody`] never streams.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};

/// HTTP response body used by every quillpub handler.
#[derive(Debug, Default)]
pub enum ResponseBody {
    /// Buffered body for JSON payloads and error bodies.
    Buffered(Full<Bytes>),
    /// Empty body for `201` with only a `Location`, `204`, and preflight responses.
    #[default]
    Empty,
}

impl ResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create a buffered body holding serialized JSON.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::from_string(value.to_string())
    }

    /// Drain the body into a single buffer.
    pub async fn into_bytes(self) -> Bytes {
        match self {
            Self::Buffered(full) => match full.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            },
            Self::Empty => Bytes::new(),
        }
    }
}

impl http_body::Body for ResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
