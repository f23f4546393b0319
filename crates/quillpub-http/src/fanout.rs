//! Multi-file media upload fan-out.
//!
//! The media endpoint accepts one file per request. A multipart submission
//! carrying several files is split into one request per file, each with all
//! non-file fields, delegated in upload order, and answered with a single
//! `{ "locations": [...] }` body whose order matches the upload order.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, Method, Response, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::body::ResponseBody;
use crate::canonical::{CanonicalRequest, full_body};
use crate::delegate::{MicropubDelegate, guarded};
use crate::multipart::{MultipartForm, content_type_for, encode_multipart, new_boundary};
use crate::response::{json_response, location_of};
use crate::rewrite::{EXPOSE_HEADERS, LocationRewriter};

/// Method, URL, and headers shared by every per-file request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// Original method.
    pub method: Method,
    /// Original URL.
    pub url: Url,
    /// Original headers.
    pub headers: HeaderMap,
}

impl RequestHead {
    /// Capture the head of `req`.
    #[must_use]
    pub fn of(req: &CanonicalRequest) -> Self {
        Self {
            method: req.method().clone(),
            url: req.url().clone(),
            headers: req.headers().clone(),
        }
    }
}

/// Split a form into one single-file request per file, in upload order.
///
/// Each request carries every non-file field plus exactly one file under its
/// original field name, with a fresh boundary and regenerated `Content-Type`.
#[must_use]
pub fn split_uploads(head: &RequestHead, form: &MultipartForm) -> Vec<CanonicalRequest> {
    form.files()
        .map(|file| {
            let boundary = new_boundary();
            let body: Bytes = encode_multipart(form.fields().chain(std::iter::once(file)), &boundary);

            let mut headers = head.headers.clone();
            headers.remove(CONTENT_LENGTH);
            headers.remove(CONTENT_TYPE);
            if let Ok(ct) = HeaderValue::from_str(&content_type_for(&boundary)) {
                headers.insert(CONTENT_TYPE, ct);
            }

            CanonicalRequest::new(
                head.method.clone(),
                head.url.clone(),
                headers,
                Some(full_body(body)),
            )
        })
        .collect()
}

/// The aggregated `201 { "locations": [...] }` response.
#[must_use]
pub fn locations_response(locations: &[Option<String>]) -> Response<ResponseBody> {
    let mut response = json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "locations": locations }),
    );
    response
        .headers_mut()
        .insert(EXPOSE_HEADERS, HeaderValue::from_static("Location"));
    response
}

/// Delegate each file of `form` sequentially and aggregate the public locations.
///
/// A failed upload yields `null` at its position instead of aborting the batch.
pub async fn fan_out(
    delegate: &dyn MicropubDelegate,
    rewriter: &LocationRewriter,
    head: &RequestHead,
    form: &MultipartForm,
) -> Response<ResponseBody> {
    let base = rewriter.base_for(&head.url);
    let requests = split_uploads(head, form);
    info!(files = requests.len(), "fanning out multi-file media upload");

    let mut locations: Vec<Option<String>> = Vec::with_capacity(requests.len());
    for (index, req) in requests.into_iter().enumerate() {
        let outcome = guarded(delegate.media(req)).await;
        let status = outcome.response.status();
        let location = if status == StatusCode::CREATED {
            location_of(&outcome.response).and_then(|loc| rewriter.media_location(loc, &base))
        } else {
            None
        };
        match &location {
            Some(loc) => debug!(index, location = %loc, "uploaded file"),
            None => warn!(index, %status, "file upload produced no location"),
        }
        locations.push(location);
    }

    locations_response(&locations)
}
