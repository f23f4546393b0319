//! JSON response helpers.

use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};

use crate::body::ResponseBody;

/// Build a JSON response.
#[must_use]
pub fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::from_json(value));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a `{ "error": <message> }` response.
#[must_use]
pub fn error_response(status: StatusCode, message: &str) -> Response<ResponseBody> {
    json_response(status, &serde_json::json!({ "error": message }))
}

/// Build a response with no body.
#[must_use]
pub fn empty_response(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::empty());
    *response.status_mut() = status;
    response
}

/// The `Location` header as a string, if present and valid.
#[must_use]
pub fn location_of<B>(response: &Response<B>) -> Option<&str> {
    response
        .headers()
        .get(http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_build_error_response() {
        let resp = error_response(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        let body = resp.into_body().into_bytes().await;
        assert_eq!(body.as_ref(), br#"{"error":"boom"}"#);
    }

    #[test]
    fn test_should_read_location_header() {
        let mut resp = empty_response(StatusCode::CREATED);
        assert!(location_of(&resp).is_none());
        resp.headers_mut().insert(
            http::header::LOCATION,
            HeaderValue::from_static("https://example.com/a"),
        );
        assert_eq!(location_of(&resp), Some("https://example.com/a"));
    }
}
