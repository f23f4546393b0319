//! The hyper `Service` in front of the [`Gateway`].
//!
//! [`QuillHttpService`] handles:
//!
//! 1. Health check interception (`GET /health`, `GET /_health`)
//! 2. CORS preflight requests (`OPTIONS`)
//! 3. Endpoint routing (`/api/micropub`, `/api/media`)
//! 4. Handing the request to the gateway in the standard shape
//! 5. Common response headers (`x-request-id`, `Server`, CORS)

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use http::header::HeaderValue;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, info};
use uuid::Uuid;

use crate::body::ResponseBody;
use crate::canonical::RequestBody;
use crate::gateway::{Endpoint, Gateway};
use crate::inbound::InboundRequest;
use crate::response::{error_response, json_response};
use crate::rewrite::EXPOSE_HEADERS;

/// Value of the `Server` response header.
pub const SERVER_NAME: &str = "quillpub";

/// The quillpub HTTP service.
#[derive(Debug, Clone)]
pub struct QuillHttpService {
    gateway: Gateway,
}

impl QuillHttpService {
    /// Wrap a gateway.
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Process a request whose body is already boxed.
    pub async fn process(&self, req: http::Request<RequestBody>) -> http::Response<ResponseBody> {
        let request_id = Uuid::new_v4().to_string();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        debug!(%method, %path, request_id, "processing request");

        let response = if is_health_check(&method, &path) {
            health_check_response()
        } else if method == Method::OPTIONS {
            cors_preflight_response()
        } else if let Some(endpoint) = Endpoint::from_path(&path) {
            let response = self
                .gateway
                .handle(endpoint, InboundRequest::Standard(req))
                .await
                .into_http();
            info!(%method, %path, status = %response.status(), request_id, "request complete");
            response
        } else {
            error_response(StatusCode::NOT_FOUND, "Not found")
        };

        add_common_headers(response, &request_id)
    }
}

impl Service<http::Request<Incoming>> for QuillHttpService {
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            let req = req.map(|body| body.map_err(Into::into).boxed_unsync());
            Ok(service.process(req).await)
        })
    }
}

fn is_health_check(method: &Method, path: &str) -> bool {
    *method == Method::GET && (path == "/health" || path == "/_health")
}

fn health_check_response() -> http::Response<ResponseBody> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({ "status": "running", "service": "micropub" }),
    )
}

fn cors_preflight_response() -> http::Response<ResponseBody> {
    http::Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header(
            "Access-Control-Allow-Headers",
            "Authorization, Content-Type",
        )
        .header("Access-Control-Max-Age", "86400")
        .body(ResponseBody::empty())
        .expect("static CORS response should be valid")
}

fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let headers = response.headers_mut();
    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", hv);
    }
    headers.insert("Server", HeaderValue::from_static(SERVER_NAME));
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    if !headers.contains_key(EXPOSE_HEADERS) {
        headers.insert(EXPOSE_HEADERS, HeaderValue::from_static("x-request-id"));
    }
    response
}
