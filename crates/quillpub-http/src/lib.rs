//! HTTP layer for the quillpub Micropub endpoint.
//!
//! This crate sits between the network and a [`MicropubDelegate`]:
//!
//! - **Inbound** ([`inbound`]): Accepts a standard `http::Request` or a legacy
//!   Node-style request record and normalizes both into a [`CanonicalRequest`].
//!   Responses go back out in the shape the caller sent.
//!
//! - **Gate** ([`gate`]): Answers `q=config` capability discovery and rejects
//!   writes while required configuration is missing.
//!
//! - **Delegate** ([`delegate`]): The [`MicropubDelegate`] trait plus the
//!   wrapper that turns delegate failures into `500` responses.
//!
//! - **Rewrite** ([`rewrite`]): Maps repository `Location`s onto public URLs.
//!
//! - **Fan-out** ([`fanout`]): Splits multi-file media uploads into one
//!   delegate call per file.
//!
//! - **Gateway** ([`gateway`]): The pipeline tying the pieces together.
//!
//! - **Service** ([`service`]): [`QuillHttpService`], the hyper `Service`.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> QuillHttpService (hyper Service)
//!     -> Health check / CORS interception
//!     -> Endpoint routing
//!     -> Gateway
//!       -> CanonicalRequest
//!       -> q=config / environment gate
//!       -> MicropubDelegate
//!       -> normalize created post
//!       -> Location rewrite / media fan-out
//!     -> Common response headers (x-request-id, Server, CORS)
//!   <- HTTP Response
//! ```

pub mod body;
pub mod canonical;
pub mod delegate;
pub mod fanout;
pub mod gate;
pub mod gateway;
pub mod inbound;
pub mod multipart;
pub mod response;
pub mod rewrite;
pub mod service;

pub use body::ResponseBody;
pub use canonical::{BoxError, CanonicalRequest, RequestBody, full_body};
pub use delegate::{DelegateOutcome, MicropubDelegate, guarded};
pub use gateway::{Backend, Endpoint, Gateway};
pub use inbound::{
    InboundRequest, LegacyHeaderValue, LegacyRequest, LegacyResponse, OutboundResponse,
    ResponseShape,
};
pub use multipart::{MultipartError, MultipartForm, MultipartPart};
pub use response::{empty_response, error_response, json_response};
pub use rewrite::LocationRewriter;
pub use service::QuillHttpService;
