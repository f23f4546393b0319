//! A Micropub endpoint backed by a [`ContentStore`](quillpub_store::ContentStore).
//!
//! - **Auth** ([`auth`]): IndieAuth bearer token verification and scope checks.
//! - **Requests** ([`request`]): form, JSON, and multipart Micropub bodies.
//! - **Translation** ([`translate`]): microformats properties to Markdown posts
//!   and back.
//! - **Endpoint** ([`endpoint`]): [`MicropubEndpoint`], the
//!   [`MicropubDelegate`](quillpub_http::MicropubDelegate) the gateway calls.

pub mod auth;
pub mod endpoint;
pub mod error;
pub mod request;
pub mod translate;

pub use auth::{IndieAuthTokenVerifier, Scope, StaticTokenVerifier, TokenInfo, TokenVerifier};
pub use endpoint::{EndpointOptions, MicropubEndpoint, SlugFormatter};
pub use error::{EndpointError, EndpointResult};
pub use request::{MicropubRequest, Properties};
