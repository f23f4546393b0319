//! IndieAuth bearer token verification.
//!
//! [`TokenVerifier`] resolves a bearer token to the identity and scopes it was
//! issued for. [`IndieAuthTokenVerifier`] asks the configured token endpoint;
//! [`StaticTokenVerifier`] serves a fixed table for tests and local use.

use std::collections::HashMap;

use async_trait::async_trait;
use http::HeaderMap;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{EndpointError, EndpointResult};

/// What a token endpoint reports about a token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    /// Identity the token was issued to.
    pub me: String,
    /// Space-separated granted scopes.
    #[serde(default)]
    pub scope: String,
    /// Client the token was issued to.
    #[serde(default)]
    pub client_id: Option<String>,
}

impl TokenInfo {
    /// Token info for `me` with the given space-separated scopes.
    #[must_use]
    pub fn new(me: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            me: me.into(),
            scope: scope.into(),
            client_id: None,
        }
    }

    /// Granted scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }
}

/// A permission an action requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Create posts.
    Create,
    /// Update posts.
    Update,
    /// Delete posts.
    Delete,
    /// Upload media.
    Media,
}

impl Scope {
    /// Canonical scope name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Media => "media",
        }
    }

    /// Whether a granted scope name covers this scope.
    ///
    /// `post` is the legacy name for `create`; `create` also allows media uploads.
    #[must_use]
    pub fn granted_by(self, granted: &str) -> bool {
        match self {
            Self::Create => matches!(granted, "create" | "post"),
            Self::Update => granted == "update",
            Self::Delete => granted == "delete",
            Self::Media => matches!(granted, "media" | "create"),
        }
    }
}

/// Resolves bearer tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync + std::fmt::Debug {
    /// Look up a token.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::Forbidden`] if the token is not valid.
    async fn verify(&self, token: &str) -> EndpointResult<TokenInfo>;
}

/// Verifies tokens against an IndieAuth token endpoint.
#[derive(Debug, Clone)]
pub struct IndieAuthTokenVerifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl IndieAuthTokenVerifier {
    /// Verifier for the given token endpoint.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Verifier using an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl TokenVerifier for IndieAuthTokenVerifier {
    async fn verify(&self, token: &str) -> EndpointResult<TokenInfo> {
        debug!(endpoint = %self.endpoint, "verifying access token");
        let resp = self
            .client
            .get(self.endpoint.clone())
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| EndpointError::TokenEndpoint(e.to_string()))?;

        let status = resp.status();
        if status.is_client_error() {
            return Err(EndpointError::Forbidden(format!(
                "token endpoint rejected the token ({status})"
            )));
        }
        if !status.is_success() {
            return Err(EndpointError::TokenEndpoint(format!("unexpected status {status}")));
        }

        let info: TokenInfo = resp
            .json()
            .await
            .map_err(|e| EndpointError::TokenEndpoint(format!("unreadable response: {e}")))?;
        if info.me.trim().is_empty() {
            return Err(EndpointError::Forbidden("token is not active".into()));
        }
        Ok(info)
    }
}

/// A fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, TokenInfo>,
}

impl StaticTokenVerifier {
    /// Verifier accepting exactly the given tokens.
    pub fn new(tokens: impl IntoIterator<Item = (String, TokenInfo)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> EndpointResult<TokenInfo> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| EndpointError::Forbidden("invalid access token".into()))
    }
}

/// Bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_owned())
}

/// Check that `info` was issued to `me`. Trailing slashes and case are ignored.
pub fn check_identity(info: &TokenInfo, me: &str) -> EndpointResult<()> {
    if same_identity(&info.me, me) {
        Ok(())
    } else {
        Err(EndpointError::Forbidden(format!(
            "token belongs to {}, not {me}",
            info.me
        )))
    }
}

/// Check that `info` belongs to `me` and grants `scope`.
pub fn authorize(info: &TokenInfo, me: &str, scope: Scope) -> EndpointResult<()> {
    check_identity(info, me)?;
    if !info.scopes().any(|granted| scope.granted_by(granted)) {
        return Err(EndpointError::InsufficientScope(format!(
            "token lacks the {} scope",
            scope.as_str()
        )));
    }
    Ok(())
}

fn same_identity(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/').eq_ignore_ascii_case(b.trim().trim_end_matches('/'))
}
