//! Wiring of the production backend: GitHub store, IndieAuth verifier and
//! Micropub endpoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use quillpub_core::QuillConfig;
use quillpub_http::Backend;
use quillpub_micropub::{EndpointOptions, IndieAuthTokenVerifier, MicropubEndpoint};
use quillpub_store::{GitHubStore, GitHubStoreConfig};
use tracing::{info, warn};
use url::Url;

/// Build the backend, or `None` when required settings are missing.
///
/// The server still starts without a backend so `q=config` queries and the
/// missing-variable diagnostics keep working.
pub fn build_backend(config: &QuillConfig) -> Result<Option<Backend>> {
    let missing = config.missing_required();
    if !missing.is_empty() {
        warn!(?missing, "required environment variables missing, micropub disabled");
        return Ok(None);
    }

    let token_endpoint = Url::parse(&config.token_endpoint)
        .with_context(|| format!("invalid TOKEN_ENDPOINT: {}", config.token_endpoint))?;
    let client = reqwest::Client::builder()
        .user_agent(concat!("quillpub/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let store = GitHubStore::with_client(
        client.clone(),
        GitHubStoreConfig::builder()
            .token(config.github_token.as_str())
            .user(config.github_user.as_str())
            .repo(config.github_repo.as_str())
            .branch(config.github_branch.as_str())
            .build(),
    );
    let store = Arc::new(store);
    let verifier = Arc::new(IndieAuthTokenVerifier::with_client(client, token_endpoint));
    let endpoint = MicropubEndpoint::new(
        store.clone(),
        verifier,
        EndpointOptions::from_config(config),
    );

    info!(
        user = %config.github_user,
        repo = %config.github_repo,
        branch = %config.github_branch,
        "micropub backend ready"
    );

    Ok(Some(Backend {
        delegate: Arc::new(endpoint),
        store,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> QuillConfig {
        QuillConfig::builder()
            .me("https://blog.example.com/".into())
            .token_endpoint("https://tokens.example.com/token".into())
            .github_token("ghp_test".into())
            .github_user("someone".into())
            .github_repo("blog".into())
            .micropub_base("https://blog.example.com".into())
            .build()
    }

    #[test]
    fn test_should_skip_backend_when_incomplete() {
        let backend = build_backend(&QuillConfig::default()).expect("no error");
        assert!(backend.is_none());
    }

    #[test]
    fn test_should_build_backend_when_complete() {
        let backend = build_backend(&complete()).expect("backend");
        assert!(backend.is_some());
    }

    #[test]
    fn test_should_reject_invalid_token_endpoint() {
        let mut config = complete();
        config.token_endpoint = "not a url".into();
        assert!(build_backend(&config).is_err());
    }
}
