//! End-to-end tests for the quillpub gateway.
//!
//! Each test starts the real HTTP service in-process on an ephemeral port,
//! backed by a [`MemoryStore`] and a fixed token table, and talks to it with
//! `reqwest`.

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use quillpub_core::QuillConfig;
use quillpub_http::{Backend, Gateway, QuillHttpService};
use quillpub_micropub::{EndpointOptions, MicropubEndpoint, StaticTokenVerifier, TokenInfo};
use quillpub_store::MemoryStore;
use tokio::net::TcpListener;

static INIT: Once = Once::new();

/// Identity the test tokens are issued to.
pub const ME: &str = "https://blog.example.com/";

/// Public site URL.
pub const SITE: &str = "https://blog.example.com";

/// Token granting every scope.
pub const FULL_TOKEN: &str = "full-access";

/// Token granting only `create`.
pub const CREATE_TOKEN: &str = "create-only";

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A running server and the store behind it.
#[derive(Debug)]
pub struct TestServer {
    /// Address the server listens on.
    pub addr: SocketAddr,
    /// Backing store, for inspecting commits.
    pub store: Arc<MemoryStore>,
    /// HTTP client.
    pub client: reqwest::Client,
}

impl TestServer {
    /// Absolute URL for `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

/// Configuration with every required variable set.
#[must_use]
pub fn complete_config() -> QuillConfig {
    QuillConfig::builder()
        .gateway_listen("127.0.0.1:0".into())
        .me(ME.into())
        .token_endpoint("https://tokens.example.com/token".into())
        .github_token("unused".into())
        .github_user("someone".into())
        .github_repo("blog".into())
        .micropub_base(SITE.into())
        .build()
}

/// Start a server with a memory-backed Micropub endpoint.
pub async fn start_server() -> TestServer {
    let config = complete_config();
    let store = Arc::new(MemoryStore::new());
    let verifier = StaticTokenVerifier::new([
        (
            FULL_TOKEN.to_owned(),
            TokenInfo::new(ME, "create update delete media"),
        ),
        (CREATE_TOKEN.to_owned(), TokenInfo::new(ME, "create")),
    ]);
    let endpoint = MicropubEndpoint::new(
        store.clone(),
        Arc::new(verifier),
        EndpointOptions::from_config(&config),
    );
    let backend = Backend {
        delegate: Arc::new(endpoint),
        store: store.clone(),
    };
    let addr = spawn(config, Some(backend)).await;
    TestServer {
        addr,
        store,
        client: reqwest::Client::new(),
    }
}

/// Start a server with the given configuration and no backend.
pub async fn start_unconfigured_server(config: QuillConfig) -> TestServer {
    let addr = spawn(config, None).await;
    TestServer {
        addr,
        store: Arc::new(MemoryStore::new()),
        client: reqwest::Client::new(),
    }
}

async fn spawn(config: QuillConfig, backend: Option<Backend>) -> SocketAddr {
    init_tracing();

    let gateway = Gateway::new(config, backend).expect("gateway");
    let service = QuillHttpService::new(gateway);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let http = HttpConnBuilder::new(TokioExecutor::new());
        while let Ok((stream, _)) = listener.accept().await {
            let conn = http
                .serve_connection(TokioIo::new(stream), service.clone())
                .into_owned();
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!(error = %e, "test connection error");
                }
            });
        }
    });

    addr
}

mod test_gateway;
mod test_media;
mod test_micropub;
