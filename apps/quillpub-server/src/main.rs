//! Quillpub server - Micropub gateway for a GitHub-backed static site.
//!
//! Serves `/api/micropub` and `/api/media`, publishing posts and uploads as
//! commits to the configured repository.
//!
//! # Usage
//!
//! ```text
//! ME=https://blog.example.com/ TOKEN_ENDPOINT=https://tokens.indieauth.com/token \
//! GITHUB_TOKEN=... GITHUB_USER=someone GITHUB_REPO=blog \
//! MICROPUB_BASE=https://blog.example.com quillpub-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:3000` | Bind address |
//! | `ME` | *(required)* | Site owner identity |
//! | `TOKEN_ENDPOINT` | *(required)* | IndieAuth token endpoint |
//! | `GITHUB_TOKEN` | *(required)* | Repository access token |
//! | `GITHUB_USER` | *(required)* | Repository owner |
//! | `GITHUB_REPO` | *(required)* | Repository name |
//! | `GITHUB_BRANCH` | `main` | Branch to commit to |
//! | `MICROPUB_BASE` | *(required)* | Public site URL |
//! | `CONTENT_DIR` | `src/posts` | Post directory in the repository |
//! | `MEDIA_DIR` | `src/images` | Upload directory in the repository |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod backend;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use quillpub_core::QuillConfig;
use quillpub_http::{Gateway, QuillHttpService};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::backend::build_backend;

/// Server version reported at start-up.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: QuillHttpService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let conn = http.serve_connection(TokioIo::new(stream), service.clone());
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Request `/health` from a running server.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = QuillConfig::from_env();

    // Docker HEALTHCHECK
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        me = %config.me,
        micropub_base = %config.micropub_base,
        content_dir = %config.content_dir,
        media_dir = %config.media_dir,
        version = VERSION,
        "starting quillpub server",
    );

    let addr = config.listen_addr()?;
    let backend = build_backend(&config)?;
    let service = QuillHttpService::new(Gateway::new(config, backend)?);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
