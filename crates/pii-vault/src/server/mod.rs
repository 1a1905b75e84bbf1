//! Administrative HTTP(S) server: routing, handlers, and the listener.
//!
//! # Responsibilities
//! - Bind the listener, plain TCP or rustls when a certificate is configured.
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.

pub mod handlers;
pub mod router;
pub mod state;
pub mod tls;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;

/// Bind `cfg.listen_port` and serve `router` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the port cannot be bound, the TLS material is
/// invalid, or the server fails.
pub async fn serve(cfg: &Config, router: Router, shutdown: CancellationToken) -> Result<()> {
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    match cfg.tls_paths() {
        Some((cert_path, key_path)) => {
            let tls = tls::load_server_config(cert_path, key_path).await?;
            info!(addr = %addr, "listening (https)");
            tls::serve_tls(listener, tls, router, shutdown).await
        }
        None => {
            info!(addr = %addr, "listening (http)");
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .context("HTTP server failed")
        }
    }
}
