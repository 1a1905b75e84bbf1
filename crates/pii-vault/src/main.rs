//! `pii-vault` binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Build the key ring and field codec.
//! 4. Build the Axum router and serve until Ctrl-C.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use pii_vault::codec::FieldCodec;
use pii_vault::config::Config;
use pii_vault::migration::MigrationController;
use pii_vault::server::{self, state::AppState};
use pii_vault::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        tls = cfg.tls_paths().is_some(),
        "pii-vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key ring
    // -----------------------------------------------------------------------
    let key_ring = cfg.key_ring()?;
    info!(
        active_alias = %key_ring.active_alias(),
        key_count = key_ring.snapshot().len(),
        "key ring initialised"
    );
    let codec = FieldCodec::new(key_ring).with_policy(cfg.unresolved_alias_policy);

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let shutdown = CancellationToken::new();
    let migrations = MigrationController::new(shutdown.child_token());
    let state = AppState::new(codec, cfg.migration_attributes(), migrations);
    let router = server::router::build(state);

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                return;
            }
            info!("shutdown signal received");
            shutdown.cancel();
        });
    }

    let result = server::serve(&cfg, router, shutdown).await;
    if let Err(e) = &result {
        error!(error = %e, "server exited with error");
    }
    info!("pii-vault stopped");
    telemetry::shutdown_telemetry();
    result
}
