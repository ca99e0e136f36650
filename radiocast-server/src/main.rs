//! radiocast-server - radio schedule, metadata and push-update service
//!
//! Serves `GET /radio/metadata`, the `GET /radio/stream-state` SSE channel,
//! and the admin schedule API whose mutations fan out to every listener.

use anyhow::{Context, Result};
use clap::Parser;
use radiocast_common::config::{ensure_directory, load_toml, resolve_root_folder, ROOT_FOLDER_ENV};
use radiocast_server::api::AuthService;
use radiocast_server::config::{Args, ServerConfig};
use radiocast_server::db::{self, SqliteStore};
use radiocast_server::resolver::{MetadataResolver, RandomEstimate};
use radiocast_server::sse::Broadcaster;
use radiocast_server::{build_router, AppState};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config: ServerConfig = load_toml::<ServerConfig>(args.config.as_deref())
        .context("Failed to load configuration")?
        .with_args(&args);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting radiocast-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV);
    ensure_directory(&root_folder).context("Failed to prepare root folder")?;
    let db_path = root_folder.join("radiocast.db");
    info!("Database path: {}", db_path.display());

    let pool = db::connect(&db_path)
        .await
        .context("Failed to open database")?;
    let store = Arc::new(SqliteStore::new(pool));

    let resolver = MetadataResolver::new(store.clone(), config.live_settings()).with_estimator(
        Arc::new(RandomEstimate {
            min: config.listener_estimate_min,
            max: config.listener_estimate_max,
        }),
    );

    let auth = AuthService::new(
        config.admin_password_sha256.clone(),
        config.login_min_interval(),
    );
    if !auth.is_enabled() {
        warn!("admin_password_sha256 not set - admin API authentication disabled");
    }

    let broadcaster = Broadcaster::new(config.channel_capacity, config.keepalive());
    let state = AppState::new(store, resolver, broadcaster, auth);
    let broadcaster = Arc::clone(&state.broadcaster);
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("radiocast-server listening on http://{}", addr);
    info!("Live fallback stream: {}", config.live_stream_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open SSE streams would otherwise hold graceful shutdown forever
            broadcaster.shutdown();
        })
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
