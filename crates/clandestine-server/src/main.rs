mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method, header::CONTENT_TYPE};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use clandestine_api::auth::{AppState, AppStateInner};
use clandestine_api::cleanup;
use clandestine_api::middleware::SESSION_HEADER;
use clandestine_db::{Clock, Database, JsonFileStore, SqliteStore, SystemClock};

use crate::config::{Config, StorageKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clandestine=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = match config.storage {
        StorageKind::Json => Database::open(JsonFileStore::new(&config.data_path)),
        StorageKind::Sqlite => Database::open(SqliteStore::open(&config.data_path)?),
        StorageKind::Memory => {
            warn!("Using in-memory storage; nothing survives a restart");
            Database::in_memory()
        }
    };

    let clock = Arc::new(SystemClock);

    // Expired posts never outlive a restart.
    cleanup::sweep(&db, clock.now_ms())?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        clock,
        master_token: config.master_token.clone(),
        frontend_url: config.frontend_url.clone(),
    });

    tokio::spawn(cleanup::run_sweep_loop(state.clone(), config.sweep_interval));

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_str(&config.frontend_url)?)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, SESSION_HEADER.parse()?])
        .allow_credentials(true);

    let app = clandestine_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Clandestine server listening on {}", addr);
    info!("Storage: {} at {}", config.storage, config.data_path.display());
    info!("Frontend URL: {}", config.frontend_url);
    info!("Sweeping expired posts every {}s", config.sweep_interval.as_secs());

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
