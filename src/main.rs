//! Mokepon Arena Server - authoritative player registry over HTTP
//!
//! This is the server entry point. It handles:
//! - Session endpoints: join, mokepon selection, map sync, disconnect
//! - Battle endpoints: start, submit attacks, poll attacks, end

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use mokepon_arena::app::AppState;
use mokepon_arena::config::Config;
use mokepon_arena::http::build_router;
use mokepon_arena::util::logging::init_tracing;
use mokepon_arena::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);
    init_server_time();

    info!("Starting Mokepon Arena Server");
    info!(id_style = ?config.id_style, "Server address: {}", config.server_addr);

    let state = AppState::new(config.clone());
    let router = build_router(state);

    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
