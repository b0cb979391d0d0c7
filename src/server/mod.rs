//! Mock HTTP API for the study mentor.
//!
//! Provides JSON endpoints for:
//! - Templated chat replies
//! - Health checks
//! - Upload announcements
//! - In-process sessions and usage counters

pub mod reply;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// Start the HTTP server with graceful shutdown support.
///
/// The server will stop accepting new connections when `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    config: &ServerConfig,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Socratic mentor API listening on http://{}", listener.local_addr()?);

    serve(listener, build_app(state, config), shutdown_signal).await
}

/// Router with CORS and request tracing applied.
pub fn build_app(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state, config.static_dir.as_deref())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` on an already bound listener.
///
/// # Errors
/// Returns an error if serving fails.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;
    Ok(())
}
