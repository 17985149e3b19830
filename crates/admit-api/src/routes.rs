//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use admit_core::config::ServerConfig;
use admit_core::AdmitError;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
///
/// Health checks are exempt from rate limiting.
pub fn create_router(state: AppState) -> Router {
    let limiter = RateLimiter::new(state.config.server.rate_limit_per_minute);

    let limited = Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/stats", get(handlers::stats))
        .route("/api/sessions/{id}/history", get(handlers::session_history))
        .route("/api/sessions/{id}", delete(handlers::reset_session))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::Extension(limiter));

    Router::new()
        .route("/api/health", get(handlers::health))
        .merge(limited)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind to the configured host and port and serve until the process exits.
pub async fn start_server(server: &ServerConfig, state: AppState) -> Result<(), AdmitError> {
    let addr = format!("{}:{}", server.host, server.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AdmitError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| AdmitError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
