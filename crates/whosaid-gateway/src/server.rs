// SPDX-FileCopyrightText: 2026 Whosaid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, CORS, static asset serving, and shared state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use whosaid_core::WhosaidError;
use whosaid_game::RoomManager;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The process-wide room registry.
    pub rooms: Arc<RoomManager>,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Directory the front end is served from.
    pub web_root: PathBuf,
}

/// Builds the application router: the game API plus static assets as the
/// fallback.
pub fn router(state: GatewayState, web_root: &Path) -> Router {
    Router::new()
        .route(
            "/api/rooms",
            post(handlers::create_room).get(handlers::room_info),
        )
        .route("/api/random-message", get(handlers::next_question))
        .route("/api/guess", post(handlers::submit_guess))
        .route("/api/context", post(handlers::unlock_context))
        .fallback_service(ServeDir::new(web_root))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves until the process exits.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), WhosaidError> {
    let app = router(state, &config.web_root);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WhosaidError::Config(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| WhosaidError::Internal(format!("server error: {e}")))?;

    Ok(())
}
