//! API Routes
//!
//! Configures the Axum router for the HTTP transport.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, health_handler, mcp_handler, stats_handler, sweep_handler, AppState,
};

/// Creates the router with all endpoints configured.
///
/// # Endpoints
/// - `POST /mcp` - JSON-RPC endpoint of the MCP server
/// - `GET /health` - Health check
/// - `GET /stats` - Search cache statistics
/// - `POST /cache/sweep` - Remove expired cache entries
/// - `DELETE /cache` - Remove every cache entry
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache/sweep", post(sweep_handler))
        .route("/cache", delete(clear_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
