//! API Handlers
//!
//! HTTP handlers: the MCP endpoint plus health, statistics and cache
//! maintenance endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value;

use crate::cache::SearchCache;
use crate::clients::{BioPortalClient, CedarClient};
use crate::config::Config;
use crate::error::{ApiResult, Result};
use crate::mcp::handle_message;
use crate::models::{ClearResponse, HealthResponse, StatsResponse, SweepResponse};

/// Application state shared by every handler and transport.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Persistent search cache (possibly in bypass mode)
    pub cache: SearchCache,
    pub bioportal: Arc<BioPortalClient>,
    pub cedar: Arc<CedarClient>,
}

impl AppState {
    /// Builds the state from resolved configuration.
    ///
    /// Opens the search cache and the upstream clients. Missing API keys
    /// leave the corresponding client unauthenticated.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        let upstream = &config.upstream;
        let bioportal = BioPortalClient::new(
            &upstream.bioportal_url,
            config.bioportal_api_key.clone().unwrap_or_default(),
        )?;
        let cedar = CedarClient::new(
            &upstream.cedar_resource_url,
            &upstream.cedar_repo_url,
            config.cedar_api_key.clone().unwrap_or_default(),
        )?;

        Ok(Self {
            cache: SearchCache::open(&config.cache),
            bioportal: Arc::new(bioportal),
            cedar: Arc::new(cedar),
        })
    }
}

/// Handler for POST /mcp
///
/// Accepts one JSON-RPC message or a batch. Notifications get `202 Accepted`
/// with an empty body.
pub async fn mcp_handler(State(state): State<AppState>, Json(message): Json<Value>) -> impl IntoResponse {
    match handle_message(&state, message).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    Json(StatsResponse::new(
        &stats,
        state.cache.is_available(),
        state.cache.ttl_seconds(),
    ))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.is_available()))
}

/// Handler for POST /cache/sweep
pub async fn sweep_handler(State(state): State<AppState>) -> Result<Json<SweepResponse>> {
    let report = state.cache.sweep_expired().await?;
    Ok(Json(report.into()))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let cleared_count = state.cache.clear_all().await?;
    Ok(Json(ClearResponse { cleared_count }))
}
