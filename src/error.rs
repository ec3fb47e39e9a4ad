//! Error types for the MCP server
//!
//! Provides layered error handling using thiserror: cache storage, upstream
//! HTTP services, and tool invocation.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the persistent search cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The on-disk store could not be created or opened
    #[error("Cache storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },

    /// A stored record could not be decoded
    #[error("Corrupt cache record: {0}")]
    CorruptRecord(String),

    /// A cache key could not be derived deterministically
    #[error("Cache key derivation failed: {0}")]
    KeyDerivation(String),

    /// Underlying SQLite failure
    #[error("Cache storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A previous holder of the store lock panicked
    #[error("Cache store lock poisoned")]
    Poisoned,

    /// A blocking storage task failed to complete
    #[error("Cache background task failed: {0}")]
    Background(String),
}

impl CacheError {
    /// Builds a `StorageUnavailable` error for the given location.
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CacheError::StorageUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

// == Upstream API Error Enum ==
/// Errors raised while talking to CEDAR or BioPortal.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    /// Upstream kept answering 429 after every retry
    #[error("{url} is rate limiting requests (gave up after {attempts} attempts)")]
    RateLimited { url: String, attempts: u32 },

    /// A request URL could not be built
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// The response body did not have the expected shape
    #[error("Failed to parse upstream response: {0}")]
    Decode(String),
}

// == Tool Error Enum ==
/// Errors surfaced to the caller of a tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Arguments missing, mistyped or out of range
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// No tool registered under this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Remote service failure
    #[error(transparent)]
    Upstream(#[from] ApiError),

    /// Cache failure on a maintenance path
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// JSON-RPC error code used when this error is reported at protocol level.
    pub fn rpc_code(&self) -> i64 {
        match self {
            ToolError::InvalidParams(_) => -32602,
            ToolError::UnknownTool(_) => -32601,
            _ => -32603,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ToolError {
    fn into_response(self) -> Response {
        let status = match &self {
            ToolError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ToolError::UnknownTool(_) => StatusCode::NOT_FOUND,
            ToolError::Upstream(ApiError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ToolError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ToolError::Cache(CacheError::StorageUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ToolError::Cache(_) | ToolError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Aliases ==
/// Convenience Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Convenience Result type for upstream calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Convenience Result type for tool handlers.
pub type Result<T> = std::result::Result<T, ToolError>;
