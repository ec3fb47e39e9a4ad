//! API Module
//!
//! HTTP transport for the MCP server.
//!
//! # Endpoints
//! - `POST /mcp` - JSON-RPC messages
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Search cache statistics
//! - `POST /cache/sweep` - Remove expired cache entries
//! - `DELETE /cache` - Clear the search cache

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
