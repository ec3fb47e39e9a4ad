//! MCP Module
//!
//! JSON-RPC 2.0 protocol types, request handling and the stdio transport.
//! The HTTP transport lives in [`crate::api`].

pub mod protocol;
pub mod server;
pub mod stdio;

pub use server::{handle_line, handle_message, SERVER_NAME};
pub use stdio::serve_stdio;
