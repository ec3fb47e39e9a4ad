//! Tools Module
//!
//! The MCP tool catalogue and the handlers behind each tool.

pub mod definitions;
mod handlers;

pub use definitions::{tool_definitions, ToolDefinition};
pub use handlers::call_tool;
