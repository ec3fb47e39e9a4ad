//! CEDAR MCP - metadata authoring tools over the Model Context Protocol
//!
//! Exposes CEDAR template lookups and BioPortal ontology searches as MCP
//! tools, with a persistent TTL cache in front of every BioPortal lookup.

pub mod api;
pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod mcp;
pub mod models;
pub mod processing;
pub mod tasks;
pub mod tools;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
