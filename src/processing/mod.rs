//! Processing Module
//!
//! Turns raw CEDAR JSON-LD into the compact shapes returned by the tools.

mod instance;
mod template;

pub use instance::clean_template_instance_response;
pub use template::clean_template_response;
