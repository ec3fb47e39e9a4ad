//! Clients Module
//!
//! HTTP clients for the CEDAR resource server and the BioPortal API, sharing
//! one 429-aware retry helper.

pub mod bioportal;
pub mod cedar;
pub mod http;

pub use bioportal::BioPortalClient;
pub use cedar::{CedarClient, InstancePage, Pagination};
pub use http::RetryPolicy;
