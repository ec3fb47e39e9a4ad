//! Request and response models
//!
//! Tool argument DTOs, maintenance/HTTP response bodies and the simplified
//! template shape.

pub mod requests;
pub mod responses;
pub mod template;

// Re-export commonly used types
pub use requests::{
    BranchChildrenRequest, BranchSearchRequest, ClassTreeRequest, InstancesRequest,
    OntologySearchRequest, TemplateRequest,
};
pub use responses::{ClearResponse, HealthResponse, StatsResponse, SweepResponse};
pub use template::SimplifiedTemplate;
