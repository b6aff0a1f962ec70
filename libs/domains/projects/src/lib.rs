//! Project domain: membership lookups for notification fan-out and push
//! group resolution.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;

pub use error::{ProjectError, ProjectResult};
pub use memory::InMemoryProjectRepository;
pub use models::Project;
pub use repository::{MockProjectRepository, ProjectRepository};
