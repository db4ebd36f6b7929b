pub mod builder;
pub mod params;

pub use builder::{resolve_seed, Workflow, WorkflowBuilder};
pub use params::GenerationParams;
