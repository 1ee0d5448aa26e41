//! The pipeline's synchronous stages.

pub mod apply;
pub mod provision;
pub mod registry;
