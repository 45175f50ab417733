pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod validation;

// Layered boundaries: ports the stages depend on, adapters implementing them
pub mod app;
pub mod infra;

pub use error::{PipelineError, Result};
