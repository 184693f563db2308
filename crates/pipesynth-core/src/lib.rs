pub mod buildspec;
pub mod config;
pub mod error;
pub mod io;
pub mod jobs;
pub mod paths;
pub mod policy;
pub mod stack;
pub mod template;
pub mod topology;

pub use error::{PipelineError, Result};
