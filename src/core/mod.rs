// Public modules
pub mod artifact;
pub mod build;
pub mod config;
pub mod error;
pub mod git;
pub mod manifest;
pub mod paths;
pub mod pipeline;
pub mod provision;
pub mod publish;
pub mod source;
pub mod trigger;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
