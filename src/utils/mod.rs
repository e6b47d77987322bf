//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Command execution with error handling
//! - `secret` - Token masking and header encoding
//! - `template` - String template rendering

pub mod command;
pub mod secret;
pub mod template;
