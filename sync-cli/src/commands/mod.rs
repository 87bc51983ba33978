//! CLI command implementations.

pub mod replay;
pub mod serve;
pub mod validate;
