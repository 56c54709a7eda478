//! Core types and utilities for kontext
//!
//! This is the foundation crate (Layer 0) that all other kontext crates depend on.
//! It provides:
//! - Fatal and non-fatal error types
//! - Validated profile and variable names
//! - Profile-scoped path resolution and the sandbox check
//!
//! This crate has no dependencies on other kontext crates.

pub mod error;
pub mod name;
pub mod path;

pub use error::{Error, Result, Warning};
pub use name::ProfileName;
pub use path::AbsPath;
