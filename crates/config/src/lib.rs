//! Configuration and persistence for kontext
//!
//! This crate handles:
//! - XDG directory management
//! - Settings loading (`config.toml`)
//! - Logging initialization
//! - The profile manifest schema and the Profile Store

pub mod config;
pub mod dirs;
pub mod logging;
pub mod profile;
pub mod store;

// Re-export error types from core
pub use kontext_core::{Error, Result};

// Re-export main types
pub use config::{Config, GeneralConfig, HooksConfig};
pub use profile::{EnvironmentSection, GitSection, HookKind, HooksSection, Profile};
pub use store::{MANIFEST_FILE, ProfileStore};
