//! # kontext engine
//!
//! Everything between a directory and the shell code that activates its
//! profile:
//!
//! - **Resolver**: nearest `.kontext-profile` marker at or above a directory
//! - **Dotfiles**: symlinks into the profile directory with persisted backups
//! - **Hooks**: lifecycle scripts with a wall-clock timeout
//! - **Activation**: ordered activation/deactivation shell scripts
//! - **Session**: load, link and generate in one call per switch

pub mod activation;
pub mod dotfiles;
pub mod envfile;
pub mod git;
pub mod hooks;
pub mod lifecycle;
pub mod resolver;
pub mod session;
pub mod shell;

// Re-export core types
pub use kontext_core::{AbsPath, Error, ProfileName, Result, Warning};

// Re-export commonly used types
pub use activation::{
    CURRENT_PROFILE_VAR, GeneratedScript, HookInvocation, PROFILE_DIR_VAR, ScriptGenerator,
};
pub use dotfiles::{BackupLedger, BackupRecord, DotfileChange, DotfileManager};
pub use hooks::HookRunner;
pub use resolver::{ActiveProfile, MARKER_FILE, get_active_profile};
pub use session::{Session, Transition};
