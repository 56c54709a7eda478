//! Error types for kontext
//!
//! Two families live here and are deliberately distinct types:
//!
//! - [`Error`]: fatal failures. The operation is aborted and the error is
//!   reported to the user.
//! - [`Warning`]: non-fatal failures from automation (hooks, optional files,
//!   git fragments, dotfiles during activation). They are logged and the
//!   surrounding operation continues.
//!
//! Keeping them apart means a hook failure can never be `?`-propagated into a
//! fatal path by accident.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Fatal error type shared by every kontext crate
#[derive(Error, Debug)]
pub enum Error {
    /// IO error without path context
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error on a specific path
    #[error("Failed to {action} {}: {source}", path.display())]
    FileIo {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Profile name does not match `[A-Za-z0-9_-]+`
    #[error("Invalid profile name '{name}': only letters, digits, '-' and '_' are allowed")]
    InvalidName { name: String },

    /// Environment variable name does not match `[A-Za-z_][A-Za-z0-9_]*`
    #[error(
        "Invalid environment variable name '{name}': must start with a letter or underscore and contain only letters, digits and underscores"
    )]
    InvalidVariableName { name: String },

    /// Directory marker is empty after trimming
    #[error("Malformed directory marker {}: file is empty", path.display())]
    MalformedMarker { path: PathBuf },

    /// A profile with this name is already persisted
    #[error("Profile '{name}' already exists")]
    AlreadyExists { name: String },

    /// No profile with this name is persisted
    #[error("Profile '{name}' not found")]
    NotFound { name: String },

    /// A directory marker already exists where a new one was requested
    #[error("Directory is already tagged: {}", path.display())]
    MarkerExists { path: PathBuf },

    /// Refusing to delete the profile that controls the current directory
    #[error("Profile '{name}' is active in the current directory (marker: {})", marker.display())]
    ActiveProfileConflict { name: String, marker: PathBuf },

    /// A profile-owned path resolves outside the profile directory
    #[error("Path {} escapes profile directory {}", path.display(), base.display())]
    PathEscape {
        path: Arc<PathBuf>,
        base: Arc<PathBuf>,
    },

    /// Dotfile source does not exist
    #[error("Dotfile source does not exist: {}", path.display())]
    SourceMissing { path: PathBuf },

    /// Persisted manifest exists but cannot be parsed or fails validation
    #[error("Corrupt profile manifest {}: {message}", path.display())]
    CorruptManifest { path: PathBuf, message: String },

    /// Path is not absolute
    #[error("Path must be absolute: {}", path.display())]
    PathNotAbsolute { path: PathBuf },

    /// Home directory could not be determined
    #[error("Could not determine the home directory")]
    HomeDirNotFound,

    /// Settings file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted state (backup ledger) error
    #[error("State error: {0}")]
    State(String),
}

impl Error {
    /// Attach a path and action to an IO error
    pub fn file_io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            action,
            path: path.into(),
            source,
        }
    }

    /// Build a sandbox violation error
    pub fn path_escape(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self::PathEscape {
            path: Arc::new(path.into()),
            base: Arc::new(base.into()),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal failure that must never block profile switching
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Hook script does not exist
    #[error("Hook not found: {}", path.display())]
    HookMissing { path: PathBuf },

    /// Hook exceeded its wall-clock budget and was killed
    #[error("Hook {} timed out after {seconds} seconds", path.display())]
    HookTimeout { path: PathBuf, seconds: u64 },

    /// Hook exited with a non-zero status
    #[error("Hook {} exited with {}", path.display(), code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    HookNonZeroExit { path: PathBuf, code: Option<i32> },

    /// Hook could not be started or waited on
    #[error("Hook {} could not be run: {message}", path.display())]
    HookSpawn { path: PathBuf, message: String },

    /// Configured env file does not exist
    #[error("Env file not found: {}", path.display())]
    EnvFileMissing { path: PathBuf },

    /// Configured activation script does not exist
    #[error("Script not found: {}", path.display())]
    ScriptMissing { path: PathBuf },

    /// Env file line skipped
    #[error("Skipping {}:{line}: {reason}", path.display())]
    InvalidEnvEntry {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Git config fragment could not be used
    #[error("Git config {} unusable: {message}", path.display())]
    GitConfig { path: PathBuf, message: String },

    /// Dotfile step failed during activation or deactivation
    #[error("Dotfile {target}: {message}")]
    Dotfile { target: String, message: String },
}

impl Warning {
    /// Emit this warning through tracing
    pub fn log(&self) {
        tracing::warn!("{self}");
    }
}
