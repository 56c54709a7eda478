//! Error types for CLI commands
//!
//! Library errors arrive as `kontext_core::Error`; this layer adds the
//! user-facing guidance the library cannot know about (available profiles,
//! editor failures, malformed `KEY=VALUE` arguments).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during command execution
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// Profile does not exist; lists what does
    #[error("Profile '{name}' not found. {}", available_hint(.available))]
    ProfileNotFound {
        /// Requested name
        name: String,
        /// Profiles that do exist
        available: Vec<String>,
    },

    /// No marker controls the directory and no name was given
    #[error("No profile is active for {}. Tag it with `kontext tag <name>` or pass a profile name", .0.display())]
    NoActiveProfile(PathBuf),

    /// `KEY=VALUE` style argument without `=`
    #[error("Invalid {kind} '{value}': expected {kind} in KEY=VALUE form")]
    InvalidAssignment {
        /// Argument kind (`--env`, `--dotfile`)
        kind: &'static str,
        /// Raw argument
        value: String,
    },

    /// Editor could not be started or failed
    #[error("Editor '{editor}' failed: {message}")]
    EditorFailed {
        /// Editor command
        editor: String,
        /// What went wrong
        message: String,
    },

    /// Core library error
    #[error(transparent)]
    Core(#[from] kontext_core::Error),

    /// Interactive prompt error
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

impl CommandError {
    /// Build a `ProfileNotFound` error
    #[must_use]
    pub fn profile_not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        Self::ProfileNotFound {
            name: name.into(),
            available,
        }
    }
}

fn available_hint(available: &[String]) -> String {
    if available.is_empty() {
        "No profiles exist yet; create one with `kontext create <name>`".to_string()
    } else {
        format!("Available profiles: {}", available.join(", "))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_profile_not_found_lists_available() {
        let error =
            CommandError::profile_not_found("wrok", vec!["home".to_string(), "work".to_string()]);
        let msg = error.to_string();
        assert!(msg.contains("'wrok' not found"));
        assert!(msg.contains("Available profiles: home, work"));
    }

    #[test]
    fn test_profile_not_found_without_profiles() {
        let msg = CommandError::profile_not_found("work", Vec::new()).to_string();
        assert!(msg.contains("kontext create"));
    }

    #[test]
    fn test_invalid_assignment() {
        let error = CommandError::InvalidAssignment {
            kind: "--env",
            value: "NOVALUE".to_string(),
        };
        assert!(error.to_string().contains("'NOVALUE'"));
    }

    #[test]
    fn test_core_error_conversion() {
        let core = kontext_core::Error::InvalidName {
            name: "../x".to_string(),
        };
        let error: CommandError = core.into();
        assert!(matches!(error, CommandError::Core(_)));
        assert!(error.to_string().contains("../x"));
    }
}
