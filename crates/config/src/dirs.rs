//! XDG directory utilities
//!
//! This module provides XDG-compliant directory paths for kontext.
//! It follows the XDG Base Directory specification using the `xdg` crate:
//! - `XDG_CONFIG_HOME` defaults to ~/.config
//! - `XDG_STATE_HOME` defaults to ~/.local/state

use std::path::PathBuf;
use xdg::BaseDirectories;

/// Get the kontext config directory
///
/// Returns `$XDG_CONFIG_HOME/kontext` or `~/.config/kontext`
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("kontext").get_config_home()
}

/// Get the kontext state directory
///
/// Returns `$XDG_STATE_HOME/kontext` or `~/.local/state/kontext`
#[must_use]
pub fn state_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("kontext").get_state_home()
}

/// Get the default profiles root
///
/// Returns `$XDG_CONFIG_HOME/kontext/profiles`
#[must_use]
pub fn default_profiles_dir() -> Option<PathBuf> {
    config_dir().map(|d| d.join("profiles"))
}

/// Get the default settings file path
///
/// Returns `$XDG_CONFIG_HOME/kontext/config.toml`
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}
