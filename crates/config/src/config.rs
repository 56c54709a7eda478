//! Settings file
//!
//! Loads `$XDG_CONFIG_HOME/kontext/config.toml`. Every field is optional and a
//! missing file is the same as an empty one.
//!
//! ```toml
//! [general]
//! profilesDir = "~/dev/kontext-profiles"
//! stateDir = "~/.local/state/kontext"
//! editor = "nvim"
//!
//! [hooks]
//! timeout = 30
//! ```

use crate::dirs;
use kontext_core::path::expand_tilde;
use kontext_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hook wall-clock budget used when nothing else is configured
pub const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 30;

/// General configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Root directory holding one subdirectory per profile
    #[serde(default, rename = "profilesDir")]
    pub profiles_dir: Option<PathBuf>,

    /// Directory for persisted state (dotfile backup ledgers)
    #[serde(default, rename = "stateDir")]
    pub state_dir: Option<PathBuf>,

    /// Editor command for `kontext edit`
    #[serde(default)]
    pub editor: Option<String>,
}

/// Hook configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Timeout in seconds; 0 falls back to the default
    #[serde(default = "default_hook_timeout")]
    pub timeout: u64,
}

fn default_hook_timeout() -> u64 {
    DEFAULT_HOOK_TIMEOUT_SECS
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            timeout: default_hook_timeout(),
        }
    }
}

/// kontext settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Hook settings
    #[serde(default)]
    pub hooks: HooksConfig,
}

impl Config {
    /// Load settings
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// read when present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match dirs::default_config_file() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(&path).map_err(|e| Error::file_io("read", &path, e))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Profiles root, honouring `general.profilesDir`
    pub fn profiles_dir(&self) -> Result<PathBuf> {
        match &self.general.profiles_dir {
            Some(dir) => expand_tilde(&dir.to_string_lossy()),
            None => dirs::default_profiles_dir()
                .ok_or_else(|| Error::Config("cannot determine profiles directory".into())),
        }
    }

    /// State root, honouring `general.stateDir`
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.general.state_dir {
            Some(dir) => expand_tilde(&dir.to_string_lossy()),
            None => dirs::state_dir()
                .ok_or_else(|| Error::Config("cannot determine state directory".into())),
        }
    }

    /// Hook timeout as a duration
    pub fn hook_timeout(&self) -> Duration {
        let secs = if self.hooks.timeout == 0 {
            DEFAULT_HOOK_TIMEOUT_SECS
        } else {
            self.hooks.timeout
        };
        Duration::from_secs(secs)
    }
}
