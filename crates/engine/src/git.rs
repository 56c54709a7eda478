//! Git identity fragments
//!
//! A profile's git identity is a regular git-config file inside its
//! directory. It is never copied into the user's global config: activation
//! exports git's environment-config variables so the fragment is included
//! only in the shell that activated the profile.

use kontext_core::{Error, Result, Warning};
use std::fs;
use std::path::Path;

/// Variables git reads for environment-supplied config
pub const GIT_ENV_VARS: [&str; 3] = ["GIT_CONFIG_COUNT", "GIT_CONFIG_KEY_0", "GIT_CONFIG_VALUE_0"];

/// Identity read from a fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitIdentity {
    /// `user.name`
    pub user_name: Option<String>,
    /// `user.email`
    pub user_email: Option<String>,
}

/// Open a fragment and read its identity
///
/// A missing or unparsable fragment is a warning.
pub fn read_identity(path: &Path) -> std::result::Result<GitIdentity, Warning> {
    if !path.is_file() {
        return Err(Warning::GitConfig {
            path: path.to_path_buf(),
            message: "file not found".to_string(),
        });
    }

    let config = git2::Config::open(path).map_err(|e| Warning::GitConfig {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    Ok(GitIdentity {
        user_name: config.get_string("user.name").ok(),
        user_email: config.get_string("user.email").ok(),
    })
}

/// Write `user.name` / `user.email` into a fragment, creating it if needed
pub fn write_identity(path: &Path, name: Option<&str>, email: Option<&str>) -> Result<()> {
    if !path.exists() {
        fs::write(path, "").map_err(|e| Error::file_io("create", path, e))?;
    }

    let to_error = |e: git2::Error| Error::Config(format!("{}: {}", path.display(), e.message()));
    let mut config = git2::Config::open(path).map_err(to_error)?;
    if let Some(name) = name {
        config.set_str("user.name", name).map_err(to_error)?;
    }
    if let Some(email) = email {
        config.set_str("user.email", email).map_err(to_error)?;
    }
    Ok(())
}

/// Environment assignments that make git include `fragment`
pub fn include_assignments(fragment: &Path) -> [(&'static str, String); 3] {
    [
        (GIT_ENV_VARS[0], "1".to_string()),
        (GIT_ENV_VARS[1], "include.path".to_string()),
        (GIT_ENV_VARS[2], fragment.to_string_lossy().into_owned()),
    ]
}
