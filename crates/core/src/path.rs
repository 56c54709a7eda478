//! Path handling for profile-owned files
//!
//! Profile manifests reference files with plain strings. This module turns
//! those strings into filesystem paths without textual substitution:
//!
//! - [`AbsPath`]: an absolute path, used for profile directories
//! - [`resolve_in_profile`]: manifest path → absolute path, honouring the
//!   [`PROFILE_DIR_TOKEN`] placeholder only as the leading component
//! - [`ensure_within`]: the sandbox check applied before any symlink is made
//!
//! # Examples
//!
//! ```
//! use kontext_core::path::{resolve_in_profile, AbsPath};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = AbsPath::new("/profiles/work".into())?;
//! let vimrc = resolve_in_profile("{{profile_dir}}/.vimrc", &profile)?;
//! assert_eq!(vimrc, Path::new("/profiles/work/.vimrc"));
//!
//! let relative = resolve_in_profile("hooks/../env", &profile)?;
//! assert_eq!(relative, Path::new("/profiles/work/env"));
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Placeholder standing for the owning profile's directory
pub const PROFILE_DIR_TOKEN: &str = "{{profile_dir}}";

/// An absolute path on the filesystem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbsPath(PathBuf);

impl AbsPath {
    /// Create a new `AbsPath` from a `PathBuf`
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute.
    pub fn new(path: PathBuf) -> Result<Self> {
        if path.is_absolute() {
            Ok(AbsPath(path))
        } else {
            Err(Error::PathNotAbsolute { path })
        }
    }

    /// Make `path` absolute against `base` when it is relative
    pub fn resolve(path: &Path, base: &Path) -> Result<Self> {
        if path.is_absolute() {
            Self::new(normalize(path))
        } else {
            Self::new(normalize(&base.join(path)))
        }
    }

    /// Get the underlying `Path`
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Convert to a `PathBuf`
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// Join a relative component
    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.0.join(rel)
    }

    /// Get the file name
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|s| s.to_str())
    }
}

impl AsRef<Path> for AbsPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for AbsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// The current user's home directory
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(Error::HomeDirNotFound)
}

/// Expand a leading `~` or `~/` to the home directory
///
/// Other strings are returned unchanged. `~user` forms are not supported.
pub fn expand_tilde(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return home_dir();
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        return Ok(home_dir()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Lexically normalise `.` and `..` components
///
/// Does not touch the filesystem. `..` above the root of an absolute path is
/// dropped, matching what the kernel does.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    Some(Component::RootDir | Component::Prefix(_)) => true,
                    _ => false,
                };
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a manifest path string against its profile directory
///
/// - `{{profile_dir}}/x` → `<profile_dir>/x`
/// - `~/x` → `<home>/x`
/// - absolute paths are kept
/// - anything else is relative to the profile directory
///
/// The result is lexically normalised but not sandbox-checked; use
/// [`ensure_within`] for that.
pub fn resolve_in_profile(raw: &str, profile_dir: &AbsPath) -> Result<PathBuf> {
    let raw_path = Path::new(raw);
    let mut components = raw_path.components();

    let resolved = match components.next() {
        Some(Component::Normal(first)) if first == OsStr::new(PROFILE_DIR_TOKEN) => {
            profile_dir.join(components.as_path())
        }
        Some(Component::Normal(first)) if first == OsStr::new("~") => expand_tilde(raw)?,
        _ if raw_path.is_absolute() => raw_path.to_path_buf(),
        _ => profile_dir.join(raw_path),
    };

    Ok(normalize(&resolved))
}

/// Resolve a path given on the command line: absolute, `~`-relative, or
/// relative to `cwd`
pub fn resolve_user_path(raw: &str, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(raw)?;
    if expanded.is_absolute() {
        Ok(normalize(&expanded))
    } else {
        Ok(normalize(&cwd.join(expanded)))
    }
}

/// Check that `path` lies inside `base`
///
/// The lexical check runs first so `..` escapes are rejected even for paths
/// that do not exist. When the path exists it is canonicalised and checked
/// again, which rejects symlinks pointing out of the sandbox.
///
/// # Errors
///
/// Returns [`Error::PathEscape`] on violation.
pub fn ensure_within(path: &Path, base: &AbsPath) -> Result<PathBuf> {
    let normalized = normalize(path);
    let base_normalized = normalize(base.as_path());

    if !normalized.starts_with(&base_normalized) || normalized == base_normalized {
        return Err(Error::path_escape(normalized, base_normalized));
    }

    if fs::symlink_metadata(&normalized).is_ok() {
        let canonical = fs::canonicalize(&normalized)
            .map_err(|e| Error::file_io("resolve", &normalized, e))?;
        let canonical_base = fs::canonicalize(&base_normalized)
            .map_err(|e| Error::file_io("resolve", &base_normalized, e))?;
        if !canonical.starts_with(&canonical_base) {
            return Err(Error::path_escape(canonical, canonical_base));
        }
    }

    Ok(normalized)
}
