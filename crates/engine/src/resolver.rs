//! Directory Resolver
//!
//! A directory is bound to a profile by a `.kontext-profile` marker holding
//! the profile name. Directories without a marker inherit from the nearest
//! ancestor that has one; the filesystem root is checked last and acts as a
//! machine-wide default.
//!
//! Symlinked directories are walked as ordinary path components: the search
//! follows the path as given, not its canonical form.

use kontext_core::{AbsPath, Error, ProfileName, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Marker file name
pub const MARKER_FILE: &str = ".kontext-profile";

/// Profile controlling a directory, with the marker that decided it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveProfile {
    /// Profile name read from the marker
    pub name: ProfileName,
    /// Marker file that supplied the name
    pub marker: PathBuf,
}

/// Find the nearest marker at or above `start`
///
/// Relative `start` paths are taken relative to the current directory.
/// Returns `None` when no directory up to and including the root has one.
pub fn find_marker(start: &Path) -> Option<PathBuf> {
    let start = absolutize(start)?;
    let mut dir = Some(start.as_path());

    while let Some(current) = dir {
        let candidate = current.join(MARKER_FILE);
        if candidate.is_file() {
            tracing::debug!("Found marker {}", candidate.display());
            return Some(candidate);
        }
        dir = current.parent();
    }

    tracing::debug!("No marker above {}", start.display());
    None
}

/// Read and validate the profile name stored in a marker
///
/// # Errors
///
/// - `MalformedMarker` if the file is empty after trimming
/// - `InvalidName` if the trimmed content is not a valid profile name
pub fn resolve_profile_name(marker: &Path) -> Result<ProfileName> {
    let content =
        fs::read_to_string(marker).map_err(|e| Error::file_io("read marker", marker, e))?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::MalformedMarker {
            path: marker.to_path_buf(),
        });
    }
    ProfileName::new(trimmed)
}

/// Profile controlling `start`, with its marker
///
/// Never fails: unreadable or malformed markers are logged and treated as
/// "no active profile".
pub fn active_profile(start: &Path) -> Option<ActiveProfile> {
    let marker = find_marker(start)?;
    match resolve_profile_name(&marker) {
        Ok(name) => Some(ActiveProfile { name, marker }),
        Err(e) => {
            tracing::warn!("Ignoring marker {}: {e}", marker.display());
            None
        }
    }
}

/// Name of the profile controlling `start` (default: current directory)
pub fn get_active_profile(start: Option<&Path>) -> Option<ProfileName> {
    match start {
        Some(dir) => active_profile(dir).map(|a| a.name),
        None => {
            let cwd = match std::env::current_dir() {
                Ok(cwd) => cwd,
                Err(e) => {
                    tracing::warn!("Cannot read current directory: {e}");
                    return None;
                }
            };
            active_profile(&cwd).map(|a| a.name)
        }
    }
}

/// Write a marker binding `dir` to `name`
///
/// # Errors
///
/// Returns `MarkerExists` when `dir` already has a marker and `force` is false.
pub fn write_marker(dir: &Path, name: &ProfileName, force: bool) -> Result<PathBuf> {
    let marker = dir.join(MARKER_FILE);
    if !force && marker.exists() {
        return Err(Error::MarkerExists { path: marker });
    }
    fs::write(&marker, format!("{name}\n")).map_err(|e| Error::file_io("write", &marker, e))?;
    Ok(marker)
}

/// Remove the marker in `dir` itself (ancestors are untouched)
///
/// Returns whether a marker was removed.
pub fn remove_marker(dir: &Path) -> Result<bool> {
    let marker = dir.join(MARKER_FILE);
    match fs::remove_file(&marker) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::file_io("remove", &marker, e)),
    }
}

fn absolutize(start: &Path) -> Option<PathBuf> {
    if start.is_absolute() {
        return Some(start.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    AbsPath::resolve(start, &cwd).ok().map(AbsPath::into_path_buf)
}
