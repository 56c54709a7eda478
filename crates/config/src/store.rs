//! Profile Store
//!
//! Persists profiles as `<root>/<name>/profile.yml`. Every call reads from
//! disk; nothing is cached between operations.
//!
//! Store operations only touch the profile's own directory tree.

use crate::profile::Profile;
use kontext_core::{AbsPath, Error, ProfileName, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Manifest file name inside each profile directory
pub const MANIFEST_FILE: &str = "profile.yml";

/// Filesystem-backed profile storage
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    /// Create a store rooted at `root` (need not exist yet)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by profile `name`
    pub fn profile_dir(&self, name: &ProfileName) -> Result<AbsPath> {
        AbsPath::new(self.root.join(name.as_str()))
    }

    /// Manifest path of profile `name`
    pub fn manifest_path(&self, name: &ProfileName) -> PathBuf {
        self.root.join(name.as_str()).join(MANIFEST_FILE)
    }

    /// Whether a manifest is persisted for `name`
    pub fn exists(&self, name: &ProfileName) -> bool {
        self.manifest_path(name).is_file()
    }

    /// Persist a new profile
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if a manifest is already persisted under that name
    /// - `InvalidVariableName` if the profile fails validation (nothing is written)
    pub fn create(&self, profile: &Profile) -> Result<AbsPath> {
        profile.validate()?;
        if self.exists(&profile.name) {
            return Err(Error::AlreadyExists {
                name: profile.name.to_string(),
            });
        }

        let dir = self.profile_dir(&profile.name)?;
        fs::create_dir_all(dir.as_path())
            .map_err(|e| Error::file_io("create directory", dir.as_path(), e))?;
        self.write_manifest(profile)?;

        tracing::debug!(profile = %profile.name, dir = %dir, "Created profile");
        Ok(dir)
    }

    /// Load a profile
    ///
    /// Returns `Ok(None)` when no manifest is persisted.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if `name` is not a valid profile name
    /// - `CorruptManifest` if the manifest exists but is unreadable, fails the
    ///   schema, or names a different profile than its directory
    pub fn get(&self, name: &str) -> Result<Option<Profile>> {
        let name = ProfileName::new(name)?;
        let path = self.manifest_path(&name);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| Error::CorruptManifest {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let profile = Profile::from_yaml(&content).map_err(|e| Error::CorruptManifest {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if profile.name != name {
            return Err(Error::CorruptManifest {
                path,
                message: format!(
                    "manifest name '{}' does not match directory '{name}'",
                    profile.name
                ),
            });
        }

        Ok(Some(profile))
    }

    /// Load a profile that must exist
    pub fn load(&self, name: &str) -> Result<Profile> {
        self.get(name)?.ok_or_else(|| Error::NotFound {
            name: name.to_string(),
        })
    }

    /// Replace a persisted profile
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no manifest is persisted under the profile's name.
    pub fn update(&self, profile: &Profile) -> Result<()> {
        profile.validate()?;
        if !self.exists(&profile.name) {
            return Err(Error::NotFound {
                name: profile.name.to_string(),
            });
        }
        self.write_manifest(profile)
    }

    /// Remove a profile and everything in its directory
    ///
    /// Irreversible: dotfile sources, hooks and env files go with it.
    pub fn delete(&self, name: &str) -> Result<()> {
        let name = ProfileName::new(name)?;
        if !self.exists(&name) {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        }
        let dir = self.profile_dir(&name)?;
        fs::remove_dir_all(dir.as_path())
            .map_err(|e| Error::file_io("remove directory", dir.as_path(), e))?;
        tracing::debug!(profile = %name, "Deleted profile");
        Ok(())
    }

    /// Names of all profiles with a valid manifest, sorted
    ///
    /// Directories without a manifest are skipped silently; directories with
    /// a corrupt manifest are skipped with a warning.
    pub fn list(&self) -> Result<Vec<ProfileName>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::file_io("read directory", &self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::file_io("read directory", &self.root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(dir_name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let Ok(name) = ProfileName::new(dir_name) else {
                continue;
            };
            match self.get(name.as_str()) {
                Ok(Some(_)) => names.push(name),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping profile '{name}': {e}"),
            }
        }

        names.sort();
        Ok(names)
    }

    fn write_manifest(&self, profile: &Profile) -> Result<()> {
        let path = self.manifest_path(&profile.name);
        let dir = path
            .parent()
            .ok_or_else(|| Error::State(format!("manifest has no parent: {}", path.display())))?;

        let yaml = profile
            .to_yaml()
            .map_err(|e| Error::State(format!("failed to serialize profile: {e}")))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::file_io("create temporary file in", dir, e))?;
        temp.write_all(yaml.as_bytes())
            .map_err(|e| Error::file_io("write", temp.path().to_path_buf(), e))?;
        temp.persist(&path)
            .map_err(|e| Error::file_io("write", &path, e.error))?;
        Ok(())
    }
}
