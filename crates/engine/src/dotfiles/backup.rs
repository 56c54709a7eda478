//! Persisted backup ledger
//!
//! Activation and deactivation run in separate processes, so backups of
//! files displaced by dotfile symlinks are recorded on disk:
//! `<state dir>/backups/<profile>.json`, keyed by resolved target path.
//!
//! ```json
//! {
//!   "version": 1,
//!   "records": {
//!     "/home/u/.vimrc": {
//!       "originalPath": "/home/u/.vimrc",
//!       "backupPath": "/home/u/.vimrc.kontext-backup-20240101T120000Z",
//!       "wasSymlink": false,
//!       "symlinkTarget": null,
//!       "createdAt": "2024-01-01T12:00:00Z"
//!     }
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use kontext_core::{Error, ProfileName, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const LEDGER_VERSION: u32 = 1;

/// What was at a dotfile target before kontext replaced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    /// Target path that was displaced
    pub original_path: PathBuf,
    /// Where file or directory content was moved (absent for symlinks)
    pub backup_path: Option<PathBuf>,
    /// Whether the original was a symlink
    pub was_symlink: bool,
    /// Original symlink target
    pub symlink_target: Option<PathBuf>,
    /// When the backup was taken
    pub created_at: DateTime<Utc>,
}

impl BackupRecord {
    /// Record for a displaced symlink
    pub fn symlink(original_path: PathBuf, symlink_target: PathBuf) -> Self {
        Self {
            original_path,
            backup_path: None,
            was_symlink: true,
            symlink_target: Some(symlink_target),
            created_at: Utc::now(),
        }
    }

    /// Record for a file or directory moved to `backup_path`
    pub fn moved(original_path: PathBuf, backup_path: PathBuf) -> Self {
        Self {
            original_path,
            backup_path: Some(backup_path),
            was_symlink: false,
            symlink_target: None,
            created_at: Utc::now(),
        }
    }
}

/// All backup records of one profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupLedger {
    version: u32,
    records: BTreeMap<String, BackupRecord>,
}

impl Default for BackupLedger {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            records: BTreeMap::new(),
        }
    }
}

impl BackupLedger {
    /// Ledger location for `profile` under `state_dir`
    pub fn path_for(state_dir: &Path, profile: &ProfileName) -> PathBuf {
        state_dir
            .join("backups")
            .join(format!("{}.json", profile.as_str()))
    }

    /// Load a ledger; a missing file is an empty ledger
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::file_io("read", path, e)),
        };

        let ledger: Self = serde_json::from_str(&content)
            .map_err(|e| Error::State(format!("{}: {e}", path.display())))?;
        if ledger.version != LEDGER_VERSION {
            return Err(Error::State(format!(
                "{}: unsupported ledger version {}",
                path.display(),
                ledger.version
            )));
        }
        Ok(ledger)
    }

    /// Write the ledger atomically; an empty ledger removes the file
    pub fn save(&self, path: &Path) -> Result<()> {
        if self.records.is_empty() {
            return match fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::file_io("remove", path, e)),
            };
        }

        let dir = path
            .parent()
            .ok_or_else(|| Error::State(format!("ledger has no parent: {}", path.display())))?;
        fs::create_dir_all(dir).map_err(|e| Error::file_io("create directory", dir, e))?;

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::State(format!("failed to serialize ledger: {e}")))?;
        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::file_io("create temporary file in", dir, e))?;
        temp.write_all(json.as_bytes())
            .map_err(|e| Error::file_io("write", temp.path().to_path_buf(), e))?;
        temp.persist(path)
            .map_err(|e| Error::file_io("write", path, e.error))?;
        Ok(())
    }

    /// Move the ledger at `path` aside as `<name>.json.orphaned-<UTC ts>`
    ///
    /// Returns the new location, or `None` when there was no ledger.
    pub fn archive(path: &Path) -> Result<Option<PathBuf>> {
        if fs::symlink_metadata(path).is_err() {
            return Ok(None);
        }
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let file_name = path
            .file_name()
            .map_or_else(|| "ledger".into(), |n| n.to_string_lossy().into_owned());
        let archived = path.with_file_name(format!("{file_name}.orphaned-{stamp}"));
        fs::rename(path, &archived).map_err(|e| Error::file_io("archive", path, e))?;
        Ok(Some(archived))
    }

    /// Record lookup
    pub fn get(&self, target: &Path) -> Option<&BackupRecord> {
        self.records.get(&key(target))
    }

    /// Whether a record exists for `target`
    pub fn contains(&self, target: &Path) -> bool {
        self.records.contains_key(&key(target))
    }

    /// Add a record keyed by its original path
    pub fn insert(&mut self, record: BackupRecord) {
        self.records.insert(key(&record.original_path), record);
    }

    /// Remove and return the record for `target`
    pub fn take(&mut self, target: &Path) -> Option<BackupRecord> {
        self.records.remove(&key(target))
    }

    /// Records ordered by target path
    pub fn records(&self) -> impl Iterator<Item = &BackupRecord> {
        self.records.values()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no backups are outstanding
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Sibling path a displaced file is moved to
pub fn backup_path_for(target: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let file_name = target
        .file_name()
        .map_or_else(|| "target".into(), |n| n.to_string_lossy().into_owned());
    let mut candidate = target.with_file_name(format!("{file_name}.kontext-backup-{stamp}"));
    let mut counter = 1;
    while fs::symlink_metadata(&candidate).is_ok() {
        candidate = target.with_file_name(format!("{file_name}.kontext-backup-{stamp}-{counter}"));
        counter += 1;
    }
    candidate
}

fn key(target: &Path) -> String {
    target.to_string_lossy().into_owned()
}
