//! Profile lifecycle operations that need directory state
//!
//! The store alone cannot tell whether a profile is in use. These wrappers
//! consult the Directory Resolver before mutating anything.

use crate::dotfiles::{BackupLedger, BackupRecord};
use crate::resolver;
use kontext_config::ProfileStore;
use kontext_core::{Error, ProfileName, Result};
use std::path::{Path, PathBuf};

/// Delete a profile unless it controls `cwd`
///
/// Returns backups still recorded for the profile. The backup files stay on
/// disk for the user to restore by hand; the ledger is moved aside so a later
/// profile with the same name starts clean.
///
/// # Errors
///
/// - `ActiveProfileConflict` when `cwd` resolves to `name` (nothing is touched)
/// - `NotFound` when the profile does not exist
pub fn delete_profile(
    store: &ProfileStore,
    state_dir: &Path,
    name: &ProfileName,
    cwd: &Path,
) -> Result<Vec<BackupRecord>> {
    if let Some(active) = resolver::active_profile(cwd) {
        if &active.name == name {
            return Err(Error::ActiveProfileConflict {
                name: name.to_string(),
                marker: active.marker,
            });
        }
    }

    store.delete(name.as_str())?;

    let ledger_path = BackupLedger::path_for(state_dir, name);
    let ledger = BackupLedger::load(&ledger_path)?;
    if let Some(archived) = BackupLedger::archive(&ledger_path)? {
        tracing::info!("Kept backup ledger of '{name}' as {}", archived.display());
    }
    Ok(ledger.records().cloned().collect())
}

/// Bind `dir` to an existing profile
///
/// # Errors
///
/// - `NotFound` when the profile does not exist
/// - `MarkerExists` when `dir` is already tagged and `force` is false
pub fn tag_directory(
    store: &ProfileStore,
    dir: &Path,
    name: &ProfileName,
    force: bool,
) -> Result<PathBuf> {
    if !store.exists(name) {
        return Err(Error::NotFound {
            name: name.to_string(),
        });
    }
    let marker = resolver::write_marker(dir, name, force)?;
    tracing::debug!("Tagged {} with '{name}'", dir.display());
    Ok(marker)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use kontext_config::Profile;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ProfileStore, ProfileName) {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::new(temp.path().join("profiles"));
        let name = ProfileName::new("work").unwrap();
        store.create(&Profile::new(name.clone())).unwrap();
        (temp, store, name)
    }

    #[test]
    fn test_delete_guard_blocks_active_profile() {
        let (temp, store, name) = setup();
        let project = temp.path().join("proj/sub");
        fs::create_dir_all(&project).unwrap();
        tag_directory(&store, &temp.path().join("proj"), &name, false).unwrap();

        let err = delete_profile(&store, &temp.path().join("state"), &name, &project).unwrap_err();
        assert!(matches!(err, Error::ActiveProfileConflict { .. }));
        assert!(store.exists(&name));
    }

    #[test]
    fn test_delete_elsewhere_succeeds() {
        let (temp, store, name) = setup();
        let elsewhere = temp.path().join("elsewhere");
        fs::create_dir_all(&elsewhere).unwrap();

        let state = temp.path().join("state");
        let ledger_path = BackupLedger::path_for(&state, &name);
        let mut ledger = BackupLedger::default();
        ledger.insert(BackupRecord::moved(
            temp.path().join("home/.vimrc"),
            temp.path().join("home/.vimrc.kontext-backup-x"),
        ));
        ledger.save(&ledger_path).unwrap();

        let leftovers = delete_profile(&store, &state, &name, &elsewhere).unwrap();
        assert_eq!(leftovers.len(), 1);
        assert!(!store.exists(&name));
        assert!(!ledger_path.exists());

        let archived: Vec<_> = fs::read_dir(state.join("backups"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(archived.len(), 1);
        assert!(archived[0].starts_with("work.json.orphaned-"));

        // Same name again: no inherited records
        store.create(&Profile::new(name.clone())).unwrap();
        assert!(BackupLedger::load(&ledger_path).unwrap().is_empty());
    }

    #[test]
    fn test_delete_without_ledger() {
        let (temp, store, name) = setup();
        let leftovers =
            delete_profile(&store, &temp.path().join("state"), &name, temp.path()).unwrap();
        assert!(leftovers.is_empty());
        assert!(!temp.path().join("state/backups").exists());
    }

    #[test]
    fn test_tag_unknown_profile() {
        let (temp, store, _) = setup();
        let other = ProfileName::new("other").unwrap();
        let err = tag_directory(&store, temp.path(), &other, false).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(!temp.path().join(resolver::MARKER_FILE).exists());
    }

    #[test]
    fn test_tag_twice_requires_force() {
        let (temp, store, name) = setup();
        tag_directory(&store, temp.path(), &name, false).unwrap();
        assert!(matches!(
            tag_directory(&store, temp.path(), &name, false),
            Err(Error::MarkerExists { .. })
        ));
        tag_directory(&store, temp.path(), &name, true).unwrap();
    }
}
