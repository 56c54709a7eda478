//! Dotfile symlink engine
//!
//! A profile's `dotfiles` map links targets (usually under `~`) to sources
//! inside the profile directory. Whatever occupied a target before is moved
//! aside and recorded in a [`BackupLedger`] so a later, separate invocation
//! can put it back.
//!
//! Sources are sandbox-checked before anything on disk changes: a mapping
//! that points outside the profile directory fails the whole apply.

pub mod backup;

pub use backup::{BackupLedger, BackupRecord};

use indexmap::IndexMap;
use kontext_core::path::{ensure_within, expand_tilde, home_dir, normalize, resolve_in_profile};
use kontext_core::{AbsPath, Error, ProfileName, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotfileChange {
    /// Symlink created; `backup` is where the previous occupant went
    Linked {
        target: PathBuf,
        source: PathBuf,
        backup: Option<BackupRecord>,
    },
    /// Target already pointed at the source
    AlreadyLinked { target: PathBuf },
    /// Symlink removed; `restored` is true when a backup was put back
    Unlinked { target: PathBuf, restored: bool },
    /// Target left untouched
    Skipped { target: PathBuf, reason: String },
}

impl DotfileChange {
    /// Target path this change concerns
    pub fn target(&self) -> &Path {
        match self {
            Self::Linked { target, .. }
            | Self::AlreadyLinked { target }
            | Self::Unlinked { target, .. }
            | Self::Skipped { target, .. } => target,
        }
    }
}

impl std::fmt::Display for DotfileChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linked {
                target,
                source,
                backup,
            } => {
                write!(f, "linked {} -> {}", target.display(), source.display())?;
                if let Some(path) = backup.as_ref().and_then(|b| b.backup_path.as_ref()) {
                    write!(f, " (previous file moved to {})", path.display())?;
                }
                Ok(())
            }
            Self::AlreadyLinked { target } => write!(f, "{} already linked", target.display()),
            Self::Unlinked { target, restored } => {
                write!(f, "unlinked {}", target.display())?;
                if *restored {
                    write!(f, " (original restored)")?;
                }
                Ok(())
            }
            Self::Skipped { target, reason } => {
                write!(f, "skipped {}: {reason}", target.display())
            }
        }
    }
}

/// Applies and removes one profile's dotfile links
#[derive(Debug, Clone)]
pub struct DotfileManager {
    profile_dir: AbsPath,
    ledger_path: PathBuf,
}

impl DotfileManager {
    /// Manager for `profile`, keeping its ledger under `state_dir`
    pub fn new(profile: &ProfileName, profile_dir: AbsPath, state_dir: &Path) -> Self {
        Self {
            profile_dir,
            ledger_path: BackupLedger::path_for(state_dir, profile),
        }
    }

    /// Ledger file used by this manager
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Resolve and sandbox-check a source path
    ///
    /// # Errors
    ///
    /// [`Error::PathEscape`] when the source leaves the profile directory,
    /// [`Error::SourceMissing`] when it does not exist.
    pub fn resolve_source(&self, raw: &str) -> Result<PathBuf> {
        let resolved = resolve_in_profile(raw, &self.profile_dir)?;
        let source = ensure_within(&resolved, &self.profile_dir)?;
        if fs::symlink_metadata(&source).is_err() {
            return Err(Error::SourceMissing { path: source });
        }
        Ok(source)
    }

    /// Resolve a target: `~` expands to home, relative paths are under home
    pub fn resolve_target(raw: &str) -> Result<PathBuf> {
        let expanded = expand_tilde(raw)?;
        if expanded.is_absolute() {
            Ok(normalize(&expanded))
        } else {
            Ok(normalize(&home_dir()?.join(expanded)))
        }
    }

    /// Resolve every `(target, source)` pair without touching the filesystem
    ///
    /// # Errors
    ///
    /// The first sandbox violation, missing source or unresolvable target.
    pub fn plan(&self, mapping: &IndexMap<String, String>) -> Result<Vec<(PathBuf, PathBuf)>> {
        mapping
            .iter()
            .map(|(target, source)| Ok((Self::resolve_target(target)?, self.resolve_source(source)?)))
            .collect()
    }

    /// Link every target to its source
    ///
    /// All sources are resolved first; a sandbox violation or missing source
    /// aborts before any target is touched.
    pub fn apply(&self, mapping: &IndexMap<String, String>) -> Result<Vec<DotfileChange>> {
        let links = self.plan(mapping)?;

        let mut ledger = BackupLedger::load(&self.ledger_path)?;
        let mut changes = Vec::with_capacity(links.len());

        for (target, source) in links {
            if points_to(&target, &source) {
                tracing::debug!("Already linked: {}", target.display());
                changes.push(DotfileChange::AlreadyLinked { target });
                continue;
            }

            // One record per target: a second occupant would have nowhere to go
            if ledger.contains(&target) && fs::symlink_metadata(&target).is_ok() {
                tracing::warn!(
                    "{} was replaced after kontext backed it up; leaving it in place",
                    target.display()
                );
                changes.push(DotfileChange::Skipped {
                    target,
                    reason: "already holds a kontext backup; move the current file away first"
                        .to_string(),
                });
                continue;
            }

            let backup = self.back_up(&target, &mut ledger)?;

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::file_io("create directory", parent, e))?;
            }
            create_symlink(&source, &target)?;
            tracing::debug!("Linked {} -> {}", target.display(), source.display());

            changes.push(DotfileChange::Linked {
                target,
                source,
                backup,
            });
        }

        Ok(changes)
    }

    /// Remove links created by [`apply`](Self::apply) and restore backups
    ///
    /// Targets that are not links to this profile's sources are left alone,
    /// so calling this without a prior apply changes nothing.
    pub fn remove(&self, mapping: &IndexMap<String, String>) -> Result<Vec<DotfileChange>> {
        let mut ledger = BackupLedger::load(&self.ledger_path)?;
        let mut changes = Vec::with_capacity(mapping.len());

        for (raw_target, raw_source) in mapping {
            let target = Self::resolve_target(raw_target)?;
            let source = resolve_in_profile(raw_source, &self.profile_dir)?;

            let linked = points_to(&target, &source);
            if linked {
                fs::remove_file(&target)
                    .map_err(|e| Error::file_io("remove symlink", &target, e))?;
                tracing::debug!("Removed link {}", target.display());
            } else if fs::symlink_metadata(&target).is_ok() {
                if ledger.contains(&target) {
                    changes.push(DotfileChange::Skipped {
                        target: target.clone(),
                        reason: "replaced since activation; backup kept".to_string(),
                    });
                } else {
                    changes.push(DotfileChange::Skipped {
                        target,
                        reason: "not a link managed by this profile".to_string(),
                    });
                }
                continue;
            }

            let restored = match ledger.take(&target) {
                Some(record) => {
                    restore(&record)?;
                    ledger.save(&self.ledger_path)?;
                    true
                }
                None => false,
            };

            if linked || restored {
                changes.push(DotfileChange::Unlinked { target, restored });
            }
        }

        Ok(changes)
    }

    /// Move the current occupant of `target` aside and record it
    fn back_up(&self, target: &Path, ledger: &mut BackupLedger) -> Result<Option<BackupRecord>> {
        let Ok(metadata) = fs::symlink_metadata(target) else {
            return Ok(None);
        };

        let record = if metadata.file_type().is_symlink() {
            let link = fs::read_link(target).map_err(|e| Error::file_io("read symlink", target, e))?;
            fs::remove_file(target).map_err(|e| Error::file_io("remove symlink", target, e))?;
            BackupRecord::symlink(target.to_path_buf(), link)
        } else {
            let backup_path = backup::backup_path_for(target);
            fs::rename(target, &backup_path)
                .map_err(|e| Error::file_io("back up", target, e))?;
            BackupRecord::moved(target.to_path_buf(), backup_path)
        };

        ledger.insert(record.clone());
        ledger.save(&self.ledger_path)?;

        tracing::debug!("Backed up {}", target.display());
        Ok(Some(record))
    }
}

/// Put a recorded occupant back in place
fn restore(record: &BackupRecord) -> Result<()> {
    let target = &record.original_path;
    if record.was_symlink {
        if let Some(link) = &record.symlink_target {
            create_symlink(link, target)?;
        }
    } else if let Some(backup_path) = &record.backup_path {
        fs::rename(backup_path, target).map_err(|e| Error::file_io("restore", backup_path, e))?;
    }
    tracing::debug!("Restored {}", target.display());
    Ok(())
}

fn points_to(target: &Path, source: &Path) -> bool {
    fs::read_link(target).is_ok_and(|link| link == source)
}

fn create_symlink(source: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, link)
            .map_err(|e| Error::file_io("create symlink", link, e))
    }

    #[cfg(windows)]
    {
        if source.is_dir() {
            std::os::windows::fs::symlink_dir(source, link)
        } else {
            std::os::windows::fs::symlink_file(source, link)
        }
        .map_err(|e| Error::file_io("create symlink", link, e))
    }
}

#[cfg(all(test, unix))]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    struct Sandbox {
        _temp: TempDir,
        home: PathBuf,
        profile_dir: AbsPath,
        state: PathBuf,
    }

    fn sandbox() -> Sandbox {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        let profile_dir = temp.path().join("profiles/work");
        let state = temp.path().join("state");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(&profile_dir).unwrap();
        Sandbox {
            home,
            profile_dir: AbsPath::new(profile_dir).unwrap(),
            state,
            _temp: temp,
        }
    }

    fn manager(sb: &Sandbox) -> DotfileManager {
        let name = ProfileName::new("work").unwrap();
        DotfileManager::new(&name, sb.profile_dir.clone(), &sb.state)
    }

    fn mapping(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(t, s)| ((*t).to_string(), (*s).to_string()))
            .collect()
    }

    #[test]
    #[serial]
    fn test_apply_links_and_remove_restores_file() {
        let sb = sandbox();
        fs::write(sb.profile_dir.join(".vimrc"), "profile vimrc").unwrap();
        fs::write(sb.home.join(".vimrc"), b"original\x00bytes").unwrap();
        let map = mapping(&[("~/.vimrc", "{{profile_dir}}/.vimrc")]);

        temp_env::with_var("HOME", Some(&sb.home), || {
            let changes = manager(&sb).apply(&map).unwrap();
            assert!(matches!(changes[0], DotfileChange::Linked { backup: Some(_), .. }));
            assert_eq!(
                fs::read_link(sb.home.join(".vimrc")).unwrap(),
                sb.profile_dir.join(".vimrc")
            );

            // Fresh manager, as in a later process
            let changes = manager(&sb).remove(&map).unwrap();
            assert_eq!(
                changes,
                vec![DotfileChange::Unlinked {
                    target: sb.home.join(".vimrc"),
                    restored: true
                }]
            );
        });

        assert_eq!(fs::read(sb.home.join(".vimrc")).unwrap(), b"original\x00bytes");
        assert!(!BackupLedger::path_for(&sb.state, &ProfileName::new("work").unwrap()).exists());
    }

    #[test]
    #[serial]
    fn test_existing_symlink_is_recreated() {
        let sb = sandbox();
        fs::write(sb.profile_dir.join("gitignore"), "target/").unwrap();
        let elsewhere = sb.home.join("dots-gitignore");
        fs::write(&elsewhere, "old").unwrap();
        std::os::unix::fs::symlink(&elsewhere, sb.home.join(".gitignore")).unwrap();
        let map = mapping(&[("~/.gitignore", "gitignore")]);

        temp_env::with_var("HOME", Some(&sb.home), || {
            manager(&sb).apply(&map).unwrap();
            manager(&sb).remove(&map).unwrap();
        });

        assert_eq!(fs::read_link(sb.home.join(".gitignore")).unwrap(), elsewhere);
    }

    #[test]
    #[serial]
    fn test_reapply_is_noop() {
        let sb = sandbox();
        fs::write(sb.profile_dir.join("zshrc"), "x").unwrap();
        let map = mapping(&[(".zshrc", "zshrc")]);

        temp_env::with_var("HOME", Some(&sb.home), || {
            manager(&sb).apply(&map).unwrap();
            let changes = manager(&sb).apply(&map).unwrap();
            assert!(matches!(changes[0], DotfileChange::AlreadyLinked { .. }));
        });
    }

    #[test]
    #[serial]
    fn test_escaping_source_fails_before_mutation() {
        let sb = sandbox();
        fs::write(sb.profile_dir.join("ok"), "x").unwrap();
        fs::write(sb.home.join(".ok"), "keep").unwrap();
        let map = mapping(&[
            ("~/.ok", "ok"),
            ("~/.evil", "{{profile_dir}}/a/b/../../../../../etc/passwd"),
        ]);

        temp_env::with_var("HOME", Some(&sb.home), || {
            let err = manager(&sb).apply(&map).unwrap_err();
            assert!(matches!(err, Error::PathEscape { .. }));
        });

        assert_eq!(fs::read_to_string(sb.home.join(".ok")).unwrap(), "keep");
        assert!(fs::symlink_metadata(sb.home.join(".evil")).is_err());
    }

    #[test]
    #[serial]
    fn test_missing_source() {
        let sb = sandbox();
        let map = mapping(&[("~/.vimrc", "absent")]);
        temp_env::with_var("HOME", Some(&sb.home), || {
            let err = manager(&sb).apply(&map).unwrap_err();
            assert!(matches!(err, Error::SourceMissing { .. }));
        });
    }

    #[test]
    #[serial]
    fn test_remove_without_apply_changes_nothing() {
        let sb = sandbox();
        fs::write(sb.home.join(".vimrc"), "mine").unwrap();
        let map = mapping(&[("~/.vimrc", ".vimrc"), ("~/.absent", "absent")]);

        temp_env::with_var("HOME", Some(&sb.home), || {
            let changes = manager(&sb).remove(&map).unwrap();
            assert_eq!(changes.len(), 1);
            assert!(matches!(changes[0], DotfileChange::Skipped { .. }));
        });

        assert_eq!(fs::read_to_string(sb.home.join(".vimrc")).unwrap(), "mine");
        assert!(fs::symlink_metadata(sb.home.join(".absent")).is_err());
    }

    #[test]
    #[serial]
    fn test_replaced_link_is_left_alone_and_first_backup_kept() {
        let sb = sandbox();
        fs::write(sb.profile_dir.join("gitconfig"), "[user]").unwrap();
        fs::write(sb.home.join(".gitconfig"), "original").unwrap();
        let mine = sb.home.join("mine");
        fs::write(&mine, "user's own").unwrap();
        let map = mapping(&[("~/.gitconfig", "gitconfig")]);
        let target = sb.home.join(".gitconfig");

        temp_env::with_var("HOME", Some(&sb.home), || {
            manager(&sb).apply(&map).unwrap();

            // The user swaps the managed link for a link of their own
            fs::remove_file(&target).unwrap();
            std::os::unix::fs::symlink(&mine, &target).unwrap();

            let changes = manager(&sb).apply(&map).unwrap();
            assert!(matches!(changes[0], DotfileChange::Skipped { .. }));
            assert_eq!(fs::read_link(&target).unwrap(), mine);

            let changes = manager(&sb).remove(&map).unwrap();
            assert!(matches!(changes[0], DotfileChange::Skipped { .. }));
        });

        assert_eq!(fs::read_link(&target).unwrap(), mine);
        let ledger = BackupLedger::load(manager(&sb).ledger_path()).unwrap();
        let record = ledger.get(&target).unwrap();
        assert!(!record.was_symlink);
        assert_eq!(
            fs::read_to_string(record.backup_path.as_ref().unwrap()).unwrap(),
            "original"
        );
    }

    #[test]
    #[serial]
    fn test_plan_touches_nothing() {
        let sb = sandbox();
        fs::write(sb.profile_dir.join("vimrc"), "x").unwrap();
        let map = mapping(&[("~/.vimrc", "vimrc")]);

        temp_env::with_var("HOME", Some(&sb.home), || {
            let links = manager(&sb).plan(&map).unwrap();
            assert_eq!(links, vec![(sb.home.join(".vimrc"), sb.profile_dir.join("vimrc"))]);
        });
        assert!(fs::symlink_metadata(sb.home.join(".vimrc")).is_err());
    }

    #[test]
    #[serial]
    fn test_creates_target_parents() {
        let sb = sandbox();
        fs::write(sb.profile_dir.join("init.lua"), "--").unwrap();
        let map = mapping(&[("~/.config/nvim/init.lua", "init.lua")]);

        temp_env::with_var("HOME", Some(&sb.home), || {
            manager(&sb).apply(&map).unwrap();
        });
        assert!(
            fs::symlink_metadata(sb.home.join(".config/nvim/init.lua"))
                .unwrap()
                .file_type()
                .is_symlink()
        );
    }
}
