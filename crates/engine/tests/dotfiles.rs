//! Integration tests for dotfile linking across invocations

#![cfg(unix)]

use indexmap::IndexMap;
use kontext_engine::{AbsPath, BackupLedger, DotfileManager, Error, ProfileName};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workstation {
    _temp: TempDir,
    home: PathBuf,
    profile_dir: PathBuf,
    state: PathBuf,
}

fn workstation() -> Workstation {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home");
    let profile_dir = temp.path().join("profiles/work");
    let state = temp.path().join("state");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&profile_dir).unwrap();
    Workstation {
        home,
        profile_dir,
        state,
        _temp: temp,
    }
}

fn manager(ws: &Workstation) -> DotfileManager {
    DotfileManager::new(
        &ProfileName::new("work").unwrap(),
        AbsPath::new(ws.profile_dir.clone()).unwrap(),
        &ws.state,
    )
}

fn vimrc_mapping() -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    map.insert("~/.vimrc".to_string(), "{{profile_dir}}/.vimrc".to_string());
    map
}

fn with_home<R>(home: &Path, f: impl FnOnce() -> R) -> R {
    temp_env::with_var("HOME", Some(home), f)
}

#[test]
#[serial]
fn test_apply_then_remove_restores_original_bytes() {
    let ws = workstation();
    let original: Vec<u8> = (0u8..=255).collect();
    fs::write(ws.home.join(".vimrc"), &original).unwrap();
    fs::write(ws.profile_dir.join(".vimrc"), "set number\n").unwrap();
    let map = vimrc_mapping();

    with_home(&ws.home, || manager(&ws).apply(&map).unwrap());

    let link = ws.home.join(".vimrc");
    assert_eq!(
        fs::canonicalize(&link).unwrap(),
        fs::canonicalize(ws.profile_dir.join(".vimrc")).unwrap()
    );
    let ledger_path = BackupLedger::path_for(&ws.state, &ProfileName::new("work").unwrap());
    assert_eq!(BackupLedger::load(&ledger_path).unwrap().len(), 1);

    // A separate manager stands in for the later deactivation process
    with_home(&ws.home, || manager(&ws).remove(&map).unwrap());

    assert!(!fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(&link).unwrap(), original);
    assert!(BackupLedger::load(&ledger_path).unwrap().is_empty());
}

#[test]
#[serial]
fn test_remove_without_apply_is_noop() {
    let ws = workstation();
    fs::write(ws.home.join(".vimrc"), "untouched").unwrap();

    let changes = with_home(&ws.home, || manager(&ws).remove(&vimrc_mapping()).unwrap());

    assert!(changes.iter().all(|c| !matches!(c, kontext_engine::DotfileChange::Unlinked { .. })));
    assert_eq!(fs::read_to_string(ws.home.join(".vimrc")).unwrap(), "untouched");
    assert!(!ws.state.exists());
}

#[test]
#[serial]
fn test_deep_escape_is_rejected() {
    let ws = workstation();
    for depth in 1..6 {
        let source = format!("{{{{profile_dir}}}}/x/{}etc/hosts", "../".repeat(depth + 1));
        let mut map = IndexMap::new();
        map.insert("~/.hosts".to_string(), source);

        let err = with_home(&ws.home, || manager(&ws).apply(&map).unwrap_err());
        assert!(matches!(err, Error::PathEscape { .. }), "depth {depth}: {err}");
    }
    assert!(fs::symlink_metadata(ws.home.join(".hosts")).is_err());
}

#[test]
#[serial]
fn test_symlinked_source_leaving_profile_is_rejected() {
    let ws = workstation();
    let outside = ws.home.join("secret");
    fs::write(&outside, "x").unwrap();
    std::os::unix::fs::symlink(&outside, ws.profile_dir.join("sneaky")).unwrap();

    let mut map = IndexMap::new();
    map.insert("~/.sneaky".to_string(), "sneaky".to_string());

    let err = with_home(&ws.home, || manager(&ws).apply(&map).unwrap_err());
    assert!(matches!(err, Error::PathEscape { .. }));
}
