//! Integration tests for hook failure isolation

#![cfg(unix)]

use kontext_config::HookKind;
use kontext_engine::{HookRunner, ProfileName, Warning};
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn script(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
#[serial]
fn test_sleeping_hook_is_killed_at_timeout() {
    let dir = TempDir::new().unwrap();
    let hook = script(&dir, "sleepy.sh", "#!/bin/sh\nsleep 40\n");
    let profile = ProfileName::new("work").unwrap();

    let started = Instant::now();
    let ok = HookRunner::new(Duration::from_secs(2)).run_or_warn(&hook, &profile, HookKind::Activate);

    assert!(!ok);
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[test]
#[serial]
fn test_failing_hook_is_only_a_warning() {
    let dir = TempDir::new().unwrap();
    let hook = script(&dir, "fail.sh", "#!/bin/sh\necho oops >&2\nexit 1\n");
    let profile = ProfileName::new("work").unwrap();

    let result = HookRunner::new(Duration::from_secs(30))
        .stdout_to_stderr(true)
        .execute(&hook, &profile, HookKind::Deactivate);

    assert!(matches!(
        result,
        Err(Warning::HookNonZeroExit { code: Some(1), .. })
    ));
}
