//! Integration tests for directory-to-profile resolution

use kontext_engine::resolver::{find_marker, get_active_profile, write_marker};
use kontext_engine::{MARKER_FILE, ProfileName};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_no_marker_anywhere() {
    let temp = TempDir::new().unwrap();
    let deep = temp.path().join("a/b/c");
    fs::create_dir_all(&deep).unwrap();

    // Only meaningful when the machine itself has no root-level default
    if find_marker(temp.path()).is_none() {
        assert_eq!(get_active_profile(Some(&deep)), None);
    }
}

#[test]
fn test_subdirectory_inherits_project_marker() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("proj");
    fs::create_dir_all(project.join("sub")).unwrap();
    fs::write(project.join(MARKER_FILE), "work\n").unwrap();

    let active = get_active_profile(Some(&project.join("sub"))).unwrap();
    assert_eq!(active, "work");
}

#[test]
fn test_nearest_marker_wins() {
    let temp = TempDir::new().unwrap();
    let outer = temp.path().join("clients");
    let inner = outer.join("acme/api");
    fs::create_dir_all(&inner).unwrap();

    write_marker(&outer, &ProfileName::new("consulting").unwrap(), false).unwrap();
    write_marker(&inner, &ProfileName::new("acme").unwrap(), false).unwrap();

    assert_eq!(get_active_profile(Some(&inner)).unwrap(), "acme");
    assert_eq!(
        get_active_profile(Some(&outer.join("acme"))).unwrap(),
        "consulting"
    );
}

#[test]
fn test_bad_marker_degrades_to_none() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("proj");
    fs::create_dir_all(&project).unwrap();

    fs::write(project.join(MARKER_FILE), "   \n").unwrap();
    assert_eq!(get_active_profile(Some(&project)), None);

    fs::write(project.join(MARKER_FILE), "../escape\n").unwrap();
    assert_eq!(get_active_profile(Some(&project)), None);
}
