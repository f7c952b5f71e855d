// Integration tests for hook discovery and registry resolution
use std::fs;
use std::path::Path;

use flightcheck::{discover, resolve, FlightcheckError, HookRegistry, Phase};
use tempfile::TempDir;

fn make_tree(files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for file in files {
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\n").unwrap();
    }
    dir
}

#[test]
fn test_discovery_selects_only_phase_prefixed_files() {
    let tree = make_tree(&[
        "lint/pre.sh",
        "lint/post.sh",
        "lint/notes.md",
        "size/pre.py",
    ]);
    let found = discover(tree.path(), &Phase::new("pre")).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|m| m
        .path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("pre.")));
}

#[test]
fn test_discovery_never_selects_root_level_modules() {
    let tree = make_tree(&["pre.sh", "pre.py", "lint/pre.sh"]);
    let found = discover(tree.path(), &Phase::new("pre")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].module_id, "lint");
}

#[test]
fn test_discovery_case_folds_the_phase() {
    let tree = make_tree(&["lint/pre.sh"]);
    for phase in ["pre", "Pre", "PRE"] {
        let found = discover(tree.path(), &Phase::new(phase)).unwrap();
        assert_eq!(found.len(), 1, "phase spelling {phase} should match");
    }
}

#[test]
fn test_discovery_requires_the_dot_separator() {
    // "prefix.sh" starts with "pre" but not with "pre."
    let tree = make_tree(&["lint/prefix.sh", "lint/pre.sh"]);
    let found = discover(tree.path(), &Phase::new("pre")).unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].path.ends_with("lint/pre.sh"));
}

#[test]
fn test_discovery_descends_nested_subdirectories() {
    let tree = make_tree(&["group/lint/pre.sh"]);
    let found = discover(tree.path(), &Phase::new("pre")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].module_id, "lint");
}

#[test]
fn test_discovery_order_is_lexicographic_by_path() {
    let tree = make_tree(&["zz/pre.sh", "aa/pre.sh", "mm/pre.sh"]);
    let found = discover(tree.path(), &Phase::new("pre")).unwrap();
    let ids: Vec<&str> = found.iter().map(|m| m.module_id.as_str()).collect();
    assert_eq!(ids, vec!["aa", "mm", "zz"]);
}

#[test]
fn test_discovery_missing_root_fails_loudly() {
    let err = discover(Path::new("/definitely/not/a/hook/root"), &Phase::new("pre")).unwrap_err();
    assert!(matches!(err, FlightcheckError::Discovery(_)));
}

#[test]
fn test_discovery_root_that_is_a_file_fails() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("hooks");
    fs::write(&file, "").unwrap();
    let err = discover(&file, &Phase::new("pre")).unwrap_err();
    assert!(matches!(err, FlightcheckError::Discovery(_)));
}

#[test]
fn test_resolution_maps_ids_to_registered_hooks() {
    let tree = make_tree(&["tag/pre.sh", "repo/pre.sh"]);
    let registry = HookRegistry::with_builtins();
    let discovered = discover(tree.path(), &Phase::new("pre")).unwrap();
    let hooks = resolve(&registry, &discovered);
    assert_eq!(hooks.len(), 2);
    let mut ids: Vec<&str> = hooks.iter().map(|h| h.id()).collect();
    ids.sort();
    assert_eq!(ids, vec!["repo", "tag"]);
}

#[test]
fn test_resolution_skips_unregistered_modules() {
    let tree = make_tree(&["tag/pre.sh", "made-up/pre.sh"]);
    let registry = HookRegistry::with_builtins();
    let discovered = discover(tree.path(), &Phase::new("pre")).unwrap();
    assert_eq!(discovered.len(), 2);
    let hooks = resolve(&registry, &discovered);
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].id(), "tag");
}
