//! Folder discovery integration tests.

mod common;

use std::fs;

use mediafold::{FolderEntry, MediafoldError, discover};

#[test]
fn root_is_excluded_and_nested_folders_are_included() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("acme/archive")).unwrap();
    fs::create_dir_all(root.path().join("globex")).unwrap();
    common::write_fake_video(&root.path().join("stray.mp4"));

    let directories = discover(root.path()).unwrap();

    assert_eq!(
        directories,
        vec![
            root.path().join("acme"),
            root.path().join("acme/archive"),
            root.path().join("globex"),
        ]
    );
}

#[test]
fn empty_root_has_no_units() {
    let root = tempfile::tempdir().unwrap();
    assert!(discover(root.path()).unwrap().is_empty());
}

#[test]
fn missing_root_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("nope");
    assert!(matches!(
        discover(&missing),
        Err(MediafoldError::InvalidRoot(_))
    ));
}

#[test]
fn scan_matches_extensions_case_insensitively_and_sorts() {
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    common::write_fake_video(&folder.join("b.MOV"));
    common::write_fake_video(&folder.join("a.mp4"));
    common::write_fake_video(&folder.join("c.mkv"));
    common::write_png(&folder.join("Logo.PNG"), 4, 4);
    fs::write(folder.join("notes.txt"), b"hello").unwrap();
    fs::create_dir(folder.join("nested.mp4")).unwrap();

    let entry = FolderEntry::scan(&folder).unwrap();

    assert_eq!(entry.videos, vec![folder.join("a.mp4"), folder.join("b.MOV")]);
    assert_eq!(entry.images, vec![folder.join("Logo.PNG")]);
    assert!(!entry.is_empty());
}

#[test]
fn scan_ignores_leftover_temporaries() {
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("acme");
    fs::create_dir(&folder).unwrap();
    common::write_fake_video(&folder.join("clip.mp4"));
    common::write_fake_video(&folder.join(".mediafold-trim-clip.mp4"));
    common::write_png(&folder.join(".mediafold-resize-logo.png"), 2, 2);

    let entry = FolderEntry::scan(&folder).unwrap();

    assert_eq!(entry.videos, vec![folder.join("clip.mp4")]);
    assert!(entry.images.is_empty());
}
