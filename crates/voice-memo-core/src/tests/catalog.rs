use crate::{FsStorageGateway, RecordingCatalog, RecordingEntry, RecorderError};

use std::{path::Path, sync::Arc};

use chrono::NaiveDate;
use tempfile::TempDir;

#[allow(clippy::unwrap_used)]
fn catalog_with(files: &[&str]) -> (TempDir, RecordingCatalog) {
    let dir = tempfile::tempdir().unwrap();
    for name in files {
        std::fs::write(dir.path().join(name), b"RIFF").unwrap();
    }
    let storage = Arc::new(FsStorageGateway::new(dir.path(), "wav").unwrap());
    let mut catalog = RecordingCatalog::new(storage);
    catalog.refresh().unwrap();
    (dir, catalog)
}

fn names(catalog: &RecordingCatalog) -> Vec<&str> {
    catalog
        .entries()
        .iter()
        .map(|entry| entry.display_name.as_str())
        .collect()
}

/// WHAT: Refresh orders newest first, renamed recordings last by name
/// WHY: Most recent memo is what users look for
#[test]
#[allow(clippy::unwrap_used)]
fn given_dated_and_renamed_files_when_refreshing_then_newest_first() {
    let (_dir, catalog) = catalog_with(&[
        "recording_20240101090000.wav",
        "zebra.wav",
        "recording_20240616140322.wav",
        "groceries.wav",
    ]);

    assert_eq!(
        names(&catalog),
        vec![
            "recording_20240616140322",
            "recording_20240101090000",
            "groceries",
            "zebra",
        ]
    );
    let expected = NaiveDate::from_ymd_opt(2024, 6, 16)
        .unwrap()
        .and_hms_opt(14, 3, 22)
        .unwrap();
    assert_eq!(catalog.get(0).unwrap().created_at, Some(expected));
    assert_eq!(catalog.get(2).unwrap().created_at, None);
}

/// WHAT: Renaming moves the file and updates the entry in place
/// WHY: The list must reflect the new name without a full refresh
#[test]
#[allow(clippy::unwrap_used)]
fn given_entry_when_renaming_then_file_moved_and_entry_updated() {
    // Given: One recording
    let (dir, mut catalog) = catalog_with(&["recording_20240616140322.wav"]);
    let old_path = dir.path().join("recording_20240616140322.wav");

    // When: Renaming it
    let renamed = catalog.rename(0, "  standup notes ").unwrap().clone();

    // Then: New file, old file gone, extension kept, entry replaced
    let new_path = dir.path().join("standup notes.wav");
    assert_eq!(renamed, RecordingEntry::from_path(&new_path));
    assert_eq!(renamed.display_name, "standup notes");
    assert!(new_path.is_file());
    assert!(!old_path.exists());
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get(0).unwrap().file_path, new_path);
}

/// WHAT: Renaming onto an existing recording fails
/// WHY: A rename must never overwrite another memo
#[test]
#[allow(clippy::unwrap_used)]
fn given_name_in_use_when_renaming_then_io_failure_and_catalog_unchanged() {
    let (dir, mut catalog) = catalog_with(&["recording_20240616140322.wav", "taken.wav"]);
    let before = catalog.entries().to_vec();

    let result = catalog.rename(0, "taken");

    assert!(matches!(result, Err(RecorderError::IoFailure { .. })));
    assert_eq!(catalog.entries(), before.as_slice());
    assert!(dir.path().join("recording_20240616140322.wav").is_file());
    assert_eq!(std::fs::read(dir.path().join("taken.wav")).unwrap(), b"RIFF");
}

/// WHAT: Out-of-range index is rejected before touching storage
/// WHY: The UI may act on a stale selection
#[test]
#[allow(clippy::unwrap_used)]
fn given_bad_index_when_renaming_or_deleting_then_index_out_of_bounds() {
    let (_dir, mut catalog) = catalog_with(&["a.wav"]);

    assert!(matches!(
        catalog.rename(1, "b"),
        Err(RecorderError::IndexOutOfBounds { index: 1, len: 1, .. })
    ));
    assert!(matches!(
        catalog.delete(5),
        Err(RecorderError::IndexOutOfBounds { index: 5, len: 1, .. })
    ));
    assert_eq!(names(&catalog), vec!["a"]);
}

/// WHAT: Names that would escape the directory or hide the file are rejected
/// WHY: Rename only changes the display name, never the location
#[test]
#[allow(clippy::unwrap_used)]
fn given_invalid_names_when_renaming_then_invalid_name() {
    let (dir, mut catalog) = catalog_with(&["a.wav"]);

    for bad in ["", "   ", "../escape", "sub/dir", "back\\slash", ".hidden", "nul\0byte"] {
        assert!(
            matches!(catalog.rename(0, bad), Err(RecorderError::InvalidName { .. })),
            "accepted {:?}",
            bad
        );
    }

    assert!(dir.path().join("a.wav").is_file());
    assert_eq!(names(&catalog), vec!["a"]);
}

/// WHAT: Renaming to the current name succeeds without moving
/// WHY: Confirming an unchanged name in the UI is not an error
#[test]
#[allow(clippy::unwrap_used)]
fn given_same_name_when_renaming_then_noop_success() {
    let (dir, mut catalog) = catalog_with(&["memo.wav"]);

    let entry = catalog.rename(0, "memo").unwrap();

    assert_eq!(entry.file_path, dir.path().join("memo.wav"));
    assert!(dir.path().join("memo.wav").is_file());
}

/// WHAT: Deleting removes the file and the entry
/// WHY: Deleted memos must disappear from disk and list together
#[test]
#[allow(clippy::unwrap_used)]
fn given_entry_when_deleting_then_file_and_entry_removed() {
    let (dir, mut catalog) = catalog_with(&["a.wav", "b.wav"]);

    let removed = catalog.delete(0).unwrap();

    assert_eq!(removed.file_path, dir.path().join("a.wav"));
    assert!(!dir.path().join("a.wav").exists());
    assert_eq!(names(&catalog), vec!["b"]);
}

/// WHAT: Deleting a file removed behind the catalog's back fails and keeps the entry
/// WHY: The list only changes when the file operation succeeded
#[test]
#[allow(clippy::unwrap_used)]
fn given_file_removed_externally_when_deleting_then_io_failure_and_entry_kept() {
    let (dir, mut catalog) = catalog_with(&["a.wav"]);
    std::fs::remove_file(dir.path().join("a.wav")).unwrap();

    let result = catalog.delete(0);

    assert!(matches!(result, Err(RecorderError::IoFailure { .. })));
    assert_eq!(catalog.len(), 1);
    assert_eq!(
        catalog.get(0).unwrap().file_path,
        Path::new(dir.path()).join("a.wav")
    );
}
