use crate::storage::parse_recording_timestamp;

use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;

/// A finalized recording on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingEntry {
    /// Location of the audio file.
    pub file_path: PathBuf,
    /// File stem shown to the user.
    pub display_name: String,
    /// Creation time parsed from the file name; `None` once renamed.
    pub created_at: Option<NaiveDateTime>,
}

impl RecordingEntry {
    /// Derives an entry from its file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let file_path = path.into();
        let display_name = display_name(&file_path);
        let created_at = parse_recording_timestamp(&file_path);

        Self {
            file_path,
            display_name,
            created_at,
        }
    }

    /// Catalog order: newest dated recordings first, then undated ones by name.
    pub(crate) fn catalog_order(a: &Self, b: &Self) -> Ordering {
        match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.display_name.cmp(&b.display_name)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.display_name.cmp(&b.display_name),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
