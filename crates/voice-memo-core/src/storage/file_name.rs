use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};

const FILE_PREFIX: &str = "recording_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_LEN: usize = 14;

/// Builds `recording_<YYYYMMDDHHMMSS>.<extension>` for a capture started at `at`.
pub fn recording_file_name(at: DateTime<Local>, extension: &str) -> String {
    format!("{}{}.{}", FILE_PREFIX, at.format(TIMESTAMP_FORMAT), extension)
}

/// Like [`recording_file_name`], with a `_<n>` suffix for the `n`th capture
/// started within the same second. `n <= 1` yields the plain name.
pub fn numbered_recording_file_name(at: DateTime<Local>, extension: &str, n: u32) -> String {
    if n <= 1 {
        return recording_file_name(at, extension);
    }

    format!(
        "{}{}_{}.{}",
        FILE_PREFIX,
        at.format(TIMESTAMP_FORMAT),
        n,
        extension
    )
}

/// Recovers the creation timestamp encoded in a recording file name.
///
/// Accepts an optional numeric `_<n>` suffix. Returns `None` for renamed
/// files or names that do not follow the convention.
pub fn parse_recording_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix(FILE_PREFIX)?;

    let digits = match rest.split_once('_') {
        Some((digits, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => digits,
        Some(_) => return None,
        None => rest,
    };

    if digits.len() != TIMESTAMP_LEN || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    NaiveDateTime::parse_from_str(digits, TIMESTAMP_FORMAT).ok()
}
