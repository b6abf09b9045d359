use crate::CoreResult;

use std::path::{Path, PathBuf};

/// File-system operations over the recordings directory.
///
/// Every failure is returned to the caller; nothing is retried or swallowed here.
pub trait StorageGateway: Send + Sync {
    /// Directory holding finalized recordings.
    fn recordings_dir(&self) -> &Path;

    /// Location for an in-progress recording named `file_name`.
    fn staging_path(&self, file_name: &str) -> PathBuf;

    /// Finalized audio files, sorted by path.
    fn list_audio_files(&self) -> CoreResult<Vec<PathBuf>>;

    /// In-progress audio files left in staging, sorted by path.
    fn list_staged_files(&self) -> CoreResult<Vec<PathBuf>>;

    /// Moves `from` to `to`. Fails if `to` already exists.
    fn move_file(&self, from: &Path, to: &Path) -> CoreResult<()>;

    /// Removes the file at `path`.
    fn delete(&self, path: &Path) -> CoreResult<()>;

    /// Bytes available to the current user on the recordings volume.
    fn available_free_space(&self) -> CoreResult<u64>;
}
