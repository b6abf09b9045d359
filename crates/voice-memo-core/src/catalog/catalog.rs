use crate::{CoreResult, RecorderError, catalog::RecordingEntry, storage::StorageGateway};

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument};

/// In-memory listing of finalized recordings, rebuilt from storage on demand.
///
/// Rename and delete go straight to the [`StorageGateway`]; the list only
/// changes when the file operation succeeded.
pub struct RecordingCatalog {
    storage: Arc<dyn StorageGateway>,
    entries: Vec<RecordingEntry>,
}

impl RecordingCatalog {
    /// Creates an empty catalog. Call [`RecordingCatalog::refresh`] to populate it.
    pub fn new(storage: Arc<dyn StorageGateway>) -> Self {
        Self {
            storage,
            entries: Vec::new(),
        }
    }

    /// Re-lists the recordings directory. The list is unchanged on failure.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn refresh(&mut self) -> CoreResult<()> {
        let mut entries: Vec<RecordingEntry> = self
            .storage
            .list_audio_files()?
            .into_iter()
            .map(RecordingEntry::from_path)
            .collect();
        entries.sort_by(RecordingEntry::catalog_order);

        debug!(count = entries.len(), "Catalog refreshed");
        self.entries = entries;

        Ok(())
    }

    /// Entries in catalog order.
    pub fn entries(&self) -> &[RecordingEntry] {
        &self.entries
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&RecordingEntry> {
        self.entries.get(index)
    }

    /// Number of recordings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no recordings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renames the recording at `index` to `<new_name>.<ext>` in the same directory.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds`, `InvalidName` for empty names, names with path
    /// separators or a leading dot, and `IoFailure` when the move fails.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn rename(&mut self, index: usize, new_name: &str) -> CoreResult<&RecordingEntry> {
        let len = self.entries.len();
        let Some(entry) = self.entries.get(index) else {
            return Err(RecorderError::IndexOutOfBounds {
                index,
                len,
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let name = new_name.trim();
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']) {
            return Err(RecorderError::InvalidName {
                name: new_name.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let old_path = entry.file_path.clone();
        let file_name = match old_path.extension() {
            Some(ext) => format!("{}.{}", name, ext.to_string_lossy()),
            None => name.to_string(),
        };
        let new_path = old_path.with_file_name(file_name);

        if new_path != old_path {
            self.storage.move_file(&old_path, &new_path)?;
            info!(from = ?old_path, to = ?new_path, "Recording renamed");
        }

        self.entries[index] = RecordingEntry::from_path(new_path);

        Ok(&self.entries[index])
    }

    /// Deletes the recording at `index` and returns its entry.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds`, or `IoFailure` when the file cannot be removed.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn delete(&mut self, index: usize) -> CoreResult<RecordingEntry> {
        let Some(entry) = self.entries.get(index) else {
            return Err(RecorderError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        self.storage.delete(&entry.file_path)?;
        let removed = self.entries.remove(index);

        info!(file = ?removed.file_path, "Recording deleted");

        Ok(removed)
    }
}
