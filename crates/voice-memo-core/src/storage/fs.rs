use crate::{CoreResult, RecorderError, storage::StorageGateway};

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, info, instrument};

/// Subdirectory of the recordings directory holding in-progress files.
pub const STAGING_DIR_NAME: &str = ".incoming";

/// [`StorageGateway`] over a local directory.
#[derive(Debug, Clone)]
pub struct FsStorageGateway {
    recordings_dir: PathBuf,
    staging_dir: PathBuf,
    extension: String,
}

impl FsStorageGateway {
    /// Opens `recordings_dir`, creating it and its staging directory if needed.
    ///
    /// Only files with `extension` are listed.
    #[track_caller]
    #[instrument(skip(recordings_dir), fields(recordings_dir = ?recordings_dir.as_ref()))]
    pub fn new<P: AsRef<Path>>(recordings_dir: P, extension: &str) -> CoreResult<Self> {
        let recordings_dir = recordings_dir.as_ref().to_path_buf();
        let staging_dir = recordings_dir.join(STAGING_DIR_NAME);

        fs::create_dir_all(&staging_dir).map_err(|e| RecorderError::io(&staging_dir, e))?;

        info!("Storage gateway ready");

        Ok(Self {
            recordings_dir,
            staging_dir,
            extension: extension.to_string(),
        })
    }

    fn has_audio_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    #[track_caller]
    fn audio_files_in(&self, dir: &Path) -> CoreResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(dir).map_err(|e| RecorderError::io(dir, e))? {
            let entry = entry.map_err(|e| RecorderError::io(dir, e))?;
            let path = entry.path();
            let is_file = entry
                .file_type()
                .map_err(|e| RecorderError::io(&path, e))?
                .is_file();

            if is_file && self.has_audio_extension(&path) {
                files.push(path);
            }
        }

        files.sort();

        Ok(files)
    }
}

impl StorageGateway for FsStorageGateway {
    fn recordings_dir(&self) -> &Path {
        &self.recordings_dir
    }

    fn staging_path(&self, file_name: &str) -> PathBuf {
        self.staging_dir.join(file_name)
    }

    #[track_caller]
    fn list_audio_files(&self) -> CoreResult<Vec<PathBuf>> {
        let files = self.audio_files_in(&self.recordings_dir)?;
        debug!(count = files.len(), "Listed audio files");
        Ok(files)
    }

    #[track_caller]
    fn list_staged_files(&self) -> CoreResult<Vec<PathBuf>> {
        let files = self.audio_files_in(&self.staging_dir)?;
        debug!(count = files.len(), "Listed staged files");
        Ok(files)
    }

    #[track_caller]
    #[instrument(skip(self))]
    fn move_file(&self, from: &Path, to: &Path) -> CoreResult<()> {
        if to.exists() {
            return Err(RecorderError::io(
                to,
                io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
            ));
        }

        fs::rename(from, to).map_err(|e| RecorderError::io(from, e))?;
        debug!("File moved");

        Ok(())
    }

    #[track_caller]
    #[instrument(skip(self))]
    fn delete(&self, path: &Path) -> CoreResult<()> {
        fs::remove_file(path).map_err(|e| RecorderError::io(path, e))?;
        debug!("File deleted");

        Ok(())
    }

    #[track_caller]
    fn available_free_space(&self) -> CoreResult<u64> {
        free_space(&self.recordings_dir).map_err(|e| RecorderError::io(&self.recordings_dir, e))
    }
}

#[cfg(unix)]
fn free_space(path: &Path) -> io::Result<u64> {
    use std::{ffi::CString, os::unix::ffi::OsStrExt};

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: an all-zero statvfs is a valid value for this plain C struct.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };

    // SAFETY: c_path is NUL-terminated and stat is a valid, writable statvfs.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    #[allow(clippy::unnecessary_cast)]
    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(not(unix))]
fn free_space(_path: &Path) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "free space query not supported on this platform",
    ))
}
