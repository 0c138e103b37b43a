//! Concurrent offset writer for the output file.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Writer for the shared output file. Safe to clone and use from multiple
/// fetchers; each `write_at` is independent (pwrite-style, no shared cursor).
/// Callers keep their writes inside their own segment.
#[derive(Clone)]
pub struct StorageWriter {
    file: Arc<File>,
    temp_path: PathBuf,
}

impl StorageWriter {
    pub(crate) fn from_file_and_path(file: File, temp_path: PathBuf) -> Self {
        Self {
            file: Arc::new(file),
            temp_path,
        }
    }

    /// Write all of `data` at `offset`. Does not move any file cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Windows: `seek_write` may write short, so loop until done.
    #[cfg(windows)]
    pub fn write_at(&self, mut offset: u64, mut data: &[u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        while !data.is_empty() {
            let n = self.file.seek_write(data, offset)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "short write"));
            }
            data = &data[n..];
            offset += n as u64;
        }
        Ok(())
    }

    /// Sync file data to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Path to the temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Rename the temp file to `final_path`. Consumes this handle; other clones
    /// must already be dropped (the coordinator joins all fetchers first).
    pub fn finalize(self, final_path: &Path) -> io::Result<()> {
        let temp_path = self.temp_path.clone();
        drop(self.file);
        std::fs::rename(&temp_path, final_path)
    }
}
