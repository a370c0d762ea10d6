//! Atomic JSON document files.
//!
//! Writes go to a sibling temp file which is fsynced and renamed over the
//! target, so readers see either the previous or the new document. Writers
//! serialize on an exclusive `fs2` lock held on a `.lock` sibling.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::Value;

use hatchup_core::{HatchupError, Result};

/// Handle to one JSON document on disk.
#[derive(Debug, Clone)]
pub struct AtomicJsonFile {
    path: PathBuf,
}

impl AtomicJsonFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the document.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: document parsed
    /// - `Ok(None)`: file missing or blank
    /// - `Err`: unreadable or not valid JSON
    pub fn load(&self) -> Result<Option<Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Replaces the document atomically while holding the writer lock.
    pub fn save(&self, document: &Value) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| HatchupError::io(format!("{} has no parent", self.path.display())))?;
        fs::create_dir_all(parent)?;

        let _lock = FileLock::acquire(&self.path)?;

        let body = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.temp_path()?;
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&body)?;
        tmp.sync_all()?;
        drop(tmp);

        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| HatchupError::io(format!("{} has no file name", self.path.display())))?;
        Ok(self
            .path
            .with_file_name(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Exclusive lock on `<path>.lock`, released on drop.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive().map_err(|e| {
            HatchupError::io(format!("Failed to lock {}: {}", lock_path.display(), e))
        })?;
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
