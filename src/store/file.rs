//! File-backed store
//!
//! Every operation opens the backing file, does its work and closes it
//! again while holding the store lock, so no handle outlives a critical
//! section.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::StoreSyncStrategy;
use crate::error::{Result, ServerError};

/// Shared append-only byte log
///
/// ## Concurrency:
/// - `lock` serializes every append, read and removal
/// - Readers see the file either before or after an append, never halfway
/// - All methods take `&self`; share the store with `Arc`
pub struct Store {
    /// Backing file (created on first append)
    path: PathBuf,

    /// Whether appends are fsynced before returning
    sync_strategy: StoreSyncStrategy,

    /// Serializes all file access
    lock: Mutex<()>,
}

impl Store {
    /// Create a store handle for `path`
    ///
    /// Does not touch the filesystem; the file appears on the first append.
    pub fn new(path: impl Into<PathBuf>, sync_strategy: StoreSyncStrategy) -> Self {
        Self {
            path: path.into(),
            sync_strategy,
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file currently exists
    pub fn exists(&self) -> bool {
        let _guard = self.lock.lock();
        self.path.exists()
    }

    /// Append `bytes` to the end of the store
    ///
    /// Returns once the bytes are written (and synced, for
    /// `StoreSyncStrategy::EveryWrite`). On failure the file is truncated
    /// back to its previous length so the partial write is not visible.
    pub fn append(&self, bytes: &[u8]) -> Result<()> {
        let _guard = self.lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.write_error(source))?;

        let start = file
            .metadata()
            .map_err(|source| self.write_error(source))?
            .len();

        if let Err(source) = write_durably(&mut file, bytes, self.sync_strategy) {
            if let Err(e) = file.set_len(start) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to roll back partial append"
                );
            }
            return Err(self.write_error(source));
        }

        tracing::trace!(bytes = bytes.len(), offset = start, "Appended to store");
        Ok(())
    }

    /// Copy of the full store contents
    ///
    /// An absent backing file reads as an empty store.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let _guard = self.lock.lock();

        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.read_error(source)),
        };

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|source| self.read_error(source))?;
        Ok(contents)
    }

    /// Current size of the store in bytes
    pub fn len(&self) -> Result<u64> {
        let _guard = self.lock.lock();

        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(self.read_error(source)),
        }
    }

    /// True when nothing has been appended yet
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Delete the backing file
    ///
    /// Returns `Ok(false)` if there was nothing to delete, so calling this
    /// more than once is harmless.
    pub fn remove(&self) -> Result<bool> {
        let _guard = self.lock.lock();

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.write_error(source)),
        }
    }

    fn write_error(&self, source: io::Error) -> ServerError {
        ServerError::StoreWrite {
            path: self.path.clone(),
            source,
        }
    }

    fn read_error(&self, source: io::Error) -> ServerError {
        ServerError::StoreRead {
            path: self.path.clone(),
            source,
        }
    }
}

fn write_durably(file: &mut File, bytes: &[u8], sync: StoreSyncStrategy) -> io::Result<()> {
    file.write_all(bytes)?;
    if sync == StoreSyncStrategy::EveryWrite {
        file.sync_data()?;
    }
    Ok(())
}
