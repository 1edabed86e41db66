//! Atomic file writes
//!
//! Data is written to a temp file in the destination directory and renamed
//! over the target, so readers see either the old or the new contents.

use crate::error::{Result, StoreError};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `data` atomically
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let temp = staged(path, data)?;
    temp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Create `path` with `data` atomically, failing if it already exists
///
/// Returns `Ok(false)` when the path is taken.
pub(crate) fn atomic_create(path: &Path, data: &[u8]) -> Result<bool> {
    let temp = staged(path, data)?;
    match temp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StoreError::io(path, e.error)),
    }
}

/// Read a file, mapping absence to `None`
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Create a directory and its parents
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))
}

fn staged(path: &Path, data: &[u8]) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    temp.write_all(data).map_err(|e| StoreError::io(temp.path(), e))?;
    temp.as_file().sync_all().map_err(|e| StoreError::io(temp.path(), e))?;
    Ok(temp)
}
