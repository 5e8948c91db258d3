//! Backup, restore and atomic whole-file replacement.

use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::CoreError;

/// `<asset>.bak`, with the suffix appended to the full file name.
pub fn default_backup_path(asset: &Path) -> PathBuf {
    let mut name = OsString::from(asset.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupOutcome {
    /// A fresh copy of the asset was written.
    Created,
    /// An existing backup was kept as is.
    Reused,
}

/// Make sure a durable copy of `asset` exists at `backup`.
///
/// An existing backup is kept unless `force` is set, so repeated patch runs
/// never overwrite the pristine original with an already-patched file. A
/// directory or other non-file at `backup` is an error, forced or not.
pub fn ensure_backup(asset: &Path, backup: &Path, force: bool) -> Result<BackupOutcome, CoreError> {
    match fs::metadata(backup) {
        Ok(meta) if !meta.is_file() => {
            return Err(CoreError::BackupNotAFile {
                path: backup.to_path_buf(),
            });
        }
        Ok(_) if !force => {
            info!(backup = %backup.display(), "backup exists, keeping it");
            return Ok(BackupOutcome::Reused);
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(CoreError::io("inspect", backup, e)),
    }
    let bytes = fs::read(asset).map_err(|e| CoreError::io("read", asset, e))?;
    write_atomic(backup, &bytes)?;
    info!(backup = %backup.display(), bytes = bytes.len(), "backup written");
    Ok(BackupOutcome::Created)
}

/// Copy `backup` back over `asset`.
pub fn restore(asset: &Path, backup: &Path) -> Result<(), CoreError> {
    if !backup.is_file() {
        return Err(CoreError::BackupNotFound {
            path: backup.to_path_buf(),
        });
    }
    let bytes = fs::read(backup).map_err(|e| CoreError::io("read", backup, e))?;
    write_atomic(asset, &bytes)?;
    info!(asset = %asset.display(), backup = %backup.display(), "restored from backup");
    Ok(())
}

/// Replace `path` with `bytes` in one step: temp file in the same directory,
/// fsync, rename. Parent directories are created; an existing file's
/// permissions carry over.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| CoreError::io("create directory", dir, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CoreError::io("create temp file in", dir, e))?;
    if let Ok(meta) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| CoreError::io("set permissions on temp file for", path, e))?;
    }
    temp.as_file_mut()
        .write_all(bytes)
        .map_err(|e| CoreError::io("write temp file for", path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| CoreError::io("sync temp file for", path, e))?;
    temp.persist(path).map_err(|e| CoreError::io("replace", path, e.error))?;
    Ok(())
}
