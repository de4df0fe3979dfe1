use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::error::RecorderError;
use crate::storage::metadata;

/// Move a finished scratch file to its persisted location.
///
/// Falls back to copy + remove when the two paths are on different filesystems.
pub fn move_into_place(from: &Path, to: &Path) -> Result<(), RecorderError> {
    if from == to {
        return Ok(());
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RecorderError::StorageError(format!("failed to create directory: {}", e)))?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| RecorderError::StorageError(format!("failed to move recording: {}", e)))?;
    fs::remove_file(from)
        .map_err(|e| RecorderError::StorageError(format!("failed to remove scratch file: {}", e)))?;
    Ok(())
}

/// Delete a recording and its metadata sidecar. Missing files are not an error.
pub fn remove_recording(path: &Path) -> Result<(), RecorderError> {
    remove_if_exists(path)?;
    metadata::remove_metadata(path)
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<(), RecorderError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RecorderError::StorageError(format!(
            "failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let data =
        fs::read(path).map_err(|e| RecorderError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
