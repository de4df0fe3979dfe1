use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingMetadata;
use crate::storage::files::remove_if_exists;

/// Sidecar path for a recording: `{stem}.metadata.json` next to it.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), RecorderError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| RecorderError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(recording_path), json)
        .map_err(|e| RecorderError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, RecorderError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| RecorderError::StorageError(format!("failed to read metadata: {}", e)))?;
    let metadata: RecordingMetadata = serde_json::from_str(&json)
        .map_err(|e| RecorderError::StorageError(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}

pub fn remove_metadata(recording_path: &Path) -> Result<(), RecorderError> {
    remove_if_exists(&metadata_path(recording_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::OutputFormat;
    use crate::models::session::{FileNameOption, RecordingSession};
    use crate::traits::path_resolver::DirectoryPathResolver;

    #[test]
    fn sidecar_round_trip_and_removal() {
        let dir = std::env::temp_dir().join("audio_recorder_metadata_test");
        fs::create_dir_all(&dir).unwrap();
        let resolver = DirectoryPathResolver::new(&dir, &dir);
        let session = RecordingSession::new(&FileNameOption::Custom("memo".into()), OutputFormat::Flac, 2, &resolver);
        let metadata = RecordingMetadata::new(&session, 12.5, 540, "abc123");

        write_metadata(&metadata, session.final_path()).unwrap();
        assert_eq!(metadata_path(session.final_path()), dir.join("memo.metadata.json"));

        let loaded = read_metadata(session.final_path()).unwrap();
        assert_eq!(loaded, metadata);
        assert_eq!(loaded.format_id, "flac");
        assert_eq!(loaded.channels, 2);

        remove_metadata(session.final_path()).unwrap();
        assert!(read_metadata(session.final_path()).is_err());

        fs::remove_dir_all(&dir).ok();
    }
}
