use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::format::OutputFormat;
use super::session::RecordingSession;

/// Result returned when a recording is stopped and its file finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Metadata stored alongside a recording.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_name: String,
    pub format: OutputFormat,
    pub format_id: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub duration_secs: f64,
    pub buffer_count: u64,
    pub checksum: String,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn new(session: &RecordingSession, duration_secs: f64, buffer_count: u64, checksum: &str) -> Self {
        let settings = session.settings();
        Self {
            id: session.id().to_string(),
            file_name: session
                .final_path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            format: settings.format,
            format_id: settings.format.format_id().to_string(),
            channels: settings.channels,
            sample_rate: settings.sample_rate,
            bit_depth: settings.bit_depth,
            duration_secs,
            buffer_count,
            checksum: checksum.to_string(),
            created_at: session.created_at().to_rfc3339(),
        }
    }
}
