use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::format::{AudioSettings, OutputFormat};
use crate::traits::path_resolver::PathResolver;

/// `strftime` pattern used for timestamp-derived file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// How a recording file is named.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNameOption {
    Timestamp,
    Custom(String),
}

impl FileNameOption {
    /// File stem without extension. Timestamp names use the local clock.
    pub fn file_stem(&self) -> String {
        match self {
            Self::Timestamp => Local::now().format(TIMESTAMP_FORMAT).to_string(),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Pin a timestamp name to a fixed stem so every path derived from it agrees.
    pub fn pinned(&self) -> FileNameOption {
        Self::Custom(self.file_stem())
    }
}

impl Default for FileNameOption {
    fn default() -> Self {
        Self::Timestamp
    }
}

/// One recording: name × format × channel layout, resolved once into paths.
///
/// Immutable. A new session is built for every recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSession {
    id: Uuid,
    file_name: FileNameOption,
    settings: AudioSettings,
    scratch_path: PathBuf,
    final_path: PathBuf,
    created_at: DateTime<Utc>,
}

impl RecordingSession {
    pub fn new(
        file_name: &FileNameOption,
        format: OutputFormat,
        channels: u16,
        resolver: &dyn PathResolver,
    ) -> Self {
        let pinned = file_name.pinned();
        Self {
            id: Uuid::new_v4(),
            file_name: pinned.clone(),
            settings: AudioSettings::new(format, channels),
            scratch_path: resolver.scratch_path(&pinned, format),
            final_path: resolver.resolve(&pinned, format),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn file_name(&self) -> &FileNameOption {
        &self.file_name
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    pub fn format(&self) -> OutputFormat {
        self.settings.format
    }

    pub fn channels(&self) -> u16 {
        self.settings.channels
    }

    /// Where the file is written while recording.
    pub fn scratch_path(&self) -> &Path {
        &self.scratch_path
    }

    /// Where the file lives after a successful stop.
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
