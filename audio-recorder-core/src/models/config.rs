use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::audio_models::{Orientation, RecordingOption, SessionCategory, SessionMode, SessionOptions};
use super::error::RecorderError;
use super::format::OutputFormat;
use super::session::FileNameOption;
use crate::processing::power::{ChannelPolicy, DEFAULT_FLOOR_DB};

/// Where power levels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelSource {
    /// One value per tap callback, computed from the buffer RMS.
    Buffers,
    /// One value per ticker tick, from the input provider's hardware meter.
    Meter,
}

/// Configuration for a recorder.
///
/// Deserializable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfiguration {
    /// Container/codec for new sessions.
    pub output_format: OutputFormat,

    /// File naming for new sessions.
    pub file_name: FileNameOption,

    /// Mono or stereo capture (stereo only if the input supports it).
    pub recording_option: RecordingOption,

    /// Device orientation used to select the microphone data source.
    pub orientation: Orientation,

    pub category: SessionCategory,
    pub mode: SessionMode,
    pub options: SessionOptions,

    pub level_source: LevelSource,
    pub channel_policy: ChannelPolicy,

    /// Level treated as silence when normalizing power (dB, negative).
    pub power_floor_db: f32,

    /// Preferred frames per tap callback.
    pub buffer_size: u32,

    /// Delay between the start cue and the engine start, so the first
    /// syllable is not cut off.
    pub start_delay_ms: u64,

    /// Period of the elapsed-time ticker.
    pub ticker_interval_ms: u64,

    /// Write `{recording}.metadata.json` next to each finished recording.
    pub write_metadata: bool,
}

impl RecorderConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !self.power_floor_db.is_finite() || self.power_floor_db >= 0.0 {
            return Err(format!("power floor must be a negative dB value: {}", self.power_floor_db));
        }
        if !(256..=8192).contains(&self.buffer_size) {
            return Err(format!("unsupported buffer size: {}", self.buffer_size));
        }
        if self.start_delay_ms > 1000 {
            return Err(format!("start delay too long: {} ms", self.start_delay_ms));
        }
        if self.ticker_interval_ms == 0 {
            return Err("ticker interval must be positive".into());
        }
        if let FileNameOption::Custom(name) = &self.file_name {
            if name.trim().is_empty() {
                return Err("custom file name is empty".into());
            }
            if name.contains(['/', '\\']) {
                return Err(format!("custom file name contains a path separator: {}", name));
            }
        }
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, RecorderError> {
        let json = fs::read_to_string(path)
            .map_err(|e| RecorderError::ConfigurationFailed(format!("failed to read config: {}", e)))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| RecorderError::ConfigurationFailed(format!("failed to parse config: {}", e)))?;
        config.validate().map_err(RecorderError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn ticker_interval(&self) -> Duration {
        Duration::from_millis(self.ticker_interval_ms)
    }
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Wav,
            file_name: FileNameOption::Timestamp,
            recording_option: RecordingOption::Mono,
            orientation: Orientation::Portrait,
            category: SessionCategory::PlayAndRecord,
            mode: SessionMode::Default,
            options: SessionOptions::default(),
            level_source: LevelSource::Buffers,
            channel_policy: ChannelPolicy::Average,
            power_floor_db: DEFAULT_FLOOR_DB,
            buffer_size: 1024,
            start_delay_ms: 200,
            ticker_interval_ms: 250,
            write_metadata: false,
        }
    }
}

/// Configuration for a playback controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfiguration {
    /// Period of the progress ticker.
    pub tick_interval_ms: u64,

    /// How long progress stays at 1.0 after a natural finish before resetting to 0.
    pub finish_reset_delay_ms: u64,
}

impl PlaybackConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_ms == 0 {
            return Err("tick interval must be positive".into());
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn finish_reset_delay(&self) -> Duration {
        Duration::from_millis(self.finish_reset_delay_ms)
    }
}

impl Default for PlaybackConfiguration {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            finish_reset_delay_ms: 300,
        }
    }
}
