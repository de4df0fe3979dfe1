use serde::{Deserialize, Serialize};

/// Physical orientation of the device, used to pick the microphone data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl Orientation {
    /// Microphone that faces the user for this orientation.
    pub fn preferred_data_source(&self) -> DataSource {
        match self {
            Self::Portrait => DataSource::Bottom,
            Self::PortraitUpsideDown | Self::LandscapeLeft => DataSource::Front,
            Self::LandscapeRight => DataSource::Back,
        }
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Portrait
    }
}

/// Physical microphone selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Front,
    Back,
    Bottom,
}

/// Requested capture layout. Stereo falls back to mono when the selected
/// input cannot capture two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingOption {
    Mono,
    Stereo,
}

impl RecordingOption {
    pub fn channels(&self, supports_stereo: bool) -> u16 {
        match self {
            Self::Stereo if supports_stereo => 2,
            _ => 1,
        }
    }
}

impl Default for RecordingOption {
    fn default() -> Self {
        Self::Mono
    }
}

/// Input device chosen by the session gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: String,
    pub data_source: DataSource,
    pub supports_stereo: bool,
}

/// Audio session category requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionCategory {
    PlayAndRecord,
    Record,
    Playback,
}

/// Audio session mode requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    Default,
    Measurement,
    VoiceChat,
}

/// Audio session options requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub default_to_speaker: bool,
    pub allow_bluetooth: bool,
    pub mix_with_others: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_to_speaker: true,
            allow_bluetooth: true,
            mix_with_others: false,
        }
    }
}

/// Format the input tap must deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Preferred frames per callback.
    pub buffer_size: u32,
}

/// Borrowed PCM buffer delivered by an input tap.
///
/// Only valid for the duration of one callback.
#[derive(Debug, Clone, Copy)]
pub struct InputBuffer<'a> {
    /// Interleaved f32 samples in `[-1.0, 1.0]`.
    pub samples: &'a [f32],
    pub channels: u16,
    pub sample_rate: u32,
    /// Hardware sample count since the stream started.
    pub sample_time: u64,
}

impl<'a> InputBuffer<'a> {
    pub fn new(samples: &'a [f32], channels: u16, sample_rate: u32, sample_time: u64) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            sample_time,
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Owned copy of an [`InputBuffer`], delivered to raw-buffer subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedBuffer {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_time: u64,
}

impl From<&InputBuffer<'_>> for CapturedBuffer {
    fn from(buffer: &InputBuffer<'_>) -> Self {
        Self {
            samples: buffer.samples.to_vec(),
            channels: buffer.channels,
            sample_rate: buffer.sample_rate,
            sample_time: buffer.sample_time,
        }
    }
}

/// Diagnostics for debugging the buffer pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineDiagnostics {
    pub callbacks: u64,
    pub frames: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
    pub late_buffers: u64,
}
