use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sample rate of every file the recorder produces.
pub const SAMPLE_RATE: u32 = 44_100;

/// Bit depth of every file the recorder produces.
pub const BIT_DEPTH: u16 = 16;

/// Container/codec of a recording.
///
/// Encoding itself is delegated to an [`EncoderFactory`](crate::storage::writer::EncoderFactory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// MPEG-4 AAC in an ADTS `.aac` container.
    Aac,
    /// Apple Lossless in an MPEG-4 `.m4a` container.
    M4a,
    /// Linear PCM in a RIFF `.wav` container.
    Wav,
    /// Free Lossless Audio Codec.
    Flac,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [Self::Aac, Self::M4a, Self::Wav, Self::Flac];

    /// File extension used for the container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::M4a => "m4a",
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }

    /// Four-character platform format identifier handed to native encoders.
    pub fn format_id(&self) -> &'static str {
        match self {
            Self::Aac => "aac ",
            Self::M4a => "alac",
            Self::Wav => "lpcm",
            Self::Flac => "flac",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unknown output format: {}", s))
    }
}

/// Encoder quality hint. Recordings always request `Max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderQuality {
    Min,
    Low,
    Medium,
    High,
    Max,
}

/// Encoder settings for one recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSettings {
    pub format: OutputFormat,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub channels: u16,
    pub quality: EncoderQuality,
}

impl AudioSettings {
    pub fn new(format: OutputFormat, channels: u16) -> Self {
        Self {
            format,
            sample_rate: SAMPLE_RATE,
            bit_depth: BIT_DEPTH,
            channels: channels.clamp(1, 2),
            quality: EncoderQuality::Max,
        }
    }
}
