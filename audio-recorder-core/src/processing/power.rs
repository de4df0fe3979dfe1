//! Power/level conversion.
//!
//! Turns a PCM buffer (RMS path) or a hardware meter reading (meter path)
//! into a normalized power value in `[0.0, 1.0]`. Both paths share one
//! calibration so waveforms look the same regardless of the level source.

use serde::{Deserialize, Serialize};

use crate::models::audio_models::InputBuffer;

/// Default silence floor in dB.
pub const DEFAULT_FLOOR_DB: f32 = -80.0;

/// How multi-channel buffers are reduced to a single power value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelPolicy {
    FirstChannel,
    Average,
}

/// RMS of all samples. Empty input is silence.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// RMS of one channel of interleaved audio.
pub fn channel_rms(samples: &[f32], channels: usize, channel: usize) -> f32 {
    if channels == 0 || channel >= channels {
        return 0.0;
    }
    let mut sum_sq = 0.0f32;
    let mut count = 0usize;
    for s in samples.iter().skip(channel).step_by(channels) {
        sum_sq += s * s;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    (sum_sq / count as f32).sqrt()
}

/// Mean of the per-channel RMS values of interleaved audio.
pub fn averaged_rms(samples: &[f32], channels: usize) -> f32 {
    if channels <= 1 {
        return rms(samples);
    }
    let total: f32 = (0..channels).map(|ch| channel_rms(samples, channels, ch)).sum();
    total / channels as f32
}

/// `20·log10(rms)`, or `-inf` for silence.
pub fn db_from_rms(rms: f32) -> f32 {
    if rms > 0.0 {
        20.0 * rms.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Linear mapping from `[floor_db, 0 dB]` onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerCalibration {
    pub floor_db: f32,
}

impl PowerCalibration {
    pub fn new(floor_db: f32) -> Self {
        Self { floor_db }
    }

    pub fn normalize(&self, db: f32) -> f32 {
        if !db.is_finite() {
            // -inf is exact silence; NaN and +inf only come from broken meters.
            return 0.0;
        }
        if db < self.floor_db {
            0.0
        } else if db >= 0.0 {
            1.0
        } else {
            (db - self.floor_db) / (0.0 - self.floor_db)
        }
    }
}

impl Default for PowerCalibration {
    fn default() -> Self {
        Self::new(DEFAULT_FLOOR_DB)
    }
}

/// Converts buffers and meter readings to normalized power.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerConverter {
    pub calibration: PowerCalibration,
    pub policy: ChannelPolicy,
}

impl PowerConverter {
    pub fn new(calibration: PowerCalibration, policy: ChannelPolicy) -> Self {
        Self { calibration, policy }
    }

    /// Normalized power of one buffer.
    pub fn buffer_power(&self, buffer: &InputBuffer<'_>) -> f32 {
        let channels = buffer.channels.max(1) as usize;
        let level = match self.policy {
            ChannelPolicy::FirstChannel => channel_rms(buffer.samples, channels, 0),
            ChannelPolicy::Average => averaged_rms(buffer.samples, channels),
        };
        self.calibration.normalize(db_from_rms(level))
    }

    /// Normalized power of a hardware meter reading (one dB value per channel).
    pub fn meter_power(&self, channel_db: &[f32]) -> f32 {
        if channel_db.is_empty() {
            return 0.0;
        }
        let db = match self.policy {
            ChannelPolicy::FirstChannel => channel_db[0],
            ChannelPolicy::Average => channel_db.iter().sum::<f32>() / channel_db.len() as f32,
        };
        self.calibration.normalize(db)
    }
}

impl Default for PowerConverter {
    fn default() -> Self {
        Self::new(PowerCalibration::default(), ChannelPolicy::Average)
    }
}
