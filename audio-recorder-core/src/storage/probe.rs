use std::fs::File;
use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::models::error::PlaybackError;

/// Length of an audio file in seconds, read from the container.
///
/// Falls back to summing packet durations when the container has no frame count.
pub fn probe_duration(path: &Path) -> Result<f64, PlaybackError> {
    if !path.is_file() {
        return Err(PlaybackError::FileNotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|_| PlaybackError::FileNotFound(path.to_path_buf()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| PlaybackError::DecodeFailed(format!("unsupported format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| PlaybackError::DecodeFailed("no audio track".into()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let frames = match params.n_frames {
        Some(n) => n,
        None => {
            let mut total = 0u64;
            while let Ok(packet) = format.next_packet() {
                if packet.track_id() == track_id {
                    total += packet.dur;
                }
            }
            total
        }
    };

    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Ok(time.seconds as f64 + time.frac);
    }
    match params.sample_rate {
        Some(rate) if rate > 0 => Ok(frames as f64 / rate as f64),
        _ => Err(PlaybackError::DecodeFailed("unknown sample rate".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::fs;
    use std::path::PathBuf;

    use crate::models::format::{AudioSettings, OutputFormat};
    use crate::storage::writer::{DefaultEncoderFactory, EncoderFactory};

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("audio_recorder_probe_test_{}", name))
    }

    fn write_silence(path: &Path, format: OutputFormat, frames: usize) {
        let mut writer = DefaultEncoderFactory
            .create(path, &AudioSettings::new(format, 1))
            .unwrap();
        writer.write(&vec![0i16; frames]).unwrap();
        writer.finalize().unwrap();
    }

    #[test]
    fn wav_duration() {
        let path = temp_file_path("half_second.wav");
        write_silence(&path, OutputFormat::Wav, 22_050);

        assert_abs_diff_eq!(probe_duration(&path).unwrap(), 0.5, epsilon = 1e-6);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn flac_duration() {
        let path = temp_file_path("one_second.flac");
        write_silence(&path, OutputFormat::Flac, 44_100);

        assert_abs_diff_eq!(probe_duration(&path).unwrap(), 1.0, epsilon = 1e-3);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file() {
        let path = temp_file_path("missing.wav");
        assert_eq!(probe_duration(&path), Err(PlaybackError::FileNotFound(path.clone())));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let path = temp_file_path("garbage.wav");
        fs::write(&path, b"definitely not audio").unwrap();

        assert!(matches!(probe_duration(&path), Err(PlaybackError::DecodeFailed(_))));

        fs::remove_file(&path).ok();
    }
}
