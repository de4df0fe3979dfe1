//! Streaming encoders for finished recordings.
//!
//! The buffer pipeline hands 16-bit interleaved PCM to an [`AudioFileWriter`]
//! on the writer thread. WAV streams straight to disk through `hound`; FLAC
//! is encoded block by block with `flacenc`.
//! AAC and ALAC need a platform encoder and are plugged in through a custom
//! [`EncoderFactory`].

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flacenc::bitsink::ByteSink;
use flacenc::component::{BitRepr, Stream, StreamInfo};
use flacenc::config;
use flacenc::error::{SourceError, Verified, Verify};
use flacenc::source::{Context, Fill, FrameBuf};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::models::error::RecorderError;
use crate::models::format::{AudioSettings, OutputFormat};

/// Sink for one recording's PCM data.
pub trait AudioFileWriter: Send {
    /// Append interleaved 16-bit samples.
    fn write(&mut self, samples: &[i16]) -> Result<(), RecorderError>;

    /// Flush everything to disk and close the file. Returns the frame count.
    fn finalize(self: Box<Self>) -> Result<u64, RecorderError>;

    fn frames_written(&self) -> u64;
}

/// Creates a writer for a session's scratch file.
pub trait EncoderFactory: Send + Sync {
    fn create(&self, path: &Path, settings: &AudioSettings) -> Result<Box<dyn AudioFileWriter>, RecorderError>;
}

/// Encoders available without platform support: WAV and FLAC.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEncoderFactory;

impl EncoderFactory for DefaultEncoderFactory {
    fn create(&self, path: &Path, settings: &AudioSettings) -> Result<Box<dyn AudioFileWriter>, RecorderError> {
        match settings.format {
            OutputFormat::Wav => Ok(Box::new(WavFileWriter::create(path, settings)?)),
            OutputFormat::Flac => Ok(Box::new(FlacFileWriter::create(path, settings)?)),
            format @ (OutputFormat::Aac | OutputFormat::M4a) => Err(RecorderError::UnsupportedFormat(format)),
        }
    }
}

/// Linear PCM in a RIFF container.
pub struct WavFileWriter {
    writer: WavWriter<BufWriter<File>>,
    channels: u16,
    samples_written: u64,
}

impl WavFileWriter {
    pub fn create(path: &Path, settings: &AudioSettings) -> Result<Self, RecorderError> {
        let spec = WavSpec {
            channels: settings.channels,
            sample_rate: settings.sample_rate,
            bits_per_sample: settings.bit_depth,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec)
            .map_err(|e| RecorderError::StorageError(format!("failed to create {}: {}", path.display(), e)))?;
        Ok(Self {
            writer,
            channels: settings.channels.max(1),
            samples_written: 0,
        })
    }
}

impl AudioFileWriter for WavFileWriter {
    fn write(&mut self, samples: &[i16]) -> Result<(), RecorderError> {
        for &sample in samples {
            self.writer
                .write_sample(sample)
                .map_err(|e| RecorderError::EncodingFailed(format!("wav write failed: {}", e)))?;
        }
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<u64, RecorderError> {
        let frames = self.frames_written();
        self.writer
            .finalize()
            .map_err(|e| RecorderError::EncodingFailed(format!("wav finalize failed: {}", e)))?;
        Ok(frames)
    }

    fn frames_written(&self) -> u64 {
        self.samples_written / self.channels as u64
    }
}

/// FLAC, encoded one block at a time as samples arrive.
///
/// A placeholder STREAMINFO header is written on create. Every full block is
/// encoded and appended to the file immediately, so memory stays bounded by
/// one block. `finalize` encodes the zero-padded tail and rewrites the header
/// with the sample count and MD5.
pub struct FlacFileWriter {
    path: PathBuf,
    file: BufWriter<File>,
    config: Verified<config::Encoder>,
    stream_info: StreamInfo,
    framebuf: FrameBuf,
    context: Context,
    pending: Vec<i32>,
    channels: usize,
    block_size: usize,
}

impl FlacFileWriter {
    pub fn create(path: &Path, settings: &AudioSettings) -> Result<Self, RecorderError> {
        let channels = settings.channels.max(1) as usize;
        let bits_per_sample = settings.bit_depth as usize;
        let config = config::Encoder::default()
            .into_verified()
            .map_err(|(_, e)| RecorderError::EncodingFailed(format!("flac config error: {}", e)))?;
        let block_size = config.block_size;
        let stream_info = StreamInfo::new(settings.sample_rate as usize, channels, bits_per_sample)
            .map_err(|e| RecorderError::EncodingFailed(format!("flac stream info error: {}", e)))?;
        let framebuf = FrameBuf::with_size(channels, block_size)
            .map_err(|e| RecorderError::EncodingFailed(format!("flac block error: {}", e)))?;

        let file = File::create(path)
            .map_err(|e| RecorderError::StorageError(format!("failed to create {}: {}", path.display(), e)))?;
        let mut writer = Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            config,
            stream_info,
            framebuf,
            context: Context::new(bits_per_sample, channels, block_size),
            pending: Vec::with_capacity(block_size * channels),
            channels,
            block_size,
        };
        let header = writer.header()?;
        writer.write_bytes(&header)?;
        Ok(writer)
    }

    /// `fLaC` marker plus the STREAMINFO block. Always the same length.
    fn header(&self) -> Result<Vec<u8>, RecorderError> {
        let mut sink = ByteSink::new();
        Stream::with_stream_info(self.stream_info.clone())
            .write(&mut sink)
            .map_err(|e| RecorderError::EncodingFailed(format!("flac header write failed: {}", e)))?;
        Ok(sink.into_inner())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), RecorderError> {
        self.file
            .write_all(bytes)
            .map_err(|e| RecorderError::StorageError(format!("failed to write {}: {}", self.path.display(), e)))
    }

    /// Encode one block of interleaved samples. A short block is zero-padded.
    fn encode_block(&mut self, block: &[i32]) -> Result<(), RecorderError> {
        let full = self.block_size * self.channels;
        let fill = |e: SourceError| RecorderError::EncodingFailed(format!("flac input error: {}", e));
        if block.len() < full {
            let mut padded = block.to_vec();
            padded.resize(full, 0);
            self.framebuf.fill_interleaved(&padded).map_err(fill)?;
        } else {
            self.framebuf.fill_interleaved(block).map_err(fill)?;
        }
        self.context.fill_interleaved(block).map_err(fill)?;

        let frame_number = self.context.current_frame_number().unwrap_or(0);
        let frame = flacenc::encode_fixed_size_frame(&self.config, &self.framebuf, frame_number, &self.stream_info)
            .map_err(|e| RecorderError::EncodingFailed(format!("flac encoding failed: {:?}", e)))?;
        self.stream_info.update_frame_info(&frame);

        let mut sink = ByteSink::new();
        frame
            .write(&mut sink)
            .map_err(|e| RecorderError::EncodingFailed(format!("flac write failed: {}", e)))?;
        self.write_bytes(sink.as_slice())
    }
}

impl AudioFileWriter for FlacFileWriter {
    fn write(&mut self, samples: &[i16]) -> Result<(), RecorderError> {
        self.pending.extend(samples.iter().map(|&s| s as i32));
        let full = self.block_size * self.channels;
        while self.pending.len() >= full {
            let block: Vec<i32> = self.pending.drain(..full).collect();
            self.encode_block(&block)?;
        }
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<u64, RecorderError> {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.encode_block(&tail)?;
        }
        let frames = self.frames_written();
        self.stream_info.set_md5_digest(&self.context.md5_digest());
        self.stream_info.set_total_samples(self.context.total_samples());
        let header = self.header()?;

        let path = self.path.clone();
        let storage = |e: std::io::Error| RecorderError::StorageError(format!("failed to write {}: {}", path.display(), e));
        self.file.flush().map_err(storage)?;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(0)).map_err(storage)?;
        file.write_all(&header).map_err(storage)?;
        file.sync_all().map_err(storage)?;
        Ok(frames)
    }

    fn frames_written(&self) -> u64 {
        (self.context.total_samples() + self.pending.len() / self.channels) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use approx::assert_abs_diff_eq;

    use crate::storage::probe::probe_duration;

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("audio_recorder_writer_test_{}", name))
    }

    #[test]
    fn write_mono_wav() {
        let path = temp_file_path("mono.wav");
        let settings = AudioSettings::new(OutputFormat::Wav, 1);

        let mut writer = DefaultEncoderFactory.create(&path, &settings).unwrap();
        writer.write(&[0, 1000, -1000, 0]).unwrap();
        assert_eq!(writer.frames_written(), 4);
        assert_eq!(writer.finalize().unwrap(), 4);

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 4);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn stereo_frames_count_pairs() {
        let path = temp_file_path("stereo.wav");
        let settings = AudioSettings::new(OutputFormat::Wav, 2);

        let mut writer = DefaultEncoderFactory.create(&path, &settings).unwrap();
        writer.write(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(writer.finalize().unwrap(), 3);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn write_flac() {
        let path = temp_file_path("tone.flac");
        let settings = AudioSettings::new(OutputFormat::Flac, 1);

        let samples: Vec<i16> = (0..44_100)
            .map(|i| ((2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin() * 16_000.0) as i16)
            .collect();

        let mut writer = DefaultEncoderFactory.create(&path, &settings).unwrap();
        writer.write(&samples).unwrap();
        assert_eq!(writer.finalize().unwrap(), 44_100);

        let data = fs::read(&path).unwrap();
        assert_eq!(&data[0..4], b"fLaC");
        assert!(data.len() < samples.len() * 2);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn flac_blocks_reach_disk_before_finalize() {
        let path = temp_file_path("streaming.flac");
        let settings = AudioSettings::new(OutputFormat::Flac, 2);

        let mut writer = DefaultEncoderFactory.create(&path, &settings).unwrap();

        // Noise does not compress, so every block adds roughly its raw size.
        let mut seed = 0x1234_5678u32;
        let samples: Vec<i16> = (0..44_100 * 2)
            .map(|_| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (seed >> 16) as i16
            })
            .collect();
        for chunk in samples.chunks(2048) {
            writer.write(chunk).unwrap();
        }
        assert_eq!(writer.frames_written(), 44_100);
        assert!(fs::metadata(&path).unwrap().len() > 100_000);

        assert_eq!(writer.finalize().unwrap(), 44_100);
        let data = fs::read(&path).unwrap();
        assert_eq!(&data[0..4], b"fLaC");
        assert_abs_diff_eq!(probe_duration(&path).unwrap(), 1.0, epsilon = 1e-6);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn platform_formats_are_unsupported_by_default() {
        let path = temp_file_path("unsupported.m4a");
        for format in [OutputFormat::Aac, OutputFormat::M4a] {
            let result = DefaultEncoderFactory.create(&path, &AudioSettings::new(format, 1));
            assert_eq!(result.err(), Some(RecorderError::UnsupportedFormat(format)));
        }
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_is_a_storage_error() {
        let path = temp_file_path("missing_dir").join("nested").join("x.wav");
        let result = DefaultEncoderFactory.create(&path, &AudioSettings::new(OutputFormat::Wav, 1));
        assert!(matches!(result, Err(RecorderError::StorageError(_))));
    }
}
