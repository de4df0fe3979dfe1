//! cpal microphone input.
//!
//! `cpal::Stream` is not `Send`, so each installed tap owns a dedicated
//! thread that opens the default input device, runs the stream, and drops it
//! when the tap is removed. Device buffers are re-laid out to the requested
//! channel count and resampled to the requested rate before they reach the
//! tap, so the recorder always sees the tap format it asked for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;

use audio_recorder_core::models::audio_models::{InputBuffer, TapFormat};
use audio_recorder_core::models::error::RecorderError;
use audio_recorder_core::processing::pcm::{adapt_channels, resample};
use audio_recorder_core::processing::power::{channel_rms, db_from_rms};
use audio_recorder_core::traits::input_provider::{InputProvider, LevelMeter, TapCallback};

/// Per-channel level of the most recent input buffer, in dB.
#[derive(Default)]
pub struct CpalLevelMeter {
    levels_db: Mutex<Vec<f32>>,
}

impl CpalLevelMeter {
    pub fn update(&self, samples: &[f32], channels: usize) {
        let levels = (0..channels.max(1))
            .map(|ch| db_from_rms(channel_rms(samples, channels.max(1), ch)))
            .collect();
        *self.levels_db.lock() = levels;
    }

    pub fn reset(&self) {
        self.levels_db.lock().clear();
    }
}

impl LevelMeter for CpalLevelMeter {
    fn channel_levels_db(&self) -> Vec<f32> {
        self.levels_db.lock().clone()
    }
}

struct StreamThread {
    shutdown: Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Default-microphone input backed by cpal.
pub struct CpalInputProvider {
    meter: Arc<CpalLevelMeter>,
    running: Arc<AtomicBool>,
    stream: Option<StreamThread>,
}

impl CpalInputProvider {
    pub fn new() -> Self {
        Self {
            meter: Arc::new(CpalLevelMeter::default()),
            running: Arc::new(AtomicBool::new(false)),
            stream: None,
        }
    }

    /// Whether the input stream is currently delivering buffers.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for CpalInputProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InputProvider for CpalInputProvider {
    fn is_available(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    fn install_tap(&mut self, format: TapFormat, callback: TapCallback) -> Result<(), RecorderError> {
        if self.stream.is_some() {
            return Err(RecorderError::EngineStartFailed("input tap already installed".into()));
        }

        let (ready_tx, ready_rx) = bounded::<Result<(), RecorderError>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let meter = Arc::clone(&self.meter);
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("cpal-input".into())
            .spawn(move || {
                let stream = match open_stream(format, callback, meter) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                running.store(true, Ordering::SeqCst);
                let _ = ready_tx.send(Ok(()));

                // Blocks until the sender is dropped by `remove_tap`.
                let _ = shutdown_rx.recv();
                drop(stream);
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| RecorderError::EngineStartFailed(format!("failed to spawn input thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!(
                    "Input tap installed: {} Hz, {} ch, {} frames",
                    format.sample_rate,
                    format.channels,
                    format.buffer_size
                );
                self.stream = Some(StreamThread {
                    shutdown: shutdown_tx,
                    handle,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(RecorderError::EngineStartFailed("input thread exited before starting".into()))
            }
        }
    }

    fn remove_tap(&mut self) -> Result<(), RecorderError> {
        if let Some(stream) = self.stream.take() {
            drop(stream.shutdown);
            if stream.handle.join().is_err() {
                log::warn!("Input thread panicked");
            }
        }
        self.meter.reset();
        Ok(())
    }

    fn meter(&self) -> Option<Arc<dyn LevelMeter>> {
        Some(Arc::clone(&self.meter) as Arc<dyn LevelMeter>)
    }
}

impl Drop for CpalInputProvider {
    fn drop(&mut self) {
        let _ = self.remove_tap();
    }
}

/// Converts device buffers to the tap format and counts hardware frames.
struct TapAdapter {
    callback: TapCallback,
    meter: Arc<CpalLevelMeter>,
    device_channels: usize,
    device_rate: u32,
    format: TapFormat,
    sample_time: u64,
}

impl TapAdapter {
    fn deliver(&mut self, data: &[f32]) {
        let channels = self.format.channels.max(1) as usize;
        let adapted = adapt_channels(data, self.device_channels, channels);
        let samples = resample(
            &adapted,
            channels,
            self.device_rate as f64,
            self.format.sample_rate as f64,
        );
        if samples.is_empty() {
            return;
        }
        self.meter.update(&samples, channels);

        let buffer = InputBuffer::new(&samples, self.format.channels, self.format.sample_rate, self.sample_time);
        (self.callback)(&buffer);
        self.sample_time += buffer.frames() as u64;
    }
}

fn open_stream(
    format: TapFormat,
    callback: TapCallback,
    meter: Arc<CpalLevelMeter>,
) -> Result<Stream, RecorderError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(RecorderError::DeviceNotAvailable)?;
    let supported = device
        .default_input_config()
        .map_err(|e| RecorderError::EngineStartFailed(format!("no input config: {}", e)))?;

    let sample_format = supported.sample_format();
    let config = supported.config();
    log::debug!(
        "Opening input {:?}: {} Hz, {} ch, {:?}",
        device.name().unwrap_or_default(),
        config.sample_rate.0,
        config.channels,
        sample_format
    );

    let mut adapter = TapAdapter {
        callback,
        meter,
        device_channels: config.channels as usize,
        device_rate: config.sample_rate.0,
        format,
        sample_time: 0,
    };
    let on_error = |err: cpal::StreamError| log::error!("Input stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| adapter.deliver(data),
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                adapter.deliver(&samples);
            },
            on_error,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0).collect();
                adapter.deliver(&samples);
            },
            on_error,
            None,
        ),
        other => {
            return Err(RecorderError::EngineStartFailed(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| RecorderError::EngineStartFailed(e.to_string()))?;

    stream
        .play()
        .map_err(|e| RecorderError::EngineStartFailed(e.to_string()))?;
    Ok(stream)
}
