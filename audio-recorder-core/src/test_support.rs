//! Fake collaborators for unit tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::audio_models::{
    DeviceDescriptor, InputBuffer, Orientation, SessionCategory, SessionMode, SessionOptions, TapFormat,
};
use crate::models::error::{PlaybackError, RecorderError, SessionError};
use crate::storage::writer::AudioFileWriter;
use crate::traits::input_provider::{InputProvider, LevelMeter, TapCallback};
use crate::traits::player::{FinishedCallback, PlayerBackend, PlayerFactory};
use crate::traits::session_gateway::SessionGateway;

/// 440 Hz mono sine at 44.1 kHz.
pub fn sine(amplitude: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
        .collect()
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

// --- Input ---

#[derive(Default)]
struct ManualShared {
    callback: Option<TapCallback>,
    sample_time: u64,
    installs: usize,
    last_format: Option<TapFormat>,
}

/// Input whose buffers are pushed by the test through a [`ManualFeed`].
pub struct ManualInput {
    shared: Arc<Mutex<ManualShared>>,
    meter: Option<Arc<FixedMeter>>,
    fail_install: bool,
}

impl ManualInput {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(ManualShared::default())),
            meter: None,
            fail_install: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_install: true,
            ..Self::new()
        }
    }

    pub fn with_meter(meter: FixedMeter) -> Self {
        Self {
            meter: Some(Arc::new(meter)),
            ..Self::new()
        }
    }

    pub fn feed(&self) -> ManualFeed {
        ManualFeed {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_tapped(&self) -> bool {
        self.shared.lock().callback.is_some()
    }

    pub fn install_count(&self) -> usize {
        self.shared.lock().installs
    }

    pub fn last_format(&self) -> Option<TapFormat> {
        self.shared.lock().last_format
    }
}

impl InputProvider for ManualInput {
    fn is_available(&self) -> bool {
        true
    }

    fn install_tap(&mut self, format: TapFormat, callback: TapCallback) -> Result<(), RecorderError> {
        if self.fail_install {
            return Err(RecorderError::EngineStartFailed("engine refused to start".into()));
        }
        let mut shared = self.shared.lock();
        shared.callback = Some(callback);
        shared.installs += 1;
        shared.last_format = Some(format);
        Ok(())
    }

    fn remove_tap(&mut self) -> Result<(), RecorderError> {
        self.shared.lock().callback = None;
        Ok(())
    }

    fn meter(&self) -> Option<Arc<dyn LevelMeter>> {
        self.meter.clone().map(|m| m as Arc<dyn LevelMeter>)
    }
}

/// Test-side handle that delivers buffers to the installed tap.
pub struct ManualFeed {
    shared: Arc<Mutex<ManualShared>>,
}

impl ManualFeed {
    /// Deliver one buffer. Returns false when no tap is installed.
    pub fn push(&self, samples: &[f32], channels: u16) -> bool {
        let (callback, sample_time) = {
            let mut shared = self.shared.lock();
            let Some(callback) = shared.callback.clone() else {
                return false;
            };
            let sample_time = shared.sample_time;
            shared.sample_time += (samples.len() / channels.max(1) as usize) as u64;
            (callback, sample_time)
        };
        callback(&InputBuffer::new(samples, channels, 44_100, sample_time));
        true
    }

    /// Advance hardware time without delivering audio.
    pub fn skip_frames(&self, frames: u64) {
        self.shared.lock().sample_time += frames;
    }

    /// The installed tap, to simulate a buffer already in flight.
    pub fn callback(&self) -> Option<TapCallback> {
        self.shared.lock().callback.clone()
    }
}

pub struct FixedMeter {
    levels_db: Vec<f32>,
}

impl FixedMeter {
    pub fn new(levels_db: Vec<f32>) -> Self {
        Self { levels_db }
    }
}

impl LevelMeter for FixedMeter {
    fn channel_levels_db(&self) -> Vec<f32> {
        self.levels_db.clone()
    }
}

// --- Session ---

pub struct FailingGateway;

impl SessionGateway for FailingGateway {
    fn activate(&mut self, _: SessionCategory, _: SessionMode, _: SessionOptions) -> Result<(), SessionError> {
        Err(SessionError::ActivationFailed("session owned by another app".into()))
    }

    fn select_input(&mut self, _: Orientation) -> Result<DeviceDescriptor, SessionError> {
        Err(SessionError::NoInputDevice)
    }
}

// --- Writer ---

pub type WrittenChunks = Arc<Mutex<Vec<Vec<i16>>>>;

/// Writer that keeps chunks in memory. Optionally fails every n-th write.
pub struct RecordingWriter {
    chunks: WrittenChunks,
    fail_every: Option<usize>,
    calls: usize,
    samples: u64,
}

impl RecordingWriter {
    pub fn new() -> (Self, WrittenChunks) {
        let chunks = WrittenChunks::default();
        let writer = Self {
            chunks: Arc::clone(&chunks),
            fail_every: None,
            calls: 0,
            samples: 0,
        };
        (writer, chunks)
    }

    pub fn failing_every(n: usize) -> (Self, WrittenChunks) {
        let (mut writer, chunks) = Self::new();
        writer.fail_every = Some(n);
        (writer, chunks)
    }
}

impl AudioFileWriter for RecordingWriter {
    fn write(&mut self, samples: &[i16]) -> Result<(), RecorderError> {
        self.calls += 1;
        if self.fail_every.is_some_and(|n| self.calls % n == 0) {
            return Err(RecorderError::StorageError("disk full".into()));
        }
        self.chunks.lock().push(samples.to_vec());
        self.samples += samples.len() as u64;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<u64, RecorderError> {
        Ok(self.samples)
    }

    fn frames_written(&self) -> u64 {
        self.samples
    }
}

// --- Player ---

#[derive(Default)]
struct FakePlayerShared {
    duration: f64,
    position: f64,
    playing: bool,
    fail: bool,
    opened: Vec<PathBuf>,
    callbacks: Vec<Arc<FinishedCallback>>,
}

/// Player factory whose position and end-of-file are driven by the test.
#[derive(Clone, Default)]
pub struct FakePlayerFactory {
    shared: Arc<Mutex<FakePlayerShared>>,
}

impl FakePlayerFactory {
    pub fn new(duration: f64) -> Self {
        let factory = Self::default();
        factory.shared.lock().duration = duration;
        factory
    }

    pub fn failing() -> Self {
        let factory = Self::default();
        factory.shared.lock().fail = true;
        factory
    }

    pub fn open_count(&self) -> usize {
        self.shared.lock().opened.len()
    }

    pub fn last_opened(&self) -> Option<PathBuf> {
        self.shared.lock().opened.last().cloned()
    }

    pub fn set_position(&self, secs: f64) {
        self.shared.lock().position = secs;
    }

    pub fn position(&self) -> f64 {
        self.shared.lock().position
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().playing
    }

    /// Signal end of file on the most recently opened handle.
    pub fn finish(&self) {
        let callback = self.shared.lock().callbacks.last().cloned();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Signal end of file on the n-th handle ever opened.
    pub fn finish_nth(&self, n: usize) {
        let callback = self.shared.lock().callbacks.get(n).cloned();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl PlayerFactory for FakePlayerFactory {
    fn open(&self, path: &Path, on_finished: FinishedCallback) -> Result<Box<dyn PlayerBackend>, PlaybackError> {
        let mut shared = self.shared.lock();
        if shared.fail {
            return Err(PlaybackError::FileNotFound(path.to_path_buf()));
        }
        shared.opened.push(path.to_path_buf());
        shared.callbacks.push(Arc::new(on_finished));
        shared.position = 0.0;
        Ok(Box::new(FakePlayer {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FakePlayer {
    shared: Arc<Mutex<FakePlayerShared>>,
}

impl PlayerBackend for FakePlayer {
    fn duration(&self) -> f64 {
        self.shared.lock().duration
    }

    fn current_time(&self) -> f64 {
        self.shared.lock().position
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.shared.lock().playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.shared.lock().playing = false;
    }

    fn stop(&mut self) {
        self.shared.lock().playing = false;
    }

    fn seek(&mut self, secs: f64) -> Result<(), PlaybackError> {
        self.shared.lock().position = secs;
        Ok(())
    }
}
