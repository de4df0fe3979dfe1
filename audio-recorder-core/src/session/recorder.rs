use std::fs;
use std::sync::Arc;
use std::thread;

use crate::events::RecorderEvents;
use crate::models::audio_models::{InputBuffer, Orientation, PipelineDiagnostics, RecordingOption, TapFormat};
use crate::models::config::{LevelSource, RecorderConfiguration};
use crate::models::error::RecorderError;
use crate::models::format::SAMPLE_RATE;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::session::RecordingSession;
use crate::models::state::{RecorderCommand, RecordingState};
use crate::playback::coordinator::PlaybackCoordinator;
use crate::processing::power::{PowerCalibration, PowerConverter};
use crate::session::pipeline::{BufferPipeline, WriterHandle};
use crate::session::ticker::Ticker;
use crate::storage::writer::{DefaultEncoderFactory, EncoderFactory};
use crate::storage::{files, metadata};
use crate::traits::audio_cue::{CueKind, CuePlayer, SilentCue};
use crate::traits::input_provider::{InputProvider, TapCallback};
use crate::traits::path_resolver::PathResolver;
use crate::traits::permission::PermissionGate;
use crate::traits::session_gateway::SessionGateway;

/// Microphone recorder: stopped → recording ⇄ paused → stopped.
///
/// Generic over the input and the platform session via [`InputProvider`] and
/// [`SessionGateway`]. State transitions are driven by the owner through
/// `&mut self`; buffers arrive concurrently on the tap thread and go through
/// the shared [`BufferPipeline`].
///
/// ```text
/// record():  permission → session → [new session: input, file, cue, delay] → tap → ticker
/// pause():   gate closed → tap removed → ticker stopped
/// stop():    tap removed → ticker stopped → writer drained → move → checksum → Finished
/// ```
pub struct Recorder<I: InputProvider, G: SessionGateway> {
    input: I,
    gateway: G,
    permission: Arc<dyn PermissionGate>,
    paths: Arc<dyn PathResolver>,
    encoders: Arc<dyn EncoderFactory>,
    cues: Arc<dyn CuePlayer>,
    coordinator: Option<Arc<PlaybackCoordinator>>,
    config: RecorderConfiguration,
    events: Arc<RecorderEvents>,
    pipeline: Arc<BufferPipeline>,
    state: RecordingState,
    session: Option<RecordingSession>,
    writer_handle: Option<WriterHandle>,
    ticker: Option<Ticker>,
    last_result: Option<RecordingResult>,
}

impl<I: InputProvider, G: SessionGateway> Recorder<I, G> {
    pub fn new(
        input: I,
        gateway: G,
        permission: Arc<dyn PermissionGate>,
        paths: Arc<dyn PathResolver>,
    ) -> Self {
        let config = RecorderConfiguration::default();
        let events = Arc::new(RecorderEvents::default());
        let pipeline = Arc::new(BufferPipeline::new(
            converter_for(&config),
            config.level_source,
            Arc::clone(&events),
        ));
        Self {
            input,
            gateway,
            permission,
            paths,
            encoders: Arc::new(DefaultEncoderFactory),
            cues: Arc::new(SilentCue),
            coordinator: None,
            config,
            events,
            pipeline,
            state: RecordingState::Stopped,
            session: None,
            writer_handle: None,
            ticker: None,
            last_result: None,
        }
    }

    /// Replace the encoders used for new sessions (platform AAC/ALAC).
    pub fn with_encoders(mut self, encoders: Arc<dyn EncoderFactory>) -> Self {
        self.encoders = encoders;
        self
    }

    pub fn with_cues(mut self, cues: Arc<dyn CuePlayer>) -> Self {
        self.cues = cues;
        self
    }

    /// Share a coordination bus. `delete()` broadcasts stop-all on it.
    pub fn with_coordinator(mut self, coordinator: Arc<PlaybackCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn configuration(&self) -> &RecorderConfiguration {
        &self.config
    }

    pub fn current_session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// Normalized power values since the current recording started.
    pub fn power_levels(&self) -> Vec<f32> {
        self.pipeline.power_levels()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.pipeline.elapsed_secs()
    }

    pub fn events(&self) -> &RecorderEvents {
        &self.events
    }

    pub fn diagnostics(&self) -> PipelineDiagnostics {
        self.pipeline.diagnostics()
    }

    /// Result of the last successful stop, until it is deleted.
    pub fn last_result(&self) -> Option<&RecordingResult> {
        self.last_result.as_ref()
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    /// Apply configuration and activate the audio session.
    ///
    /// Allowed in any state except recording. Changes to format, name,
    /// orientation and channel layout take effect with the next session.
    pub fn configure(&mut self, config: RecorderConfiguration) -> Result<(), RecorderError> {
        if self.state.is_recording() {
            return Err(RecorderError::RecordingInProgress);
        }
        config.validate().map_err(RecorderError::ConfigurationFailed)?;
        self.gateway.activate(config.category, config.mode, config.options)?;
        log::info!(
            "Recorder configured: format={}, option={:?}, level source={:?}",
            config.output_format,
            config.recording_option,
            config.level_source
        );
        self.config = config;
        self.pipeline
            .reconfigure(converter_for(&self.config), self.effective_level_source());
        Ok(())
    }

    /// Start a new recording, or resume a paused one. No-op while recording.
    pub fn record(&mut self) -> Result<(), RecorderError> {
        let Some(next) = self.state.transition(RecorderCommand::Record) else {
            return Ok(());
        };

        if !self.permission.is_granted() && !self.permission.request() {
            log::warn!("Microphone permission denied");
            return Err(RecorderError::PermissionDenied);
        }
        self.gateway
            .activate(self.config.category, self.config.mode, self.config.options)?;

        let resuming = self.state.is_paused();
        if !resuming {
            self.begin_session()?;
        }

        if let Err(e) = self.start_input() {
            if !resuming {
                self.abandon_session();
            }
            return Err(e);
        }

        self.set_state(next);
        log::info!("Recording {}", if resuming { "resumed" } else { "started" });
        Ok(())
    }

    /// Pause. No-op unless recording. Elapsed time is frozen until resumed.
    pub fn pause(&mut self) {
        let Some(next) = self.state.transition(RecorderCommand::Pause) else {
            return;
        };
        self.stop_input();
        self.set_state(next);
        log::info!("Recording paused at {:.2}s", self.pipeline.elapsed_secs());
    }

    /// Stop and finalize. Returns `Ok(None)` when already stopped.
    ///
    /// Once this returns, no further audio is written.
    pub fn stop(&mut self) -> Result<Option<RecordingResult>, RecorderError> {
        self.end_session(RecorderCommand::Stop)
    }

    /// Stop, delete the recording (and its metadata), and stop all players.
    pub fn delete(&mut self) -> Result<(), RecorderError> {
        let stopped = self.end_session(RecorderCommand::Delete);
        let target = match &stopped {
            Ok(Some(result)) => Some(result.file_path.clone()),
            Ok(None) => self.last_result.as_ref().map(|r| r.file_path.clone()),
            Err(_) => None,
        };
        self.last_result = None;

        if let Some(coordinator) = &self.coordinator {
            coordinator.stop_all(None);
        }
        if let Some(path) = target {
            files::remove_recording(&path)?;
            log::info!("Deleted recording {}", path.display());
        }
        stopped.map(|_| ())
    }

    /// Finalize the live session for `Stop` or `Delete`. `Ok(None)` when
    /// there is nothing to finalize.
    fn end_session(&mut self, command: RecorderCommand) -> Result<Option<RecordingResult>, RecorderError> {
        let Some(next) = self.state.transition(command) else {
            return Ok(None);
        };

        if self.state.is_recording() {
            self.stop_input();
        }
        self.pipeline.finish();
        let outcome = self.finish_session();

        self.set_state(next);
        self.cues.play(CueKind::RecordingStop);

        match outcome {
            Ok(result) => {
                log::info!(
                    "Recording finished: {} ({:.2}s)",
                    result.file_path.display(),
                    result.duration_secs
                );
                self.last_result = Some(result.clone());
                self.events.finished.publish(result.clone());
                Ok(Some(result))
            }
            Err(e) => {
                log::error!("Failed to finalize recording: {}", e);
                self.events.errors.publish(e.clone());
                Err(e)
            }
        }
    }

    /// Orientation used to pick the data source of the next session.
    pub fn update_orientation(&mut self, orientation: Orientation) -> Result<(), RecorderError> {
        if self.state.is_recording() {
            return Err(RecorderError::RecordingInProgress);
        }
        self.config.orientation = orientation;
        Ok(())
    }

    /// Channel layout of the next session.
    pub fn update_recording_option(&mut self, option: RecordingOption) -> Result<(), RecorderError> {
        if self.state.is_recording() {
            return Err(RecorderError::RecordingInProgress);
        }
        self.config.recording_option = option;
        Ok(())
    }

    // --- Internal helpers ---

    fn set_state(&mut self, state: RecordingState) {
        if self.state != state {
            self.state = state;
            self.events.state.publish(state);
        }
    }

    /// Select the input, create the file and start the writer thread.
    fn begin_session(&mut self) -> Result<(), RecorderError> {
        let device = self.gateway.select_input(self.config.orientation)?;
        let channels = self.config.recording_option.channels(device.supports_stereo);
        let session = RecordingSession::new(
            &self.config.file_name,
            self.config.output_format,
            channels,
            self.paths.as_ref(),
        );

        if let Some(parent) = session.scratch_path().parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RecorderError::StorageError(format!("failed to create directory: {}", e)))?;
        }
        let writer = self.encoders.create(session.scratch_path(), session.settings())?;

        let level_source = self.effective_level_source();
        self.pipeline.reconfigure(converter_for(&self.config), level_source);
        let handle = match self.pipeline.begin(writer, channels) {
            Ok(handle) => handle,
            Err(e) => {
                let _ = files::remove_if_exists(session.scratch_path());
                return Err(e);
            }
        };

        log::info!(
            "New recording {} on {} ({:?}, {} ch) → {}",
            session.id(),
            device.name,
            device.data_source,
            channels,
            session.final_path().display()
        );
        self.writer_handle = Some(handle);
        self.session = Some(session);

        self.cues.play(CueKind::RecordingStart);
        let delay = self.config.start_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        Ok(())
    }

    /// Meter mode needs a hardware meter; fall back to buffer levels without one.
    fn effective_level_source(&self) -> LevelSource {
        match self.config.level_source {
            LevelSource::Meter if self.input.meter().is_none() => {
                log::warn!("Input has no level meter, using buffer levels");
                LevelSource::Buffers
            }
            source => source,
        }
    }

    /// Open the gate, install the tap and start the ticker.
    fn start_input(&mut self) -> Result<(), RecorderError> {
        if !self.input.is_available() {
            return Err(RecorderError::DeviceNotAvailable);
        }
        let channels = self
            .session
            .as_ref()
            .map(|s| s.channels())
            .ok_or_else(|| RecorderError::EngineStartFailed("no active session".into()))?;

        let format = TapFormat {
            sample_rate: SAMPLE_RATE,
            channels,
            buffer_size: self.config.buffer_size,
        };

        self.pipeline.open_gate();
        let pipeline = Arc::clone(&self.pipeline);
        let callback: TapCallback = Arc::new(move |buffer: &InputBuffer<'_>| pipeline.process(buffer));
        if let Err(e) = self.input.install_tap(format, callback) {
            self.pipeline.suspend();
            return Err(e);
        }

        if let Err(e) = self.start_ticker() {
            self.stop_input();
            return Err(e);
        }
        Ok(())
    }

    fn start_ticker(&mut self) -> Result<(), RecorderError> {
        let pipeline = Arc::clone(&self.pipeline);
        let events = Arc::clone(&self.events);
        let meter = match pipeline.level_source() {
            LevelSource::Meter => self.input.meter(),
            LevelSource::Buffers => None,
        };

        let ticker = Ticker::start("recorder-ticker", self.config.ticker_interval(), move || {
            if !pipeline.is_accepting() {
                return;
            }
            if let Some(meter) = &meter {
                pipeline.push_meter_level(&meter.channel_levels_db());
            }
            events.time_updates.publish(pipeline.elapsed_secs());
        })
        .map_err(|e| RecorderError::EngineStartFailed(format!("failed to start ticker: {}", e)))?;

        self.ticker = Some(ticker);
        Ok(())
    }

    /// Close the gate, remove the tap and stop the ticker.
    fn stop_input(&mut self) {
        self.pipeline.suspend();
        if let Err(e) = self.input.remove_tap() {
            log::warn!("Failed to remove input tap: {}", e);
        }
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    /// Drain the writer, move the file into place and build the result.
    fn finish_session(&mut self) -> Result<RecordingResult, RecorderError> {
        let session = self
            .session
            .take()
            .ok_or_else(|| RecorderError::StorageError("no active session".into()))?;

        let frames = self.join_writer();
        let result = frames.and_then(|frames| self.persist(&session, frames));
        if result.is_err() {
            discard(&session);
        }
        result
    }

    fn join_writer(&mut self) -> Result<u64, RecorderError> {
        let handle = self
            .writer_handle
            .take()
            .ok_or_else(|| RecorderError::StorageError("file writer not available".into()))?;
        handle
            .join()
            .map_err(|_| RecorderError::EncodingFailed("writer thread panicked".into()))?
    }

    fn persist(&self, session: &RecordingSession, frames: u64) -> Result<RecordingResult, RecorderError> {
        files::move_into_place(session.scratch_path(), session.final_path())?;
        let checksum = files::sha256_file(session.final_path())?;

        let duration_secs = frames as f64 / session.settings().sample_rate as f64;
        let buffer_count = self.pipeline.diagnostics().callbacks;
        let metadata = RecordingMetadata::new(session, duration_secs, buffer_count, &checksum);

        if self.config.write_metadata {
            metadata::write_metadata(&metadata, session.final_path())?;
        }

        Ok(RecordingResult {
            file_path: session.final_path().to_path_buf(),
            duration_secs,
            metadata,
            checksum,
        })
    }

    /// Drop a session whose input never started.
    fn abandon_session(&mut self) {
        self.pipeline.finish();
        if let Some(handle) = self.writer_handle.take() {
            let _ = handle.join();
        }
        if let Some(session) = self.session.take() {
            discard(&session);
        }
    }
}

impl<I: InputProvider, G: SessionGateway> Drop for Recorder<I, G> {
    fn drop(&mut self) {
        if !self.state.is_stopped() {
            if let Err(e) = self.stop() {
                log::error!("Failed to stop recorder on drop: {}", e);
            }
        }
    }
}

fn converter_for(config: &RecorderConfiguration) -> PowerConverter {
    PowerConverter::new(PowerCalibration::new(config.power_floor_db), config.channel_policy)
}

/// Remove partial files of a failed session.
fn discard(session: &RecordingSession) {
    for path in [session.scratch_path(), session.final_path()] {
        if let Err(e) = files::remove_if_exists(path) {
            log::warn!("Failed to remove partial recording: {}", e);
        }
    }
    let _ = metadata::remove_metadata(session.final_path());
}
