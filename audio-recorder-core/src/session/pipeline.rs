use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;

use crate::events::RecorderEvents;
use crate::models::audio_models::{CapturedBuffer, InputBuffer, PipelineDiagnostics};
use crate::models::config::LevelSource;
use crate::models::error::RecorderError;
use crate::processing::elapsed::ElapsedClock;
use crate::processing::pcm;
use crate::processing::power::PowerConverter;
use crate::processing::time_format::format_elapsed;
use crate::storage::writer::AudioFileWriter;

/// Join handle of the writer thread. Yields the number of frames on disk.
pub(crate) type WriterHandle = JoinHandle<Result<u64, RecorderError>>;

/// Mutable pipeline state, protected by `parking_lot::Mutex`.
struct PipelineState {
    converter: PowerConverter,
    level_source: LevelSource,
    clock: ElapsedClock,
    power_levels: Arc<Vec<f32>>,
    diagnostics: PipelineDiagnostics,
    writer: Option<Sender<Vec<i16>>>,
    channels: u16,
}

/// Real-time path from the input tap to the file and the subscribers.
///
/// ```text
/// [tap callback] → elapsed clock → power series ─┬→ events (elapsed, series, buffers)
///                                                └→ [PCM i16] → writer thread → file
/// ```
///
/// Shared between the recorder and the tap closure. The callback never
/// touches the disk: PCM goes to the writer thread over an unbounded
/// channel, in order. Events are published after the state lock is
/// released; `publishing` keeps them in buffer order.
pub struct BufferPipeline {
    accepting: AtomicBool,
    state: Mutex<PipelineState>,
    publishing: Mutex<()>,
    events: Arc<RecorderEvents>,
}

impl BufferPipeline {
    pub fn new(converter: PowerConverter, level_source: LevelSource, events: Arc<RecorderEvents>) -> Self {
        Self {
            accepting: AtomicBool::new(false),
            state: Mutex::new(PipelineState {
                converter,
                level_source,
                clock: ElapsedClock::new(),
                power_levels: Arc::new(Vec::new()),
                diagnostics: PipelineDiagnostics::default(),
                writer: None,
                channels: 1,
            }),
            publishing: Mutex::new(()),
            events,
        }
    }

    pub fn reconfigure(&self, converter: PowerConverter, level_source: LevelSource) {
        let mut s = self.state.lock();
        s.converter = converter;
        s.level_source = level_source;
    }

    /// Reset for a new recording and start the writer thread.
    pub(crate) fn begin(
        self: &Arc<Self>,
        writer: Box<dyn AudioFileWriter>,
        channels: u16,
    ) -> Result<WriterHandle, RecorderError> {
        let (tx, rx) = unbounded::<Vec<i16>>();
        let pipeline = Arc::clone(self);

        let handle = thread::Builder::new()
            .name("audio-writer".into())
            .spawn(move || {
                let mut writer = writer;
                for chunk in rx.iter() {
                    if let Err(e) = writer.write(&chunk) {
                        pipeline.report_write_error(e);
                    }
                }
                writer.finalize()
            })
            .map_err(|e| RecorderError::EngineStartFailed(format!("failed to spawn writer thread: {}", e)))?;

        let mut s = self.state.lock();
        s.clock.reset();
        s.power_levels = Arc::new(Vec::new());
        s.diagnostics = PipelineDiagnostics::default();
        s.writer = Some(tx);
        s.channels = channels.max(1);
        let _publishing = self.publishing.lock();
        drop(s);
        self.events.power_levels.publish(Arc::from(Vec::<f32>::new()));
        Ok(handle)
    }

    /// Start accepting buffers.
    pub(crate) fn open_gate(&self) {
        self.accepting.store(true, Ordering::SeqCst);
    }

    /// Stop accepting buffers and freeze the clock. The writer stays open.
    pub(crate) fn suspend(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.state.lock().clock.suspend();
    }

    /// Close the writer queue and clear the power series.
    ///
    /// Once this returns no buffer reaches the writer; the writer thread
    /// drains what is queued and finalizes the file.
    pub(crate) fn finish(&self) -> PipelineDiagnostics {
        self.accepting.store(false, Ordering::SeqCst);
        let mut s = self.state.lock();
        s.writer = None;
        s.clock.reset();
        s.power_levels = Arc::new(Vec::new());
        let diagnostics = s.diagnostics.clone();
        let _publishing = self.publishing.lock();
        drop(s);
        self.events.power_levels.publish(Arc::from(Vec::<f32>::new()));
        diagnostics
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Handle one tap buffer. Called on the hardware callback thread.
    pub fn process(&self, buffer: &InputBuffer<'_>) {
        let mut s = self.state.lock();
        // Checked under the lock so a concurrent `finish` is never overtaken.
        if !self.accepting.load(Ordering::SeqCst) {
            s.diagnostics.late_buffers += 1;
            return;
        }

        let elapsed = s.clock.observe(buffer.sample_time, buffer.frames(), buffer.sample_rate);
        s.diagnostics.callbacks += 1;
        s.diagnostics.frames += buffer.frames() as u64;

        let series = if s.level_source == LevelSource::Buffers {
            let power = s.converter.buffer_power(buffer);
            Arc::make_mut(&mut s.power_levels).push(power);
            Some(Arc::clone(&s.power_levels))
        } else {
            None
        };

        let target = s.channels;
        let chunk = if buffer.channels == target {
            pcm::convert_to_int16(buffer.samples)
        } else {
            let adapted = pcm::adapt_channels(buffer.samples, buffer.channels as usize, target as usize);
            pcm::convert_to_int16(&adapted)
        };
        let bytes = chunk.len() as u64 * 2;
        let queued = s.writer.as_ref().map(|tx| tx.send(chunk).is_ok()).unwrap_or(false);
        if queued {
            s.diagnostics.bytes_written += bytes;
        } else {
            s.diagnostics.write_errors += 1;
        }

        let _publishing = self.publishing.lock();
        drop(s);
        self.events.elapsed.publish(format_elapsed(elapsed));
        if let Some(series) = series {
            self.publish_series(&series);
        }
        if self.events.buffers.has_subscribers() {
            self.events.buffers.publish(Arc::new(CapturedBuffer::from(buffer)));
        }
    }

    /// Append one hardware meter reading (meter level source only).
    pub fn push_meter_level(&self, channel_db: &[f32]) {
        let mut s = self.state.lock();
        if !self.accepting.load(Ordering::SeqCst) || s.level_source != LevelSource::Meter {
            return;
        }
        let power = s.converter.meter_power(channel_db);
        Arc::make_mut(&mut s.power_levels).push(power);
        let series = Arc::clone(&s.power_levels);
        let _publishing = self.publishing.lock();
        drop(s);
        self.publish_series(&series);
    }

    fn publish_series(&self, series: &[f32]) {
        if self.events.power_levels.has_subscribers() {
            self.events.power_levels.publish(Arc::from(series));
        }
    }

    fn report_write_error(&self, error: RecorderError) {
        log::error!("Failed to write audio data: {}", error);
        self.state.lock().diagnostics.write_errors += 1;
        self.events.errors.publish(error);
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.state.lock().clock.elapsed_secs()
    }

    pub fn power_levels(&self) -> Vec<f32> {
        let series = Arc::clone(&self.state.lock().power_levels);
        series.to_vec()
    }

    pub fn diagnostics(&self) -> PipelineDiagnostics {
        self.state.lock().diagnostics.clone()
    }

    pub fn level_source(&self) -> LevelSource {
        self.state.lock().level_source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sine, RecordingWriter};

    fn pipeline() -> (Arc<BufferPipeline>, Arc<RecorderEvents>) {
        let events = Arc::new(RecorderEvents::default());
        let pipeline = Arc::new(BufferPipeline::new(
            PowerConverter::default(),
            LevelSource::Buffers,
            Arc::clone(&events),
        ));
        (pipeline, events)
    }

    #[test]
    fn closed_gate_rejects_buffers() {
        let (pipeline, _events) = pipeline();
        let samples = sine(0.5, 256);
        pipeline.process(&InputBuffer::new(&samples, 1, 44_100, 0));

        assert!(pipeline.power_levels().is_empty());
        assert_eq!(pipeline.diagnostics().late_buffers, 1);
    }

    #[test]
    fn buffers_reach_writer_in_order() {
        let (pipeline, _events) = pipeline();
        let (writer, written) = RecordingWriter::new();
        let handle = pipeline.begin(Box::new(writer), 1).unwrap();
        pipeline.open_gate();

        for i in 0..20u64 {
            let samples = vec![i as f32 / 100.0; 64];
            pipeline.process(&InputBuffer::new(&samples, 1, 44_100, i * 64));
        }
        pipeline.finish();

        assert_eq!(handle.join().unwrap().unwrap(), 20 * 64);
        let chunks = written.lock().clone();
        assert_eq!(chunks.len(), 20);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk[0], pcm::to_i16(i as f32 / 100.0));
        }
    }

    #[test]
    fn series_grows_per_buffer_and_clears_on_finish() {
        let (pipeline, events) = pipeline();
        let series = events.power_levels.subscribe();
        let (writer, _) = RecordingWriter::new();
        let handle = pipeline.begin(Box::new(writer), 1).unwrap();
        pipeline.open_gate();

        let samples = sine(0.5, 1024);
        for i in 0..3 {
            pipeline.process(&InputBuffer::new(&samples, 1, 44_100, i * 1024));
        }
        assert_eq!(pipeline.power_levels().len(), 3);

        pipeline.finish();
        handle.join().unwrap().unwrap();

        let lengths: Vec<usize> = series.try_iter().map(|s| s.len()).collect();
        assert_eq!(lengths, vec![0, 1, 2, 3, 0]);
        assert!(pipeline.power_levels().is_empty());
    }

    #[test]
    fn published_series_are_independent_snapshots() {
        let (pipeline, events) = pipeline();
        let (writer, _) = RecordingWriter::new();
        let handle = pipeline.begin(Box::new(writer), 1).unwrap();
        pipeline.open_gate();

        let samples = sine(0.5, 256);
        pipeline.process(&InputBuffer::new(&samples, 1, 44_100, 0));
        let series = events.power_levels.subscribe();
        pipeline.process(&InputBuffer::new(&samples, 1, 44_100, 256));
        let held = series.try_recv().unwrap();
        pipeline.process(&InputBuffer::new(&samples, 1, 44_100, 512));

        assert_eq!(held.len(), 2);
        assert_eq!(series.try_recv().unwrap().len(), 3);
        assert_eq!(pipeline.power_levels().len(), 3);

        pipeline.finish();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn stereo_input_downmixed_for_mono_file() {
        let (pipeline, _events) = pipeline();
        let (writer, written) = RecordingWriter::new();
        let handle = pipeline.begin(Box::new(writer), 1).unwrap();
        pipeline.open_gate();

        let samples = [0.5f32, 0.0, 0.5, 0.0];
        pipeline.process(&InputBuffer::new(&samples, 2, 44_100, 0));
        pipeline.finish();
        handle.join().unwrap().unwrap();

        assert_eq!(written.lock()[0], vec![pcm::to_i16(0.25); 2]);
    }

    #[test]
    fn raw_buffers_only_copied_for_subscribers() {
        let (pipeline, events) = pipeline();
        let (writer, _) = RecordingWriter::new();
        let handle = pipeline.begin(Box::new(writer), 1).unwrap();
        pipeline.open_gate();

        let samples = sine(0.1, 128);
        pipeline.process(&InputBuffer::new(&samples, 1, 44_100, 0));

        let buffers = events.buffers.subscribe();
        pipeline.process(&InputBuffer::new(&samples, 1, 44_100, 128));
        pipeline.finish();
        handle.join().unwrap().unwrap();

        let received: Vec<_> = buffers.try_iter().collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].sample_time, 128);
        assert_eq!(received[0].samples.len(), 128);
    }

    #[test]
    fn write_errors_are_published_and_capture_continues() {
        let (pipeline, events) = pipeline();
        let errors = events.errors.subscribe();
        let (writer, written) = RecordingWriter::failing_every(2);
        let handle = pipeline.begin(Box::new(writer), 1).unwrap();
        pipeline.open_gate();

        let samples = [0.0f32; 32];
        for i in 0..4 {
            pipeline.process(&InputBuffer::new(&samples, 1, 44_100, i * 32));
        }
        pipeline.finish();
        handle.join().unwrap().unwrap();

        assert_eq!(written.lock().len(), 2);
        assert_eq!(errors.try_iter().count(), 2);
        assert_eq!(pipeline.diagnostics().write_errors, 2);
        assert_eq!(pipeline.diagnostics().callbacks, 4);
    }

    #[test]
    fn meter_levels_only_in_meter_mode() {
        let (pipeline, _events) = pipeline();
        pipeline.open_gate();
        pipeline.push_meter_level(&[-40.0]);
        assert!(pipeline.power_levels().is_empty());

        pipeline.reconfigure(PowerConverter::default(), LevelSource::Meter);
        pipeline.push_meter_level(&[-40.0]);
        assert_eq!(pipeline.power_levels(), vec![0.5]);

        // Buffers no longer add levels.
        let samples = sine(0.5, 256);
        pipeline.process(&InputBuffer::new(&samples, 1, 44_100, 0));
        assert_eq!(pipeline.power_levels().len(), 1);
    }
}
