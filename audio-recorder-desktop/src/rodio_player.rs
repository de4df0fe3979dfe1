//! rodio playback backend.
//!
//! `rodio::OutputStream` is not `Send`, so the factory keeps it alive on a
//! dedicated `audio-output` thread and hands every player a cloned
//! [`OutputStreamHandle`]. Each player decodes its file into a fresh [`Sink`]
//! whenever playback (re)starts at a new offset, followed by an
//! [`EmptyCallback`] that reports the natural end of the file. Stopping or
//! seeking bumps a generation counter so callbacks of discarded sinks are
//! ignored.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};
use rodio::source::EmptyCallback;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use audio_recorder_core::models::error::PlaybackError;
use audio_recorder_core::storage::probe::probe_duration;
use audio_recorder_core::traits::player::{FinishedCallback, PlayerBackend, PlayerFactory};

/// Opens [`RodioPlayer`]s on the default output device.
pub struct RodioPlayerFactory {
    output: OutputStreamHandle,
    shutdown: Option<Sender<()>>,
    host: Option<thread::JoinHandle<()>>,
}

impl RodioPlayerFactory {
    pub fn new() -> Result<Self, PlaybackError> {
        let (ready_tx, ready_rx) = bounded::<Result<OutputStreamHandle, PlaybackError>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let host = thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(PlaybackError::OutputUnavailable(e.to_string())));
                }
            })
            .map_err(|e| PlaybackError::OutputUnavailable(format!("failed to spawn output thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(output)) => Ok(Self {
                output,
                shutdown: Some(shutdown_tx),
                host: Some(host),
            }),
            Ok(Err(e)) => {
                let _ = host.join();
                Err(e)
            }
            Err(_) => {
                let _ = host.join();
                Err(PlaybackError::OutputUnavailable("output thread exited".into()))
            }
        }
    }

    /// Handle to the shared output stream, e.g. for cue playback.
    pub fn output_handle(&self) -> OutputStreamHandle {
        self.output.clone()
    }
}

impl PlayerFactory for RodioPlayerFactory {
    fn open(&self, path: &Path, on_finished: FinishedCallback) -> Result<Box<dyn PlayerBackend>, PlaybackError> {
        let duration = probe_duration(path)?;
        log::debug!("Opened {} ({:.2}s)", path.display(), duration);
        Ok(Box::new(RodioPlayer {
            output: self.output.clone(),
            path: path.to_path_buf(),
            duration,
            sink: None,
            on_finished: Arc::new(on_finished),
            generation: Arc::new(AtomicU64::new(0)),
            clock: PlayClock::default(),
        }))
    }
}

impl Drop for RodioPlayerFactory {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(host) = self.host.take() {
            let _ = host.join();
        }
    }
}

/// Playback position derived from the start offset and wall-clock time.
#[derive(Debug, Default)]
struct PlayClock {
    base: f64,
    started: Option<Instant>,
}

impl PlayClock {
    fn position(&self, duration: f64) -> f64 {
        let position = match self.started {
            Some(started) => self.base + started.elapsed().as_secs_f64(),
            None => self.base,
        };
        position.min(duration)
    }

    fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn hold(&mut self, duration: f64) {
        self.base = self.position(duration);
        self.started = None;
    }

    fn set(&mut self, secs: f64) {
        self.base = secs;
        self.started = None;
    }

    fn is_running(&self) -> bool {
        self.started.is_some()
    }
}

pub struct RodioPlayer {
    output: OutputStreamHandle,
    path: PathBuf,
    duration: f64,
    sink: Option<Sink>,
    on_finished: Arc<FinishedCallback>,
    generation: Arc<AtomicU64>,
    clock: PlayClock,
}

impl RodioPlayer {
    fn build_sink(&self) -> Result<Sink, PlaybackError> {
        let file = File::open(&self.path).map_err(|_| PlaybackError::FileNotFound(self.path.clone()))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::DecodeFailed(e.to_string()))?;
        let sink = Sink::try_new(&self.output).map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;

        sink.append(source.skip_duration(Duration::from_secs_f64(self.clock.base.max(0.0))));

        let expected = self.generation.load(Ordering::SeqCst);
        let generation = Arc::clone(&self.generation);
        let on_finished = Arc::clone(&self.on_finished);
        sink.append(EmptyCallback::<f32>::new(Box::new(move || {
            if generation.load(Ordering::SeqCst) == expected {
                on_finished();
            }
        })));
        Ok(sink)
    }

    fn discard_sink(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

impl PlayerBackend for RodioPlayer {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.clock.position(self.duration)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if let Some(sink) = &self.sink {
            sink.play();
        } else {
            let sink = self.build_sink()?;
            self.sink = Some(sink);
        }
        self.clock.start();
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        self.clock.hold(self.duration);
    }

    fn stop(&mut self) {
        self.discard_sink();
        self.clock.hold(self.duration);
    }

    fn seek(&mut self, secs: f64) -> Result<(), PlaybackError> {
        let resume = self.clock.is_running();
        self.discard_sink();
        self.clock.set(secs.clamp(0.0, self.duration));
        if resume {
            self.play()?;
        }
        Ok(())
    }
}

impl Drop for RodioPlayer {
    fn drop(&mut self) {
        self.discard_sink();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn held_clock_does_not_advance() {
        let mut clock = PlayClock::default();
        clock.set(1.5);
        thread::sleep(Duration::from_millis(20));
        assert_abs_diff_eq!(clock.position(10.0), 1.5);
        assert!(!clock.is_running());
    }

    #[test]
    fn running_clock_advances_from_its_offset() {
        let mut clock = PlayClock::default();
        clock.set(2.0);
        clock.start();
        thread::sleep(Duration::from_millis(30));

        let position = clock.position(10.0);
        assert!(position >= 2.03 && position < 3.0, "position = {}", position);

        clock.hold(10.0);
        let held = clock.position(10.0);
        thread::sleep(Duration::from_millis(20));
        assert_abs_diff_eq!(clock.position(10.0), held);
    }

    #[test]
    fn stopped_clock_keeps_position_until_seek() {
        let mut clock = PlayClock::default();
        clock.set(4.0);
        clock.start();
        thread::sleep(Duration::from_millis(20));

        // What `stop` does to the clock.
        clock.hold(10.0);
        let stopped_at = clock.position(10.0);
        assert!(stopped_at >= 4.02, "position = {}", stopped_at);
        assert!(!clock.is_running());

        // The controller rewinds with an explicit seek.
        clock.set(0.0);
        assert_abs_diff_eq!(clock.position(10.0), 0.0);
    }

    #[test]
    fn position_never_exceeds_duration() {
        let mut clock = PlayClock::default();
        clock.set(9.99);
        clock.start();
        thread::sleep(Duration::from_millis(30));
        assert_abs_diff_eq!(clock.position(10.0), 10.0);
    }
}
