use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::events::PlaybackEvents;
use crate::models::config::PlaybackConfiguration;
use crate::models::error::PlaybackError;
use crate::models::state::PlaybackState;
use crate::playback::coordinator::{CoordinationMessage, Envelope, PlaybackCoordinator, SubscriberId};
use crate::processing::time_format::{format_elapsed, format_remaining};
use crate::session::ticker::Ticker;
use crate::traits::player::{FinishedCallback, PlayerBackend, PlayerFactory};

/// Position snapshot published to progress subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackProgress {
    /// `current / duration`, clamped to `[0, 1]`.
    pub progress: f64,
    pub current_secs: f64,
    pub duration_secs: f64,
    /// `MM:SS`
    pub current_time: String,
    /// `-MM:SS`
    pub remaining_time: String,
}

impl PlaybackProgress {
    pub fn new(current_secs: f64, duration_secs: f64) -> Self {
        let progress = if duration_secs > 0.0 {
            (current_secs / duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            progress,
            current_secs,
            duration_secs,
            current_time: format_elapsed(current_secs),
            remaining_time: format_remaining((duration_secs - current_secs).max(0.0)),
        }
    }

    /// Start of the file: zero progress, full time remaining.
    pub fn reset(duration_secs: f64) -> Self {
        Self::new(0.0, duration_secs)
    }
}

struct PlayerInner {
    path: PathBuf,
    state: PlaybackState,
    backend: Option<Box<dyn PlayerBackend>>,
    /// Bumped on every load so finish signals from older handles are ignored.
    generation: u64,
    last_progress: PlaybackProgress,
}

/// Shared between the controller, its listener thread and its ticker.
struct PlayerCore {
    inner: Mutex<PlayerInner>,
    ticker: Mutex<Option<Ticker>>,
    events: PlaybackEvents,
    factory: Arc<dyn PlayerFactory>,
    config: PlaybackConfiguration,
    finished_tx: Sender<u64>,
}

impl PlayerCore {
    fn load(&self, inner: &mut PlayerInner) -> Result<(), PlaybackError> {
        if inner.backend.is_some() {
            return Ok(());
        }
        inner.generation += 1;
        let generation = inner.generation;
        let tx = self.finished_tx.clone();
        let on_finished: FinishedCallback = Box::new(move || {
            let _ = tx.send(generation);
        });

        let backend = self.factory.open(&inner.path, on_finished)?;
        log::debug!("Loaded {} ({:.2}s)", inner.path.display(), backend.duration());
        inner.backend = Some(backend);
        Ok(())
    }

    fn unload(&self, inner: &mut PlayerInner) {
        if let Some(mut backend) = inner.backend.take() {
            backend.stop();
        }
        inner.generation += 1;
    }

    fn set_state(&self, inner: &mut PlayerInner, state: PlaybackState) {
        if inner.state != state {
            inner.state = state;
            self.events.state.publish(state);
        }
    }

    fn publish_progress(&self, inner: &mut PlayerInner, progress: PlaybackProgress) {
        inner.last_progress = progress.clone();
        self.events.progress.publish(progress);
    }

    /// Stop output and seek back to the start.
    fn rewind(inner: &mut PlayerInner) {
        if let Some(backend) = inner.backend.as_mut() {
            backend.stop();
            if let Err(e) = backend.seek(0.0) {
                log::warn!("Failed to rewind {}: {}", inner.path.display(), e);
            }
        }
    }

    fn duration(inner: &PlayerInner) -> f64 {
        inner.backend.as_ref().map(|b| b.duration()).unwrap_or(0.0)
    }

    fn fail(&self, error: PlaybackError) -> PlaybackError {
        log::error!("Playback failed: {}", error);
        self.events.errors.publish(error.clone());
        error
    }

    fn configure(&self) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock();
        self.load(&mut inner).map_err(|e| self.fail(e))?;
        let duration = Self::duration(&inner);
        self.publish_progress(&mut inner, PlaybackProgress::reset(duration));
        Ok(())
    }

    fn play(self: &Arc<Self>) -> Result<(), PlaybackError> {
        {
            let mut inner = self.inner.lock();
            if inner.state.is_playing() {
                return Ok(());
            }
            self.load(&mut inner).map_err(|e| self.fail(e))?;
            if let Some(backend) = inner.backend.as_mut() {
                backend.play().map_err(|e| self.fail(e))?;
            }
            self.set_state(&mut inner, PlaybackState::Playing);
            log::info!("Playing {}", inner.path.display());
        }
        self.start_ticker()
    }

    fn pause(&self) {
        let mut inner = self.inner.lock();
        if !inner.state.is_playing() {
            return;
        }
        if let Some(backend) = inner.backend.as_mut() {
            backend.pause();
        }
        self.set_state(&mut inner, PlaybackState::Paused);
    }

    fn stop(&self) {
        self.stop_ticker();
        let mut inner = self.inner.lock();
        Self::rewind(&mut inner);
        self.set_state(&mut inner, PlaybackState::Stopped);
        let duration = Self::duration(&inner);
        self.publish_progress(&mut inner, PlaybackProgress::reset(duration));
    }

    /// Seek by `delta` seconds, clamped into `[0, duration]`.
    fn skip(&self, delta: f64) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock();
        let Some(backend) = inner.backend.as_mut() else {
            return Ok(());
        };
        let duration = backend.duration();
        let target = (backend.current_time() + delta).clamp(0.0, duration);
        backend.seek(target)?;
        let current = backend.current_time();
        self.publish_progress(&mut inner, PlaybackProgress::new(current, duration));
        Ok(())
    }

    fn reset_playback(&self) -> Result<(), PlaybackError> {
        self.stop();
        let mut inner = self.inner.lock();
        self.unload(&mut inner);
        self.load(&mut inner).map_err(|e| self.fail(e))?;
        let duration = Self::duration(&inner);
        self.publish_progress(&mut inner, PlaybackProgress::reset(duration));
        Ok(())
    }

    fn set_file(&self, path: PathBuf) {
        self.stop();
        let mut inner = self.inner.lock();
        self.unload(&mut inner);
        inner.path = path;
        self.publish_progress(&mut inner, PlaybackProgress::reset(0.0));
    }

    fn tick(&self) {
        let mut inner = self.inner.lock();
        if !inner.state.is_playing() {
            return;
        }
        let Some(backend) = inner.backend.as_ref() else {
            return;
        };
        let progress = PlaybackProgress::new(backend.current_time(), backend.duration());
        self.publish_progress(&mut inner, progress);
    }

    /// Natural end of file. Returns whether a delayed reset is due.
    fn handle_finished(&self, generation: u64) -> bool {
        let finished = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || !inner.state.is_playing() {
                return false;
            }
            let duration = Self::duration(&inner);
            Self::rewind(&mut inner);
            self.set_state(&mut inner, PlaybackState::Stopped);
            self.publish_progress(&mut inner, PlaybackProgress::new(duration, duration));
            log::info!("Finished {}", inner.path.display());
            true
        };
        self.stop_ticker();
        finished
    }

    fn reset_after_finish(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation == generation && inner.state.is_stopped() {
            let duration = Self::duration(&inner);
            self.publish_progress(&mut inner, PlaybackProgress::reset(duration));
        }
    }

    fn handle_coordination(&self, me: SubscriberId, envelope: Envelope) {
        if envelope.origin == Some(me) {
            return;
        }
        let matches = match &envelope.message {
            CoordinationMessage::StopAll => true,
            CoordinationMessage::StopTarget(path) => self.inner.lock().path == *path,
        };
        if matches && !self.inner.lock().state.is_stopped() {
            self.stop();
        }
    }

    fn start_ticker(self: &Arc<Self>) -> Result<(), PlaybackError> {
        let mut slot = self.ticker.lock();
        if slot.as_ref().map(|t| t.is_running()).unwrap_or(false) {
            return Ok(());
        }
        let weak: Weak<PlayerCore> = Arc::downgrade(self);
        let ticker = Ticker::start("playback-ticker", self.config.tick_interval(), move || {
            if let Some(core) = weak.upgrade() {
                core.tick();
            }
        })
        .map_err(|e| PlaybackError::OutputUnavailable(format!("failed to start ticker: {}", e)))?;
        *slot = Some(ticker);
        Ok(())
    }

    /// Never called with `inner` locked: the tick takes that lock.
    fn stop_ticker(&self) {
        let ticker = self.ticker.lock().take();
        if let Some(mut ticker) = ticker {
            ticker.stop();
        }
    }
}

/// Player for one audio file.
///
/// Subscribes to the coordination bus at construction and unsubscribes on
/// drop. `play()` broadcasts stop-all first so only one controller is
/// audible at a time.
pub struct PlaybackController {
    core: Arc<PlayerCore>,
    coordinator: Arc<PlaybackCoordinator>,
    id: SubscriberId,
    shutdown: Option<Sender<()>>,
    listener: Option<JoinHandle<()>>,
}

impl PlaybackController {
    pub fn new(
        path: impl Into<PathBuf>,
        factory: Arc<dyn PlayerFactory>,
        coordinator: Arc<PlaybackCoordinator>,
        config: PlaybackConfiguration,
    ) -> Result<Self, PlaybackError> {
        config.validate().map_err(PlaybackError::OutputUnavailable)?;

        let (finished_tx, finished_rx) = unbounded();
        let core = Arc::new(PlayerCore {
            inner: Mutex::new(PlayerInner {
                path: path.into(),
                state: PlaybackState::Stopped,
                backend: None,
                generation: 0,
                last_progress: PlaybackProgress::reset(0.0),
            }),
            ticker: Mutex::new(None),
            events: PlaybackEvents::default(),
            factory,
            config,
            finished_tx,
        });

        let subscription = coordinator.subscribe();
        let id = subscription.id;
        let (shutdown, shutdown_rx) = unbounded::<()>();
        let listener_core = Arc::clone(&core);
        let listener = thread::Builder::new()
            .name("playback-listener".into())
            .spawn(move || listen(listener_core, id, subscription.receiver, finished_rx, shutdown_rx));

        let listener = match listener {
            Ok(handle) => handle,
            Err(e) => {
                coordinator.unsubscribe(id);
                return Err(PlaybackError::OutputUnavailable(format!(
                    "failed to spawn listener thread: {}",
                    e
                )));
            }
        };

        Ok(Self {
            core,
            coordinator,
            id,
            shutdown: Some(shutdown),
            listener: Some(listener),
        })
    }

    /// Open the file now and publish its initial progress. Decode errors surface here.
    pub fn configure(&self) -> Result<(), PlaybackError> {
        self.core.configure()
    }

    /// Start or resume. No-op while playing. Stops every other controller first.
    pub fn play(&self) -> Result<(), PlaybackError> {
        if self.state().is_playing() {
            return Ok(());
        }
        self.coordinator.stop_all(Some(self.id));
        self.core.play()
    }

    /// Pause. No-op unless playing.
    pub fn pause(&self) {
        self.core.pause();
    }

    /// Stop and rewind to the start. Idempotent.
    pub fn stop(&self) {
        self.core.stop();
    }

    pub fn forward(&self, secs: f64) -> Result<(), PlaybackError> {
        self.core.skip(secs.abs())
    }

    pub fn rewind(&self, secs: f64) -> Result<(), PlaybackError> {
        self.core.skip(-secs.abs())
    }

    /// Stop and reload the file, e.g. after it was re-recorded.
    pub fn reset_playback(&self) -> Result<(), PlaybackError> {
        self.core.reset_playback()
    }

    /// Point this controller at another file. Stops playback.
    pub fn set_file(&self, path: impl Into<PathBuf>) {
        self.core.set_file(path.into());
    }

    pub fn state(&self) -> PlaybackState {
        self.core.inner.lock().state
    }

    /// Last published progress snapshot.
    pub fn progress(&self) -> PlaybackProgress {
        self.core.inner.lock().last_progress.clone()
    }

    pub fn current_time(&self) -> f64 {
        let inner = self.core.inner.lock();
        inner.backend.as_ref().map(|b| b.current_time()).unwrap_or(0.0)
    }

    pub fn duration(&self) -> f64 {
        PlayerCore::duration(&self.core.inner.lock())
    }

    pub fn file_path(&self) -> PathBuf {
        self.core.inner.lock().path.clone()
    }

    pub fn events(&self) -> &PlaybackEvents {
        &self.core.events
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    pub fn is_playing_file(&self, path: &Path) -> bool {
        let inner = self.core.inner.lock();
        inner.state.is_playing() && inner.path == path
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.coordinator.unsubscribe(self.id);
        self.shutdown.take();
        if let Some(handle) = self.listener.take() {
            let _ = handle.join();
        }
        self.core.stop_ticker();
        let mut inner = self.core.inner.lock();
        self.core.unload(&mut inner);
    }
}

/// Listener loop: coordination messages, finish signals and the delayed reset.
fn listen(
    core: Arc<PlayerCore>,
    id: SubscriberId,
    bus: Receiver<Envelope>,
    finished: Receiver<u64>,
    shutdown: Receiver<()>,
) {
    const IDLE: Duration = Duration::from_secs(3600);
    let reset_delay = core.config.finish_reset_delay();
    let mut pending_reset: Option<(Instant, u64)> = None;

    loop {
        let timeout = pending_reset
            .map(|(at, _)| at.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE);

        select! {
            recv(bus) -> msg => match msg {
                Ok(envelope) => core.handle_coordination(id, envelope),
                Err(_) => break,
            },
            recv(finished) -> msg => match msg {
                Ok(generation) => {
                    if core.handle_finished(generation) {
                        pending_reset = Some((Instant::now() + reset_delay, generation));
                    }
                }
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
            default(timeout) => {
                if let Some((_, generation)) = pending_reset.take() {
                    core.reset_after_finish(generation);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{wait_until, FakePlayerFactory};

    fn config() -> PlaybackConfiguration {
        PlaybackConfiguration {
            tick_interval_ms: 10,
            finish_reset_delay_ms: 30,
        }
    }

    fn controller(
        path: &str,
        duration: f64,
        bus: &Arc<PlaybackCoordinator>,
    ) -> (PlaybackController, FakePlayerFactory) {
        let factory = FakePlayerFactory::new(duration);
        let controller = PlaybackController::new(
            path,
            Arc::new(factory.clone()),
            Arc::clone(bus),
            config(),
        )
        .unwrap();
        (controller, factory)
    }

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn progress_snapshot_formatting() {
        let p = PlaybackProgress::new(65.0, 125.0);
        assert!((p.progress - 0.52).abs() < 1e-9);
        assert_eq!(p.current_time, "01:05");
        assert_eq!(p.remaining_time, "-01:00");

        assert_eq!(PlaybackProgress::new(5.0, 0.0).progress, 0.0);
        assert_eq!(PlaybackProgress::new(12.0, 10.0).progress, 1.0);
        assert_eq!(PlaybackProgress::reset(30.0).remaining_time, "-00:30");
    }

    #[test]
    fn play_loads_lazily_and_ticks() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (player, factory) = controller("/tmp/a.wav", 10.0, &bus);
        let progress = player.events().progress.subscribe();
        assert_eq!(factory.open_count(), 0);

        player.play().unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);
        assert_eq!(factory.open_count(), 1);

        factory.set_position(2.5);
        assert!(wait_until(WAIT, || progress.try_iter().any(|p| p.current_secs == 2.5)));
        assert!((player.progress().progress - 0.25).abs() < 1e-9);

        player.play().unwrap();
        assert_eq!(factory.open_count(), 1);
    }

    #[test]
    fn open_failure_is_reported() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let factory = FakePlayerFactory::failing();
        let player = PlaybackController::new("/tmp/missing.wav", Arc::new(factory), Arc::clone(&bus), config()).unwrap();
        let errors = player.events().errors.subscribe();

        let err = player.play().unwrap_err();
        assert_eq!(err, PlaybackError::FileNotFound(PathBuf::from("/tmp/missing.wav")));
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(errors.try_recv(), Ok(err));
        assert!(player.configure().is_err());
    }

    #[test]
    fn pause_freezes_displayed_time() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (player, factory) = controller("/tmp/a.wav", 10.0, &bus);
        let progress = player.events().progress.subscribe();

        player.play().unwrap();
        player.pause();
        assert_eq!(player.state(), PlaybackState::Paused);
        assert!(!factory.is_playing());
        progress.try_iter().count();

        factory.set_position(7.0);
        thread::sleep(Duration::from_millis(60));
        assert!(progress.try_iter().all(|p| p.current_secs != 7.0));

        player.pause();
        assert_eq!(player.state(), PlaybackState::Paused);
    }

    #[test]
    fn stop_rewinds_and_resets_progress() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (player, factory) = controller("/tmp/a.wav", 30.0, &bus);

        player.play().unwrap();
        factory.set_position(12.0);
        player.stop();

        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(factory.position(), 0.0);
        assert_eq!(player.progress(), PlaybackProgress::reset(30.0));
        assert_eq!(player.progress().remaining_time, "-00:30");

        // Idempotent.
        player.stop();
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn forward_and_rewind_clamp_and_publish_immediately() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (player, factory) = controller("/tmp/a.wav", 10.0, &bus);
        player.configure().unwrap();
        let progress = player.events().progress.subscribe();

        factory.set_position(8.0);
        player.forward(5.0).unwrap();
        assert_eq!(factory.position(), 10.0);
        assert_eq!(progress.try_recv().map(|p| p.progress), Ok(1.0));

        player.rewind(3.0).unwrap();
        assert_eq!(factory.position(), 7.0);
        assert_eq!(progress.try_recv().map(|p| p.current_time), Ok("00:07".to_string()));

        player.rewind(20.0).unwrap();
        assert_eq!(factory.position(), 0.0);
        assert_eq!(progress.try_recv().map(|p| p.remaining_time), Ok("-00:10".to_string()));
    }

    #[test]
    fn natural_finish_publishes_full_then_zero() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (player, factory) = controller("/tmp/a.wav", 4.0, &bus);
        let states = player.events().state.subscribe();

        player.play().unwrap();
        let progress = player.events().progress.subscribe();
        factory.set_position(4.0);
        factory.finish();

        assert!(wait_until(WAIT, || player.state() == PlaybackState::Stopped));
        assert!(wait_until(WAIT, || player.progress().progress == 0.0));
        assert_eq!(factory.position(), 0.0);

        let finish_values: Vec<f64> = progress
            .try_iter()
            .filter(|p| p.progress == 1.0 || p.current_secs == 0.0)
            .map(|p| p.progress)
            .collect();
        assert_eq!(finish_values.last(), Some(&0.0));
        assert!(finish_values.contains(&1.0));
        assert_eq!(
            states.try_iter().collect::<Vec<_>>(),
            vec![PlaybackState::Playing, PlaybackState::Stopped]
        );
    }

    #[test]
    fn stale_finish_signal_is_ignored() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (player, factory) = controller("/tmp/a.wav", 4.0, &bus);

        player.play().unwrap();
        player.reset_playback().unwrap();
        assert_eq!(factory.open_count(), 2);
        player.play().unwrap();

        factory.finish_nth(0);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(player.state(), PlaybackState::Playing);
    }

    #[test]
    fn starting_one_player_stops_the_other() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (a, _fa) = controller("/tmp/a.wav", 10.0, &bus);
        let (b, _fb) = controller("/tmp/b.wav", 10.0, &bus);

        a.play().unwrap();
        b.play().unwrap();

        assert!(wait_until(WAIT, || a.state() == PlaybackState::Stopped));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(b.state(), PlaybackState::Playing);
    }

    #[test]
    fn stop_target_only_stops_matching_file() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (a, _fa) = controller("/tmp/a.wav", 10.0, &bus);
        let (b, _fb) = controller("/tmp/b.wav", 10.0, &bus);

        a.play().unwrap();
        b.core.play().unwrap();
        assert!(a.is_playing_file(Path::new("/tmp/a.wav")));

        bus.stop_target(Path::new("/tmp/b.wav"));

        assert!(wait_until(WAIT, || b.state() == PlaybackState::Stopped));
        assert_eq!(a.state(), PlaybackState::Playing);
    }

    #[test]
    fn set_file_switches_target() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (player, factory) = controller("/tmp/a.wav", 10.0, &bus);

        player.play().unwrap();
        player.set_file("/tmp/c.wav");

        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.file_path(), PathBuf::from("/tmp/c.wav"));
        player.play().unwrap();
        assert_eq!(factory.last_opened(), Some(PathBuf::from("/tmp/c.wav")));
    }

    #[test]
    fn drop_unsubscribes() {
        let bus = Arc::new(PlaybackCoordinator::new());
        let (player, _factory) = controller("/tmp/a.wav", 10.0, &bus);
        assert_eq!(bus.subscriber_count(), 1);

        player.play().unwrap();
        drop(player);

        assert_eq!(bus.subscriber_count(), 0);
    }
}
