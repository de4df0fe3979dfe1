use std::path::Path;

use crate::models::error::PlaybackError;

/// Called once when playback reaches the end of the file on its own.
///
/// Never called for `stop()`, `pause()` or seeks.
pub type FinishedCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// One loaded audio file on an output device.
///
/// Implemented by:
/// - `RodioPlayer` (desktop)
pub trait PlayerBackend: Send {
    /// Total length in seconds.
    fn duration(&self) -> f64;

    /// Current position in seconds.
    fn current_time(&self) -> f64;

    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    /// Stop output. The position is left as is; callers seek back explicitly.
    fn stop(&mut self);

    /// Move to `secs`, already clamped to `[0, duration]` by the caller.
    fn seek(&mut self, secs: f64) -> Result<(), PlaybackError>;
}

/// Opens files for playback.
pub trait PlayerFactory: Send + Sync {
    fn open(&self, path: &Path, on_finished: FinishedCallback) -> Result<Box<dyn PlayerBackend>, PlaybackError>;
}
