use std::sync::Arc;

use crate::models::audio_models::{InputBuffer, TapFormat};
use crate::models::error::RecorderError;

/// Callback invoked for every buffer delivered by the input tap.
///
/// Runs on the hardware callback thread. It must not block on I/O.
pub type TapCallback = Arc<dyn Fn(&InputBuffer<'_>) + Send + Sync + 'static>;

/// Per-channel hardware level meter, read by the ticker in meter mode.
pub trait LevelMeter: Send + Sync {
    /// Current average power per channel in dB (0 dB = full scale).
    fn channel_levels_db(&self) -> Vec<f32>;
}

/// Microphone input with an installable tap.
///
/// Implemented by:
/// - `CpalInputProvider` (desktop)
/// - `ManualInput` (tests)
pub trait InputProvider: Send {
    /// Whether an input device is present.
    fn is_available(&self) -> bool;

    /// Install the tap and start the input engine.
    ///
    /// Buffers must arrive as interleaved f32 in `format`, with monotonically
    /// increasing `sample_time`.
    fn install_tap(&mut self, format: TapFormat, callback: TapCallback) -> Result<(), RecorderError>;

    /// Remove the tap and stop the engine. At most one buffer that was
    /// already in flight may still be delivered after this returns.
    fn remove_tap(&mut self) -> Result<(), RecorderError>;

    /// Hardware meter, if the input provides one.
    fn meter(&self) -> Option<Arc<dyn LevelMeter>> {
        None
    }
}
