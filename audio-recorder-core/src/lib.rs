//! # audio-recorder-core
//!
//! Platform-agnostic voice recording and playback core library.
//!
//! Provides the recorder state machine, the real-time buffer pipeline
//! (power levels, elapsed time, file writing, fan-out), playback control and
//! cross-player coordination. Platform backends (desktop: cpal + rodio)
//! implement the collaborator traits and plug into the generic `Recorder`
//! and `PlaybackController`.
//!
//! ## Architecture
//!
//! ```text
//! audio-recorder-core (this crate)
//! ├── traits/       ← InputProvider, SessionGateway, PermissionGate, PathResolver, PlayerFactory, CuePlayer
//! ├── models/       ← RecorderError, RecordingState, RecorderConfiguration, OutputFormat, RecordingSession, etc.
//! ├── processing/   ← power conversion, PCM helpers, elapsed clock, MM:SS formatting
//! ├── session/      ← Recorder (state machine), BufferPipeline, Ticker
//! ├── playback/     ← PlaybackController, PlaybackCoordinator
//! ├── storage/      ← WAV/FLAC writers, file moves + checksum, metadata, duration probe
//! └── events        ← per-category event channels
//! ```

pub mod events;
pub mod models;
pub mod playback;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for convenience.
pub use events::{EventChannel, PlaybackEvents, RecorderEvents};
pub use models::audio_models::{
    CapturedBuffer, DataSource, DeviceDescriptor, InputBuffer, Orientation, PipelineDiagnostics, RecordingOption,
    SessionCategory, SessionMode, SessionOptions, TapFormat,
};
pub use models::config::{LevelSource, PlaybackConfiguration, RecorderConfiguration};
pub use models::error::{PlaybackError, RecorderError, SessionError};
pub use models::format::{AudioSettings, OutputFormat};
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::session::{FileNameOption, RecordingSession};
pub use models::state::{PlaybackState, RecordingState};
pub use playback::controller::{PlaybackController, PlaybackProgress};
pub use playback::coordinator::{CoordinationMessage, PlaybackCoordinator};
pub use processing::power::{ChannelPolicy, PowerCalibration, PowerConverter};
pub use session::recorder::Recorder;
pub use storage::writer::{AudioFileWriter, DefaultEncoderFactory, EncoderFactory};
pub use traits::audio_cue::{CueKind, CuePlayer, SilentCue};
pub use traits::input_provider::{InputProvider, LevelMeter, TapCallback};
pub use traits::path_resolver::{DirectoryPathResolver, PathResolver};
pub use traits::permission::{PermissionGate, StaticPermission};
pub use traits::player::{FinishedCallback, PlayerBackend, PlayerFactory};
pub use traits::session_gateway::{NullSessionGateway, SessionGateway};
