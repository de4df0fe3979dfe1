use std::path::PathBuf;

use thiserror::Error;

use super::format::OutputFormat;

/// Errors reported by a [`SessionGateway`](crate::traits::session_gateway::SessionGateway).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session activation failed: {0}")]
    ActivationFailed(String),

    #[error("unable to select input {device}: {reason}")]
    InputSelectionFailed { device: String, reason: String },

    #[error("no input device available")]
    NoInputDevice,
}

/// Errors that can occur while configuring or running a recorder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("engine start failed: {0}")]
    EngineStartFailed(String),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(OutputFormat),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("operation not allowed while recording")]
    RecordingInProgress,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

/// Errors surfaced by a playback controller when a file cannot be played.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("audio file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to decode audio file: {0}")]
    DecodeFailed(String),

    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),
}
