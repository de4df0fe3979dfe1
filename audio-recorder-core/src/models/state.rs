use std::fmt;

use serde::{Deserialize, Serialize};

/// Recorder state machine.
///
/// State transitions:
/// ```text
///            record            pause
/// stopped ──────────→ recording ────→ paused
///    ↑                  │    ↑          │
///    │       stop       │    └─record───┘
///    └──────────────────┴───────stop────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Stopped,
    Recording,
    Paused,
}

/// Commands accepted by the recorder state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecorderCommand {
    Record,
    Pause,
    Stop,
    Delete,
}

impl RecordingState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Next state for `command`, or `None` when the command is a no-op in
    /// the current state.
    pub fn transition(self, command: RecorderCommand) -> Option<RecordingState> {
        match (self, command) {
            (Self::Stopped | Self::Paused, RecorderCommand::Record) => Some(Self::Recording),
            (Self::Recording, RecorderCommand::Pause) => Some(Self::Paused),
            (Self::Recording | Self::Paused, RecorderCommand::Stop | RecorderCommand::Delete) => {
                Some(Self::Stopped)
            }
            _ => None,
        }
    }
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Stopped
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Recording => write!(f, "recording"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Playback state of a single controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::Stopped
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
        }
    }
}
