//! # audio-recorder-desktop
//!
//! Desktop backend for audio-recorder, built on cpal and rodio.
//!
//! Provides:
//! - `CpalInputProvider`: Default-microphone input tap with a per-channel level meter
//! - `CpalSessionGateway`: Device checks and input selection for the recorder
//! - `MicrophonePermission`: Microphone access check
//! - `RodioPlayerFactory`: File playback backend for `PlaybackController`
//! - `RodioCuePlayer`: Start/stop chimes
//! - `paths`: Scratch and persisted recording directories
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use audio_recorder_core::Recorder;
//! use audio_recorder_desktop::{default_path_resolver, CpalInputProvider, CpalSessionGateway, MicrophonePermission};
//!
//! let mut recorder = Recorder::new(
//!     CpalInputProvider::new(),
//!     CpalSessionGateway::new(),
//!     Arc::new(MicrophonePermission),
//!     Arc::new(default_path_resolver()),
//! );
//! recorder.record()?;
//! ```

pub mod cpal_input;
pub mod cues;
pub mod gateway;
pub mod paths;
pub mod permissions;
pub mod rodio_player;

pub use cpal_input::{CpalInputProvider, CpalLevelMeter};
pub use cues::RodioCuePlayer;
pub use gateway::CpalSessionGateway;
pub use paths::default_path_resolver;
pub use permissions::MicrophonePermission;
pub use rodio_player::{RodioPlayer, RodioPlayerFactory};
