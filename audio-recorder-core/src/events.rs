//! Per-category event channels.
//!
//! Every category has its own list of unbounded crossbeam senders, so a slow
//! subscriber of one category never delays another and the producer never
//! blocks. Subscribers whose receiver has been dropped are pruned on the
//! next publish.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::models::audio_models::CapturedBuffer;
use crate::models::error::{PlaybackError, RecorderError};
use crate::models::recording_result::RecordingResult;
use crate::models::state::{PlaybackState, RecordingState};
use crate::playback::controller::PlaybackProgress;

/// Fan-out of one event category to any number of receivers.
pub struct EventChannel<T> {
    senders: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Register a new receiver. Events published before this call are not replayed.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = unbounded();
        self.senders.lock().push(tx);
        rx
    }

    pub fn has_subscribers(&self) -> bool {
        !self.senders.lock().is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().len()
    }

    pub(crate) fn publish(&self, event: T) {
        let mut senders = self.senders.lock();
        match senders.len() {
            0 => {}
            1 => {
                if senders[0].send(event).is_err() {
                    senders.clear();
                }
            }
            _ => senders.retain(|tx| tx.send(event.clone()).is_ok()),
        }
    }
}

impl<T: Clone> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Observable streams of a recorder.
#[derive(Default)]
pub struct RecorderEvents {
    pub state: EventChannel<RecordingState>,
    /// Elapsed time as `MM:SS`, one per accepted buffer.
    pub elapsed: EventChannel<String>,
    /// Full power series after every change, one shared snapshot per event.
    pub power_levels: EventChannel<Arc<[f32]>>,
    /// Copies of accepted tap buffers. Only allocated while someone listens.
    pub buffers: EventChannel<Arc<CapturedBuffer>>,
    /// Elapsed seconds from the ticker.
    pub time_updates: EventChannel<f64>,
    pub finished: EventChannel<RecordingResult>,
    pub errors: EventChannel<RecorderError>,
}

/// Observable streams of a playback controller.
#[derive(Default)]
pub struct PlaybackEvents {
    pub state: EventChannel<PlaybackState>,
    pub progress: EventChannel<PlaybackProgress>,
    pub errors: EventChannel<PlaybackError>,
}
