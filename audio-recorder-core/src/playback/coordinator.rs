//! Cross-player coordination.
//!
//! Any number of playback controllers (and recorders) share one
//! [`PlaybackCoordinator`], injected at construction. Messages are
//! fire-and-forget: every live subscriber gets its own copy on an unbounded
//! channel, and subscribers whose receiver is gone are pruned.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

pub type SubscriberId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinationMessage {
    /// Stop whichever player has this file loaded.
    StopTarget(PathBuf),
    /// Stop every player.
    StopAll,
}

/// A message plus the subscriber that sent it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub origin: Option<SubscriberId>,
    pub message: CoordinationMessage,
}

pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: Receiver<Envelope>,
}

#[derive(Default)]
pub struct PlaybackCoordinator {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriberId, Sender<Envelope>)>>,
}

impl PlaybackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();
        self.subscribers.lock().push((id, tx));
        Subscription { id, receiver: rx }
    }

    /// Remove a subscriber. Its receiver disconnects once drained.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.lock().retain(|(sid, _)| *sid != id);
    }

    pub fn publish(&self, envelope: Envelope) {
        log::debug!("Coordination message {:?} from {:?}", envelope.message, envelope.origin);
        self.subscribers
            .lock()
            .retain(|(_, tx)| tx.send(envelope.clone()).is_ok());
    }

    /// Ask every player to stop. `origin` is skipped by the player that sent it.
    pub fn stop_all(&self, origin: Option<SubscriberId>) {
        self.publish(Envelope {
            origin,
            message: CoordinationMessage::StopAll,
        });
    }

    /// Ask the player that has `path` loaded to stop.
    pub fn stop_target(&self, path: &Path) {
        self.publish(Envelope {
            origin: None,
            message: CoordinationMessage::StopTarget(path.to_path_buf()),
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
