//! Player notifications
//!
//! The player never calls back into the host. Instead every subscriber gets
//! its own channel and receives a copy of each [`PlayerEvent`], so a UI thread
//! can drain events at its own pace.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::types::PlaybackState;

/// Human-facing status line.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Selected { name: String, chords: usize },
    /// Seconds left before playback starts
    CountingDown(u32),
    Playing,
    Paused,
    Stopped,
    Finished,
    /// Playback aborted; carries the failure detail for logs
    Error(String),
    /// A control operation was ignored
    Warning(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Selected { name, chords } => {
                write!(f, "Selected: {} ({} chords detected)", name, chords)
            }
            Status::CountingDown(seconds) => write!(f, "Starting in {}...", seconds),
            Status::Playing => write!(f, "Playing..."),
            Status::Paused => write!(f, "Paused"),
            Status::Stopped => write!(f, "Stopped"),
            Status::Finished => write!(f, "Finished"),
            Status::Error(_) => write!(f, "Error occurred during playback"),
            Status::Warning(message) => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A chord at `current_ms` has been dispatched. `total_ms` is the time of
    /// the song's last chord.
    Progress { current_ms: u64, total_ms: u64 },
    StatusChanged(Status),
    SongFinished,
    StateChanged(PlaybackState),
}

/// Fan-out of events to every live subscriber
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<Sender<PlayerEvent>>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        receiver
    }

    /// Subscribers whose receiver was dropped are forgotten
    pub(crate) fn emit(&self, event: PlayerEvent) {
        log::trace!("event: {:?}", event);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    pub(crate) fn status(&self, status: Status) {
        self.emit(PlayerEvent::StatusChanged(status));
    }
}
