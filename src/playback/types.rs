//! Playback type definitions

use std::fmt;

use serde::Serialize;

use crate::song::Note;

/// Playback state machine.
///
/// ```text
/// Idle -> CountingDown -> Playing <-> Paused -> Finished
///   ^          |             |          |          |
///   +----------+---- stop ---+----------+----------+
/// ```
///
/// `Error` is entered when the dispatch loop fails unexpectedly. Like
/// `Finished`, it allows a fresh `play()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackState {
    Idle,
    /// Pre-roll before the first chord
    CountingDown,
    Playing,
    Paused,
    Finished,
    Error,
}

impl PlaybackState {
    /// States from which `play()` starts a new session
    pub fn can_play(self) -> bool {
        matches!(
            self,
            PlaybackState::Idle | PlaybackState::Finished | PlaybackState::Error
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::CountingDown => "counting down",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Finished => "finished",
            PlaybackState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Notes that start at the same instant.
///
/// `notes` is never empty and every note in it has `time == self.time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChordGroup {
    /// Offset from the start of the song in milliseconds
    pub time: u64,
    pub notes: Vec<Note>,
}

impl ChordGroup {
    /// More than one key at once
    pub fn is_chord(&self) -> bool {
        self.notes.len() > 1
    }

    pub fn keys(&self) -> Vec<&str> {
        self.notes.iter().map(|note| note.key.as_str()).collect()
    }
}
