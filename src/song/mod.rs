//! # Song Module
//!
//! Load structured song files into validated, time-ordered note sequences.
//!
//! ## Song Format
//! A song file is a JSON document, either a single object or an array whose
//! first element is the song object:
//!
//! ```json
//! [{
//!   "name": "Ode to Joy",
//!   "bpm": 120,
//!   "songNotes": [
//!     { "key": "1Key4", "time": 0 },
//!     { "key": "1Key9", "time": 0 },
//!     { "key": "1Key4", "time": 500 }
//!   ]
//! }]
//! ```
//!
//! Parsing is forgiving: bad note entries and missing fields are dropped or
//! defaulted and reported as warnings, so a partially broken song still plays.
//! Only a missing or unreadable file fails to load.
//!
//! ## Sub-modules
//! - `parser` - JSON document to [`Song`] conversion
//! - `library` - Batch loading with duplicate detection
//!
//! ## Example
//! ```rust
//! use keyscore::parse_song;
//!
//! let source = r#"{"name": "Two Notes", "songNotes": [
//!     {"key": "1Key2", "time": 250},
//!     {"key": "1Key0", "time": 0}
//! ]}"#;
//!
//! let parsed = parse_song(source, "two.json").unwrap();
//! assert_eq!(parsed.song.bpm, 120);
//! assert_eq!(parsed.song.notes[0].key, "1Key0");
//! assert!(parsed.warnings.is_empty());
//! ```

mod library;
mod parser;


use serde::Serialize;

pub use library::{LoadSummary, SongLibrary};
pub use parser::{load_song, parse_document, parse_song, ParsedSong, DEFAULT_BPM};

/// A single key event: which logical key to press, and when.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Note {
    /// Logical key identifier such as `1Key0`
    pub key: String,
    /// Offset from the start of the song in milliseconds
    pub time: u64,
}

impl Note {
    pub fn new(key: impl Into<String>, time: u64) -> Self {
        Self {
            key: key.into(),
            time,
        }
    }
}

/// A parsed song.
///
/// `notes` is always sorted by `time`. Notes sharing a timestamp form a chord
/// and keep the order they had in the source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub name: String,
    pub bpm: u32,
    pub notes: Vec<Note>,
    pub source_path: String,
}

impl Song {
    /// Build a song from notes in any order. Notes are stably sorted by time.
    pub fn new(name: impl Into<String>, bpm: u32, mut notes: Vec<Note>, source_path: impl Into<String>) -> Self {
        notes.sort_by_key(|note| note.time);
        Self {
            name: name.into(),
            bpm,
            notes,
            source_path: source_path.into(),
        }
    }

    /// Time of the last note, or 0 for an empty song.
    pub fn duration_ms(&self) -> u64 {
        self.notes.last().map_or(0, |note| note.time)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
