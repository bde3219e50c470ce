//! # Error Types
//!
//! This module defines all error types for keyscore.
//!
//! None of these errors crash playback. Song and key level failures are
//! logged and skipped, invalid control operations are reported back to the
//! caller and ignored, and a panic inside the dispatch loop is converted into a
//! [`PlaybackError`] that moves the player into its error state.
//!
//! ## Error Types
//! - [`ParseError`] - Song loading failures and per-song warnings
//! - [`DispatchError`] - Per-key failures while firing a chord
//! - [`StateError`] - Control operations issued in the wrong playback state
//! - [`PlaybackError`] - Unexpected failure that escaped the dispatch loop
//! - [`ConfigError`] - Invalid player configuration
//! - [`Error`] - Umbrella type for hosts that want a single error
//!
//! ## Usage
//! ```rust
//! use keyscore::{parse_song, ParseError};
//!
//! match parse_song("{ not json", "broken.json") {
//!     Ok(parsed) => println!("Loaded {}", parsed.song.name),
//!     Err(ParseError::Malformed { path, message }) => {
//!         eprintln!("{} is not a song: {}", path, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

use crate::playback::PlaybackState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The song source does not exist.
    #[error("Song not found: {path}")]
    NotFound { path: String },

    /// The song source exists but could not be read or is not valid JSON.
    ///
    /// # Example
    /// ```
    /// # use keyscore::ParseError;
    /// let err = ParseError::Malformed {
    ///     path: "song.json".to_string(),
    ///     message: "expected value at line 1 column 1".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Malformed song song.json: expected value at line 1 column 1");
    /// ```
    #[error("Malformed song {path}: {message}")]
    Malformed { path: String, message: String },

    /// A `songNotes` entry missing its key or time. Recorded as a warning;
    /// the entry is dropped and the rest of the song loads.
    #[error("Invalid note entry #{index}: {reason}")]
    InvalidNoteEntry { index: usize, reason: String },

    /// A top-level field with an unusable value. Recorded as a warning; the
    /// field falls back to its default.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The document has no `songNotes` array. Recorded as a warning; the song
    /// loads with zero notes.
    #[error("No 'songNotes' found in song data")]
    MissingNotes,
}

impl ParseError {
    /// Warnings are recorded alongside a successfully parsed song; the other
    /// variants prevent the song from loading at all.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ParseError::InvalidNoteEntry { .. }
                | ParseError::InvalidField { .. }
                | ParseError::MissingNotes
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Unknown key mapping for: {key}")]
    UnmappedKey { key: String },

    #[error("Error pressing key {symbol} (from {key}): {message}")]
    PressFailure {
        key: String,
        symbol: String,
        message: String,
    },

    #[error("Timed out pressing key {symbol} (from {key})")]
    PressTimeout { key: String, symbol: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("No song selected")]
    NoSongSelected,

    /// # Example
    /// ```
    /// # use keyscore::{PlaybackState, StateError};
    /// let err = StateError::InvalidTransition {
    ///     operation: "pause",
    ///     state: PlaybackState::Idle,
    /// };
    /// assert_eq!(err.to_string(), "Cannot pause while idle");
    /// ```
    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: PlaybackState,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("Unexpected playback failure: {0}")]
    Unexpected(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid key id '{0}', expected <instrument>Key<position> such as 1Key0")]
    InvalidKeyId(String),
}

/// Umbrella error for hosts such as the command line front end.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
