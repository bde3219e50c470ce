//! # Playback Module
//!
//! Turn a [`Song`](crate::Song) into real-time key presses.
//!
//! ## Pipeline
//! 1. **Select** - [`Player::select_song`] groups the song's notes into
//!    [`ChordGroup`]s once, up front
//! 2. **Countdown** - [`Player::play`] starts a session thread that announces
//!    each second of the configured pre-roll
//! 3. **Dispatch** - the session thread sleeps until each chord is due and
//!    hands it to the [`Dispatcher`], which presses all of its keys at once
//! 4. **Report** - progress and lifecycle [`PlayerEvent`]s go to every
//!    subscriber
//!
//! ## Sub-modules
//! - `types` - [`PlaybackState`] and [`ChordGroup`]
//! - `chords` - Grouping notes by start time
//! - `dispatcher` - Concurrent key presses with a bounded wait
//! - `countdown` - Cancellable pre-roll
//! - `session` - State shared between control calls and the session thread
//! - `events` - [`PlayerEvent`] fan-out
//! - `engine` - [`Player`], the state machine and dispatch loop
//!
//! ## State Machine
//!
//! | From | Operation | To |
//! |------|-----------|----|
//! | `Idle`, `Finished`, `Error` | `play()` | `CountingDown` |
//! | `CountingDown` | countdown completes | `Playing` |
//! | `Playing` | `pause()` | `Paused` |
//! | `Paused` | `pause()` | `Playing` |
//! | `Playing` | last chord dispatched | `Finished` |
//! | any | `stop()` | `Idle` |
//! | `Playing` | dispatch loop panics | `Error` |
//!
//! Operations outside this table are rejected with a
//! [`StateError`](crate::StateError) and leave the state untouched.
//!
//! ## Timing
//!
//! Chord `n` is due at `start + time_n`, where `start` is the instant playback
//! began plus the total time spent paused. Waiting against absolute instants
//! keeps scheduling error from compounding across a long song; the design
//! target is accuracy within tens of milliseconds, not sample accuracy.

mod chords;
mod countdown;
mod dispatcher;
mod engine;
mod events;
mod session;
mod types;

#[cfg(test)]
mod tests;

pub use chords::{chord_count, group_chords};
pub use dispatcher::{DispatchReport, Dispatcher, KeyPresser, PressError};
pub use engine::Player;
pub use events::{PlayerEvent, Status};
pub use types::{ChordGroup, PlaybackState};
