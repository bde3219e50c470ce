//! Playback scheduler
//!
//! [`Player`] owns the playback state machine and the session thread that
//! walks a song's chord groups in real time.
//!
//! Every chord is scheduled against the song's absolute start instant rather
//! than relative to the previous chord, so scheduling error never accumulates.
//! Pausing moves that start instant forward by the paused duration on resume,
//! which keeps the remaining chords at their original spacing.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use super::chords::{chord_count, group_chords};
use super::countdown::{run_countdown, CountdownOutcome};
use super::dispatcher::{panic_message, Dispatcher, KeyPresser};
use super::events::{PlayerEvent, Status};
use super::session::Shared;
use super::types::{ChordGroup, PlaybackState};
use crate::config::PlayerConfig;
use crate::error::{ConfigError, PlaybackError, StateError};
use crate::song::Song;

/// Drives timed key playback for one selected song.
///
/// All control operations take `&self` and may be called from any thread;
/// wrap the player in an `Arc` to share it. Dropping the player stops any
/// running session.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use keyscore::{load_song, KeyPresser, PlayerConfig, Player, PlayerEvent, PressError};
///
/// struct Console;
///
/// impl KeyPresser for Console {
///     fn press(&self, symbol: &str) -> Result<(), PressError> {
///         println!("press {}", symbol);
///         Ok(())
///     }
/// }
///
/// let player = Player::new(&PlayerConfig::default(), Arc::new(Console))?;
/// let events = player.subscribe();
///
/// player.select_song(load_song("ode.json")?.song);
/// player.play()?;
///
/// for event in events.iter() {
///     if event == PlayerEvent::SongFinished {
///         break;
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Player {
    pub(super) shared: Arc<Shared>,
    dispatcher: Arc<Dispatcher>,
    countdown_seconds: u32,
}

impl Player {
    /// Build a player from configuration, pressing keys through `presser`.
    ///
    /// # Errors
    /// [`ConfigError::InvalidKeyId`] if a key map override is not a valid id.
    pub fn new(config: &PlayerConfig, presser: Arc<dyn KeyPresser>) -> Result<Self, ConfigError> {
        let dispatcher = Dispatcher::new(config.key_map()?, presser, config.press_timeout());
        let player = Self::with_dispatcher(dispatcher, config.countdown_seconds);
        player.set_looping(config.loop_playback);
        Ok(player)
    }

    pub fn with_dispatcher(dispatcher: Dispatcher, countdown_seconds: u32) -> Self {
        log::info!("Initializing player");
        Self {
            shared: Arc::new(Shared::new(false)),
            dispatcher: Arc::new(dispatcher),
            countdown_seconds,
        }
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state
    }

    /// Time of the most recently dispatched chord
    pub fn position_ms(&self) -> u64 {
        self.shared.lock().position_ms
    }

    pub fn current_song(&self) -> Option<Arc<Song>> {
        self.shared.lock().song.clone()
    }

    /// Chord groups of the selected song
    pub fn chord_groups(&self) -> Arc<Vec<ChordGroup>> {
        Arc::clone(&self.shared.lock().chords)
    }

    /// The dispatcher, and through it the key map, this player presses with
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn set_looping(&self, looping: bool) {
        self.shared.lock().looping = looping;
        log::info!("Loop playback {}", if looping { "enabled" } else { "disabled" });
    }

    pub fn is_looping(&self) -> bool {
        self.shared.lock().looping
    }

    /// Make `song` the current song, replacing (and stopping) any previous one.
    ///
    /// The chord groups are computed here, once per selection.
    pub fn select_song(&self, song: Song) {
        let chords = group_chords(&song.notes);
        let chords_detected = chord_count(&chords);
        log::info!(
            "Selected song: {} ({} notes, {} chords)",
            song.name,
            song.notes.len(),
            chords_detected
        );

        let mut session = self.shared.lock();
        session.reset();
        if session.state != PlaybackState::Idle {
            self.shared.transition(&mut session, PlaybackState::Idle);
            self.shared.events.status(Status::Stopped);
        }
        let name = song.name.clone();
        session.song = Some(Arc::new(song));
        session.chords = Arc::new(chords);
        self.shared.events.status(Status::Selected {
            name,
            chords: chords_detected,
        });
        drop(session);
        self.shared.notify();
    }

    /// Start the selected song, beginning with the countdown.
    ///
    /// Only valid from `Idle`, `Finished` or `Error`. Calling it in any other
    /// state changes nothing: the countdown is not restarted and the position
    /// is kept.
    pub fn play(&self) -> Result<(), StateError> {
        let mut session = self.shared.lock();
        let Some(song) = session.song.clone() else {
            log::warn!("No song loaded, cannot play");
            self.shared
                .events
                .status(Status::Warning("Please select a song first".to_string()));
            return Err(StateError::NoSongSelected);
        };
        if !session.state.can_play() {
            return Err(self.reject(session.state, "play"));
        }

        let generation = session.reset();
        self.shared.transition(&mut session, PlaybackState::CountingDown);
        let chords = Arc::clone(&session.chords);
        drop(session);

        log::info!("Starting to play: {}", song.name);
        let shared = Arc::clone(&self.shared);
        let dispatcher = Arc::clone(&self.dispatcher);
        let countdown_seconds = self.countdown_seconds;
        let spawned = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || run_session(&shared, &dispatcher, &chords, generation, countdown_seconds));

        if let Err(e) = spawned {
            fail(
                &self.shared,
                generation,
                PlaybackError::Unexpected(format!("unable to start playback thread: {}", e)),
            );
        }
        Ok(())
    }

    /// Toggle between `Playing` and `Paused`.
    pub fn pause(&self) -> Result<(), StateError> {
        let mut session = self.shared.lock();
        match session.state {
            PlaybackState::Playing => {
                session.paused_at = Some(Instant::now());
                self.shared.transition(&mut session, PlaybackState::Paused);
                self.shared.events.status(Status::Paused);
                log::info!("Paused playback at {}ms", session.position_ms);
            }
            PlaybackState::Paused => {
                if let (Some(paused_at), Some(started_at)) = (session.paused_at.take(), session.started_at) {
                    session.started_at = Some(started_at + paused_at.elapsed());
                }
                self.shared.transition(&mut session, PlaybackState::Playing);
                self.shared.events.status(Status::Playing);
                log::info!("Resumed playback");
            }
            state => return Err(self.reject(state, "pause")),
        }
        drop(session);
        self.shared.notify();
        Ok(())
    }

    /// Stop playback and return to `Idle` at position 0. Safe in any state.
    pub fn stop(&self) {
        let mut session = self.shared.lock();
        session.reset();
        if session.state != PlaybackState::Idle {
            log::info!("Stopping playback");
            self.shared.transition(&mut session, PlaybackState::Idle);
            self.shared.events.status(Status::Stopped);
        }
        drop(session);
        self.shared.notify();
    }

    fn reject(&self, state: PlaybackState, operation: &'static str) -> StateError {
        let error = StateError::InvalidTransition { operation, state };
        log::warn!("{}", error);
        self.shared.events.status(Status::Warning(error.to_string()));
        error
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Shortest time between the starts of two passes of a looping song
const MIN_LOOP_INTERVAL: Duration = Duration::from_secs(1);

enum LoopOutcome {
    Completed,
    Cancelled,
}

/// Body of the session thread
fn run_session(
    shared: &Shared,
    dispatcher: &Dispatcher,
    chords: &[ChordGroup],
    generation: u64,
    countdown_seconds: u32,
) {
    loop {
        let pass_started = Instant::now();
        if run_countdown(shared, generation, countdown_seconds) == CountdownOutcome::Cancelled {
            return;
        }
        if !begin_playing(shared, generation) {
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            play_chords(shared, dispatcher, chords, generation)
        }));
        match outcome {
            Ok(LoopOutcome::Completed) => {
                if !finish(shared, generation) {
                    return;
                }
                // A short song with no countdown must not restart back to back
                if !shared.sleep_until(generation, pass_started + MIN_LOOP_INTERVAL) {
                    return;
                }
            }
            Ok(LoopOutcome::Cancelled) => {
                log::info!("Playback stopped by user");
                return;
            }
            Err(payload) => {
                fail(shared, generation, PlaybackError::Unexpected(panic_message(payload)));
                return;
            }
        }
    }
}

/// `CountingDown -> Playing`
fn begin_playing(shared: &Shared, generation: u64) -> bool {
    let mut session = shared.lock();
    if session.generation != generation {
        return false;
    }
    session.position_ms = 0;
    session.started_at = Some(Instant::now());
    session.paused_at = None;
    shared.transition(&mut session, PlaybackState::Playing);
    shared.events.status(Status::Playing);
    true
}

fn play_chords(shared: &Shared, dispatcher: &Dispatcher, chords: &[ChordGroup], generation: u64) -> LoopOutcome {
    let total_ms = chords.last().map_or(0, |group| group.time);
    log::info!("Playing {} note groups over {}ms", chords.len(), total_ms);

    if chords.is_empty() {
        let session = shared.lock();
        if session.generation != generation {
            return LoopOutcome::Cancelled;
        }
        shared.events.emit(PlayerEvent::Progress {
            current_ms: 0,
            total_ms: 0,
        });
        return LoopOutcome::Completed;
    }

    for group in chords {
        if !wait_until_due(shared, generation, group.time) {
            return LoopOutcome::Cancelled;
        }

        let report = dispatcher.dispatch(group);
        if !report.is_clean() {
            log::debug!(
                "Chord at {}ms: {} pressed, {} skipped",
                group.time,
                report.pressed,
                report.errors.len()
            );
        }

        let mut session = shared.lock();
        if session.generation != generation {
            return LoopOutcome::Cancelled;
        }
        #[cfg(test)]
        if session.panic_at_ms == Some(group.time) {
            drop(session);
            panic!("injected failure at {}ms", group.time);
        }
        session.position_ms = group.time;
        shared.events.emit(PlayerEvent::Progress {
            current_ms: group.time,
            total_ms,
        });
    }
    LoopOutcome::Completed
}

/// Block until the chord at `time_ms` is due. Pausing parks the thread
/// without consuming song time. Returns false once the session is cancelled.
fn wait_until_due(shared: &Shared, generation: u64, time_ms: u64) -> bool {
    let mut session = shared.lock();
    loop {
        if session.generation != generation {
            return false;
        }
        if session.state == PlaybackState::Paused {
            session = shared.wait(session);
            continue;
        }
        let Some(started_at) = session.started_at else {
            return true;
        };
        let due = started_at + Duration::from_millis(time_ms);
        let now = Instant::now();
        if due <= now {
            return true;
        }
        session = shared.wait_timeout(session, due - now);
    }
}

/// Move a completed session to `Finished`. Returns true when looping should
/// start the song over.
fn finish(shared: &Shared, generation: u64) -> bool {
    let mut session = shared.lock();
    if session.generation != generation {
        return false;
    }
    if !matches!(session.state, PlaybackState::Playing | PlaybackState::Paused) {
        return false;
    }

    log::info!("Song finished naturally");
    session.paused_at = None;
    shared.transition(&mut session, PlaybackState::Finished);
    shared.events.emit(PlayerEvent::SongFinished);
    shared.events.status(Status::Finished);

    if !session.looping {
        return false;
    }
    log::info!("Loop enabled, restarting song");
    session.position_ms = 0;
    session.started_at = None;
    shared.transition(&mut session, PlaybackState::CountingDown);
    true
}

/// Abort session `generation` after an unexpected failure
fn fail(shared: &Shared, generation: u64, error: PlaybackError) {
    let mut session = shared.lock();
    if session.generation != generation {
        return;
    }
    log::error!("Error during song playback: {}", error);
    session.reset();
    shared.transition(&mut session, PlaybackState::Error);
    shared.events.status(Status::Error(error.to_string()));
    drop(session);
    shared.notify();
}
