//! Shared playback session state
//!
//! Control operations run on the caller's thread while the countdown and the
//! dispatch loop run on the session thread. Both sides go through [`Shared`]:
//! one mutex guarding [`Session`] plus a condition variable that every state
//! change notifies.
//!
//! Cancellation is level-triggered. Each `play()` starts a new session
//! generation and `stop()` (or selecting another song) bumps the generation
//! again. A session thread compares its own generation against the current one
//! after every wake-up and exits as soon as they differ.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::events::{EventBus, PlayerEvent};
use super::types::{ChordGroup, PlaybackState};
use crate::song::Song;

pub(crate) struct Session {
    pub(crate) state: PlaybackState,
    pub(crate) song: Option<Arc<Song>>,
    /// Grouped once per song selection
    pub(crate) chords: Arc<Vec<ChordGroup>>,
    pub(crate) position_ms: u64,
    /// Wall-clock origin of the song, pushed forward by every pause
    pub(crate) started_at: Option<Instant>,
    pub(crate) paused_at: Option<Instant>,
    pub(crate) generation: u64,
    pub(crate) looping: bool,
    /// Makes the dispatch loop panic after the chord at this time
    #[cfg(test)]
    pub(crate) panic_at_ms: Option<u64>,
}

impl Session {
    fn new(looping: bool) -> Self {
        Self {
            state: PlaybackState::Idle,
            song: None,
            chords: Arc::new(Vec::new()),
            position_ms: 0,
            started_at: None,
            paused_at: None,
            generation: 0,
            looping,
            #[cfg(test)]
            panic_at_ms: None,
        }
    }

    /// Clear position and timing and cancel any running session thread
    pub(crate) fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.position_ms = 0;
        self.started_at = None;
        self.paused_at = None;
        self.generation
    }
}

pub(crate) struct Shared {
    session: Mutex<Session>,
    wake: Condvar,
    pub(crate) events: EventBus,
}

impl Shared {
    pub(crate) fn new(looping: bool) -> Self {
        Self {
            session: Mutex::new(Session::new(looping)),
            wake: Condvar::new(),
            events: EventBus::new(),
        }
    }

    /// A panic on another thread never leaves the session unusable
    pub(crate) fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify(&self) {
        self.wake.notify_all();
    }

    /// Park until notified
    pub(crate) fn wait<'a>(&self, guard: MutexGuard<'a, Session>) -> MutexGuard<'a, Session> {
        self.wake.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Park until notified or `timeout` elapses
    pub(crate) fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, Session>,
        timeout: Duration,
    ) -> MutexGuard<'a, Session> {
        match self.wake.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    /// Sleep until `deadline`. Returns false as soon as the session is
    /// cancelled.
    pub(crate) fn sleep_until(&self, generation: u64, deadline: Instant) -> bool {
        let mut session = self.lock();
        loop {
            if session.generation != generation {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            session = self.wait_timeout(session, deadline - now);
        }
    }

    /// Change state and announce it. Must be called with the session locked so
    /// that events are emitted in state order.
    pub(crate) fn transition(&self, session: &mut Session, state: PlaybackState) {
        if session.state == state {
            return;
        }
        log::debug!("playback state: {} -> {}", session.state, state);
        session.state = state;
        self.events.emit(PlayerEvent::StateChanged(state));
    }
}
