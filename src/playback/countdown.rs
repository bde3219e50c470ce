//! Pre-roll countdown
//!
//! Gives the user a few seconds to focus the target window before the first
//! key goes out. The countdown is a phase of the session thread rather than a
//! callback: it announces each remaining second, sleeps on the session's
//! condition variable, and tells the caller whether playback may begin.

use std::time::{Duration, Instant};

use super::events::Status;
use super::session::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CountdownOutcome {
    Completed,
    /// The session was stopped or replaced; playback must not start
    Cancelled,
}

const TICK: Duration = Duration::from_secs(1);

/// Count down `seconds` whole seconds for session `generation`.
pub(crate) fn run_countdown(shared: &Shared, generation: u64, seconds: u32) -> CountdownOutcome {
    if seconds > 0 {
        log::info!("Starting {}-second countdown", seconds);
    }

    let mut tick_at = Instant::now();
    for remaining in (1..=seconds).rev() {
        {
            let session = shared.lock();
            if session.generation != generation {
                return CountdownOutcome::Cancelled;
            }
            log::info!("Countdown: {}", remaining);
            shared.events.status(Status::CountingDown(remaining));
        }

        tick_at += TICK;
        if !shared.sleep_until(generation, tick_at) {
            log::info!("Countdown cancelled with {} seconds left", remaining);
            return CountdownOutcome::Cancelled;
        }
    }

    if shared.lock().generation == generation {
        CountdownOutcome::Completed
    } else {
        CountdownOutcome::Cancelled
    }
}
