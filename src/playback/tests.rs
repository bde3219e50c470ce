use super::*;
use crate::error::StateError;
use crate::keymap::KeyMap;
use crate::song::{Note, Song};
use crossbeam_channel::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Records every press with the instant it happened
#[derive(Default)]
struct RecordingPresser {
    presses: Mutex<Vec<(String, Instant)>>,
}

impl RecordingPresser {
    fn symbols(&self) -> Vec<String> {
        self.presses
            .lock()
            .unwrap()
            .iter()
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    fn times(&self) -> Vec<Instant> {
        self.presses.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

impl KeyPresser for RecordingPresser {
    fn press(&self, symbol: &str) -> Result<(), PressError> {
        self.presses
            .lock()
            .unwrap()
            .push((symbol.to_string(), Instant::now()));
        Ok(())
    }
}

fn player(countdown_seconds: u32) -> (Player, Arc<RecordingPresser>, Receiver<PlayerEvent>) {
    let presser = Arc::new(RecordingPresser::default());
    let dispatcher = Dispatcher::new(KeyMap::sky(), presser.clone(), Duration::from_millis(200));
    let player = Player::with_dispatcher(dispatcher, countdown_seconds);
    let events = player.subscribe();
    (player, presser, events)
}

fn song(name: &str, notes: &[(&str, u64)]) -> Song {
    let notes = notes.iter().map(|(key, time)| Note::new(*key, *time)).collect();
    Song::new(name, 120, notes, format!("{}.json", name))
}

/// Collect events until one matches `done`, or give up after `timeout`
fn events_until(
    events: &Receiver<PlayerEvent>,
    timeout: Duration,
    done: impl Fn(&PlayerEvent) -> bool,
) -> Vec<PlayerEvent> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    while let Ok(event) = events.recv_deadline(deadline) {
        let finished = done(&event);
        seen.push(event);
        if finished {
            return seen;
        }
    }
    panic!("timed out waiting for event; saw {:?}", seen);
}

fn progress(events: &[PlayerEvent]) -> Vec<(u64, u64)> {
    events
        .iter()
        .filter_map(|event| match event {
            PlayerEvent::Progress {
                current_ms,
                total_ms,
            } => Some((*current_ms, *total_ms)),
            _ => None,
        })
        .collect()
}

fn wait_for_state(player: &Player, state: PlaybackState, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while player.state() != state {
        assert!(
            Instant::now() < deadline,
            "still {} waiting for {}",
            player.state(),
            state
        );
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_empty_song_finishes_immediately() {
    let (player, presser, events) = player(0);
    player.select_song(song("Silence", &[]));
    player.play().unwrap();

    let seen = events_until(&events, Duration::from_secs(2), |e| {
        *e == PlayerEvent::SongFinished
    });

    assert_eq!(progress(&seen), vec![(0, 0)]);
    assert!(seen.contains(&PlayerEvent::StatusChanged(Status::Playing)));
    assert!(presser.symbols().is_empty());
    wait_for_state(&player, PlaybackState::Finished, Duration::from_secs(1));
}

#[test]
fn test_chords_fire_in_time_order() {
    let (player, presser, events) = player(0);
    player.select_song(song(
        "Chords",
        &[("1Key2", 80), ("1Key0", 0), ("1Key1", 0)],
    ));
    assert_eq!(player.chord_groups().len(), 2);

    player.play().unwrap();
    let seen = events_until(&events, Duration::from_secs(2), |e| {
        *e == PlayerEvent::SongFinished
    });

    assert_eq!(progress(&seen), vec![(0, 80), (80, 80)]);
    let symbols = presser.symbols();
    assert_eq!(symbols.len(), 3);
    let mut chord = symbols[..2].to_vec();
    chord.sort();
    assert_eq!(chord, vec!["u", "y"]);
    assert_eq!(symbols[2], "i");

    let times = presser.times();
    let gap = times[2].duration_since(times[0]);
    assert!(gap >= Duration::from_millis(70), "second chord too early: {:?}", gap);
    assert_eq!(player.position_ms(), 80);
}

#[test]
fn test_state_and_status_sequence() {
    let (player, _presser, events) = player(0);
    player.select_song(song("One", &[("1Key0", 0)]));
    player.play().unwrap();

    let seen = events_until(&events, Duration::from_secs(2), |e| {
        *e == PlayerEvent::StatusChanged(Status::Finished)
    });
    let states: Vec<PlaybackState> = seen
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect();

    assert_eq!(
        states,
        vec![
            PlaybackState::CountingDown,
            PlaybackState::Playing,
            PlaybackState::Finished
        ]
    );
    assert!(matches!(
        seen.first(),
        Some(PlayerEvent::StatusChanged(Status::Selected { chords: 0, .. }))
    ));
}

#[test]
fn test_unmapped_key_is_skipped() {
    let (player, presser, events) = player(0);
    player.select_song(song("Unmapped", &[("9Key99", 0), ("1Key4", 0)]));
    player.play().unwrap();

    events_until(&events, Duration::from_secs(2), |e| {
        *e == PlayerEvent::SongFinished
    });
    assert_eq!(presser.symbols(), vec!["p"]);
}

#[test]
fn test_pause_resume_is_neutral() {
    let (player, presser, events) = player(0);
    player.select_song(song("Pause", &[("1Key0", 0), ("1Key1", 300)]));
    player.play().unwrap();

    events_until(&events, Duration::from_secs(2), |e| {
        matches!(e, PlayerEvent::Progress { current_ms: 0, .. })
    });
    thread::sleep(Duration::from_millis(100));
    player.pause().unwrap();
    assert_eq!(player.state(), PlaybackState::Paused);

    // Well past the second chord's offset; nothing may fire while paused
    thread::sleep(Duration::from_millis(300));
    assert_eq!(presser.symbols().len(), 1);
    assert_eq!(player.position_ms(), 0);

    player.pause().unwrap();
    assert_eq!(player.state(), PlaybackState::Playing);
    events_until(&events, Duration::from_secs(2), |e| {
        *e == PlayerEvent::SongFinished
    });

    let times = presser.times();
    let gap = times[1].duration_since(times[0]);
    // Due at start + 300ms + ~300ms of pause
    assert!(gap >= Duration::from_millis(550), "fired too early: {:?}", gap);
    assert!(gap < Duration::from_millis(1200), "fired too late: {:?}", gap);
}

#[test]
fn test_play_while_playing_is_ignored() {
    let (player, _presser, events) = player(0);
    player.select_song(song("Long", &[("1Key0", 0), ("1Key1", 50), ("1Key2", 5000)]));
    player.play().unwrap();

    events_until(&events, Duration::from_secs(2), |e| {
        matches!(e, PlayerEvent::Progress { current_ms: 50, .. })
    });
    let result = player.play();

    assert_eq!(
        result,
        Err(StateError::InvalidTransition {
            operation: "play",
            state: PlaybackState::Playing
        })
    );
    assert_eq!(player.state(), PlaybackState::Playing);
    assert_eq!(player.position_ms(), 50);
    let seen: Vec<PlayerEvent> = events.try_iter().collect();
    assert!(!seen.contains(&PlayerEvent::StateChanged(PlaybackState::CountingDown)));
    player.stop();
}

#[test]
fn test_pause_while_idle_is_rejected() {
    let (player, _presser, events) = player(0);
    assert_eq!(
        player.pause(),
        Err(StateError::InvalidTransition {
            operation: "pause",
            state: PlaybackState::Idle
        })
    );
    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(
        events.try_recv().unwrap(),
        PlayerEvent::StatusChanged(Status::Warning("Cannot pause while idle".to_string()))
    );
}

#[test]
fn test_play_without_song() {
    let (player, _presser, _events) = player(0);
    assert_eq!(player.play(), Err(StateError::NoSongSelected));
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[test]
fn test_stop_when_idle_is_safe() {
    let (player, _presser, events) = player(0);
    player.stop();
    player.stop();
    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(player.position_ms(), 0);
    assert!(events.try_recv().is_err());
}

#[test]
fn test_stop_during_playback() {
    let (player, presser, events) = player(0);
    player.select_song(song("Stop", &[("1Key0", 0), ("1Key1", 40), ("1Key2", 400)]));
    player.play().unwrap();

    events_until(&events, Duration::from_secs(2), |e| {
        matches!(e, PlayerEvent::Progress { current_ms: 40, .. })
    });
    player.stop();
    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(player.position_ms(), 0);

    thread::sleep(Duration::from_millis(500));
    assert_eq!(presser.symbols(), vec!["y", "u"]);
    let late: Vec<PlayerEvent> = events.try_iter().collect();
    assert!(!late.contains(&PlayerEvent::SongFinished));
    assert_eq!(player.position_ms(), 0);
}

#[test]
fn test_stop_while_paused() {
    let (player, presser, events) = player(0);
    player.select_song(song("Paused", &[("1Key0", 0), ("1Key1", 100)]));
    player.play().unwrap();
    events_until(&events, Duration::from_secs(2), |e| {
        matches!(e, PlayerEvent::Progress { current_ms: 0, .. })
    });

    player.pause().unwrap();
    player.stop();
    assert_eq!(player.state(), PlaybackState::Idle);

    thread::sleep(Duration::from_millis(250));
    assert_eq!(presser.symbols(), vec!["y"]);
}

#[test]
fn test_stop_during_countdown_never_starts() {
    let (player, presser, events) = player(1);
    player.select_song(song("Countdown", &[("1Key0", 0)]));
    player.play().unwrap();
    assert_eq!(player.state(), PlaybackState::CountingDown);

    events_until(&events, Duration::from_secs(1), |e| {
        *e == PlayerEvent::StatusChanged(Status::CountingDown(1))
    });
    player.stop();

    thread::sleep(Duration::from_millis(1300));
    assert!(presser.symbols().is_empty());
    assert_eq!(player.state(), PlaybackState::Idle);
    let late: Vec<PlayerEvent> = events.try_iter().collect();
    assert!(!late.contains(&PlayerEvent::StatusChanged(Status::Playing)));
}

#[test]
fn test_countdown_precedes_playback() {
    let (player, presser, events) = player(1);
    player.select_song(song("Countdown", &[("1Key0", 0)]));

    let started = Instant::now();
    player.play().unwrap();
    let seen = events_until(&events, Duration::from_secs(3), |e| {
        *e == PlayerEvent::SongFinished
    });

    let tick = seen
        .iter()
        .position(|e| *e == PlayerEvent::StatusChanged(Status::CountingDown(1)))
        .unwrap();
    let playing = seen
        .iter()
        .position(|e| *e == PlayerEvent::StatusChanged(Status::Playing))
        .unwrap();
    assert!(tick < playing);
    assert!(presser.times()[0].duration_since(started) >= Duration::from_millis(950));
}

#[test]
fn test_replay_after_finish() {
    let (player, presser, events) = player(0);
    player.select_song(song("Twice", &[("1Key0", 0)]));

    for _ in 0..2 {
        player.play().unwrap();
        events_until(&events, Duration::from_secs(2), |e| {
            *e == PlayerEvent::SongFinished
        });
        wait_for_state(&player, PlaybackState::Finished, Duration::from_secs(1));
    }
    assert_eq!(presser.symbols(), vec!["y", "y"]);
}

#[test]
fn test_looping_restarts_song() {
    let (player, presser, events) = player(0);
    player.set_looping(true);
    player.select_song(song("Loop", &[("1Key0", 0), ("1Key1", 20)]));
    player.play().unwrap();

    for _ in 0..2 {
        events_until(&events, Duration::from_secs(2), |e| {
            *e == PlayerEvent::SongFinished
        });
    }
    player.stop();
    wait_for_state(&player, PlaybackState::Idle, Duration::from_secs(1));

    let symbols = presser.symbols();
    assert!(symbols.len() >= 4);
    assert_eq!(symbols[..4], ["y", "u", "y", "u"]);
}

#[test]
fn test_selecting_a_song_stops_playback() {
    let (player, presser, events) = player(0);
    player.select_song(song("First", &[("1Key0", 0), ("1Key1", 300)]));
    player.play().unwrap();
    events_until(&events, Duration::from_secs(2), |e| {
        matches!(e, PlayerEvent::Progress { current_ms: 0, .. })
    });

    player.select_song(song("Second", &[("1Key5", 0)]));
    assert_eq!(player.state(), PlaybackState::Idle);
    assert_eq!(player.current_song().unwrap().name, "Second");

    thread::sleep(Duration::from_millis(400));
    assert_eq!(presser.symbols(), vec!["y"]);
}

#[test]
fn test_failing_presser_does_not_stop_playback() {
    let presser = |symbol: &str| -> Result<(), PressError> {
        if symbol == "y" {
            panic!("stuck key");
        }
        Err("no focus".into())
    };
    let dispatcher = Dispatcher::new(KeyMap::sky(), Arc::new(presser), Duration::from_millis(100));
    let player = Player::with_dispatcher(dispatcher, 0);
    let events = player.subscribe();

    player.select_song(song("Faulty", &[("1Key0", 0), ("1Key1", 0), ("1Key2", 30)]));
    player.play().unwrap();

    let seen = events_until(&events, Duration::from_secs(2), |e| {
        *e == PlayerEvent::SongFinished
    });
    assert_eq!(progress(&seen), vec![(0, 30), (30, 30)]);
    assert_eq!(player.state(), PlaybackState::Finished);
}

#[test]
fn test_panic_in_dispatch_loop_moves_to_error() {
    let (player, presser, events) = player(0);
    player.select_song(song("Doomed", &[("1Key0", 0), ("1Key1", 50)]));
    player.shared.lock().panic_at_ms = Some(0);
    player.play().unwrap();

    let seen = events_until(&events, Duration::from_secs(2), |e| {
        matches!(e, PlayerEvent::StatusChanged(Status::Error(_)))
    });
    assert_eq!(
        seen.last().unwrap().clone(),
        PlayerEvent::StatusChanged(Status::Error(
            "Unexpected playback failure: injected failure at 0ms".to_string()
        ))
    );
    assert!(seen.contains(&PlayerEvent::StateChanged(PlaybackState::Error)));
    assert_eq!(player.state(), PlaybackState::Error);
    assert_eq!(player.position_ms(), 0);

    // The loop is gone: the second chord never fires
    thread::sleep(Duration::from_millis(150));
    assert_eq!(presser.symbols(), vec!["y"]);

    // Error allows a fresh play
    player.shared.lock().panic_at_ms = None;
    player.play().unwrap();
    events_until(&events, Duration::from_secs(2), |e| {
        *e == PlayerEvent::SongFinished
    });
    assert_eq!(presser.symbols(), vec!["y", "y", "u"]);
}

#[test]
fn test_looping_without_countdown_rests_between_passes() {
    let (player, presser, _events) = player(0);
    player.set_looping(true);
    player.select_song(song("Blip", &[("1Key0", 0)]));
    player.play().unwrap();

    thread::sleep(Duration::from_millis(500));
    assert_eq!(presser.symbols().len(), 1);

    thread::sleep(Duration::from_millis(800));
    player.stop();
    assert_eq!(presser.symbols().len(), 2);
}

#[test]
fn test_stop_wakes_loop_rest() {
    let (player, presser, events) = player(0);
    player.set_looping(true);
    player.select_song(song("Empty loop", &[]));
    player.play().unwrap();

    events_until(&events, Duration::from_secs(2), |e| {
        *e == PlayerEvent::SongFinished
    });
    player.stop();
    assert_eq!(player.state(), PlaybackState::Idle);

    thread::sleep(Duration::from_millis(1200));
    assert!(presser.symbols().is_empty());
    let late: Vec<PlayerEvent> = events.try_iter().collect();
    assert!(!late.contains(&PlayerEvent::SongFinished));
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[test]
fn test_progress_is_monotonic() {
    let (player, _presser, events) = player(0);
    let notes: Vec<(String, u64)> = (0..20)
        .map(|i| (format!("1Key{}", i % 15), (i / 2) * 5))
        .collect();
    let notes: Vec<(&str, u64)> = notes.iter().map(|(k, t)| (k.as_str(), *t)).collect();
    player.select_song(song("Dense", &notes));
    player.play().unwrap();

    let seen = events_until(&events, Duration::from_secs(3), |e| {
        *e == PlayerEvent::SongFinished
    });
    let reported = progress(&seen);
    assert_eq!(reported.len(), 10);
    assert!(reported.windows(2).all(|w| w[0].0 < w[1].0));
    assert!(reported.iter().all(|(_, total)| *total == 45));
}
