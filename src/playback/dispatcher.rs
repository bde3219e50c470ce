//! Key emission
//!
//! Fire every key of a chord at (nearly) the same instant. Each press runs on
//! its own short-lived thread and reports back over a channel; the dispatcher
//! waits for the reports until the press timeout runs out, so a single stuck
//! key costs at most one timeout per chord.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;

use super::types::ChordGroup;
use crate::error::DispatchError;
use crate::keymap::KeyMap;

pub type PressError = Box<dyn std::error::Error + Send + Sync>;

/// The OS-level "press this key" primitive.
///
/// Implementations receive physical key symbols from the [`KeyMap`] (`"y"`,
/// `";"`, ...). They may fail or even panic; the dispatcher records the
/// failure and carries on with the rest of the chord.
pub trait KeyPresser: Send + Sync {
    fn press(&self, symbol: &str) -> Result<(), PressError>;
}

impl<F> KeyPresser for F
where
    F: Fn(&str) -> Result<(), PressError> + Send + Sync,
{
    fn press(&self, symbol: &str) -> Result<(), PressError> {
        self(symbol)
    }
}

/// What happened to one chord
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    /// Presses that completed successfully
    pub pressed: usize,
    pub errors: Vec<DispatchError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Dispatcher {
    keymap: Arc<KeyMap>,
    presser: Arc<dyn KeyPresser>,
    press_timeout: Duration,
}

impl Dispatcher {
    pub fn new(keymap: KeyMap, presser: Arc<dyn KeyPresser>, press_timeout: Duration) -> Self {
        Self {
            keymap: Arc::new(keymap),
            presser,
            press_timeout,
        }
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    /// Press every mapped key of `group` concurrently and wait for them.
    ///
    /// Unmapped keys, failed presses and presses still running when the
    /// timeout expires all end up in [`DispatchReport::errors`]; none of them
    /// prevent the other keys from being pressed.
    pub fn dispatch(&self, group: &ChordGroup) -> DispatchReport {
        let mut report = DispatchReport::default();
        let (sender, receiver) = bounded(group.notes.len());
        let mut pending: BTreeMap<usize, (String, String)> = BTreeMap::new();

        for (index, note) in group.notes.iter().enumerate() {
            let Some(symbol) = self.keymap.resolve(&note.key) else {
                let error = DispatchError::UnmappedKey {
                    key: note.key.clone(),
                };
                log::warn!("{}", error);
                report.errors.push(error);
                continue;
            };

            let presser = Arc::clone(&self.presser);
            let sender = sender.clone();
            let target = symbol.to_string();
            let spawned = thread::Builder::new()
                .name(format!("press-{}", note.key))
                .spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| presser.press(&target)))
                        .unwrap_or_else(|payload| Err(panic_message(payload).into()))
                        .map_err(|e| e.to_string());
                    // The dispatcher may have stopped listening after a timeout
                    let _ = sender.send((index, outcome));
                });

            match spawned {
                Ok(_) => {
                    pending.insert(index, (note.key.clone(), symbol.to_string()));
                }
                Err(e) => {
                    let error = DispatchError::PressFailure {
                        key: note.key.clone(),
                        symbol: symbol.to_string(),
                        message: e.to_string(),
                    };
                    log::error!("{}", error);
                    report.errors.push(error);
                }
            }
        }
        drop(sender);

        let deadline = Instant::now() + self.press_timeout;
        while !pending.is_empty() {
            let Ok((index, outcome)) = receiver.recv_deadline(deadline) else {
                break;
            };
            let Some((key, symbol)) = pending.remove(&index) else {
                continue;
            };
            match outcome {
                Ok(()) => {
                    log::debug!("Pressed key: {} -> {}", key, symbol);
                    report.pressed += 1;
                }
                Err(message) => {
                    let error = DispatchError::PressFailure {
                        key,
                        symbol,
                        message,
                    };
                    log::error!("{}", error);
                    report.errors.push(error);
                }
            }
        }

        for (key, symbol) in pending.into_values() {
            let error = DispatchError::PressTimeout { key, symbol };
            log::warn!("{}", error);
            report.errors.push(error);
        }

        if group.is_chord() {
            log::debug!("Played simultaneous notes: {:?}", group.keys());
        }
        report
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
