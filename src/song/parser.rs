//! JSON song parsing

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Number, Value};

use super::{Note, Song};
use crate::error::ParseError;

/// Tempo used when a song does not declare one
pub const DEFAULT_BPM: u32 = 120;

/// A successfully parsed song plus the non-fatal problems found on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSong {
    pub song: Song,
    /// Only ever holds variants for which [`ParseError::is_warning`] is true
    pub warnings: Vec<ParseError>,
}

/// Read and parse a song file.
///
/// The file name doubles as the song name when the document has none.
///
/// # Errors
/// - [`ParseError::NotFound`] if the file does not exist
/// - [`ParseError::Malformed`] if it cannot be read or is not valid JSON
pub fn load_song(path: impl AsRef<Path>) -> Result<ParsedSong, ParseError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    log::info!("Loading song from: {}", display);

    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            log::error!("File not found: {}", display);
            ParseError::NotFound {
                path: display.clone(),
            }
        }
        _ => {
            log::error!("Unable to read {}: {}", display, e);
            ParseError::Malformed {
                path: display.clone(),
                message: e.to_string(),
            }
        }
    })?;

    parse_song(&text, &display)
}

/// Parse song JSON text. `source` names where the text came from; it becomes
/// the song's `source_path` and, via its file name, the default song name.
pub fn parse_song(text: &str, source: &str) -> Result<ParsedSong, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let document: Value = serde_json::from_str(text).map_err(|e| {
        log::error!("Invalid JSON format in {}: {}", source, e);
        ParseError::Malformed {
            path: source.to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(parse_document(&document, source))
}

/// Convert an already decoded JSON document into a song.
///
/// This never fails: every problem in the document degrades into a warning
/// and a default value.
pub fn parse_document(document: &Value, source: &str) -> ParsedSong {
    let object = match document {
        Value::Array(items) if !items.is_empty() => {
            log::debug!("Song data is in list format, using first element");
            &items[0]
        }
        _ => document,
    };

    let mut warnings = Vec::new();

    let name = match object.get("name") {
        Some(Value::String(name)) => name.clone(),
        other => {
            if let Some(value) = other {
                warnings.push(ParseError::InvalidField {
                    field: "name",
                    reason: format!("expected a string, got {}", value),
                });
            }
            default_name(source)
        }
    };

    let bpm = match object.get("bpm") {
        None => DEFAULT_BPM,
        Some(value) => match value.as_u64().and_then(|bpm| u32::try_from(bpm).ok()) {
            Some(bpm) if bpm > 0 => bpm,
            _ => {
                warnings.push(ParseError::InvalidField {
                    field: "bpm",
                    reason: format!("expected a positive integer, got {}", value),
                });
                DEFAULT_BPM
            }
        },
    };

    let mut notes = Vec::new();
    match object.get("songNotes") {
        Some(Value::Array(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                match parse_note(index, entry) {
                    Ok(note) => notes.push(note),
                    Err(warning) => warnings.push(warning),
                }
            }
            log::info!("Parsed {} notes from song", notes.len());
        }
        Some(value) => warnings.push(ParseError::InvalidField {
            field: "songNotes",
            reason: format!("expected an array, got {}", value),
        }),
        None => warnings.push(ParseError::MissingNotes),
    }

    for warning in &warnings {
        log::warn!("{}: {}", source, warning);
    }

    let song = Song::new(name, bpm, notes, source);
    log::info!(
        "Successfully loaded song: {} (BPM: {}, Notes: {})",
        song.name,
        song.bpm,
        song.notes.len()
    );

    ParsedSong { song, warnings }
}

fn parse_note(index: usize, entry: &Value) -> Result<Note, ParseError> {
    let invalid = |reason: String| ParseError::InvalidNoteEntry { index, reason };

    let key = match entry.get("key") {
        Some(Value::String(key)) => key.clone(),
        Some(value) => return Err(invalid(format!("key must be a string, got {}", value))),
        None => return Err(invalid(format!("missing 'key' in {}", entry))),
    };

    let time = match entry.get("time") {
        Some(Value::Number(number)) => number_to_millis(number)
            .ok_or_else(|| invalid(format!("time must be a non-negative millisecond count, got {}", number)))?,
        Some(value) => return Err(invalid(format!("time must be a number, got {}", value))),
        None => return Err(invalid(format!("missing 'time' in {}", entry))),
    };

    Ok(Note { key, time })
}

/// Fractional times are rounded to the nearest millisecond. Values that do
/// not fit in a `u64` are rejected rather than saturated.
fn number_to_millis(number: &Number) -> Option<u64> {
    if let Some(ms) = number.as_u64() {
        return Some(ms);
    }
    match number.as_f64().map(f64::round) {
        Some(ms) if ms.is_finite() && ms >= 0.0 && ms < u64::MAX as f64 => Some(ms as u64),
        _ => None,
    }
}

fn default_name(source: &str) -> String {
    Path::new(source)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(source)
        .to_string()
}
