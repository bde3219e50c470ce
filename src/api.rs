//! # Public API
//!
//! Convenience entry points layered over the song and playback modules.
//!
//! - [`analyze()`] - Chord structure summary of a song
//! - [`load_paths()`] - Load a mix of song files and song folders
//!
//! ## Typical Usage
//!
//! ```rust
//! use keyscore::{analyze, parse_song};
//!
//! let source = r#"{"name": "Intro", "songNotes": [
//!     {"key": "1Key0", "time": 0},
//!     {"key": "1Key4", "time": 0},
//!     {"key": "1Key2", "time": 400}
//! ]}"#;
//!
//! let song = parse_song(source, "intro.json")?.song;
//! let analysis = analyze(&song);
//! assert_eq!(analysis.groups, 2);
//! assert_eq!(analysis.chords, 1);
//! assert_eq!(analysis.duration_ms, 400);
//! # Ok::<(), keyscore::ParseError>(())
//! ```

use std::path::Path;

use serde::Serialize;

use crate::playback::{chord_count, group_chords};
use crate::song::{LoadSummary, Song, SongLibrary};

/// Shape of a song as seen by the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongAnalysis {
    pub name: String,
    pub bpm: u32,
    pub notes: usize,
    /// Distinct start times
    pub groups: usize,
    /// Start times with more than one key
    pub chords: usize,
    pub duration_ms: u64,
}

/// Summarize how a song will be scheduled.
pub fn analyze(song: &Song) -> SongAnalysis {
    let groups = group_chords(&song.notes);
    SongAnalysis {
        name: song.name.clone(),
        bpm: song.bpm,
        notes: song.notes.len(),
        groups: groups.len(),
        chords: chord_count(&groups),
        duration_ms: song.duration_ms(),
    }
}

/// Load every path into `library`. Directories contribute their `.json`
/// files; anything else is loaded as a song file. An unreadable directory
/// counts as one failure.
pub fn load_paths<I, P>(library: &mut SongLibrary, paths: I) -> LoadSummary
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut summary = LoadSummary::default();
    let mut files = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            match library.load_folder(path) {
                Ok(folder) => summary += folder,
                Err(e) => {
                    log::error!("Error scanning folder {}: {}", path.display(), e);
                    summary.failed += 1;
                }
            }
        } else {
            files.push(path.to_path_buf());
        }
    }

    summary += library.load_files(files);
    summary
}
