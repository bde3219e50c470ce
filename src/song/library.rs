//! Batch song loading
//!
//! Hosts typically load a whole folder or a multi-file selection at once. The
//! library keeps every song that loaded, remembers which files it has already
//! seen so the same file is never listed twice, and tallies the outcome.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use super::{load_song, Song};
use crate::error::ParseError;

/// Outcome of a batch load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl AddAssign for LoadSummary {
    fn add_assign(&mut self, other: Self) {
        self.loaded += other.loaded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts = Vec::new();
        if self.loaded > 0 {
            parts.push(format!("Loaded {} songs", self.loaded));
        }
        if self.skipped > 0 {
            parts.push(format!("Skipped {} duplicates", self.skipped));
        }
        if self.failed > 0 {
            parts.push(format!("Failed {} files", self.failed));
        }
        if parts.is_empty() {
            write!(f, "No files processed")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

#[derive(Debug, Default)]
pub struct SongLibrary {
    songs: Vec<Song>,
    loaded_paths: HashSet<PathBuf>,
}

impl SongLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load each file, skipping files already in the library.
    ///
    /// Failures are logged and counted but never stop the batch.
    pub fn load_files<I, P>(&mut self, paths: I) -> LoadSummary
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut summary = LoadSummary::default();

        for path in paths {
            let path = path.as_ref();
            let normalized = normalize(path);
            if self.loaded_paths.contains(&normalized) {
                log::debug!("Skipping duplicate file: {}", path.display());
                summary.skipped += 1;
                continue;
            }

            match load_song(path) {
                Ok(parsed) => {
                    log::debug!("Successfully loaded: {}", parsed.song.name);
                    self.songs.push(parsed.song);
                    self.loaded_paths.insert(normalized);
                    summary.loaded += 1;
                }
                Err(e) => {
                    log::error!("Failed to load {}: {}", path.display(), e);
                    summary.failed += 1;
                }
            }
        }

        log::info!(
            "Loading completed: {} loaded, {} skipped, {} errors",
            summary.loaded,
            summary.skipped,
            summary.failed
        );
        summary
    }

    /// Load every `.json` file directly inside `dir`, in file name order.
    ///
    /// # Errors
    /// [`ParseError::NotFound`] if the folder does not exist, or
    /// [`ParseError::Malformed`] if it cannot be listed.
    pub fn load_folder(&mut self, dir: impl AsRef<Path>) -> Result<LoadSummary, ParseError> {
        let dir = dir.as_ref();
        log::info!("Loading songs from folder: {}", dir.display());

        let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ParseError::NotFound {
                path: dir.display().to_string(),
            },
            _ => ParseError::Malformed {
                path: dir.display().to_string(),
                message: e.to_string(),
            },
        })?;

        let mut json_files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_json(path))
            .collect();
        json_files.sort();

        if json_files.is_empty() {
            log::warn!("No JSON files found in {}", dir.display());
            return Ok(LoadSummary::default());
        }

        log::info!("Found {} JSON files in folder", json_files.len());
        Ok(self.load_files(json_files))
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn get(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn clear(&mut self) {
        log::info!("Clearing {} songs from library", self.songs.len());
        self.songs.clear();
        self.loaded_paths.clear();
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

/// Two spellings of the same file must compare equal
fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}
