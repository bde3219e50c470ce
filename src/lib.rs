pub mod api;
pub mod config;
pub mod error;
pub mod keymap;
pub mod playback;
pub mod song;

pub use api::{analyze, load_paths, SongAnalysis};
pub use config::{KeyMapConfig, PlayerConfig};
pub use error::*;
pub use keymap::{KeyId, KeyMap};
pub use playback::{
    chord_count, group_chords, ChordGroup, DispatchReport, Dispatcher, KeyPresser, PlaybackState,
    Player, PlayerEvent, PressError, Status,
};
pub use song::{load_song, parse_song, LoadSummary, Note, ParsedSong, Song, SongLibrary};
