//! # Key Mapping
//!
//! Translate logical song keys into the physical key symbols that get pressed.
//!
//! Song files name keys per instrument: `1Key0` is position 0 of instrument 1,
//! `3Key14` is position 14 of instrument 3. A [`KeyMap`] resolves each of
//! those to one physical key symbol. The map is built once, usually from
//! [`PlayerConfig`](crate::PlayerConfig), and shared read-only with the
//! dispatcher for the lifetime of a player.
//!
//! ## Default Layout
//! The default map assigns the same 15-key layout to instruments 1 through 4:
//!
//! ```text
//! position:  0 1 2 3 4   5 6 7 8 9   10 11 12 13 14
//! key:       y u i o p   h j k l ;   n  m  ,  .  /
//! ```
//!
//! Per-instrument overrides let distinct instruments use distinct keys.
//!
//! ## Example
//! ```rust
//! use keyscore::{KeyId, KeyMap};
//!
//! let map = KeyMap::sky().with_key(KeyId::new(2, 0), "q");
//! assert_eq!(map.resolve("1Key0"), Some("y"));
//! assert_eq!(map.resolve("2Key0"), Some("q"));
//! assert_eq!(map.resolve("9Key99"), None);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::KeyMapConfig;
use crate::error::ConfigError;

/// The 15-key layout shared by every instrument in the default map
pub const SKY_LAYOUT: [&str; 15] = [
    "y", "u", "i", "o", "p", "h", "j", "k", "l", ";", "n", "m", ",", ".", "/",
];

/// Number of instruments covered by the default map
pub const DEFAULT_INSTRUMENTS: u8 = 4;

/// Logical key: instrument number plus position within that instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId {
    pub instrument: u8,
    pub position: u8,
}

impl KeyId {
    pub fn new(instrument: u8, position: u8) -> Self {
        Self {
            instrument,
            position,
        }
    }
}

impl FromStr for KeyId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidKeyId(s.to_string());
        let (instrument, position) = s.split_once("Key").ok_or_else(invalid)?;
        let is_number = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !is_number(instrument) || !is_number(position) {
            return Err(invalid());
        }
        Ok(KeyId {
            instrument: instrument.parse().map_err(|_| invalid())?,
            position: position.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}Key{}", self.instrument, self.position)
    }
}

/// Immutable logical key to physical symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    keys: BTreeMap<KeyId, String>,
}

impl KeyMap {
    /// A map with no keys; every lookup misses
    pub fn empty() -> Self {
        Self {
            keys: BTreeMap::new(),
        }
    }

    /// Assign `layout[position]` to every instrument from 1 to `instruments`
    pub fn from_layout<S: AsRef<str>>(instruments: u8, layout: &[S]) -> Self {
        let mut keys = BTreeMap::new();
        for instrument in 1..=instruments {
            for (position, symbol) in layout.iter().enumerate() {
                let Ok(position) = u8::try_from(position) else {
                    break;
                };
                keys.insert(KeyId::new(instrument, position), symbol.as_ref().to_string());
            }
        }
        Self { keys }
    }

    /// The default four-instrument layout
    pub fn sky() -> Self {
        Self::from_layout(DEFAULT_INSTRUMENTS, &SKY_LAYOUT)
    }

    /// Build the map described by a config section, applying overrides last.
    pub fn from_config(config: &KeyMapConfig) -> Result<Self, ConfigError> {
        let mut map = Self::from_layout(config.instruments, &config.layout);
        for (key, symbol) in &config.overrides {
            let id: KeyId = key.parse()?;
            map = map.with_key(id, symbol.clone());
        }
        Ok(map)
    }

    /// Return a copy of the map with one key added or replaced
    pub fn with_key(mut self, id: KeyId, symbol: impl Into<String>) -> Self {
        self.keys.insert(id, symbol.into());
        self
    }

    pub fn get(&self, id: KeyId) -> Option<&str> {
        self.keys.get(&id).map(String::as_str)
    }

    /// Look up a song key such as `1Key0`. Keys that do not parse are unmapped.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        key.parse::<KeyId>().ok().and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeyId, &str)> {
        self.keys.iter().map(|(id, symbol)| (*id, symbol.as_str()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::sky()
    }
}
