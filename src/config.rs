//! # Player Configuration
//!
//! YAML settings for a [`Player`](crate::Player). Every field is optional;
//! anything left out takes its default.
//!
//! ```yaml
//! countdown-seconds: 3
//! press-timeout-ms: 100
//! loop-playback: false
//! keymap:
//!   instruments: 4
//!   layout: [y, u, i, o, p, h, j, k, l, ";", n, m, ",", ".", /]
//!   overrides:
//!     2Key0: q
//! ```
//!
//! ## Example
//! ```rust
//! use keyscore::PlayerConfig;
//!
//! let config = PlayerConfig::from_yaml("countdown-seconds: 5").unwrap();
//! assert_eq!(config.countdown_seconds, 5);
//! assert_eq!(config.press_timeout_ms, 100);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::keymap::{KeyMap, DEFAULT_INSTRUMENTS, SKY_LAYOUT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlayerConfig {
    /// Whole seconds of pre-roll before the first chord
    pub countdown_seconds: u32,
    /// How long a chord waits for its key presses before moving on
    pub press_timeout_ms: u64,
    /// Restart the song after it finishes
    pub loop_playback: bool,
    pub keymap: KeyMapConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 3,
            press_timeout_ms: 100,
            loop_playback: false,
            keymap: KeyMapConfig::default(),
        }
    }
}

impl PlayerConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        log::info!("Loaded player config from {}", path.display());
        Ok(config)
    }

    pub fn press_timeout(&self) -> Duration {
        Duration::from_millis(self.press_timeout_ms)
    }

    pub fn key_map(&self) -> Result<KeyMap, ConfigError> {
        KeyMap::from_config(&self.keymap)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct KeyMapConfig {
    /// Instruments 1 through this number all receive `layout`
    pub instruments: u8,
    /// Physical key symbol for each position
    pub layout: Vec<String>,
    /// Per-key replacements, keyed by ids such as `2Key0`
    pub overrides: BTreeMap<String, String>,
}

impl Default for KeyMapConfig {
    fn default() -> Self {
        Self {
            instruments: DEFAULT_INSTRUMENTS,
            layout: SKY_LAYOUT.iter().map(|s| s.to_string()).collect(),
            overrides: BTreeMap::new(),
        }
    }
}
