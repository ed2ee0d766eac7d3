//! Configuration management (config.toml)
//!
//! Replay directories and playback tuning, stored as TOML in the
//! platform-specific config directory. Missing fields take their defaults.

use crate::formats::DecodeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where replays are looked up
    #[serde(default)]
    pub replays: ReplayDirs,
    /// Playback settings
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Replay directories, one per producer
///
/// A directory left unset is not scanned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReplayDirs {
    /// Legacy `.reqlay` files
    #[serde(default)]
    pub legacy_dir: Option<PathBuf>,
    /// BeatLeader `.bsor` files
    #[serde(default)]
    pub bsor_dir: Option<PathBuf>,
    /// ScoreSaber `.dat` files
    #[serde(default)]
    pub scoresaber_dir: Option<PathBuf>,
    /// A single replay to play instead of scanning the directories
    #[serde(default)]
    pub external: Option<PathBuf>,
}

/// Playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Keyframes/events inspected on each side of the current one by the
    /// combo-drop and score-override checks (default: 2)
    #[serde(default = "default_lookahead_window")]
    pub lookahead_window: usize,
    /// Average only head yaw on 360/90 degree maps (default: true)
    #[serde(default = "default_true")]
    pub yaw_only_for_rotating_maps: bool,
}

fn default_lookahead_window() -> usize {
    2
}

fn default_true() -> bool {
    true
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            lookahead_window: default_lookahead_window(),
            yaw_only_for_rotating_maps: default_true(),
        }
    }
}

impl Config {
    /// Decoder settings derived from this configuration
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            yaw_only_for_rotating_maps: self.playback.yaw_only_for_rotating_maps,
        }
    }

    /// Load from an explicit file, falling back to defaults on any failure
    pub fn load_from(path: &Path) -> Config {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Config::default(),
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring malformed config {}: {}", path.display(), e);
                Config::default()
            }
        }
    }

    /// Write to an explicit file, creating its directory
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, content)
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\bsreplay\config`
/// On macOS: `~/Library/Application Support/io.bsreplay.bsreplay`
/// On Linux: `~/.config/bsreplay`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.bsreplay", "", "bsreplay")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads `config.toml` from the configuration directory, or defaults.
pub fn load() -> Config {
    config_dir()
        .map(|dir| Config::load_from(&dir.join("config.toml")))
        .unwrap_or_default()
}

/// Saves `config.toml` to the configuration directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &Config) -> std::io::Result<()> {
    match config_dir() {
        Some(dir) => config.save_to(&dir.join("config.toml")),
        None => Ok(()),
    }
}
