//! Common configuration and asset-path conventions shared across Balade crates

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors raised while loading the application configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Audio playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Master volume applied on top of per-narration volumes (0.0..=1.0)
    pub master_volume: f32,
    /// Disable audio output entirely (captions still run)
    pub muted: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            muted: false,
        }
    }
}

/// Application-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of the asset tree (audios/, markers.json). Discovered if unset.
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub audio: AudioConfig,
    /// Tracing filter directive used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            audio: AudioConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// Locate the asset directory: explicit config, then BALADE_DATA,
/// then ./data, then next to the executable.
pub fn find_data_dir(config: &AppConfig) -> Option<PathBuf> {
    if let Some(dir) = &config.data_dir {
        if dir.is_dir() {
            return Some(dir.clone());
        }
    }
    if let Ok(dir) = std::env::var("BALADE_DATA") {
        let dir = PathBuf::from(dir);
        if dir.is_dir() {
            return Some(dir);
        }
    }
    let cwd_data = PathBuf::from("data");
    if cwd_data.is_dir() {
        return Some(cwd_data);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let beside = parent.join("data");
            if beside.is_dir() {
                return Some(beside);
            }
        }
    }
    None
}

/// Asset-path conventions for narration and bonus audio
pub struct AssetPaths {
    root: PathBuf,
}

impl AssetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Narration audio: audios/narration/{id}.m4a
    pub fn narration_audio(&self, id: &str) -> PathBuf {
        self.root
            .join("audios")
            .join("narration")
            .join(format!("{id}.m4a"))
    }

    /// Narration captions: audios/narration/{id}.vtt
    pub fn narration_captions(&self, id: &str) -> PathBuf {
        self.root
            .join("audios")
            .join("narration")
            .join(format!("{id}.vtt"))
    }

    /// Bonus one-shot: audios/narration/bonus/{id}.mp3, falling back to
    /// audios/randoms/{id}.mp3 when the bonus file does not exist.
    pub fn bonus_audio(&self, id: &str) -> PathBuf {
        let bonus = self
            .root
            .join("audios")
            .join("narration")
            .join("bonus")
            .join(format!("{id}.mp3"));
        if bonus.is_file() {
            bonus
        } else {
            self.root.join("audios").join("randoms").join(format!("{id}.mp3"))
        }
    }

    /// Marker configuration file
    pub fn markers_config(&self) -> PathBuf {
        self.root.join("markers.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narration_paths() {
        let paths = AssetPaths::new("/data");
        assert_eq!(
            paths.narration_audio("Scene03_SautAuDessusDeLArbre"),
            PathBuf::from("/data/audios/narration/Scene03_SautAuDessusDeLArbre.m4a")
        );
        assert_eq!(
            paths.narration_captions("Radio1"),
            PathBuf::from("/data/audios/narration/Radio1.vtt")
        );
    }

    #[test]
    fn test_bonus_falls_back_to_randoms() {
        // Nonexistent root: bonus file can't exist, so the randoms path wins
        let paths = AssetPaths::new("/nonexistent");
        assert_eq!(
            paths.bonus_audio("chirp"),
            PathBuf::from("/nonexistent/audios/randoms/chirp.mp3")
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert!(config.data_dir.is_none());
        assert!(!config.audio.muted);
        assert_eq!(config.audio.master_volume, 1.0);
    }

    #[test]
    fn test_config_parses_partial_toml() {
        let config: AppConfig = toml::from_str("log_level = \"debug\"").unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.audio.master_volume, 1.0);
    }
}
