// Player settings stored as JSON next to the host application's data
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::player::{MAX_VOLUME, MIN_VOLUME};
use crate::error::SettingsError;
use crate::waveform::renderer::RenderConfig;

pub const SETTINGS_FILE: &str = "settings.json";

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Gain applied when the controller is created, -1.0 to 1.0
    pub initial_volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            initial_volume: MAX_VOLUME,
        }
    }
}

impl PlaybackSettings {
    pub fn clamped_volume(&self) -> f32 {
        if self.initial_volume.is_finite() {
            self.initial_volume.clamp(MIN_VOLUME, MAX_VOLUME)
        } else {
            MAX_VOLUME
        }
    }
}

/// Main settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: i32, // Settings schema version for future migrations
    pub playback: PlaybackSettings,
    pub waveform: RenderConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            playback: PlaybackSettings::default(),
            waveform: RenderConfig::default(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn settings_path(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE)
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(dir: &Path) -> Result<Self, SettingsError> {
        let path = Self::settings_path(dir);

        if !path.exists() {
            log::info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let settings: Settings = serde_json::from_str(&content)?;

        log::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, dir: &Path) -> Result<(), SettingsError> {
        // Ensure directory exists
        fs::create_dir_all(dir)?;

        let path = Self::settings_path(dir);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;

        log::info!("Saved settings to {:?}", path);
        Ok(())
    }
}
