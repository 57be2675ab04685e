use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

use super::alerts::model::{DEFAULT_ALERT_MESSAGE, DEFAULT_ALERT_TITLE};
use super::alerts::unlock::DEFAULT_UNLOCK_EVENTS;
use super::alerts::web::DEFAULT_WEB_VOLUME;

/// Alert settings, persisted as settings.json.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Asset looped by the native service
    pub sound_path: PathBuf,
    /// Asset URL for the in-page audio element
    pub web_sound_url: String,
    pub web_volume: f64,
    /// Native alarms play at full volume unless configured otherwise
    pub native_volume: f32,
    pub default_title: String,
    pub default_message: String,
    /// DOM events that count as the unlocking user gesture
    pub unlock_events: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_path: PathBuf::from("notification-sound.wav"),
            web_sound_url: "/notification-sound.wav".to_string(),
            web_volume: DEFAULT_WEB_VOLUME,
            native_volume: 1.0,
            default_title: DEFAULT_ALERT_TITLE.to_string(),
            default_message: DEFAULT_ALERT_MESSAGE.to_string(),
            unlock_events: DEFAULT_UNLOCK_EVENTS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    pub fn load(&self) -> Settings {
        if self.config_path.exists() {
            match fs::read_to_string(&self.config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => log::warn!("Ignoring malformed {:?}: {}", self.config_path, e),
                },
                Err(e) => log::warn!("Could not read {:?}: {}", self.config_path, e),
            }
        }
        Settings::default()
    }

    pub fn save(&self, settings: &Settings) -> io::Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)
    }
}
