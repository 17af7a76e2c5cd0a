use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::{
    DEFAULT_AUTOPLAY_COUNTDOWN_SECS, DEFAULT_CONTROLS_HIDE_DELAY_SECS,
    DEFAULT_PAUSE_OVERLAY_DELAY_SECS, DEFAULT_PROGRESS_INTERVAL_SECS, DEFAULT_SEEK_STEP_SECS,
};
use crate::player::stream_source::TransportPreference;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub watch_history: WatchHistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub device_id: String,

    #[serde(default = "default_device_name")]
    pub device_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub transport: TransportPreference,

    #[serde(default = "default_direct_play_containers")]
    pub direct_play_containers: Vec<String>,

    #[serde(default = "default_quality")]
    pub default_quality: String,

    #[serde(default = "default_true")]
    pub autoplay_enabled: bool,

    #[serde(default = "default_controls_hide_delay")]
    pub controls_hide_delay_secs: u64,

    #[serde(default = "default_pause_overlay_delay")]
    pub pause_overlay_delay_secs: u64,

    #[serde(default = "default_progress_interval")]
    pub progress_interval_secs: u64,

    #[serde(default = "default_autoplay_countdown")]
    pub autoplay_countdown_secs: u32,

    #[serde(default = "default_seek_step")]
    pub seek_step_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchHistoryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_trakt_url")]
    pub base_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Timer delays used by a playback session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTimings {
    pub progress_interval: Duration,
    pub controls_hide_delay: Duration,
    pub pause_overlay_delay: Duration,
    pub autoplay_countdown_secs: u32,
    pub seek_step: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        PlaybackConfig::default().session_timings()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads the config at `path`, writing defaults there when it does not exist.
    /// A missing device id is generated and persisted.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            debug!("Loading config from {:?}", path);
            let contents = fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            info!("Config loaded successfully");
            config
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        if config.server.device_id.trim().is_empty() || !path.exists() {
            if config.server.device_id.trim().is_empty() {
                config.server.device_id = Uuid::new_v4().to_string();
                debug!("Generated device id {}", config.server.device_id);
            }
            config.save_to(path)?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn session_timings(&self) -> SessionTimings {
        self.playback.session_timings()
    }

    pub fn watch_history_enabled(&self) -> bool {
        self.watch_history.enabled
            && !self.watch_history.client_id.is_empty()
            && self
                .watch_history
                .access_token
                .as_deref()
                .is_some_and(|t| !t.is_empty())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("marquee").join("config.toml"))
    }
}

impl PlaybackConfig {
    pub fn session_timings(&self) -> SessionTimings {
        SessionTimings {
            progress_interval: Duration::from_secs(self.progress_interval_secs.max(1)),
            controls_hide_delay: Duration::from_secs(self.controls_hide_delay_secs),
            pause_overlay_delay: Duration::from_secs(self.pause_overlay_delay_secs),
            autoplay_countdown_secs: self.autoplay_countdown_secs,
            seek_step: Duration::from_secs(self.seek_step_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            access_token: String::new(),
            user_id: String::new(),
            device_id: String::new(),
            device_name: default_device_name(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            transport: TransportPreference::default(),
            direct_play_containers: default_direct_play_containers(),
            default_quality: default_quality(),
            autoplay_enabled: default_true(),
            controls_hide_delay_secs: default_controls_hide_delay(),
            pause_overlay_delay_secs: default_pause_overlay_delay(),
            progress_interval_secs: default_progress_interval(),
            autoplay_countdown_secs: default_autoplay_countdown(),
            seek_step_secs: default_seek_step(),
        }
    }
}

impl Default for WatchHistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_trakt_url(),
            client_id: String::new(),
            access_token: None,
        }
    }
}

// Default value functions
fn default_device_name() -> String { "Marquee TV".to_string() }
fn default_direct_play_containers() -> Vec<String> {
    vec!["mp4".to_string(), "m4v".to_string(), "webm".to_string()]
}
fn default_quality() -> String { "Auto".to_string() }
fn default_true() -> bool { true }
fn default_controls_hide_delay() -> u64 { DEFAULT_CONTROLS_HIDE_DELAY_SECS }
fn default_pause_overlay_delay() -> u64 { DEFAULT_PAUSE_OVERLAY_DELAY_SECS }
fn default_progress_interval() -> u64 { DEFAULT_PROGRESS_INTERVAL_SECS }
fn default_autoplay_countdown() -> u32 { DEFAULT_AUTOPLAY_COUNTDOWN_SECS }
fn default_seek_step() -> u64 { DEFAULT_SEEK_STEP_SECS }
fn default_trakt_url() -> String { "https://api.trakt.tv".to_string() }
