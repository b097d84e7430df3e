//! Configuration management for Crickstream
//!
//! This module handles loading and managing application configuration
//! from various sources including config files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::utils::error::{IntoPlayerError, PlayerError, Result};

/// Delay after the last pointer activity before the controls hide
pub const HIDE_CONTROLS_DELAY: Duration = Duration::from_secs(3);

/// Distance from the live edge, in seconds, beyond which playback is "behind live"
pub const BEHIND_LIVE_THRESHOLD_SECS: f64 = 15.0;

/// Live edge poll period
pub const LIVE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Step size for the rewind/forward controls, in seconds
pub const STEP_SECONDS: f64 = 10.0;

/// Default media receiver application id
pub const DEFAULT_RECEIVER_APP_ID: &str = "CC1AD845";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Player timing and start-up behaviour
    pub player: PlayerSettings,

    /// Cast framework options
    pub cast: CastConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Idle time before the control chrome hides, in milliseconds
    pub hide_controls_delay_ms: u64,

    /// Behind-live threshold in seconds
    pub behind_live_threshold_secs: f64,

    /// Live edge poll period in milliseconds
    pub live_poll_interval_ms: u64,

    /// Rewind/forward step in seconds
    pub step_seconds: f64,

    /// Start sessions unmuted
    pub start_unmuted: bool,
}

/// Auto-join policy handed to the cast framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoJoinPolicy {
    TabAndOriginScoped,
    OriginScoped,
    PageScoped,
}

/// Cast configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CastConfig {
    /// Receiver application id
    pub receiver_app_id: String,

    /// Auto-join policy
    pub auto_join_policy: AutoJoinPolicy,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Catalog JSON file; the builtin catalog is used when unset
    pub catalog_path: Option<PathBuf>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            hide_controls_delay_ms: HIDE_CONTROLS_DELAY.as_millis() as u64,
            behind_live_threshold_secs: BEHIND_LIVE_THRESHOLD_SECS,
            live_poll_interval_ms: LIVE_POLL_INTERVAL.as_millis() as u64,
            step_seconds: STEP_SECONDS,
            start_unmuted: false,
        }
    }
}

impl PlayerSettings {
    pub fn hide_controls_delay(&self) -> Duration {
        Duration::from_millis(self.hide_controls_delay_ms)
    }

    pub fn live_poll_interval(&self) -> Duration {
        Duration::from_millis(self.live_poll_interval_ms)
    }
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            receiver_app_id: DEFAULT_RECEIVER_APP_ID.to_string(),
            auto_join_policy: AutoJoinPolicy::OriginScoped,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            catalog_path: None,
        }
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/crickstream/config.toml on Linux)
    /// 3. User config file (~/.config/crickstream/config.toml on Linux)
    /// 4. Environment variables (CRICKSTREAM_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config = Self::from_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config = Self::from_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Read a single TOML file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).config_err("Failed to read config file")?;
        toml::from_str(&contents).config_err("Failed to parse config file")
    }

    /// Save configuration to user config file
    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path()
            .ok_or_else(|| PlayerError::Config("Cannot determine user config path".to_string()))?;
        self.save_to(&path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PlayerError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let toml = toml::to_string_pretty(self)
            .map_err(|e| PlayerError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml)
            .map_err(|e| PlayerError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(log_level) = std::env::var("CRICKSTREAM_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        if let Ok(catalog) = std::env::var("CRICKSTREAM_CATALOG") {
            self.general.catalog_path = Some(PathBuf::from(catalog));
        }

        if let Ok(delay) = std::env::var("CRICKSTREAM_HIDE_CONTROLS_MS") {
            self.player.hide_controls_delay_ms = delay.parse()
                .map_err(|_| PlayerError::Config("Invalid CRICKSTREAM_HIDE_CONTROLS_MS".to_string()))?;
        }

        if let Ok(app_id) = std::env::var("CRICKSTREAM_RECEIVER_APP_ID") {
            self.cast.receiver_app_id = app_id;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.player.hide_controls_delay_ms == 0 {
            return Err(PlayerError::Config("Hide-controls delay must be non-zero".to_string()));
        }

        if self.player.live_poll_interval_ms == 0 {
            return Err(PlayerError::Config("Live poll interval must be non-zero".to_string()));
        }

        if !(self.player.behind_live_threshold_secs > 0.0) {
            return Err(PlayerError::Config("Behind-live threshold must be positive".to_string()));
        }

        if !(self.player.step_seconds > 0.0) {
            return Err(PlayerError::Config("Step size must be positive".to_string()));
        }

        if self.cast.receiver_app_id.trim().is_empty() {
            return Err(PlayerError::Config("Receiver application id must not be empty".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(PlayerError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level,
                valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/crickstream/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA").ok()
            .map(|p| PathBuf::from(p).join("Crickstream").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/Crickstream/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return dirs::config_dir()
            .map(|p| p.join("crickstream").join("config.toml"));

        #[cfg(not(target_os = "linux"))]
        return dirs::config_dir()
            .map(|p| p.join("Crickstream").join("config.toml"));
    }
}
