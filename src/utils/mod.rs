//! Utility module for Crickstream
//!
//! This module provides common utilities used throughout the player:
//! - Error handling with custom error types
//! - Configuration management
//! - Injectable time source for timers
//! - Display helpers

pub mod clock;
pub mod config;
pub mod error;

// Re-export commonly used items
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AutoJoinPolicy, CastConfig, Config, GeneralConfig, PlayerSettings};
pub use error::{PlayerError, Result};

/// Initialize the application configuration
///
/// Loads configuration from:
/// 1. Default values
/// 2. System configuration file
/// 3. User configuration file
/// 4. Environment variables
pub fn load_config() -> Result<Config> {
    Config::load()
}

/// Format a playback position for display
///
/// Renders "MM:SS", or "H:MM:SS" once the position reaches an hour.
/// Non-finite positions (an unknown live duration) render as "00:00".
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "00:00".to_string();
    }

    let total_secs = seconds.max(0.0) as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Clamp a value between min and max
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}
