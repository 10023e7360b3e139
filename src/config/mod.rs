//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Status channel the persistent indicator is attached to
    pub channel: ChannelConfig,

    /// Persistent indicator contents
    pub indicator: IndicatorConfig,

    /// Wake guard configuration
    pub wake: WakeConfig,

    /// Session keeper runtime configuration
    pub session: SessionConfig,

    /// Logging level
    pub log_level: String,

    /// File-based logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    /// Stable channel identifier, reused across registrations
    pub id: String,

    /// Human-readable channel name
    pub name: String,

    /// Human-readable channel description
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Indicator title line
    pub title: String,

    /// Indicator body line
    pub body: String,

    /// Icon name resolved by the host notification backend
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WakeConfig {
    /// Hard upper bound on a single wake guard hold, in seconds
    pub max_hold_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Marker file recording the command to redeliver after a relaunch
    pub restart_marker_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Absolute or relative path to the rolling log file
    pub file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            indicator: IndicatorConfig::default(),
            wake: WakeConfig::default(),
            session: SessionConfig::default(),
            log_level: "info".to_string(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            id: "screen_sharing_channel".to_string(),
            name: "Screen Sharing Service".to_string(),
            description: "Keeps screen sharing active in background".to_string(),
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            title: "Screen Sharing Active".to_string(),
            body: "Tap to return to app".to_string(),
            icon: "video-display".to_string(),
        }
    }
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            max_hold_secs: 24 * 60 * 60, // 24 hour safety bound
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restart_marker_path: ".screenkeeper-restart".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: "logs/screenkeeper.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        // SCREENKEEPER_CHANNEL_ID - status channel identifier
        if let Ok(id) = env::var("SCREENKEEPER_CHANNEL_ID") {
            if !id.trim().is_empty() {
                self.channel.id = id;
            }
        }

        // SCREENKEEPER_CHANNEL_NAME - status channel name
        if let Ok(name) = env::var("SCREENKEEPER_CHANNEL_NAME") {
            if !name.trim().is_empty() {
                self.channel.name = name;
            }
        }

        // SCREENKEEPER_INDICATOR_TITLE - indicator title line
        if let Ok(title) = env::var("SCREENKEEPER_INDICATOR_TITLE") {
            if !title.trim().is_empty() {
                self.indicator.title = title;
            }
        }

        // SCREENKEEPER_INDICATOR_BODY - indicator body line
        if let Ok(body) = env::var("SCREENKEEPER_INDICATOR_BODY") {
            self.indicator.body = body;
        }

        // SCREENKEEPER_WAKE_MAX_HOLD_SECS - wake guard safety bound
        if let Ok(max_hold) = env::var("SCREENKEEPER_WAKE_MAX_HOLD_SECS") {
            if let Ok(value) = max_hold.parse::<u64>() {
                self.wake.max_hold_secs = value;
            }
        }

        // SCREENKEEPER_RESTART_MARKER_PATH - redelivery marker location
        if let Ok(marker) = env::var("SCREENKEEPER_RESTART_MARKER_PATH") {
            if !marker.trim().is_empty() {
                self.session.restart_marker_path = marker;
            }
        }

        // SCREENKEEPER_LOG_LEVEL - logging level
        if let Ok(log_level) = env::var("SCREENKEEPER_LOG_LEVEL") {
            self.log_level = log_level;
        }

        // SCREENKEEPER_LOG_FILE_PATH - logging destination file
        if let Ok(file_path) = env::var("SCREENKEEPER_LOG_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.log.file_path = file_path;
            }
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!("Failed to load config: {}, using defaults", err);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.channel.id.trim().is_empty() {
            anyhow::bail!("Channel id must not be empty");
        }

        if self.channel.id.contains(char::is_whitespace) {
            anyhow::bail!("Channel id must not contain whitespace: {}", self.channel.id);
        }

        if self.channel.name.trim().is_empty() {
            anyhow::bail!("Channel name must not be empty");
        }

        if self.indicator.title.trim().is_empty() {
            anyhow::bail!("Indicator title must not be empty");
        }

        if self.wake.max_hold_secs == 0 {
            anyhow::bail!("Wake guard max hold must be greater than 0");
        }

        if self.session.restart_marker_path.trim().is_empty() {
            anyhow::bail!("Restart marker path must not be empty");
        }

        if self.log.file_path.trim().is_empty() {
            anyhow::bail!("Log file path must not be empty");
        }

        Ok(())
    }

    /// Display formatted configuration
    pub fn display(&self) -> Result<()> {
        println!("Current configuration:");
        println!("{:#?}", self);
        Ok(())
    }

    /// Display configuration summary
    pub fn display_summary(&self) -> Result<()> {
        println!("Configuration loaded successfully");
        Ok(())
    }

    /// Display configuration management help
    pub fn display_help() -> Result<()> {
        println!("Configuration management commands:");
        println!("  screenkeeper config show  - Show current configuration");
        println!("  screenkeeper config reset - Show default configuration");
        Ok(())
    }

    /// Handle configuration command
    pub fn handle_command(
        action: &Option<crate::cli::ConfigAction>,
        config_file: &str,
    ) -> Result<()> {
        match action {
            Some(crate::cli::ConfigAction::Show) => {
                let config = Config::load_or_default(config_file);
                config.display()?;
            }
            Some(crate::cli::ConfigAction::Reset) => {
                let default_config = Config::default();
                default_config.display()?;
            }
            None => {
                Config::display_help()?;
            }
        }
        Ok(())
    }
}
