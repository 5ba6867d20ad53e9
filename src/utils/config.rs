//! Configuration management for mediadrain
//!
//! This module handles loading and managing pipeline configuration
//! from config files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::utils::error::{Error, Result, ResultExt};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Audio path configuration
    pub audio: AudioConfig,

    /// Video path configuration
    pub video: VideoConfig,

    /// General settings
    pub general: GeneralConfig,
}

/// Audio path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Request 32-bit float PCM instead of 16-bit integer PCM
    pub output_float: bool,
}

/// Video path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Decoder thread count (0 lets the engine decide)
    pub thread_count: usize,

    /// Queue depth above which a warning is logged
    pub queue_warn_depth: usize,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_float: false,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            thread_count: 0,
            queue_warn_depth: 16,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/mediadrain/config.toml on Linux)
    /// 3. User config file (~/.config/mediadrain/config.toml on Linux)
    /// 4. Environment variables (MEDIADRAIN_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        for path in [Self::system_config_path(), Self::user_config_path()].into_iter().flatten() {
            if path.exists() {
                config = Self::read_file(&path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a single TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the given path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .config_err("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self)
            .config_err("Failed to serialize config")?;

        std::fs::write(path, toml)
            .config_err("Failed to write config file")?;

        Ok(())
    }

    /// Parse a TOML file; missing keys keep their defaults
    fn read_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .config_err("Failed to read config file")?;

        toml::from_str(&contents)
            .config_err("Failed to parse config file")
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("MEDIADRAIN_LOG_LEVEL") {
            self.general.log_level = level;
        }

        if let Ok(float) = std::env::var("MEDIADRAIN_AUDIO_OUTPUT_FLOAT") {
            self.audio.output_float = float.parse()
                .map_err(|_| Error::Config("Invalid MEDIADRAIN_AUDIO_OUTPUT_FLOAT".to_string()))?;
        }

        if let Ok(threads) = std::env::var("MEDIADRAIN_VIDEO_THREADS") {
            self.video.thread_count = threads.parse()
                .map_err(|_| Error::Config("Invalid MEDIADRAIN_VIDEO_THREADS".to_string()))?;
        }

        if let Ok(depth) = std::env::var("MEDIADRAIN_VIDEO_QUEUE_DEPTH") {
            self.video.queue_warn_depth = depth.parse()
                .map_err(|_| Error::Config("Invalid MEDIADRAIN_VIDEO_QUEUE_DEPTH".to_string()))?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.video.queue_warn_depth == 0 {
            return Err(Error::Config("Queue warning depth must be non-zero".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(Error::Config(format!(
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
        return Some(PathBuf::from("/etc/mediadrain/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA").ok()
            .map(|p| PathBuf::from(p).join("mediadrain").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/mediadrain/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mediadrain").join("config.toml"))
    }
}
