//! Configuration for dictado.
//!
//! Handles loading, saving, and providing defaults for the configuration.
//! Command-line arguments override values from the config file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// Configuration for the speech recognition model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Whisper model size to use.
    pub model: SpeechModel,
    /// Language to recognize. Use "auto" for automatic detection.
    pub language: String,
    /// Directory where model weights are cached. Defaults to the XDG cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

/// Supported Whisper model sizes, via whisper.cpp.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechModel {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    #[default]
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV3,
    LargeV3Turbo,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: LogLevel,
}

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to a tracing filter directive string for this crate.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "dictado=error",
            LogLevel::Warn => "dictado=warn",
            LogLevel::Info => "dictado=info",
            LogLevel::Debug => "dictado=debug",
            LogLevel::Trace => "dictado=trace",
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: SpeechModel::default(),
            language: "es".to_string(),
            cache_dir: None,
        }
    }
}

impl ModelConfig {
    /// Language hint passed to the model. "auto" means autodetect (no hint).
    pub fn language_hint(&self) -> Option<&str> {
        if self.language == "auto" {
            None
        } else {
            Some(&self.language)
        }
    }

    /// Directory holding model weights, honoring the configured override.
    /// `~/.cache/dictado/models/` by default.
    pub fn models_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::dirs::cache_dir().map(|p| p.join("models")),
        }
    }
}

impl Config {
    /// Returns the default config file path.
    /// `~/.config/dictado/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        crate::dirs::config_dir().map(|p| p.join("config.toml"))
    }

    /// Load configuration from the default path.
    /// Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file as TOML")
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
