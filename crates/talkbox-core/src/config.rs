//! Persistent application configuration
//!
//! Stores device selection, sample rate, block size and engine parameters
//! in a JSON file at `<config_dir>/talkbox/config.json` unless a path is
//! given explicitly.

use crate::dsp::params::TalkBoxParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_sample_rate() -> u32 {
    crate::DEFAULT_SAMPLE_RATE
}

fn default_block_size() -> usize {
    crate::DEFAULT_BLOCK_SIZE
}

fn default_params() -> TalkBoxParams {
    TalkBoxParams::full_wet()
}

/// Persistent application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Audio device name for the live host (None = system default)
    #[serde(default)]
    pub device: Option<String>,
    /// Sample rate in Hz for the live host
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Frames handed to the engine per call
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Engine parameters (full effect unless configured)
    #[serde(default = "default_params")]
    pub params: TalkBoxParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: default_sample_rate(),
            block_size: default_block_size(),
            params: default_params(),
        }
    }
}

impl AppConfig {
    /// Default config file path: `<config_dir>/talkbox/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("talkbox")
            .join("config.json")
    }

    /// Load config from disk, falling back to defaults on any error
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded config from disk");
                    config.sanitized()
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }

    /// Block size clamped to what the hosts accept
    pub fn sanitized(mut self) -> Self {
        self.block_size = self.block_size.clamp(1, crate::MAX_BLOCK_SIZE);
        self
    }
}
