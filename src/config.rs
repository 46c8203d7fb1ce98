//! Config module.
//! Manages I/O for fensnap.json (backend URL, timeouts, capture directory).
//! Uses serde for JSON serialization.
//! A missing file yields defaults; `FENSNAP_API_URL` overrides the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "fensnap.json";
pub const API_URL_ENV: &str = "FENSNAP_API_URL";
const DEFAULT_API_URL: &str = "https://chess-ai-python-backend-production.up.railway.app/";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the detection backend; `detect` is resolved against it.
    pub api_url: String,
    pub timeout_secs: u64,
    pub capture_dir: PathBuf,
    pub jpeg_quality: u8,
    /// Edge length of the square annotated preview.
    pub preview_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
            capture_dir: PathBuf::from("captures"),
            jpeg_quality: 90,
            preview_size: 800,
        }
    }
}

impl Config {
    /// Applies `FENSNAP_API_URL` when it is set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        self.with_api_url_override(std::env::var(API_URL_ENV).ok())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            anyhow::bail!("jpeg_quality must be within 1..=100, got {}", self.jpeg_quality);
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        if self.preview_size == 0 {
            anyhow::bail!("preview_size must be at least 1");
        }
        Ok(())
    }

    pub fn with_api_url_override(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        self
    }
}

/// Loads config from `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed config: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, json).with_context(|| format!("Failed to write config: {}", path.display()))?;
    Ok(())
}
