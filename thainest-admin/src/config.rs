//! Console configuration

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use thainest_content::{
    ConsoleSettings, Locale, StoreConfig, WritePolicy, DEFAULT_API_URL, DEFAULT_ASSET_URL,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Content API connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the content API
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// What to do with a write that overlaps another on the same section
    #[serde(default)]
    pub write_policy: WritePolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_timeout(),
            write_policy: WritePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Public root the site serves images from
    #[serde(default = "default_asset_url")]
    pub base_url: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_url: default_asset_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Seconds a success or error banner stays up
    #[serde(default = "default_status_ttl")]
    pub status_ttl_secs: u64,

    /// Message language (th, en)
    #[serde(default)]
    pub locale: Locale,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            status_ttl_secs: default_status_ttl(),
            locale: Locale::default(),
        }
    }
}

// Defaults
fn default_api_url() -> String { DEFAULT_API_URL.to_string() }
fn default_asset_url() -> String { DEFAULT_ASSET_URL.to_string() }
fn default_timeout() -> u64 { 30 }
fn default_status_ttl() -> u64 { 5 }

impl ConsoleConfig {
    /// Read the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            base_url: self.api.base_url.clone(),
            timeout_secs: self.api.timeout_secs,
        }
    }

    pub fn settings(&self) -> ConsoleSettings {
        ConsoleSettings {
            status_ttl: Duration::from_secs(self.display.status_ttl_secs),
            write_policy: self.api.write_policy,
            locale: self.display.locale,
            asset_base_url: self.assets.base_url.clone(),
        }
    }
}
