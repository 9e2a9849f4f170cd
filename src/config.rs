//! ==============================================================================
//! config.rs - panel configuration loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `panel.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - DeviceConfig: where the printer lives and how long to wait on it.
//!     - PollingConfig: log poll period and the startup delay.
//!     - LoggingConfig: tracing filter and whether to echo device logs.
//!     - MirrorConfig: optional local json mirror of the cached status.
//!
//! every section and field is optional; missing ones take the defaults below.
//!
//! ==============================================================================

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PanelConfig {
    pub device: DeviceConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
    pub mirror: MirrorConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub log_interval_ms: u64,
    pub startup_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_logs: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MirrorConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://lifepath.local".to_string(),
            timeout_ms: crate::device::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { log_interval_ms: 1_000, startup_delay_ms: 100 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_logs: true }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self { enabled: false, bind: "127.0.0.1:3000".to_string() }
    }
}

impl PollingConfig {
    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms.max(1))
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

impl PanelConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// first panel.toml found in the usual places
    pub fn discover() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config").join("panel.toml"),
            PathBuf::from("..").join("config").join("panel.toml"),
        ];
        paths.into_iter().find(|path| path.exists())
    }

    /// Load from `path`, or from a discovered file, or fall back to defaults.
    /// an explicit path that fails to load is an error; a discovered one
    /// falls back with a warning.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = path {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        match Self::discover() {
            Some(found) => match Self::load(&found) {
                Ok(config) => Ok((config, Some(found))),
                Err(e) => {
                    eprintln!("[CONFIG] Warning: Failed to load {}: {:#}", found.display(), e);
                    Ok((Self::default(), None))
                }
            },
            None => Ok((Self::default(), None)),
        }
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!("[CONFIG] Device: {}", self.device.base_url);
        tracing::info!("[CONFIG] Timeout: {}ms", self.device.timeout_ms);
        tracing::info!("[CONFIG] Log poll interval: {}ms", self.polling.log_interval_ms);
        tracing::info!("[CONFIG] Log level: {}", self.logging.level);
        if self.mirror.enabled {
            tracing::info!("[CONFIG] Mirror: http://{}", self.mirror.bind);
        }
    }
}
