//! Configuration module for visionflow
//!
//! This module handles application configuration including:
//! - The annotation boundary (endpoint, paths, poll window, JPEG quality)
//! - Operator defaults (Limit size, simulated processing delay)
//! - The logging filter used when `RUST_LOG` is not set
//!
//! # Config Location
//!
//! The configuration file is stored in the platform-appropriate location:
//! - **Linux**: `~/.config/dev.visionflow/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.visionflow/config.toml`
//! - **Windows**: `%APPDATA%\dev.visionflow\config.toml`
//!
//! Every field has a default, so a partial file (or no file) is valid.
//!
//! # Example
//!
//! ```ignore
//! use visionflow::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default(AppConfig::default_path());
//! config.operators.default_limit = 10;
//! config.save("visionflow.toml")?;
//! ```

use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "dev.visionflow";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default delay before the first annotation scan in milliseconds
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 5_000;

/// Default interval between annotation scans in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Default total annotation wait in milliseconds
pub const DEFAULT_MAX_WAIT_MS: u64 = 60_000;

/// Default JPEG quality for materialized uploads
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Default HTTP request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,visionflow=debug";

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

// ==================== Annotation Config ====================

/// When the poll loop stops scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PollCompletion {
    /// Stop at the first scan that returns any record
    #[default]
    FirstNonEmpty,
    /// Keep scanning until at least one usable record per submitted image
    AwaitAll,
}

/// Settings for the external annotation boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Base URL of the annotation API
    pub endpoint: String,

    /// Path of the upload call, appended to `endpoint`
    pub upload_path: String,

    /// Path of the retrieval call, appended to `endpoint`
    pub records_path: String,

    /// Delay before the first scan
    pub initial_delay_ms: u64,

    /// Delay between scans
    pub poll_interval_ms: u64,

    /// Total wait, measured from before the initial delay
    pub max_wait_ms: u64,

    /// Stop rule for the poll loop
    pub completion: PollCompletion,

    /// JPEG quality (1-100) for materialized images
    pub jpeg_quality: u8,

    /// Per-request HTTP timeout
    pub request_timeout_ms: u64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000".to_string(),
            upload_path: "/api/upload".to_string(),
            records_path: "/api/annotations".to_string(),
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            completion: PollCompletion::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl AnnotationConfig {
    pub fn upload_url(&self) -> String {
        join_url(&self.endpoint, &self.upload_path)
    }

    pub fn records_url(&self) -> String {
        join_url(&self.endpoint, &self.records_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// JPEG quality clamped to the encoder's valid range
    pub fn quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ==================== Operator Config ====================

/// Defaults applied to operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Record count of newly created Limit nodes
    pub default_limit: usize,

    /// Simulated processing delay applied to every run (0 = none)
    pub processing_delay_ms: u64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            default_limit: crate::graph::DEFAULT_LIMIT,
            processing_delay_ms: 0,
        }
    }
}

impl OperatorConfig {
    pub fn processing_delay(&self) -> Option<Duration> {
        (self.processing_delay_ms > 0).then(|| Duration::from_millis(self.processing_delay_ms))
    }
}

// ==================== Logging Config ====================

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Annotation boundary settings
    pub annotation: AnnotationConfig,

    /// Operator defaults
    pub operators: OperatorConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Default config file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        config_dir().map(|p| p.join(CONFIG_FILE))
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            FlowError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load a config file, returning defaults if it is missing or invalid
    pub fn load_or_default(path: Option<impl AsRef<Path>>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    FlowError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| FlowError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            FlowError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
