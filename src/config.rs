//! Configuration management for bridgectl.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values
//!
//! The user-editable part of the configuration ([`Settings`]) is served to
//! the rest of the crate through the [`SettingsProvider`] trait.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cli::Args;
use crate::error::BridgeError;
use crate::Result;

/// Default device polling interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
/// Lower bound for the polling interval.
pub const MIN_POLL_INTERVAL_MS: u64 = 500;
/// Upper bound for the polling interval.
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// User-editable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Bridge executable override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adb_path: Option<String>,
    /// Directory where saved logs go.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_directory: Option<String>,
    /// Device polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            adb_path: None,
            log_directory: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Settings {
    /// Trim paths, make them absolute and clamp the polling interval.
    pub fn normalized(self) -> Self {
        Self {
            adb_path: normalize_path(self.adb_path.as_deref()),
            log_directory: normalize_path(self.log_directory.as_deref()),
            poll_interval_ms: self
                .poll_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        }
    }

    /// Apply a partial update.
    pub fn merged(&self, patch: SettingsPatch) -> Self {
        Self {
            adb_path: patch.adb_path.or_else(|| self.adb_path.clone()),
            log_directory: patch.log_directory.or_else(|| self.log_directory.clone()),
            poll_interval_ms: patch.poll_interval_ms.unwrap_or(self.poll_interval_ms),
        }
        .normalized()
    }
}

/// Partial settings update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub adb_path: Option<String>,
    pub log_directory: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

fn normalize_path(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let path = Path::new(trimmed);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    Some(absolute.display().to_string())
}

/// Source of user settings.
pub trait SettingsProvider: Send + Sync {
    /// Current settings.
    fn get(&self) -> Settings;
    /// Apply a partial update and return the normalized result.
    fn update(&self, patch: SettingsPatch) -> Result<Settings>;
}

/// In-memory settings, optionally persisted as JSON.
#[derive(Debug)]
pub struct SettingsStore {
    current: RwLock<Settings>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// Create a store that lives only in memory.
    pub fn new(initial: Settings) -> Self {
        Self {
            current: RwLock::new(initial.normalized()),
            path: None,
        }
    }

    /// Create a store backed by a JSON file.
    ///
    /// A missing or unreadable file falls back to `defaults`.
    pub fn persistent(path: impl Into<PathBuf>, defaults: Settings) -> Self {
        let path = path.into();
        let initial = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<Settings>(&content).unwrap_or_else(|e| {
                warn!("Ignoring malformed settings file {}: {}", path.display(), e);
                defaults.clone()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => defaults,
            Err(e) => {
                warn!("Failed to read settings file {}: {}", path.display(), e);
                defaults
            }
        };

        Self {
            current: RwLock::new(initial.normalized()),
            path: Some(path),
        }
    }

    fn persist(&self, settings: &Settings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| BridgeError::Settings(format!("failed to save settings: {}", e)))?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| BridgeError::Settings(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| BridgeError::Settings(format!("failed to save settings: {}", e)))
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsProvider for SettingsStore {
    fn get(&self) -> Settings {
        self.current
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn update(&self, patch: SettingsPatch) -> Result<Settings> {
        let mut current = self
            .current
            .write()
            .map_err(|_| BridgeError::LockPoisoned)?;
        let next = current.merged(patch);
        self.persist(&next)?;
        *current = next.clone();
        Ok(next)
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User-editable settings.
    pub settings: Settings,
    /// Tool location settings.
    pub paths: PathsSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Tool location section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// Bundled resources directory (defaults to `resources/` next to the binary).
    pub resources_dir: Option<PathBuf>,
    /// Application directory holding `vendor/` (defaults to the working directory).
    pub app_dir: Option<PathBuf>,
    /// Mirroring tool override.
    pub scrcpy_path: Option<String>,
    /// File where settings updates are persisted.
    pub settings_file: Option<PathBuf>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("BRIDGECTL_ADB_PATH") {
            self.settings.adb_path = Some(path);
        }

        if let Ok(path) = std::env::var("BRIDGECTL_SCRCPY_PATH") {
            self.paths.scrcpy_path = Some(path);
        }

        if let Ok(dir) = std::env::var("BRIDGECTL_LOG_DIR") {
            self.settings.log_directory = Some(dir);
        }

        if let Ok(level) = std::env::var("BRIDGECTL_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref path) = args.adb_path {
            self.settings.adb_path = Some(path.clone());
        }

        if let Some(ref path) = args.scrcpy_path {
            self.paths.scrcpy_path = Some(path.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> std::result::Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        config.settings = config.settings.normalized();
        Ok(config)
    }

    /// Build the settings provider for this configuration.
    pub fn settings_store(&self) -> SettingsStore {
        match &self.paths.settings_file {
            Some(path) => SettingsStore::persistent(path, self.settings.clone()),
            None => SettingsStore::new(self.settings.clone()),
        }
    }

    /// Get the log filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
