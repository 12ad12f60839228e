//! Settings schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// Environment variable overriding the store file location.
pub const CONFIG_PATH_ENV: &str = "LAUNCHPAD_CONFIG_PATH";

/// Store file name inside the per-user configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Application directory name inside the per-user configuration directory.
pub const APP_DIR_NAME: &str = "launchpad";

/// Root settings structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LaunchpadSettings {
    /// Store file location; the per-user default when absent.
    #[serde(default)]
    pub config_path: Option<PathBuf>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LaunchpadSettings {
    /// Resolves the store file path.
    ///
    /// An explicit `config_path` must live in an existing directory. The
    /// default location's directory is created on demand.
    pub fn store_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.config_path {
            let parent_exists = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
                _ => true,
            };
            if !parent_exists {
                return Err(ConfigError::MissingDirectory {
                    path: path.clone(),
                    var: CONFIG_PATH_ENV,
                });
            }
            return Ok(path.clone());
        }

        let dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir {
                var: CONFIG_PATH_ENV,
            })?
            .join(APP_DIR_NAME);
        std::fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDirectory {
            path: dir.clone(),
            var: CONFIG_PATH_ENV,
            source,
        })?;
        Ok(dir.join(CONFIG_FILE_NAME))
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `launchpad_runtime = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace.
    Trace,
    /// Debug.
    Debug,
    /// Info.
    #[default]
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

impl LogLevel {
    /// Returns the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing::Level`.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line compact output.
    #[default]
    Compact,
    /// Default `tracing-subscriber` output.
    Full,
    /// Multi-line human-friendly output.
    Pretty,
    /// JSON lines; requires the `json-log` feature.
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// File at `file_path`.
    File,
}
