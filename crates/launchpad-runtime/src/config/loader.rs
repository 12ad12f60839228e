//! Settings loader using figment.
//!
//! # Settings Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Settings file (`launchpad.toml`)
//! 3. Environment variables (`LAUNCHPAD_*`)
//! 4. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `LAUNCHPAD_` prefix with `__`
//! as separator:
//!
//! - `LAUNCHPAD_CONFIG_PATH=/tmp/launchers.json` → `config_path = "/tmp/launchers.json"`
//! - `LAUNCHPAD_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! # Example
//!
//! ```rust,ignore
//! use launchpad_runtime::config::SettingsLoader;
//!
//! let settings = SettingsLoader::new().load()?;
//! let store_path = settings.store_path()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::{APP_DIR_NAME, LaunchpadSettings};

/// Settings file searched for in the search paths.
pub const SETTINGS_FILE_NAME: &str = "launchpad.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LAUNCHPAD_";

/// Settings loader with figment-based multi-source support.
pub struct SettingsLoader {
    /// Programmatic overrides.
    figment: Figment,
    /// Search paths for the settings file.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific settings file to load (overrides search).
    settings_file: Option<PathBuf>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Creates a new settings loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            settings_file: None,
        }
    }

    /// Adds a search path for the settings file.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific settings file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.settings_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges settings programmatically, on top of every other source.
    pub fn merge(mut self, settings: LaunchpadSettings) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(settings));
        self
    }

    /// Loads and returns the settings.
    pub fn load(self) -> ConfigResult<LaunchpadSettings> {
        let figment = self.build_figment()?;
        let settings: LaunchpadSettings = figment.extract()?;

        debug!(
            config_path = ?settings.config_path,
            logging_level = %settings.logging.level,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(LaunchpadSettings::default()));

        if let Some(path) = self.settings_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading settings file");
            figment = Self::merge_settings_file(figment, &path)?;
        } else if let Some(path) = self.find_settings_file() {
            info!(path = %path.display(), "Loading settings file");
            figment = Self::merge_settings_file(figment, &path)?;
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment.merge(self.figment))
    }

    /// Merges a single settings file, dispatching on its extension.
    fn merge_settings_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => {
                let _ = figment;
                Err(ConfigError::UnsupportedFormat(ext.to_string()))
            }
        }
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join(APP_DIR_NAME));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    fn find_settings_file(&self) -> Option<PathBuf> {
        self.resolve_search_paths()
            .into_iter()
            .map(|dir| dir.join(SETTINGS_FILE_NAME))
            .find(|path| path.exists())
    }
}

/// Loads settings from the default locations and the environment.
pub fn load_settings() -> ConfigResult<LaunchpadSettings> {
    SettingsLoader::new().load()
}

// =============================================================================
// Tests
// =============================================================================
