//! Settings of the launcher itself.
//!
//! These are the launcher's own settings (store location, logging), loaded
//! with figment from a TOML file and `LAUNCHPAD_*` environment variables.
//! Product configurations live in the [`ConfigStore`](crate::ConfigStore).

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{SettingsLoader, load_settings};
pub use schema::{
    CONFIG_PATH_ENV, LaunchpadSettings, LogFormat, LogLevel, LogOutput, LoggingConfig,
};
