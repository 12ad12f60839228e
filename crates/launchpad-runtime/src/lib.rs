//! Launchpad Runtime - Configuration and lifecycle layer of the Launchpad
//! product launcher.
//!
//! This crate provides:
//! - Product configuration storage (`ConfigStore`)
//! - Product lifecycle management (`ProductInstance`)
//! - Launch orchestration (`launch_product`)
//! - Launcher settings and logging configuration
//! - The `launchpad` command-line interface (feature `cli`)
//!
//! # Launching a product
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use launchpad_core::PluginRegistry;
//! use launchpad_runtime::{ConfigStore, launch_product, load_settings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = load_settings()?;
//!     let registry = Arc::new(PluginRegistry::discover()?);
//!     let store = ConfigStore::from_settings(registry, &settings)?;
//!
//!     let mut instance = launch_product(&store, "echo", None, None)?;
//!     instance.wait(Duration::from_secs(10))?;
//!     println!("serving at {}", instance.urls()["main"]);
//!     instance.stop(None)?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration file
//!
//! Product configurations are stored as JSON at the path named by
//! `LAUNCHPAD_CONFIG_PATH`, or in the user configuration directory.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod instance;
pub mod launch;
pub mod logging;
pub mod store;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::{
    ConfigError, ConfigResult, LaunchpadSettings, LoggingConfig, SettingsLoader, load_settings,
};
pub use error::{RuntimeError, RuntimeResult};
pub use instance::{InstanceScope, ProductInstance, SAFETY_NET_STOP_TIMEOUT};
pub use launch::{launch_product, launch_product_with};
pub use logging::{LoggingBuilder, init_from_config};
pub use store::{ConfigStore, ProductEntry, ProductRecord, StoredConfig};
