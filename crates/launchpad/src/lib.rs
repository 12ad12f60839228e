//! # Launchpad
//!
//! A plugin-based launcher for locally started products.
//!
//! ## Overview
//!
//! Products (servers, solvers, tools) are started through launcher plugins.
//! Each plugin handles one launch mode of one product, such as running a
//! local binary or a container, and declares the endpoints it serves.
//! Launchpad resolves which plugin and configuration to use, runs the
//! plugin's lifecycle, and stops what it started.
//!
//! ## Architecture
//!
//! ```text
//! launch_product ──▶ ConfigStore ──▶ PluginRegistry ──▶ Launcher plugin
//!                    (mode, config)  (product.mode)    (start/stop/check)
//!                                                              │
//!                    ProductInstance ◀─────────────────────────┘
//!                    (urls, gRPC channels, safety net)
//! ```
//!
//! - **Plugins**: types implementing [`Launcher`](prelude::Launcher), registered
//!   with `#[register_launcher(product = "...", mode = "...")]`
//! - **Registry**: every linked plugin, keyed by product and launch mode
//! - **Store**: the default launch mode and configuration of each product
//! - **Instance**: a started product, stopped again when dropped
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use launchpad::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(PluginRegistry::discover()?);
//!     let store = ConfigStore::from_settings(registry, &load_settings()?)?;
//!
//!     let mut instance = launch_product(&store, "echo", None, None)?;
//!     instance.wait(Duration::from_secs(10))?;
//!     instance.stop(None)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read launcher settings from `launchpad.toml` (default)
//! - `json-log`: JSON log output
//! - `cli`: the `launchpad` command-line interface

pub use launchpad_core as core;
pub use launchpad_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use launchpad::prelude::*;
/// ```
pub mod prelude {
    // Launching products
    pub use launchpad_runtime::{
        ConfigStore, InstanceScope, ProductInstance, launch_product, launch_product_with,
        load_settings,
    };

    // Writing launcher plugins
    pub use launchpad_core::{
        BoxError, Launcher, LauncherConfig, ServerType, register_launcher,
    };

    // Plugin resolution
    pub use launchpad_core::{FALLBACK_LAUNCH_MODE, LauncherDescriptor, PluginRegistry};

    // gRPC endpoints
    pub use launchpad_core::{ChannelFactory, GrpcChannel};

    // Errors
    pub use launchpad_core::{LaunchError, LaunchResult};
    pub use launchpad_runtime::{RuntimeError, RuntimeResult};
}
