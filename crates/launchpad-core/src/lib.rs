//! # Launchpad Core
//!
//! Contracts and building blocks of the Launchpad product launcher.
//!
//! ## Layers
//!
//! ### Contract Layer
//!
//! What a launcher plugin must provide:
//! - **Launcher**: start/stop/check/urls over one external service ([`Launcher`])
//! - **Configuration**: serde-backed typed configuration ([`LauncherConfig`])
//! - **Endpoints**: declared endpoint kinds ([`ServerSpec`], [`ServerType`])
//!
//! ### Resolution Layer
//!
//! How a `(product, launch mode)` pair becomes a launcher:
//! - **Descriptors**: static, `Copy` plugin handles ([`LauncherDescriptor`])
//! - **Discovery**: link-time registration via `#[register_launcher]`
//! - **Registry**: validated lookup with a reserved fallback mode ([`PluginRegistry`])
//!
//! ### Support Layer
//!
//! - **Channels**: gRPC channel handles and transport options ([`GrpcChannel`])
//! - **Helpers**: free ports, install roots, child processes, TCP probes ([`helpers`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use launchpad_core::{register_launcher, Launcher, LauncherConfig, ServerType};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, LauncherConfig)]
//! pub struct EchoConfig {
//!     /// Port of the HTTP server.
//!     #[serde(default)]
//!     pub port: u16,
//! }
//!
//! #[register_launcher(product = "echo", mode = "direct")]
//! pub struct EchoLauncher { /* ... */ }
//!
//! impl Launcher for EchoLauncher {
//!     type Config = EchoConfig;
//!     const SERVER_SPEC: &'static [(&'static str, ServerType)] = &[("main", ServerType::Generic)];
//!     // ...
//! }
//! ```

// Lets the derive macros resolve `::launchpad_core` inside this crate.
extern crate self as launchpad_core;

pub mod channel;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod helpers;
pub mod interface;
pub mod registry;

#[doc(hidden)]
pub use linkme;

pub use channel::{ChannelFactory, GrpcChannel, InsecureChannelFactory, TransportMode, TransportOptions};
pub use config::{ConfigField, ConfigType, ErasedConfig, LauncherConfig, SharedConfig};
pub use descriptor::{FALLBACK_LAUNCH_MODE, LAUNCHER_REGISTRY, LauncherDescriptor};
pub use error::{BoxError, LaunchError, LaunchResult};
pub use interface::{BoxedLauncher, DynLauncher, Launcher, ServerSpec, ServerType};
pub use registry::{LinkedPlugins, ModeMap, PluginRegistry, PluginSource};

pub use launchpad_macros::{LauncherConfig, register_launcher};
