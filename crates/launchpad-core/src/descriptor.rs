//! Launcher descriptor: the static, `Copy` handle to a launcher plugin.

use linkme::distributed_slice;

use crate::config::{ConfigType, ErasedConfig};
use crate::error::LaunchResult;
use crate::interface::{BoxedLauncher, Launcher, ServerSpec, ServerType};

/// Reserved launch mode under which a product's fallback launcher is registered.
pub const FALLBACK_LAUNCH_MODE: &str = "__fallback__";

// ─── LauncherDescriptor ─────────────────────────────────────────────────────────

/// A static, `Copy` descriptor that identifies and instantiates a launcher.
///
/// # Creating descriptors
///
/// Use `#[register_launcher(product = "...", mode = "...")]` on the launcher
/// type, or [`LauncherDescriptor::of`] for manual registration.
#[derive(Debug, Clone, Copy)]
pub struct LauncherDescriptor {
    /// Product name.
    pub product: &'static str,

    /// Launch mode, or [`FALLBACK_LAUNCH_MODE`].
    pub mode: &'static str,

    launcher_name: fn() -> &'static str,

    /// Configuration type the launcher accepts.
    pub config_type: ConfigType,

    /// Declared endpoints of the launcher.
    pub server_spec: &'static [(&'static str, ServerType)],

    create: fn(&dyn ErasedConfig) -> LaunchResult<BoxedLauncher>,
}

impl LauncherDescriptor {
    /// Describes launcher `L` registered under `product` / `mode`.
    pub const fn of<L: Launcher>(product: &'static str, mode: &'static str) -> Self {
        Self {
            product,
            mode,
            launcher_name: std::any::type_name::<L>,
            config_type: ConfigType::of::<L::Config>(),
            server_spec: L::SERVER_SPEC,
            create: create_erased::<L>,
        }
    }

    /// Returns `true` if this descriptor is a product's fallback.
    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.mode == FALLBACK_LAUNCH_MODE
    }

    /// Name of the launcher type, for logs.
    pub fn launcher_name(&self) -> &'static str {
        (self.launcher_name)()
    }

    /// Dotted `product.mode` key used in logs and errors.
    pub fn key(&self) -> String {
        format!("{}.{}", self.product, self.mode)
    }

    /// The declared server spec.
    pub fn server_spec(&self) -> ServerSpec {
        ServerSpec::from_static(self.server_spec)
    }

    /// Creates the launcher from a configuration of the registered type.
    ///
    /// Fails with [`LaunchError::TypeMismatch`] for any other type.
    pub fn instantiate(&self, config: &dyn ErasedConfig) -> LaunchResult<BoxedLauncher> {
        (self.create)(config)
    }
}

fn create_erased<L: Launcher>(config: &dyn ErasedConfig) -> LaunchResult<BoxedLauncher> {
    let config = config.expect_type::<L::Config>()?.clone();
    Ok(Box::new(L::new(config)))
}

// ─── Discovery ──────────────────────────────────────────────────────────────────

/// Launchers registered at link time through `#[register_launcher]`.
#[distributed_slice]
pub static LAUNCHER_REGISTRY: [LauncherDescriptor];

