//! Plugin registry resolving `(product, launch mode)` pairs to launchers.
//!
//! The registry is built once from a [`PluginSource`] and never mutated
//! afterwards. Keys are validated at construction: product and mode names
//! must be non-empty, contain no `.`, and be unique.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::ConfigType;
use crate::descriptor::{FALLBACK_LAUNCH_MODE, LAUNCHER_REGISTRY, LauncherDescriptor};
use crate::error::{LaunchError, LaunchResult};

/// Launchers of one product, keyed by launch mode.
pub type ModeMap = BTreeMap<String, LauncherDescriptor>;

// =============================================================================
// PluginSource
// =============================================================================

/// Enumerates the launcher bindings available to a registry.
pub trait PluginSource {
    /// Returns every available launcher descriptor.
    fn discover(&self) -> Vec<LauncherDescriptor>;
}

/// Launchers linked into the binary through `#[register_launcher]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedPlugins;

impl PluginSource for LinkedPlugins {
    fn discover(&self) -> Vec<LauncherDescriptor> {
        LAUNCHER_REGISTRY.to_vec()
    }
}

impl PluginSource for [LauncherDescriptor] {
    fn discover(&self) -> Vec<LauncherDescriptor> {
        self.to_vec()
    }
}

// =============================================================================
// PluginRegistry
// =============================================================================

/// Immutable index of launcher descriptors.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, ModeMap>,
}

impl PluginRegistry {
    /// Builds a registry from the launchers linked into the binary.
    pub fn discover() -> LaunchResult<Self> {
        Self::from_source(&LinkedPlugins)
    }

    /// Builds a registry from any plugin source.
    pub fn from_source<S: PluginSource + ?Sized>(source: &S) -> LaunchResult<Self> {
        Self::from_descriptors(source.discover())
    }

    /// Builds a registry from a discovery function.
    pub fn from_fn<F>(discover: F) -> LaunchResult<Self>
    where
        F: FnOnce() -> Vec<LauncherDescriptor>,
    {
        Self::from_descriptors(discover())
    }

    /// Builds a registry from explicit descriptors.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = LauncherDescriptor>,
    ) -> LaunchResult<Self> {
        let mut plugins: BTreeMap<String, ModeMap> = BTreeMap::new();

        for desc in descriptors {
            validate_name(desc.product)?;
            validate_name(desc.mode)?;
            validate_server_spec(&desc)?;

            let modes = plugins.entry(desc.product.to_string()).or_default();
            if modes.contains_key(desc.mode) {
                return Err(LaunchError::DuplicatePlugin {
                    product: desc.product.to_string(),
                    mode: desc.mode.to_string(),
                });
            }
            trace!(
                plugin = %desc.key(),
                launcher = desc.launcher_name(),
                config = desc.config_type.name(),
                "Registered launcher"
            );
            modes.insert(desc.mode.to_string(), desc);
        }

        debug!(
            products = plugins.len(),
            launchers = plugins.values().map(BTreeMap::len).sum::<usize>(),
            "Plugin registry built"
        );
        Ok(Self { plugins })
    }

    /// Returns the descriptor registered for exactly this pair.
    pub fn resolve(&self, product: &str, mode: &str) -> LaunchResult<&LauncherDescriptor> {
        self.plugins
            .get(product)
            .and_then(|modes| modes.get(mode))
            .ok_or_else(|| LaunchError::plugin_not_found(product, mode))
    }

    /// Returns the configuration type registered for this pair.
    pub fn resolve_config_type(&self, product: &str, mode: &str) -> LaunchResult<ConfigType> {
        self.resolve(product, mode).map(|desc| desc.config_type)
    }

    /// Returns `true` if `product` registers a fallback launcher.
    pub fn has_fallback(&self, product: &str) -> bool {
        self.plugins
            .get(product)
            .is_some_and(|modes| modes.contains_key(FALLBACK_LAUNCH_MODE))
    }

    /// Returns the fallback launcher of `product`.
    pub fn resolve_fallback(&self, product: &str) -> LaunchResult<&LauncherDescriptor> {
        self.plugins
            .get(product)
            .and_then(|modes| modes.get(FALLBACK_LAUNCH_MODE))
            .ok_or_else(|| LaunchError::FallbackNotFound {
                product: product.to_string(),
            })
    }

    /// Full inventory without fallback modes.
    ///
    /// Products that only register a fallback launcher are omitted.
    pub fn list_all(&self) -> BTreeMap<String, ModeMap> {
        self.plugins
            .iter()
            .filter_map(|(product, modes)| {
                let visible: ModeMap = modes
                    .iter()
                    .filter(|(_, desc)| !desc.is_fallback())
                    .map(|(mode, desc)| (mode.clone(), *desc))
                    .collect();
                (!visible.is_empty()).then(|| (product.clone(), visible))
            })
            .collect()
    }

    /// Full inventory including fallback modes.
    pub fn list_all_with_fallback(&self) -> &BTreeMap<String, ModeMap> {
        &self.plugins
    }

    /// Number of registered launchers, fallbacks included.
    pub fn len(&self) -> usize {
        self.plugins.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if no launcher is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

fn validate_name(name: &'static str) -> LaunchResult<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains('.') {
        "name contains '.'"
    } else {
        return Ok(());
    };
    Err(LaunchError::InvalidPluginKey {
        key: name.to_string(),
        reason,
    })
}

fn validate_server_spec(desc: &LauncherDescriptor) -> LaunchResult<()> {
    for (i, (key, _)) in desc.server_spec.iter().enumerate() {
        if desc.server_spec[..i].iter().any(|(seen, _)| seen == key) {
            return Err(LaunchError::DuplicateServerKey {
                plugin: desc.key(),
                key: (*key).to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::{BoxError, Launcher, LauncherConfig, ServerType};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct ConfigA {
        #[serde(default)]
        value: u32,
    }
    impl LauncherConfig for ConfigA {}

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct ConfigB {
        #[serde(default)]
        name: String,
    }
    impl LauncherConfig for ConfigB {}

    struct LauncherA;
    impl Launcher for LauncherA {
        type Config = ConfigA;
        const SERVER_SPEC: &'static [(&'static str, ServerType)] = &[];
        fn new(_: ConfigA) -> Self {
            Self
        }
        fn start(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
        fn stop(&mut self, _: Option<Duration>) -> Result<(), BoxError> {
            Ok(())
        }
        fn check(&self, _: Option<Duration>) -> bool {
            true
        }
        fn urls(&self) -> BTreeMap<String, String> {
            BTreeMap::new()
        }
    }

    struct LauncherB;
    impl Launcher for LauncherB {
        type Config = ConfigB;
        const SERVER_SPEC: &'static [(&'static str, ServerType)] = &[];
        fn new(_: ConfigB) -> Self {
            Self
        }
        fn start(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
        fn stop(&mut self, _: Option<Duration>) -> Result<(), BoxError> {
            Ok(())
        }
        fn check(&self, _: Option<Duration>) -> bool {
            true
        }
        fn urls(&self) -> BTreeMap<String, String> {
            BTreeMap::new()
        }
    }

    struct DoubleMainLauncher;
    impl Launcher for DoubleMainLauncher {
        type Config = ConfigA;
        const SERVER_SPEC: &'static [(&'static str, ServerType)] =
            &[("main", ServerType::Grpc), ("main", ServerType::Generic)];
        fn new(_: ConfigA) -> Self {
            Self
        }
        fn start(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
        fn stop(&mut self, _: Option<Duration>) -> Result<(), BoxError> {
            Ok(())
        }
        fn check(&self, _: Option<Duration>) -> bool {
            true
        }
        fn urls(&self) -> BTreeMap<String, String> {
            BTreeMap::new()
        }
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::from_descriptors([
            LauncherDescriptor::of::<LauncherA>("alpha", "direct"),
            LauncherDescriptor::of::<LauncherB>("alpha", "docker"),
            LauncherDescriptor::of::<LauncherA>("alpha", FALLBACK_LAUNCH_MODE),
            LauncherDescriptor::of::<LauncherB>("beta", FALLBACK_LAUNCH_MODE),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_round_trip() {
        let reg = registry();
        assert_eq!(
            reg.resolve_config_type("alpha", "direct").unwrap(),
            ConfigType::of::<ConfigA>()
        );
        assert_eq!(
            reg.resolve_config_type("alpha", "docker").unwrap(),
            ConfigType::of::<ConfigB>()
        );
        assert!(reg.resolve("alpha", "missing").unwrap_err().is_not_found());
        assert!(reg.resolve("gamma", "direct").unwrap_err().is_not_found());
    }

    #[test]
    fn test_fallback_is_hidden_from_listing() {
        let reg = registry();
        let listed = reg.list_all();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            listed["alpha"].keys().collect::<Vec<_>>(),
            vec!["direct", "docker"]
        );
        assert_eq!(reg.list_all_with_fallback().len(), 2);
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn test_fallback_accessors() {
        let reg = registry();
        assert!(reg.has_fallback("alpha"));
        assert!(reg.has_fallback("beta"));
        assert!(!reg.has_fallback("gamma"));
        assert!(reg.resolve_fallback("beta").unwrap().is_fallback());
        assert!(matches!(
            reg.resolve_fallback("gamma"),
            Err(LaunchError::FallbackNotFound { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_keys() {
        let dup = PluginRegistry::from_descriptors([
            LauncherDescriptor::of::<LauncherA>("alpha", "direct"),
            LauncherDescriptor::of::<LauncherB>("alpha", "direct"),
        ]);
        assert!(matches!(dup, Err(LaunchError::DuplicatePlugin { .. })));

        let dotted =
            PluginRegistry::from_descriptors([LauncherDescriptor::of::<LauncherA>("a.b", "direct")]);
        assert!(matches!(dotted, Err(LaunchError::InvalidPluginKey { .. })));

        let empty = PluginRegistry::from_descriptors([LauncherDescriptor::of::<LauncherA>("a", "")]);
        assert!(matches!(empty, Err(LaunchError::InvalidPluginKey { .. })));
    }

    #[test]
    fn test_rejects_repeated_server_spec_key() {
        let err = PluginRegistry::from_descriptors([LauncherDescriptor::of::<DoubleMainLauncher>(
            "alpha", "direct",
        )])
        .unwrap_err();
        match err {
            LaunchError::DuplicateServerKey { plugin, key } => {
                assert_eq!(plugin, "alpha.direct");
                assert_eq!(key, "main");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sources() {
        let reg =
            PluginRegistry::from_fn(|| vec![LauncherDescriptor::of::<LauncherA>("alpha", "direct")])
                .unwrap();
        assert!(reg.resolve("alpha", "direct").is_ok());

        let descriptors = [LauncherDescriptor::of::<LauncherB>("beta", "direct")];
        let reg = PluginRegistry::from_source(&descriptors[..]).unwrap();
        assert!(reg.resolve("beta", "direct").is_ok());
    }

    #[test]
    fn test_instantiate_checks_config_type() {
        let reg = registry();
        let desc = reg.resolve("alpha", "direct").unwrap();
        assert!(desc.instantiate(&ConfigA::default()).is_ok());
        let err = desc.instantiate(&ConfigB::default()).err().unwrap();
        assert!(err.is_type_mismatch());
    }
}
