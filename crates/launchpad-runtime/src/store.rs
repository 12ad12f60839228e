//! Product configuration store.
//!
//! Maps each product to its default launch mode and the configuration of
//! every configured mode. The backing file is read lazily on first access and
//! written only by [`ConfigStore::save`]:
//!
//! ```json
//! {
//!   "echo": {
//!     "launch_mode": "direct",
//!     "configs": { "direct": { "port": 8080 } }
//!   }
//! }
//! ```
//!
//! Entries read from disk stay raw JSON until first requested; they are then
//! deserialized into the registered configuration type and cached in place.
//! Entries for plugins that are not installed are kept as they are and
//! written back unchanged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use launchpad_core::{
    FALLBACK_LAUNCH_MODE, LaunchError, LauncherConfig, PluginRegistry, SharedConfig,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, trace};

use crate::config::{ConfigError, LaunchpadSettings};
use crate::error::{RuntimeError, RuntimeResult};

// =============================================================================
// Entries
// =============================================================================

/// A stored configuration, raw as read from disk or typed once resolved.
#[derive(Debug, Clone)]
pub enum StoredConfig {
    /// JSON not yet checked against the registered type.
    Raw(Value),
    /// Configuration of the registered type.
    Typed(SharedConfig),
}

impl StoredConfig {
    /// Serializes the configuration.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            Self::Raw(value) => Ok(value.clone()),
            Self::Typed(config) => config.to_value(),
        }
    }
}

/// Configuration of one product.
#[derive(Debug, Clone)]
pub struct ProductEntry {
    /// Default launch mode.
    pub launch_mode: String,
    /// Configuration per launch mode.
    pub configs: BTreeMap<String, StoredConfig>,
}

/// On-disk form of a [`ProductEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Default launch mode.
    pub launch_mode: String,
    /// Serialized configuration per launch mode.
    #[serde(default)]
    pub configs: BTreeMap<String, Value>,
}

type Products = BTreeMap<String, ProductEntry>;

// =============================================================================
// ConfigStore
// =============================================================================

/// Product configuration store bound to a plugin registry.
///
/// `ConfigStore` is `Sync`; every operation locks the in-memory state for
/// its duration.
pub struct ConfigStore {
    registry: Arc<PluginRegistry>,
    path: Option<PathBuf>,
    products: Mutex<Option<Products>>,
}

impl ConfigStore {
    /// Creates a store persisted at `path`.
    pub fn new(registry: Arc<PluginRegistry>, path: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            path: Some(path.into()),
            products: Mutex::new(None),
        }
    }

    /// Creates a store without a backing file. [`save`](Self::save) is a no-op.
    pub fn in_memory(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            path: None,
            products: Mutex::new(None),
        }
    }

    /// Creates a store at the location configured by `settings`.
    pub fn from_settings(
        registry: Arc<PluginRegistry>,
        settings: &LaunchpadSettings,
    ) -> RuntimeResult<Self> {
        Ok(Self::new(registry, settings.store_path()?))
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The registry configurations are checked against.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Reads the backing file, replacing the in-memory state.
    ///
    /// A missing file yields an empty store.
    pub fn load(&self) -> RuntimeResult<()> {
        let products = self.read_file()?;
        *self.products.lock() = Some(products);
        Ok(())
    }

    /// Discards the in-memory state; the next access reloads the file.
    pub fn reset(&self) {
        *self.products.lock() = None;
        trace!("Configuration store reset");
    }

    /// Writes every stored configuration to the backing file.
    ///
    /// Nothing is written if the store was never accessed. The whole document
    /// is serialized before the file is opened.
    pub fn save(&self) -> RuntimeResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let guard = self.products.lock();
        let Some(products) = guard.as_ref() else {
            return Ok(());
        };

        let mut records = BTreeMap::new();
        for (product, entry) in products {
            let mut configs = BTreeMap::new();
            for (mode, config) in &entry.configs {
                let value = config.to_value().map_err(|source| ConfigError::Serialize {
                    product: product.clone(),
                    mode: mode.clone(),
                    source,
                })?;
                configs.insert(mode.clone(), value);
            }
            records.insert(
                product.clone(),
                ProductRecord {
                    launch_mode: entry.launch_mode.clone(),
                    configs,
                },
            );
        }
        let json = serde_json::to_string_pretty(&records).map_err(ConfigError::Encode)?;
        drop(guard);

        std::fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), products = records.len(), "Configuration saved");
        Ok(())
    }

    fn read_file(&self) -> RuntimeResult<Products> {
        let Some(path) = &self.path else {
            return Ok(Products::new());
        };
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, starting empty");
            return Ok(Products::new());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let records: BTreeMap<String, ProductRecord> =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), products = records.len(), "Configuration loaded");

        Ok(records
            .into_iter()
            .map(|(product, record)| {
                let configs = record
                    .configs
                    .into_iter()
                    .map(|(mode, value)| (mode, StoredConfig::Raw(value)))
                    .collect();
                (
                    product,
                    ProductEntry {
                        launch_mode: record.launch_mode,
                        configs,
                    },
                )
            })
            .collect())
    }

    /// Runs `f` on the loaded products, loading them first if needed.
    fn with_products<R>(&self, f: impl FnOnce(&mut Products) -> R) -> RuntimeResult<R> {
        let mut guard = self.products.lock();
        if guard.is_none() {
            *guard = Some(self.read_file()?);
        }
        Ok(f(guard.get_or_insert_with(Products::new)))
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    /// Resolves the launch mode of `product`.
    ///
    /// An explicit mode is returned unchanged. Otherwise the stored default
    /// is used; a product without stored configuration resolves to the
    /// fallback mode if it has a fallback launcher.
    pub fn get_default_mode(&self, product: &str, mode: Option<&str>) -> RuntimeResult<String> {
        if let Some(mode) = mode {
            return Ok(mode.to_string());
        }
        let stored = self.with_products(|products| {
            products.get(product).map(|entry| entry.launch_mode.clone())
        })?;
        match stored {
            Some(mode) => Ok(mode),
            None if self.registry.has_fallback(product) => {
                debug!(product, "No stored launch mode, using fallback");
                Ok(FALLBACK_LAUNCH_MODE.to_string())
            }
            None => Err(LaunchError::ProductNotConfigured {
                product: product.to_string(),
            }
            .into()),
        }
    }

    /// Returns the configuration of `product` in `mode` (default mode if `None`).
    ///
    /// The fallback mode always yields a fresh default configuration of the
    /// fallback launcher. An unconfigured mode yields the default of its
    /// configuration type, if it has one.
    pub fn get_config(&self, product: &str, mode: Option<&str>) -> RuntimeResult<SharedConfig> {
        let mode = self.get_default_mode(product, mode)?;

        if mode == FALLBACK_LAUNCH_MODE {
            let desc = self.registry.resolve_fallback(product)?;
            return desc.config_type.default_config().ok_or_else(|| {
                LaunchError::NoDefaultConfig {
                    product: product.to_string(),
                    mode: mode.clone(),
                }
                .into()
            });
        }

        let config_type = self.registry.resolve_config_type(product, &mode)?;
        self.with_products(|products| -> Result<SharedConfig, LaunchError> {
            let slot = products
                .get_mut(product)
                .and_then(|entry| entry.configs.get_mut(&mode));
            let Some(slot) = slot else {
                return config_type
                    .default_config()
                    .ok_or_else(|| LaunchError::NoDefaultConfig {
                        product: product.to_string(),
                        mode: mode.clone(),
                    });
            };

            let value = match &*slot {
                StoredConfig::Typed(config) => {
                    config_type.check(config.as_ref())?;
                    return Ok(Arc::clone(config));
                }
                StoredConfig::Raw(value) => value.clone(),
            };
            let config = config_type
                .deserialize(value)
                .map_err(|source| LaunchError::InvalidConfig {
                    product: product.to_string(),
                    mode: mode.clone(),
                    source,
                })?;
            trace!(product, mode = %mode, "Stored configuration upgraded to typed");
            *slot = StoredConfig::Typed(Arc::clone(&config));
            Ok(config)
        })?
        .map_err(RuntimeError::from)
    }

    /// Typed variant of [`get_config`](Self::get_config).
    pub fn get_config_typed<C: LauncherConfig>(
        &self,
        product: &str,
        mode: Option<&str>,
    ) -> RuntimeResult<C> {
        let config = self.get_config(product, mode)?;
        Ok(config.expect_type::<C>()?.clone())
    }

    /// Returns whether a configuration is stored for `product` in `mode`
    /// (default mode if `None`).
    ///
    /// Resolving through the fallback mode or a type default does not count.
    /// A stored entry is validated against the registered type.
    pub fn is_configured(&self, product: &str, mode: Option<&str>) -> RuntimeResult<bool> {
        let mode = match self.get_default_mode(product, mode) {
            Ok(mode) => mode,
            Err(RuntimeError::Launch(err)) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err),
        };
        if mode == FALLBACK_LAUNCH_MODE {
            return Ok(false);
        }
        let stored = self.with_products(|products| {
            products
                .get(product)
                .is_some_and(|entry| entry.configs.contains_key(&mode))
        })?;
        if !stored {
            return Ok(false);
        }
        match self.get_config(product, Some(&mode)) {
            Ok(_) => Ok(true),
            Err(RuntimeError::Launch(err)) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Stores `config` for `product` in `mode`.
    ///
    /// The first configuration stored for a product sets its default mode.
    /// Later calls change the default only with `overwrite_default`. The
    /// configuration must be of the type registered for the pair. Only the
    /// in-memory state changes; call [`save`](Self::save) to persist.
    pub fn set_config(
        &self,
        product: &str,
        mode: &str,
        config: SharedConfig,
        overwrite_default: bool,
    ) -> RuntimeResult<()> {
        if mode == FALLBACK_LAUNCH_MODE {
            return Err(LaunchError::ReservedLaunchMode(mode.to_string()).into());
        }
        let config_type = self.registry.resolve_config_type(product, mode)?;
        config_type.check(config.as_ref())?;

        self.with_products(|products| match products.get_mut(product) {
            Some(entry) => {
                entry
                    .configs
                    .insert(mode.to_string(), StoredConfig::Typed(config));
                if overwrite_default {
                    entry.launch_mode = mode.to_string();
                }
            }
            None => {
                products.insert(
                    product.to_string(),
                    ProductEntry {
                        launch_mode: mode.to_string(),
                        configs: BTreeMap::from([(mode.to_string(), StoredConfig::Typed(config))]),
                    },
                );
            }
        })?;
        debug!(product, mode, overwrite_default, "Configuration stored");
        Ok(())
    }

    /// Typed variant of [`set_config`](Self::set_config).
    pub fn set_config_typed<C: LauncherConfig>(
        &self,
        product: &str,
        mode: &str,
        config: C,
        overwrite_default: bool,
    ) -> RuntimeResult<()> {
        self.set_config(product, mode, Arc::new(config), overwrite_default)
    }

    /// Serialized view of every stored product, for display.
    pub fn snapshot(&self) -> RuntimeResult<BTreeMap<String, ProductRecord>> {
        self.with_products(|products| -> Result<BTreeMap<String, ProductRecord>, ConfigError> {
            products
                .iter()
                .map(|(product, entry)| -> Result<(String, ProductRecord), ConfigError> {
                    let configs = entry
                        .configs
                        .iter()
                        .map(|(mode, config)| -> Result<(String, Value), ConfigError> {
                            let value = config.to_value().map_err(|source| {
                                ConfigError::Serialize {
                                    product: product.clone(),
                                    mode: mode.clone(),
                                    source,
                                }
                            })?;
                            Ok((mode.clone(), value))
                        })
                        .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;
                    Ok((
                        product.clone(),
                        ProductRecord {
                            launch_mode: entry.launch_mode.clone(),
                            configs,
                        },
                    ))
                })
                .collect::<Result<BTreeMap<_, _>, ConfigError>>()
        })?
        .map_err(RuntimeError::from)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .field("loaded", &self.products.lock().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{PathConfig, PortConfig, registry};

    fn temp_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(registry(), dir.path().join("config.json"));
        (dir, store)
    }

    #[test]
    fn test_first_write_sets_sticky_default() {
        let store = ConfigStore::in_memory(registry());
        store
            .set_config_typed("echo", "direct", PortConfig { port: 1 }, false)
            .unwrap();
        store
            .set_config_typed("echo", "docker", PortConfig { port: 2 }, false)
            .unwrap();
        assert_eq!(store.get_default_mode("echo", None).unwrap(), "direct");

        store
            .set_config_typed("echo", "docker", PortConfig { port: 3 }, true)
            .unwrap();
        assert_eq!(store.get_default_mode("echo", None).unwrap(), "docker");
        let config: PortConfig = store.get_config_typed("echo", None).unwrap();
        assert_eq!(config.port, 3);
    }

    #[test]
    fn test_explicit_mode_is_returned_unchanged() {
        let store = ConfigStore::in_memory(registry());
        assert_eq!(
            store.get_default_mode("anything", Some("whatever")).unwrap(),
            "whatever"
        );
    }

    #[test]
    fn test_unconfigured_product_uses_fallback() {
        let store = ConfigStore::in_memory(registry());
        assert_eq!(
            store.get_default_mode("echo", None).unwrap(),
            FALLBACK_LAUNCH_MODE
        );
        assert!(!store.is_configured("echo", None).unwrap());

        let config: PortConfig = store.get_config_typed("echo", None).unwrap();
        assert_eq!(config, PortConfig::default());

        let err = store.get_default_mode("solver", None).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Launch(LaunchError::ProductNotConfigured { .. })
        ));
        assert!(!store.is_configured("solver", None).unwrap());
    }

    #[test]
    fn test_unconfigured_mode_defaults() {
        let store = ConfigStore::in_memory(registry());
        let config: PortConfig = store.get_config_typed("echo", Some("docker")).unwrap();
        assert_eq!(config.port, 0);
        assert!(!store.is_configured("echo", Some("docker")).unwrap());

        let err = store.get_config("solver", Some("grpc")).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Launch(LaunchError::NoDefaultConfig { .. })
        ));
    }

    #[test]
    fn test_set_config_checks_registration_and_type() {
        let store = ConfigStore::in_memory(registry());
        let err = store
            .set_config_typed("echo", FALLBACK_LAUNCH_MODE, PortConfig::default(), false)
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Launch(LaunchError::ReservedLaunchMode(_))
        ));

        let err = store
            .set_config_typed("echo", "direct", PathConfig { binary: "x".into() }, false)
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Launch(LaunchError::TypeMismatch { .. })
        ));

        let err = store
            .set_config_typed("nope", "direct", PortConfig::default(), false)
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Launch(LaunchError::PluginNotFound { .. })
        ));
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let (_dir, store) = temp_store();
        store
            .set_config_typed("echo", "direct", PortConfig { port: 8080 }, false)
            .unwrap();
        store.save().unwrap();

        let reloaded = ConfigStore::new(registry(), store.path().unwrap());
        assert!(reloaded.is_configured("echo", None).unwrap());
        let config: PortConfig = reloaded.get_config_typed("echo", None).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_unknown_products_survive_save() {
        let (_dir, store) = temp_store();
        let path = store.path().unwrap().to_path_buf();
        let document = json!({
            "uninstalled": { "launch_mode": "remote", "configs": { "remote": { "url": "x" } } },
            "echo": { "launch_mode": "direct", "configs": { "direct": { "port": 9 } } }
        });
        std::fs::write(&path, document.to_string()).unwrap();

        store
            .set_config_typed("echo", "docker", PortConfig { port: 10 }, false)
            .unwrap();
        store.save().unwrap();

        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["uninstalled"], document["uninstalled"]);
        assert_eq!(saved["echo"]["launch_mode"], "direct");
        assert_eq!(saved["echo"]["configs"]["direct"]["port"], 9);
        assert_eq!(saved["echo"]["configs"]["docker"]["port"], 10);
    }

    #[test]
    fn test_invalid_stored_config() {
        let (_dir, store) = temp_store();
        let document = json!({
            "echo": { "launch_mode": "direct", "configs": { "direct": { "port": "high" } } }
        });
        std::fs::write(store.path().unwrap(), document.to_string()).unwrap();

        let err = store.get_config("echo", None).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Launch(LaunchError::InvalidConfig { .. })
        ));
        assert!(store.is_configured("echo", None).is_err());
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let (_dir, store) = temp_store();
        assert!(store.snapshot().unwrap().is_empty());
        store.save().unwrap();
        assert_eq!(std::fs::read_to_string(store.path().unwrap()).unwrap(), "{}");
    }

    #[test]
    fn test_reset_reloads_from_disk() {
        let (_dir, store) = temp_store();
        store
            .set_config_typed("echo", "direct", PortConfig { port: 1 }, false)
            .unwrap();
        store.reset();
        assert!(!store.is_configured("echo", Some("direct")).unwrap());
    }

    #[test]
    fn test_malformed_file() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path().unwrap(), "not json").unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, RuntimeError::Config(ConfigError::Parse { .. })));
    }
}
