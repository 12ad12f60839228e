//! Launching a product from its stored configuration.

use std::sync::Arc;

use launchpad_core::{FALLBACK_LAUNCH_MODE, LauncherConfig, SharedConfig};
use tracing::{debug, info};

use crate::error::RuntimeResult;
use crate::instance::ProductInstance;
use crate::store::ConfigStore;

/// Launches `product` and returns the running instance.
///
/// Without `mode`, the product's default launch mode is used (its fallback
/// launcher if the product was never configured). Without `config`, the
/// configuration stored for the mode is used. An explicit configuration must
/// be of the type the selected launcher accepts.
pub fn launch_product(
    store: &ConfigStore,
    product: &str,
    mode: Option<&str>,
    config: Option<SharedConfig>,
) -> RuntimeResult<ProductInstance> {
    let mode = store.get_default_mode(product, mode)?;
    let registry = store.registry();
    let descriptor = if mode == FALLBACK_LAUNCH_MODE {
        registry.resolve_fallback(product)?
    } else {
        registry.resolve(product, &mode)?
    };

    let config = match config {
        Some(config) => {
            descriptor.config_type.check(config.as_ref())?;
            config
        }
        None => store.get_config(product, Some(&mode))?,
    };
    debug!(product, mode = %mode, launcher = descriptor.launcher_name(), "Launching product");

    let launcher = descriptor.instantiate(config.as_ref())?;
    let instance = ProductInstance::new(launcher)?;
    info!(product, mode = %mode, urls = ?instance.urls(), "Product launched");
    Ok(instance)
}

/// Launches `product` with an explicit typed configuration.
pub fn launch_product_with<C: LauncherConfig>(
    store: &ConfigStore,
    product: &str,
    mode: Option<&str>,
    config: C,
) -> RuntimeResult<ProductInstance> {
    launch_product(store, product, mode, Some(Arc::new(config)))
}
