//! Unified error types for launcher resolution and instance lifecycle.
//!
//! Every failure the core can report is a variant of [`LaunchError`]. The
//! variants fall into five families:
//!
//! - **not found**: no plugin, no fallback, no stored default, no default config
//! - **type mismatch**: a configuration of the wrong concrete type
//! - **contract violation**: a plugin reported URLs that differ from its spec
//! - **invalid state transition**: start while running, stop while stopped
//! - **timeout**: `wait` exhausted its budget

use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by plugin implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Launch Errors
// =============================================================================

/// Errors that can occur while resolving, configuring or driving a launcher.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No plugin is registered for the product / launch mode pair.
    #[error("no plugin found for '{product}.{mode}'")]
    PluginNotFound {
        /// Product name.
        product: String,
        /// Launch mode.
        mode: String,
    },

    /// The product has no fallback launcher.
    #[error("no fallback plugin found for '{product}'")]
    FallbackNotFound {
        /// Product name.
        product: String,
    },

    /// No default launch mode is stored and no fallback launcher exists.
    #[error("no configuration defined for product name '{product}'")]
    ProductNotConfigured {
        /// Product name.
        product: String,
    },

    /// Nothing is stored for the pair and its configuration type has no default.
    #[error(
        "product '{product}' is not configured for launch mode '{mode}', \
         and its configuration has no default"
    )]
    NoDefaultConfig {
        /// Product name.
        product: String,
        /// Launch mode.
        mode: String,
    },

    /// A configuration of the wrong concrete type was supplied or stored.
    #[error("configuration is of wrong type '{found}', should be '{expected}'")]
    TypeMismatch {
        /// The type registered for the launch mode.
        expected: &'static str,
        /// The type actually supplied.
        found: &'static str,
    },

    /// Stored or supplied configuration data does not fit the registered type.
    #[error("invalid configuration for '{product}.{mode}': {source}")]
    InvalidConfig {
        /// Product name.
        product: String,
        /// Launch mode.
        mode: String,
        /// Deserialization failure.
        #[source]
        source: serde_json::Error,
    },

    /// The URL keys reported by a launcher differ from its declared server spec.
    #[error(
        "the URL keys {reported:?} provided by the launcher do not match \
         the server spec keys {declared:?}"
    )]
    ContractViolation {
        /// Keys declared in the server spec.
        declared: Vec<String>,
        /// Keys reported by the launcher after start.
        reported: Vec<String>,
    },

    /// `start` was called on a running instance.
    #[error("cannot start the server, it has already been started")]
    AlreadyStarted,

    /// `stop` was called on a stopped instance.
    #[error("cannot stop the server, it has already been stopped")]
    AlreadyStopped,

    /// A scope was entered on a stopped instance.
    #[error("the product instance is stopped, cannot enter scope")]
    ScopeOnStopped,

    /// `wait` ran out of time before the product answered.
    #[error("the product is not running after {}s", .timeout.as_secs_f64())]
    NotRunning {
        /// The budget that was exhausted.
        timeout: Duration,
    },

    /// A plugin operation failed.
    #[error("launcher failed to {operation}: {source}")]
    Launcher {
        /// The operation that failed (`start` or `stop`).
        operation: &'static str,
        /// Error reported by the plugin.
        #[source]
        source: BoxError,
    },

    /// A gRPC channel could not be built for an endpoint.
    #[error("cannot create channel for '{key}': {reason}")]
    Channel {
        /// Server spec key.
        key: String,
        /// Reason for failure.
        reason: String,
    },

    /// Two plugins were registered under the same key.
    #[error("duplicate plugin registered for '{product}.{mode}'")]
    DuplicatePlugin {
        /// Product name.
        product: String,
        /// Launch mode.
        mode: String,
    },

    /// A launcher declares the same server spec key twice.
    #[error("plugin '{plugin}' declares server spec key '{key}' more than once")]
    DuplicateServerKey {
        /// Dotted `product.mode` key of the plugin.
        plugin: String,
        /// The repeated endpoint key.
        key: String,
    },

    /// A plugin key is malformed.
    #[error("invalid plugin key '{key}': {reason}")]
    InvalidPluginKey {
        /// The offending key.
        key: String,
        /// Reason for rejection.
        reason: &'static str,
    },

    /// The reserved fallback mode name was used where a user mode is required.
    #[error("launch mode '{0}' is reserved and cannot be configured")]
    ReservedLaunchMode(String),
}

impl LaunchError {
    /// Creates a [`LaunchError::PluginNotFound`] error.
    pub fn plugin_not_found(product: impl Into<String>, mode: impl Into<String>) -> Self {
        Self::PluginNotFound {
            product: product.into(),
            mode: mode.into(),
        }
    }

    /// Wraps a plugin failure for the given operation.
    pub fn launcher(operation: &'static str, source: BoxError) -> Self {
        Self::Launcher { operation, source }
    }

    /// Returns `true` for every member of the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PluginNotFound { .. }
                | Self::FallbackNotFound { .. }
                | Self::ProductNotConfigured { .. }
                | Self::NoDefaultConfig { .. }
        )
    }

    /// Returns `true` if the error is a [`LaunchError::TypeMismatch`].
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}

/// Result type for launch operations.
pub type LaunchResult<T> = Result<T, LaunchError>;
