//! The launcher capability contract.
//!
//! A plugin implements [`Launcher`] for one (product, launch mode) pair. The
//! trait fixes the configuration type as an associated type and the exposed
//! endpoints as an associated constant, so both are known without starting
//! anything.
//!
//! ```rust,ignore
//! use launchpad_core::{BoxError, Launcher, ServerType};
//!
//! struct EchoLauncher { config: EchoConfig, url: Option<String> }
//!
//! impl Launcher for EchoLauncher {
//!     type Config = EchoConfig;
//!     const SERVER_SPEC: &'static [(&'static str, ServerType)] = &[("main", ServerType::Generic)];
//!
//!     fn new(config: EchoConfig) -> Self { Self { config, url: None } }
//!     fn start(&mut self) -> Result<(), BoxError> { /* spawn */ Ok(()) }
//!     fn stop(&mut self, timeout: Option<Duration>) -> Result<(), BoxError> { Ok(()) }
//!     fn check(&self, timeout: Option<Duration>) -> bool { true }
//!     fn urls(&self) -> BTreeMap<String, String> { /* ... */ }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::LauncherConfig;
use crate::error::BoxError;

// =============================================================================
// ServerType / ServerSpec
// =============================================================================

/// Protocol kind of an endpoint exposed by a launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// Generic server answering at a URL; no protocol is implied.
    Generic,
    /// Server accessible via gRPC; a channel is created for it on start.
    Grpc,
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "GENERIC"),
            Self::Grpc => write!(f, "GRPC"),
        }
    }
}

/// Declared endpoints of a launcher, keyed by logical endpoint name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSpec(BTreeMap<String, ServerType>);

impl ServerSpec {
    /// Builds a spec from a static declaration.
    pub fn from_static(entries: &[(&str, ServerType)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(key, kind)| ((*key).to_string(), *kind))
                .collect(),
        )
    }

    /// Returns the kind declared for `key`.
    pub fn get(&self, key: &str) -> Option<ServerType> {
        self.0.get(key).copied()
    }

    /// Iterates over all declared endpoints in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ServerType)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Declared endpoint keys in key order.
    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Keys of the gRPC endpoints.
    pub fn grpc_keys(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, kind)| *kind == ServerType::Grpc)
            .map(|(key, _)| key)
    }

    /// Returns `true` if `urls` has exactly the declared key set.
    pub fn matches_urls(&self, urls: &BTreeMap<String, String>) -> bool {
        let declared: BTreeSet<&String> = self.0.keys().collect();
        let reported: BTreeSet<&String> = urls.keys().collect();
        declared == reported
    }

    /// Number of declared endpoints.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no endpoint is declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ServerType)> for ServerSpec {
    fn from_iter<T: IntoIterator<Item = (String, ServerType)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Launcher
// =============================================================================

/// Interface every launcher plugin implements.
///
/// # Contract
///
/// - `start` is not required to be idempotent; the
///   [`ProductInstance`](../launchpad_runtime/struct.ProductInstance.html)
///   guards against double starts.
/// - `stop` must return in finite time when `timeout` is given, killing the
///   process if it does not exit gracefully in time. `None` waits for a
///   graceful exit without a deadline.
/// - `check` treats `timeout` as a hint, but must never hang indefinitely.
/// - After `start` returns, the keys of `urls` equal the keys of
///   [`SERVER_SPEC`](Self::SERVER_SPEC).
pub trait Launcher: Send + 'static {
    /// The configuration type accepted by [`new`](Self::new).
    type Config: LauncherConfig;

    /// Endpoints exposed by the started product.
    const SERVER_SPEC: &'static [(&'static str, ServerType)];

    /// Creates the launcher from its configuration. Nothing is started yet.
    fn new(config: Self::Config) -> Self
    where
        Self: Sized;

    /// Starts the product.
    fn start(&mut self) -> Result<(), BoxError>;

    /// Stops the product, killing it if it is still alive after `timeout`.
    fn stop(&mut self, timeout: Option<Duration>) -> Result<(), BoxError>;

    /// Returns whether the product currently answers requests.
    fn check(&self, timeout: Option<Duration>) -> bool;

    /// URLs of the endpoints, keyed like [`SERVER_SPEC`](Self::SERVER_SPEC).
    fn urls(&self) -> BTreeMap<String, String>;
}

// =============================================================================
// DynLauncher
// =============================================================================

/// Object-safe form of [`Launcher`], used once the concrete type is erased.
pub trait DynLauncher: Send {
    /// See [`Launcher::start`].
    fn start(&mut self) -> Result<(), BoxError>;

    /// See [`Launcher::stop`].
    fn stop(&mut self, timeout: Option<Duration>) -> Result<(), BoxError>;

    /// See [`Launcher::check`].
    fn check(&self, timeout: Option<Duration>) -> bool;

    /// See [`Launcher::urls`].
    fn urls(&self) -> BTreeMap<String, String>;

    /// The declared server spec.
    fn server_spec(&self) -> ServerSpec;

    /// Name of the concrete launcher type, for logs.
    fn launcher_name(&self) -> &'static str;
}

impl<L: Launcher> DynLauncher for L {
    fn start(&mut self) -> Result<(), BoxError> {
        Launcher::start(self)
    }

    fn stop(&mut self, timeout: Option<Duration>) -> Result<(), BoxError> {
        Launcher::stop(self, timeout)
    }

    fn check(&self, timeout: Option<Duration>) -> bool {
        Launcher::check(self, timeout)
    }

    fn urls(&self) -> BTreeMap<String, String> {
        Launcher::urls(self)
    }

    fn server_spec(&self) -> ServerSpec {
        ServerSpec::from_static(L::SERVER_SPEC)
    }

    fn launcher_name(&self) -> &'static str {
        std::any::type_name::<L>()
    }
}

/// Boxed launcher handed to the lifecycle manager.
pub type BoxedLauncher = Box<dyn DynLauncher>;
