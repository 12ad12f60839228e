//! Launchers and configurations shared by the unit tests of this crate.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use launchpad_core::{
    BoxError, FALLBACK_LAUNCH_MODE, Launcher, LauncherConfig, LauncherDescriptor, PluginRegistry,
    ServerType,
};
use serde::{Deserialize, Serialize};

/// Configuration with a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, LauncherConfig)]
pub struct PortConfig {
    /// Port to listen on.
    #[serde(default)]
    pub port: u16,
}

/// Configuration without a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, LauncherConfig)]
pub struct PathConfig {
    /// Path to the product binary.
    pub binary: String,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl Counters {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Launcher serving one generic endpoint, with scripted behavior.
pub struct MockLauncher {
    pub counters: Arc<Counters>,
    pub port: u16,
    pub healthy: bool,
    pub fail_start: bool,
    /// Extra endpoint reported from the given start onwards (1-based).
    pub extra_url_from_start: Option<usize>,
}

impl MockLauncher {
    pub fn with_counters(counters: Arc<Counters>) -> Self {
        Self {
            counters,
            port: 8080,
            healthy: true,
            fail_start: false,
            extra_url_from_start: None,
        }
    }
}

impl Launcher for MockLauncher {
    type Config = PortConfig;
    const SERVER_SPEC: &'static [(&'static str, ServerType)] = &[("main", ServerType::Generic)];

    fn new(config: PortConfig) -> Self {
        Self {
            port: config.port,
            ..Self::with_counters(Arc::default())
        }
    }

    fn start(&mut self) -> Result<(), BoxError> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err("port already in use".into());
        }
        Ok(())
    }

    fn stop(&mut self, _timeout: Option<Duration>) -> Result<(), BoxError> {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check(&self, _timeout: Option<Duration>) -> bool {
        self.healthy
    }

    fn urls(&self) -> BTreeMap<String, String> {
        let mut urls = BTreeMap::from([("main".to_string(), format!("localhost:{}", self.port))]);
        if self
            .extra_url_from_start
            .is_some_and(|from| self.counters.starts() >= from)
        {
            urls.insert("extra".to_string(), "localhost:1".to_string());
        }
        urls
    }
}

/// Launcher serving one gRPC endpoint.
pub struct GrpcLauncher {
    pub counters: Arc<Counters>,
    config: PathConfig,
}

impl Launcher for GrpcLauncher {
    type Config = PathConfig;
    const SERVER_SPEC: &'static [(&'static str, ServerType)] = &[("main", ServerType::Grpc)];

    fn new(config: PathConfig) -> Self {
        Self {
            counters: Arc::default(),
            config,
        }
    }

    fn start(&mut self) -> Result<(), BoxError> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        if self.config.binary.is_empty() {
            return Err("no binary configured".into());
        }
        Ok(())
    }

    fn stop(&mut self, _timeout: Option<Duration>) -> Result<(), BoxError> {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check(&self, _timeout: Option<Duration>) -> bool {
        true
    }

    fn urls(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("main".to_string(), "127.0.0.1:50051".to_string())])
    }
}

/// `echo` with `direct` and a fallback, `solver` with `grpc` only.
pub fn registry() -> Arc<PluginRegistry> {
    let registry = PluginRegistry::from_descriptors([
        LauncherDescriptor::of::<MockLauncher>("echo", "direct"),
        LauncherDescriptor::of::<MockLauncher>("echo", "docker"),
        LauncherDescriptor::of::<MockLauncher>("echo", FALLBACK_LAUNCH_MODE),
        LauncherDescriptor::of::<GrpcLauncher>("solver", "grpc"),
    ])
    .expect("test registry is valid");
    Arc::new(registry)
}
