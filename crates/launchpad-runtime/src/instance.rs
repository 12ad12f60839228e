//! Lifecycle of a launched product.
//!
//! A [`ProductInstance`] owns one launcher. It is started on construction,
//! checks the endpoints reported by the launcher against the declared
//! [`ServerSpec`], and opens a channel for every gRPC endpoint.
//!
//! Every successful start arms a safety net: an instance dropped while
//! running stops its launcher, bounded by [`SAFETY_NET_STOP_TIMEOUT`].
//! Explicit [`stop`](ProductInstance::stop) disarms it, so the launcher is
//! stopped exactly once per start.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use launchpad_core::{
    BoxedLauncher, ChannelFactory, GrpcChannel, InsecureChannelFactory, LaunchError, LaunchResult,
    ServerSpec,
};
use tracing::{debug, error, info, warn};

/// Upper bound on the stop issued when a running instance is dropped.
pub const SAFETY_NET_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// A running (or stopped) product.
pub struct ProductInstance {
    launcher: BoxedLauncher,
    server_spec: ServerSpec,
    channel_factory: Arc<dyn ChannelFactory>,
    urls: BTreeMap<String, String>,
    channels: BTreeMap<String, GrpcChannel>,
    armed: bool,
}

impl ProductInstance {
    /// Wraps `launcher` and starts it.
    pub fn new(launcher: BoxedLauncher) -> LaunchResult<Self> {
        Self::with_channel_factory(launcher, Arc::new(InsecureChannelFactory))
    }

    /// Wraps `launcher` and starts it, building gRPC channels with `factory`.
    pub fn with_channel_factory(
        launcher: BoxedLauncher,
        channel_factory: Arc<dyn ChannelFactory>,
    ) -> LaunchResult<Self> {
        let server_spec = launcher.server_spec();
        let mut instance = Self {
            launcher,
            server_spec,
            channel_factory,
            urls: BTreeMap::new(),
            channels: BTreeMap::new(),
            armed: false,
        };
        instance.start()?;
        Ok(instance)
    }

    /// Starts the product.
    ///
    /// Fails with [`LaunchError::AlreadyStarted`] if it is running. If the
    /// launcher fails to start, reports endpoints that differ from its
    /// declared ones, or a channel cannot be opened, the launcher is stopped
    /// again and the instance is left stopped.
    pub fn start(&mut self) -> LaunchResult<()> {
        if self.armed {
            return Err(LaunchError::AlreadyStarted);
        }
        let launcher = self.launcher.launcher_name();
        debug!(launcher, "Starting product");

        // Armed before the launcher runs: a failed start may have spawned.
        self.armed = true;
        if let Err(source) = self.launcher.start() {
            error!(launcher, error = %source, "Launcher failed to start");
            self.fire_safety_net();
            return Err(LaunchError::launcher("start", source));
        }

        let urls = self.launcher.urls();
        if !self.server_spec.matches_urls(&urls) {
            let declared = self.server_spec.keys();
            let reported: Vec<String> = urls.keys().cloned().collect();
            error!(launcher, ?declared, ?reported, "Reported endpoints differ from the declared ones");
            self.fire_safety_net();
            return Err(LaunchError::ContractViolation { declared, reported });
        }

        let grpc_keys: Vec<String> = self.server_spec.grpc_keys().map(str::to_string).collect();
        let mut channels = BTreeMap::new();
        for key in grpc_keys {
            let Some(url) = urls.get(&key) else { continue };
            match self.channel_factory.create(&key, url) {
                Ok(channel) => {
                    debug!(key = %key, target = channel.target(), "gRPC channel created");
                    channels.insert(key, channel);
                }
                Err(err) => {
                    error!(launcher, key = %key, error = %err, "Failed to create gRPC channel");
                    self.fire_safety_net();
                    return Err(err);
                }
            }
        }

        info!(launcher, ?urls, "Product started");
        self.urls = urls;
        self.channels = channels;
        Ok(())
    }

    /// Stops the product, giving it up to `timeout` to shut down.
    ///
    /// Fails with [`LaunchError::AlreadyStopped`] if it is not running. The
    /// instance counts as stopped afterwards even if the launcher reports an
    /// error.
    pub fn stop(&mut self, timeout: Option<Duration>) -> LaunchResult<()> {
        if !self.armed {
            return Err(LaunchError::AlreadyStopped);
        }
        self.disarm();
        let launcher = self.launcher.launcher_name();
        debug!(launcher, ?timeout, "Stopping product");
        self.launcher
            .stop(timeout)
            .map_err(|source| LaunchError::launcher("stop", source))?;
        info!(launcher, "Product stopped");
        Ok(())
    }

    /// Stops, then starts the product.
    pub fn restart(&mut self, stop_timeout: Option<Duration>) -> LaunchResult<()> {
        self.stop(stop_timeout)?;
        self.start()
    }

    /// Returns `true` if every endpoint answers. `timeout` is a hint to the
    /// launcher, not a bound on how long this takes.
    pub fn check(&self, timeout: Option<Duration>) -> bool {
        self.launcher.check(timeout)
    }

    /// Polls [`check`](Self::check) until it succeeds or `timeout` elapses.
    ///
    /// Each probe gets a third of `timeout`; probes are spaced by a hundredth
    /// of it.
    pub fn wait(&self, timeout: Duration) -> LaunchResult<()> {
        let started = Instant::now();
        let probe = timeout / 3;
        let pause = timeout / 100;
        while started.elapsed() <= timeout {
            if self.check(Some(probe)) {
                return Ok(());
            }
            thread::sleep(pause);
        }
        warn!(launcher = self.launcher.launcher_name(), ?timeout, "Product did not become ready");
        Err(LaunchError::NotRunning { timeout })
    }

    /// Endpoint URLs reported at the last start. Empty while stopped.
    pub fn urls(&self) -> &BTreeMap<String, String> {
        &self.urls
    }

    /// gRPC channels by endpoint key. Empty while stopped.
    pub fn channels(&self) -> &BTreeMap<String, GrpcChannel> {
        &self.channels
    }

    /// Channel of endpoint `key`.
    pub fn channel(&self, key: &str) -> Option<&GrpcChannel> {
        self.channels.get(key)
    }

    /// Returns `true` unless the product is running.
    pub fn stopped(&self) -> bool {
        !self.armed
    }

    /// Declared endpoints of the launcher.
    pub fn server_spec(&self) -> &ServerSpec {
        &self.server_spec
    }

    /// Name of the launcher type.
    pub fn launcher_name(&self) -> &'static str {
        self.launcher.launcher_name()
    }

    /// Borrows the running instance in a guard that stops it when dropped.
    pub fn scoped(&mut self) -> LaunchResult<InstanceScope<'_>> {
        if self.stopped() {
            return Err(LaunchError::ScopeOnStopped);
        }
        Ok(InstanceScope { instance: self })
    }

    fn disarm(&mut self) {
        self.armed = false;
        self.urls.clear();
        self.channels.clear();
    }

    fn fire_safety_net(&mut self) {
        if !self.armed {
            return;
        }
        self.disarm();
        if let Err(err) = self.launcher.stop(Some(SAFETY_NET_STOP_TIMEOUT)) {
            warn!(launcher = self.launcher.launcher_name(), error = %err, "Safety-net stop failed");
        }
    }
}

impl Drop for ProductInstance {
    fn drop(&mut self) {
        if self.armed {
            warn!(launcher = self.launcher.launcher_name(), "Product dropped while running, stopping it");
            self.fire_safety_net();
        }
    }
}

impl std::fmt::Debug for ProductInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductInstance")
            .field("launcher", &self.launcher.launcher_name())
            .field("stopped", &self.stopped())
            .field("urls", &self.urls)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`ProductInstance::scoped`].
///
/// Stops the instance without a timeout when dropped, unless it was already
/// stopped inside the scope.
pub struct InstanceScope<'a> {
    instance: &'a mut ProductInstance,
}

impl Deref for InstanceScope<'_> {
    type Target = ProductInstance;

    fn deref(&self) -> &ProductInstance {
        self.instance
    }
}

impl DerefMut for InstanceScope<'_> {
    fn deref_mut(&mut self) -> &mut ProductInstance {
        self.instance
    }
}

impl Drop for InstanceScope<'_> {
    fn drop(&mut self) {
        if self.instance.stopped() {
            return;
        }
        if let Err(err) = self.instance.stop(None) {
            warn!(error = %err, "Failed to stop product when leaving scope");
        }
    }
}

#[cfg(test)]
mod tests {
    use launchpad_core::{Launcher, PluginRegistry};

    use super::*;
    use crate::testing::{Counters, GrpcLauncher, MockLauncher, PathConfig, registry};

    fn mock() -> (Arc<Counters>, MockLauncher) {
        let counters = Arc::new(Counters::default());
        (Arc::clone(&counters), MockLauncher::with_counters(counters))
    }

    #[test]
    fn test_construction_starts() {
        let (counters, launcher) = mock();
        let instance = ProductInstance::new(Box::new(launcher)).unwrap();
        assert!(!instance.stopped());
        assert_eq!(counters.starts(), 1);
        assert_eq!(instance.urls()["main"], "localhost:8080");
        assert!(instance.channels().is_empty());
    }

    #[test]
    fn test_stop_twice_stops_once() {
        let (counters, launcher) = mock();
        let mut instance = ProductInstance::new(Box::new(launcher)).unwrap();
        instance.stop(None).unwrap();
        assert!(instance.stopped());
        assert!(matches!(instance.stop(None), Err(LaunchError::AlreadyStopped)));
        drop(instance);
        assert_eq!(counters.stops(), 1);
    }

    #[test]
    fn test_start_twice_fails() {
        let (counters, launcher) = mock();
        let mut instance = ProductInstance::new(Box::new(launcher)).unwrap();
        assert!(matches!(instance.start(), Err(LaunchError::AlreadyStarted)));
        assert_eq!(counters.starts(), 1);
    }

    #[test]
    fn test_restart() {
        let (counters, launcher) = mock();
        let mut instance = ProductInstance::new(Box::new(launcher)).unwrap();
        instance.restart(Some(Duration::from_secs(1))).unwrap();
        assert!(!instance.stopped());
        assert_eq!(counters.starts(), 2);
        assert_eq!(counters.stops(), 1);

        instance.stop(None).unwrap();
        assert!(matches!(instance.restart(None), Err(LaunchError::AlreadyStopped)));
    }

    #[test]
    fn test_drop_stops_running_instance() {
        let (counters, launcher) = mock();
        let instance = ProductInstance::new(Box::new(launcher)).unwrap();
        drop(instance);
        assert_eq!(counters.stops(), 1);
    }

    #[test]
    fn test_contract_violation_at_construction() {
        let (counters, mut launcher) = mock();
        launcher.extra_url_from_start = Some(1);
        let err = ProductInstance::new(Box::new(launcher)).unwrap_err();
        match err {
            LaunchError::ContractViolation { declared, reported } => {
                assert_eq!(declared, vec!["main"]);
                assert_eq!(reported, vec!["extra", "main"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counters.stops(), 1);
    }

    #[test]
    fn test_contract_violation_on_restart_leaves_stopped() {
        let (counters, mut launcher) = mock();
        launcher.extra_url_from_start = Some(2);
        let mut instance = ProductInstance::new(Box::new(launcher)).unwrap();

        let err = instance.restart(None).unwrap_err();
        assert!(matches!(err, LaunchError::ContractViolation { .. }));
        assert!(instance.stopped());
        assert!(instance.urls().is_empty());
        assert_eq!(counters.stops(), 2);

        drop(instance);
        assert_eq!(counters.stops(), 2);
    }

    #[test]
    fn test_failed_start_is_stopped() {
        let (counters, mut launcher) = mock();
        launcher.fail_start = true;
        let err = ProductInstance::new(Box::new(launcher)).unwrap_err();
        assert!(matches!(err, LaunchError::Launcher { operation: "start", .. }));
        assert_eq!(counters.stops(), 1);
    }

    #[test]
    fn test_grpc_channels() {
        let launcher = GrpcLauncher::new(PathConfig {
            binary: "/bin/solver".into(),
        });
        let mut instance = ProductInstance::new(Box::new(launcher)).unwrap();
        let channel = instance.channel("main").unwrap();
        assert_eq!(channel.target(), "127.0.0.1:50051");
        assert_eq!(channel.uri(), "http://127.0.0.1:50051");

        instance.stop(None).unwrap();
        assert!(instance.channels().is_empty());
    }

    struct RefusingFactory;

    impl ChannelFactory for RefusingFactory {
        fn create(&self, key: &str, _url: &str) -> LaunchResult<GrpcChannel> {
            Err(LaunchError::Channel {
                key: key.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    #[test]
    fn test_channel_failure_stops_launcher() {
        let launcher = GrpcLauncher::new(PathConfig {
            binary: "/bin/solver".into(),
        });
        let counters = Arc::clone(&launcher.counters);

        let err =
            ProductInstance::with_channel_factory(Box::new(launcher), Arc::new(RefusingFactory))
                .unwrap_err();
        assert!(matches!(err, LaunchError::Channel { ref key, .. } if key == "main"));
        assert_eq!(counters.starts(), 1);
        assert_eq!(counters.stops(), 1);
    }

    #[test]
    fn test_channel_failure_on_restart_leaves_instance_stopped() {
        let launcher = GrpcLauncher::new(PathConfig {
            binary: "/bin/solver".into(),
        });
        let counters = Arc::clone(&launcher.counters);
        let mut instance = ProductInstance::new(Box::new(launcher)).unwrap();
        instance.stop(None).unwrap();

        instance.channel_factory = Arc::new(RefusingFactory);
        assert!(matches!(instance.start(), Err(LaunchError::Channel { .. })));
        assert!(instance.stopped());
        assert!(instance.channels().is_empty());
        assert!(instance.urls().is_empty());
        assert_eq!(counters.stops(), 2);

        drop(instance);
        assert_eq!(counters.stops(), 2);
    }

    #[test]
    fn test_wait_ready() {
        let (_, launcher) = mock();
        let instance = ProductInstance::new(Box::new(launcher)).unwrap();
        let started = Instant::now();
        instance.wait(Duration::from_secs(3)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_times_out() {
        let (_, mut launcher) = mock();
        launcher.healthy = false;
        let instance = ProductInstance::new(Box::new(launcher)).unwrap();

        let timeout = Duration::from_millis(300);
        let started = Instant::now();
        let err = instance.wait(timeout).unwrap_err();
        let elapsed = started.elapsed();
        assert!(matches!(err, LaunchError::NotRunning { .. }));
        assert!(elapsed >= timeout);
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_scope_stops_on_exit() {
        let (counters, launcher) = mock();
        let mut instance = ProductInstance::new(Box::new(launcher)).unwrap();
        {
            let scope = instance.scoped().unwrap();
            assert!(scope.check(None));
        }
        assert!(instance.stopped());
        assert_eq!(counters.stops(), 1);
        assert!(matches!(instance.scoped(), Err(LaunchError::ScopeOnStopped)));
    }

    #[test]
    fn test_scope_tolerates_explicit_stop() {
        let (counters, launcher) = mock();
        let mut instance = ProductInstance::new(Box::new(launcher)).unwrap();
        {
            let mut scope = instance.scoped().unwrap();
            scope.stop(None).unwrap();
        }
        assert_eq!(counters.stops(), 1);
    }

    #[test]
    fn test_instance_from_registry() {
        let registry: Arc<PluginRegistry> = registry();
        let desc = registry.resolve("echo", "direct").unwrap();
        let config = crate::testing::PortConfig { port: 9000 };
        let instance = ProductInstance::new(desc.instantiate(&config).unwrap()).unwrap();
        assert_eq!(instance.urls()["main"], "localhost:9000");
        assert!(instance.launcher_name().ends_with("MockLauncher"));
    }
}
