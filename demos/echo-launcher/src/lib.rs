//! Example launcher plugin for the `echo` product.
//!
//! Serves the working directory over HTTP with Python's `http.server`
//! module. Registered as `echo.direct` and as the `echo` fallback, so
//! `launch_product(&store, "echo", None, None)` works without configuration.

use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use std::time::Duration;

use launchpad::prelude::*;
use launchpad_core::helpers::{DirectProcess, check_tcp, find_free_ports};
use serde::{Deserialize, Serialize};
use tracing::debug;

const HOST: &str = "127.0.0.1";

fn default_python() -> String {
    "python3".to_string()
}

/// Configuration of the `echo` launcher.
#[derive(Debug, Clone, Serialize, Deserialize, LauncherConfig)]
pub struct EchoConfig {
    /// Port of the HTTP server. A free port is chosen when 0.
    #[serde(default)]
    pub port: u16,

    /// Python interpreter running the server.
    #[launcher(skip_prompt)]
    #[serde(default = "default_python")]
    pub python: String,
}

/// Launches `python -m http.server` on localhost.
#[register_launcher(product = "echo", mode = "direct")]
#[register_launcher(product = "echo", fallback)]
pub struct EchoLauncher {
    config: EchoConfig,
    port: Option<u16>,
    process: Option<DirectProcess>,
}

impl Launcher for EchoLauncher {
    type Config = EchoConfig;
    const SERVER_SPEC: &'static [(&'static str, ServerType)] = &[("main", ServerType::Generic)];

    fn new(config: EchoConfig) -> Self {
        Self {
            config,
            port: None,
            process: None,
        }
    }

    fn start(&mut self) -> Result<(), BoxError> {
        let port = match self.config.port {
            0 => find_free_ports(1)?
                .into_iter()
                .next()
                .ok_or("no free port available")?,
            port => port,
        };
        let process = DirectProcess::spawn(
            Command::new(&self.config.python)
                .args(["-m", "http.server"])
                .arg(port.to_string())
                .args(["--bind", HOST])
                .stdout(Stdio::null())
                .stderr(Stdio::null()),
        )?;
        debug!(port, pid = process.id(), "Echo server spawned");
        self.port = Some(port);
        self.process = Some(process);
        Ok(())
    }

    fn stop(&mut self, timeout: Option<Duration>) -> Result<(), BoxError> {
        self.port = None;
        if let Some(mut process) = self.process.take() {
            process.stop(timeout)?;
        }
        Ok(())
    }

    fn check(&self, timeout: Option<Duration>) -> bool {
        match self.port {
            Some(port) => check_tcp(&format!("{HOST}:{port}"), timeout),
            None => false,
        }
    }

    fn urls(&self) -> BTreeMap<String, String> {
        self.port
            .map(|port| ("main".to_string(), format!("{HOST}:{port}")))
            .into_iter()
            .collect()
    }
}
