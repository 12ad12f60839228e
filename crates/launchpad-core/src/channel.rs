//! gRPC channel handles and transport options.
//!
//! A [`GrpcChannel`] is a lazily-connecting handle: creating it performs no
//! I/O, it only binds a target and the transport options needed to reach it.
//! Clients build their stubs from [`GrpcChannel::uri`].

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LaunchError, LaunchResult};

const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

// =============================================================================
// Transport options
// =============================================================================

/// Transport mode of a gRPC connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Unix domain socket.
    Uds,
    /// Windows named user authentication over localhost TCP.
    Wnua,
    /// Mutual TLS.
    Mtls,
    /// Plain TCP without encryption.
    Insecure,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uds => "uds",
            Self::Wnua => "wnua",
            Self::Mtls => "mtls",
            Self::Insecure => "insecure",
        };
        f.write_str(s)
    }
}

/// Options describing how to reach a gRPC server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport_mode", rename_all = "lowercase")]
pub enum TransportOptions {
    /// Unix domain socket `<dir>/<service>[-<id>].sock`.
    Uds {
        /// Service name, used as the socket file stem.
        service: String,
        /// Socket directory; the system temporary directory when absent.
        #[serde(default)]
        dir: Option<PathBuf>,
        /// Optional instance id appended to the socket name.
        #[serde(default)]
        id: Option<String>,
    },
    /// Windows named user authentication on a localhost port.
    Wnua {
        /// Server port.
        port: u16,
    },
    /// Mutual TLS.
    Mtls {
        /// Directory holding the client certificate, key and CA.
        #[serde(default)]
        certs_dir: Option<PathBuf>,
        /// Server host.
        #[serde(default = "default_host")]
        host: String,
        /// Server port.
        port: u16,
        /// Permit hosts other than localhost.
        #[serde(default)]
        allow_remote_host: bool,
    },
    /// Plain TCP.
    Insecure {
        /// Server host.
        #[serde(default = "default_host")]
        host: String,
        /// Server port.
        port: u16,
        /// Permit hosts other than localhost.
        #[serde(default)]
        allow_remote_host: bool,
    },
}

fn default_host() -> String {
    "localhost".to_string()
}

impl TransportOptions {
    /// Insecure options for a localhost port.
    pub fn insecure(port: u16) -> Self {
        Self::Insecure {
            host: default_host(),
            port,
            allow_remote_host: false,
        }
    }

    /// The transport mode of these options.
    pub fn mode(&self) -> TransportMode {
        match self {
            Self::Uds { .. } => TransportMode::Uds,
            Self::Wnua { .. } => TransportMode::Wnua,
            Self::Mtls { .. } => TransportMode::Mtls,
            Self::Insecure { .. } => TransportMode::Insecure,
        }
    }

    /// Rejects remote hosts unless `allow_remote_host` is set.
    pub fn validate(&self) -> LaunchResult<()> {
        match self {
            Self::Mtls {
                host,
                allow_remote_host: false,
                ..
            }
            | Self::Insecure {
                host,
                allow_remote_host: false,
                ..
            } if !LOCAL_HOSTS.contains(&host.as_str()) => Err(LaunchError::Channel {
                key: self.target(),
                reason: format!(
                    "remote host '{host}' specified without setting 'allow_remote_host'"
                ),
            }),
            Self::Uds { service, .. } if service.is_empty() => Err(LaunchError::Channel {
                key: self.target(),
                reason: "UDS service name is empty".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// The connection target, `host:port` or `unix:<path>`.
    pub fn target(&self) -> String {
        match self {
            Self::Uds { service, dir, id } => {
                let file = match id {
                    Some(id) => format!("{service}-{id}.sock"),
                    None => format!("{service}.sock"),
                };
                let dir = dir.clone().unwrap_or_else(std::env::temp_dir);
                format!("unix:{}", dir.join(file).display())
            }
            Self::Wnua { port } => format!("localhost:{port}"),
            Self::Mtls { host, port, .. } | Self::Insecure { host, port, .. } => {
                format!("{host}:{port}")
            }
        }
    }

    /// Validates the options and creates a channel handle from them.
    pub fn create_channel(&self) -> LaunchResult<GrpcChannel> {
        self.validate()?;
        Ok(GrpcChannel {
            target: self.target(),
            options: self.clone(),
        })
    }
}

// =============================================================================
// GrpcChannel
// =============================================================================

/// Lazily-connecting gRPC channel handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcChannel {
    target: String,
    options: TransportOptions,
}

impl GrpcChannel {
    /// The connection target.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The transport options the channel was built from.
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// URI suitable for a gRPC client endpoint.
    pub fn uri(&self) -> String {
        match self.options.mode() {
            TransportMode::Uds => self.target.clone(),
            TransportMode::Mtls => format!("https://{}", self.target),
            TransportMode::Wnua | TransportMode::Insecure => format!("http://{}", self.target),
        }
    }
}

// =============================================================================
// ChannelFactory
// =============================================================================

/// Builds the channel for a gRPC endpoint reported by a launcher.
pub trait ChannelFactory: Send + Sync {
    /// Creates the channel for endpoint `key` at `url`.
    fn create(&self, key: &str, url: &str) -> LaunchResult<GrpcChannel>;
}

/// Default factory: insecure channels to the reported `host:port`.
///
/// URLs come from the launcher itself, so remote hosts are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsecureChannelFactory;

impl ChannelFactory for InsecureChannelFactory {
    fn create(&self, key: &str, url: &str) -> LaunchResult<GrpcChannel> {
        let (host, port) = split_host_port(url).ok_or_else(|| LaunchError::Channel {
            key: key.to_string(),
            reason: format!("'{url}' is not a 'host:port' address"),
        })?;
        TransportOptions::Insecure {
            host,
            port,
            allow_remote_host: true,
        }
        .create_channel()
    }
}

/// Splits `host:port`, tolerating a leading scheme and bracketed IPv6 hosts.
pub fn split_host_port(url: &str) -> Option<(String, u16)> {
    let authority = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = authority.split('/').next()?;
    let (host, port) = authority.rsplit_once(':')?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port.parse().ok()?))
}
