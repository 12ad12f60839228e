//! TCP readiness probes for launched servers.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::channel::split_host_port;

/// Probe budget used when the caller gives no timeout.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(1);

/// Returns whether something accepts TCP connections at `url`.
///
/// `url` is `host:port`, optionally with a scheme and path. Every resolved
/// address is tried within the shared `timeout` budget.
pub fn check_tcp(url: &str, timeout: Option<Duration>) -> bool {
    let Some((host, port)) = split_host_port(url) else {
        trace!(url, "Not a host:port address");
        return false;
    };
    let addrs: Vec<SocketAddr> = match (host.as_str(), port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            trace!(url, error = %e, "Address resolution failed");
            return false;
        }
    };

    let deadline = Instant::now() + timeout.unwrap_or(DEFAULT_CHECK_TIMEOUT);
    addrs.iter().any(|addr| {
        let remaining = deadline.saturating_duration_since(Instant::now());
        !remaining.is_zero() && TcpStream::connect_timeout(addr, remaining).is_ok()
    })
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn test_check_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(check_tcp(&format!("127.0.0.1:{port}"), None));
        assert!(check_tcp(
            &format!("http://localhost:{port}/"),
            Some(Duration::from_millis(500))
        ));
    }

    #[test]
    fn test_check_closed_port() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(!check_tcp(
            &format!("127.0.0.1:{port}"),
            Some(Duration::from_millis(200))
        ));
        assert!(!check_tcp("garbage", None));
    }
}
