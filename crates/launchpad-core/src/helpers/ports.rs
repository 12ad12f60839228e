//! Free port discovery on localhost.

use std::io;
use std::net::{Ipv4Addr, TcpListener};

/// Finds `count` distinct free TCP ports on localhost.
///
/// All listeners stay bound until every port is chosen, so the returned ports
/// are distinct. Nothing reserves them afterwards: another process may take a
/// port before the product binds it.
pub fn find_free_ports(count: usize) -> io::Result<Vec<u16>> {
    let listeners = (0..count)
        .map(|_| TcpListener::bind((Ipv4Addr::LOCALHOST, 0)))
        .collect::<io::Result<Vec<_>>>()?;

    listeners
        .iter()
        .map(|listener| listener.local_addr().map(|addr| addr.port()))
        .collect()
}
