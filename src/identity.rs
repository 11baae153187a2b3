use std::net::{Ipv6Addr, UdpSocket};

use tracing::debug;

const LOOPBACK_ALIASES: [&str; 3] = ["127.0.0.1", "localhost", "::1"];

/// Externally reachable address of this node, fixed for the process lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeIdentity {
    address: String,
    listen_port: u16,
}

impl NodeIdentity {
    pub fn new(address: impl Into<String>, listen_port: u16) -> Self {
        Self {
            address: address.into(),
            listen_port,
        }
    }

    /// Uses `advertise` when given, otherwise the IP of the outbound interface.
    pub fn resolve(advertise: Option<String>, listen_port: u16) -> Self {
        match advertise {
            Some(address) => Self::new(address, listen_port),
            None => Self::new(
                outbound_ip().unwrap_or_else(|| "127.0.0.1".to_string()),
                listen_port,
            ),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// True when `host[:port]` names this node: its own address or a loopback
    /// alias, with no port or with the port this node listens on.
    pub fn is_local(&self, host: &str) -> bool {
        let (own_host, own_port) = split_host_port(&self.address);
        let own_port = own_port.unwrap_or(self.listen_port);
        let (name, port) = split_host_port(host);
        let same_host = name == own_host || LOOPBACK_ALIASES.contains(&name);
        same_host && port.map_or(true, |port| port == own_port)
    }
}

/// `10.0.0.1:65530` → (`10.0.0.1`, Some(65530)); `[::1]:65530` and bare IPv6
/// addresses are understood too. A suffix that is not a port stays in the host.
fn split_host_port(address: &str) -> (&str, Option<u16>) {
    if let Some(rest) = address.strip_prefix('[') {
        if let Some((ip, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (ip, port);
        }
    }
    if address.parse::<Ipv6Addr>().is_ok() {
        return (address, None);
    }
    match address.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (address, None),
        },
        None => (address, None),
    }
}

// UDP "connect" sends nothing, it only makes the kernel pick a route
fn outbound_ip() -> Option<String> {
    let sock = UdpSocket::bind("0.0.0.0:0").ok()?;
    sock.connect("8.8.8.8:80").ok()?;
    let ip = sock.local_addr().ok()?.ip();
    debug!("outbound interface address {ip}");
    Some(ip.to_string())
}
