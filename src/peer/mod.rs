use std::{
    fs,
    io::{self, Read, Write},
    net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs},
    path::Path,
    time::Duration,
};

use tracing::{debug, warn};

use crate::{
    config::RECV_BUFFER,
    i18n::{Catalog, MessageKey},
};

/// Sends one command to another node and returns its answer as protocol text.
///
/// Transport failures are not errors for the caller: they come back as
/// `ER …` lines that can be relayed to a client as they are.
pub trait PeerTransport: Send + Sync {
    fn send(&self, address: &str, command: &str) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum PeerFailure {
    #[error("timed out")]
    Timeout,
    #[error("connection refused")]
    Refused,
    #[error("empty response")]
    Empty,
    #[error("{0}")]
    Network(String),
}

impl From<io::Error> for PeerFailure {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => PeerFailure::Timeout,
            io::ErrorKind::ConnectionRefused => PeerFailure::Refused,
            _ => PeerFailure::Network(err.to_string()),
        }
    }
}

/// One fresh TCP connection per request, closed on every exit path.
#[derive(Clone, Debug)]
pub struct PeerClient {
    catalog: Catalog,
    timeout: Duration,
    default_port: u16,
}

impl PeerClient {
    pub fn new(catalog: Catalog, timeout: Duration, default_port: u16) -> Self {
        Self {
            catalog,
            timeout,
            default_port,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn send_with_timeout(&self, address: &str, command: &str, timeout: Duration) -> String {
        match self.exchange(address, command, timeout) {
            Ok(text) => text,
            Err(failure) => {
                warn!(peer = address, "peer call failed: {failure}");
                self.describe(address, &failure)
            }
        }
    }

    pub fn exchange(
        &self,
        address: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<String, PeerFailure> {
        let target = self.target(address);
        let mut stream = connect(&target, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let msg = command.trim();
        debug!(peer = %target, "→ {msg}");
        stream.write_all(msg.as_bytes())?;

        let mut buf = [0u8; RECV_BUFFER];
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(PeerFailure::Empty);
        }
        let text = String::from_utf8_lossy(&buf[..n]).trim().to_string();
        debug!(peer = %target, "← {text}");
        Ok(text)
    }

    pub fn describe(&self, address: &str, failure: &PeerFailure) -> String {
        match failure {
            PeerFailure::Timeout => self.catalog.with_detail(MessageKey::PeerTimeout, address),
            PeerFailure::Refused => self.catalog.with_detail(MessageKey::PeerRefused, address),
            PeerFailure::Empty => self.catalog.translate(MessageKey::PeerEmpty).to_string(),
            PeerFailure::Network(msg) => {
                format!("{}: {msg}", self.catalog.translate(MessageKey::PeerNetwork))
            }
        }
    }

    /// `host` or `host:port`; bare hosts get the default peer port.
    fn target(&self, address: &str) -> String {
        if address.parse::<SocketAddr>().is_ok() {
            return address.to_string();
        }
        if let Ok(ip) = address.parse::<IpAddr>() {
            return SocketAddr::new(ip, self.default_port).to_string();
        }
        if address.contains(':') {
            address.to_string()
        } else {
            format!("{address}:{}", self.default_port)
        }
    }
}

impl PeerTransport for PeerClient {
    fn send(&self, address: &str, command: &str) -> String {
        self.send_with_timeout(address, command, self.timeout)
    }
}

fn connect(target: &str, timeout: Duration) -> Result<TcpStream, PeerFailure> {
    let mut last_err = None;
    for addr in target.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(match last_err {
        Some(err) => err.into(),
        None => PeerFailure::Network(format!("no address for {target}")),
    })
}

/// Peer list: one address per line, `#` comments and blank lines skipped.
/// A missing file falls back to the loopback address.
pub fn load_peers(path: &Path) -> Vec<String> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), "peer list unavailable ({err}), using 127.0.0.1");
            return vec!["127.0.0.1".to_string()];
        }
    };
    let mut peers: Vec<String> = Vec::new();
    for line in text.lines() {
        let addr = line.trim();
        if addr.is_empty() || addr.starts_with('#') {
            continue;
        }
        if !peers.iter().any(|p| p == addr) {
            peers.push(addr.to_string());
        }
    }
    peers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use std::{net::TcpListener, thread};

    fn client() -> PeerClient {
        PeerClient::new(Catalog::new(Language::En), Duration::from_millis(300), 65525)
    }

    #[test]
    fn answer_is_returned_trimmed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let n = conn.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"BA");
            conn.write_all(b"BA 100\n").unwrap();
        });
        assert_eq!(client().send(&addr.to_string(), "  BA \n"), "BA 100");
        server.join().unwrap();
    }

    #[test]
    fn refused_connection_is_a_response_not_a_crash() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let reply = client().send(&addr.to_string(), "BA");
        assert!(reply.starts_with("ER"), "{reply}");
        assert!(reply.contains("refused"), "{reply}");
        assert!(reply.contains(&addr.to_string()), "{reply}");
    }

    #[test]
    fn silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let reply = client().send(&addr.to_string(), "BA");
        assert!(reply.starts_with("ER Timeout"), "{reply}");
        drop(listener);
    }

    #[test]
    fn closed_without_answer_is_empty_response() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let _ = conn.read(&mut buf);
        });
        let reply = client().send(&addr.to_string(), "BN");
        assert_eq!(reply, "ER Empty response");
        server.join().unwrap();
    }

    #[test]
    fn unresolvable_host_is_a_network_error_with_detail() {
        let reply = client().send("bank.invalid", "BA");
        let detail = reply
            .strip_prefix("ER Network error:")
            .unwrap_or_else(|| panic!("unexpected reply: {reply}"));
        assert!(!detail.trim().is_empty(), "{reply}");
    }

    #[test]
    fn bare_hosts_get_the_default_port() {
        let c = client();
        assert_eq!(c.target("10.0.0.7"), "10.0.0.7:65525");
        assert_eq!(c.target("10.0.0.7:65530"), "10.0.0.7:65530");
        assert_eq!(c.target("::1"), "[::1]:65525");
        assert_eq!(c.target("bank.local"), "bank.local:65525");
    }

    #[test]
    fn peer_list_skips_comments_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peers.txt");
        fs::write(&path, "# class\n10.0.0.1\n\n  10.0.0.2  \n10.0.0.1\n#10.0.0.3\n").unwrap();
        assert_eq!(load_peers(&path), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn missing_peer_list_falls_back_to_loopback() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_peers(&dir.path().join("nope.txt")), vec!["127.0.0.1"]);
    }
}
