use std::{ops::RangeInclusive, path::PathBuf, time::Duration};

use crate::i18n::Language;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 65525;
/// Ports the class agreed on. Anything else only produces a warning.
pub const PORT_RANGE: RangeInclusive<u16> = 65525..=65535;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_LEDGER_FILE: &str = "data.json";
pub const DEFAULT_PEERS_FILE: &str = "peers.txt";

/// Size of a single read, on both the server and the peer client side.
pub const RECV_BUFFER: usize = 1024;
pub const LISTEN_BACKLOG: i32 = 5;

#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub idle_timeout: Duration,
    pub peer_timeout: Duration,
    /// Port used for peer addresses that do not carry one.
    pub peer_port: u16,
    pub ledger_path: PathBuf,
    pub peers_path: PathBuf,
    pub language: Language,
    /// Address reported by `BC`/`AC`; resolved from the network when unset.
    pub advertise: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            peer_port: DEFAULT_PORT,
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
            peers_path: PathBuf::from(DEFAULT_PEERS_FILE),
            language: Language::default(),
            advertise: None,
        }
    }
}

impl NodeConfig {
    pub fn port_in_range(&self) -> bool {
        PORT_RANGE.contains(&self.port)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_class_protocol() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:65525");
        assert!(cfg.port_in_range());
        assert_eq!(cfg.idle_timeout, Duration::from_secs(60));
        assert_eq!(cfg.language, Language::Cs);
    }

    #[test]
    fn out_of_range_port_is_flagged() {
        let cfg = NodeConfig {
            port: 8080,
            ..NodeConfig::default()
        };
        assert!(!cfg.port_in_range());
    }
}
