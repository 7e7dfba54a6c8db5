//! Server configuration, built by the binary and consumed at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (0 for auto-assign).
    pub port: u16,
    /// Path to the `SQLite` history database.
    pub db_path: PathBuf,
    /// Evict sessions idle longer than this. `None` disables eviction.
    pub idle_timeout: Option<Duration>,
}

impl ServerConfig {
    /// The socket address to bind, or an error string for a bad host.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8420,
            db_path: PathBuf::from("courier.db"),
            idle_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_parses_host_and_port() {
        let config = ServerConfig {
            host: "0.0.0.0".into(),
            port: 9000,
            ..ServerConfig::default()
        };
        let addr = config.bind_addr().unwrap();
        assert_eq!(addr.port(), 9000);
    }

    #[test]
    fn bad_host_is_an_error() {
        let config = ServerConfig {
            host: "not a host".into(),
            ..ServerConfig::default()
        };
        assert!(config.bind_addr().is_err());
    }
}
