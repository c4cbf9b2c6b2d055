//! Server and logging configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 8000;

/// Where and how the server logs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Append to `<directory>/server.log`.
    pub to_files: bool,
    /// Print to stdout.
    pub to_console: bool,
    /// Delete `directory` before logging starts.
    pub clean_on_start: bool,
    pub directory: PathBuf,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            to_files: false,
            to_console: true,
            clean_on_start: false,
            directory: PathBuf::from("logs"),
            filter: "info".to_string(),
        }
    }
}

/// Everything the server needs to run.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Maximum number of online clients. 0 means unlimited.
    pub max_clients: usize,

    /// How long a new connection may take to send its first packet.
    pub handshake_timeout: Duration,

    /// Kick online clients that stay silent this long. `None` disables it.
    pub idle_timeout: Option<Duration>,

    /// How long one outbound frame may take to write. A client that
    /// stops reading is dropped once a write stalls this long.
    pub write_timeout: Duration,

    /// How long shutdown waits for sessions to flush and close.
    pub shutdown_grace: Duration,

    pub log: LogConfig,
}

impl ServerConfig {
    /// `host:port`, as handed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: 0,
            handshake_timeout: Duration::from_secs(10),
            idle_timeout: None,
            write_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.max_clients, 0);
        assert!(config.idle_timeout.is_none());
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert!(config.log.to_console);
        assert!(!config.log.to_files);
    }
}
