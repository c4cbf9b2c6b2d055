//! Parley chat server binary.
//!
//! # Usage
//!
//! ```bash
//! # Port 8000, unlimited clients, log to the console
//! parley-server
//!
//! # Port 9000, at most 50 clients, log to logs/server.log only
//! parley-server 9000 50 --log-files --clean-logs
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use parley::{DEFAULT_PORT, LogConfig, ParleyServer, ServerConfig};

/// Real-time text chat server
#[derive(Parser, Debug)]
#[command(name = "parley-server")]
#[command(about = "Real-time text chat server over WebSocket")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum number of online clients (0 = unlimited)
    #[arg(default_value_t = 0)]
    max_clients: usize,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Write logs to <log-dir>/server.log
    #[arg(long)]
    log_files: bool,

    /// Write logs to stdout
    #[arg(long)]
    log_console: bool,

    /// Delete the log directory before starting
    #[arg(long)]
    clean_logs: bool,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Log filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Kick clients that send nothing for this many seconds
    #[arg(long)]
    idle_timeout: Option<u64>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        // Console logging is the fallback when no sink was asked for.
        let to_console = self.log_console || !self.log_files;
        ServerConfig {
            host: self.host,
            port: self.port,
            max_clients: self.max_clients,
            idle_timeout: self.idle_timeout.map(Duration::from_secs),
            log: LogConfig {
                to_files: self.log_files,
                to_console,
                clean_on_start: self.clean_logs,
                directory: self.log_dir,
                filter: self.log_level,
            },
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Args::parse().into_config();

    let _log = match parley::logging::init(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("parley-server: {e}");
            return ExitCode::FAILURE;
        }
    };

    let server = match ParleyServer::builder().config(config).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "could not start server");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server stopped with an error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["parley-server"];
        argv.extend_from_slice(args);
        Args::parse_from(argv).into_config()
    }

    #[test]
    fn test_args_defaults_log_to_console() {
        let config = parse(&[]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_clients, 0);
        assert!(config.log.to_console);
        assert!(!config.log.to_files);
        assert_eq!(config.idle_timeout, None);
    }

    #[test]
    fn test_args_positional_port_and_capacity() {
        let config = parse(&["9000", "50"]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_clients, 50);
    }

    #[test]
    fn test_args_log_files_only_disables_console() {
        let config = parse(&["--log-files", "--clean-logs", "--log-dir", "/tmp/chat"]);
        assert!(config.log.to_files);
        assert!(!config.log.to_console);
        assert!(config.log.clean_on_start);
        assert_eq!(config.log.directory, PathBuf::from("/tmp/chat"));
    }

    #[test]
    fn test_args_both_sinks() {
        let config = parse(&["--log-files", "--log-console"]);
        assert!(config.log.to_files && config.log.to_console);
    }

    #[test]
    fn test_args_idle_timeout_in_seconds() {
        let config = parse(&["--idle-timeout", "30"]);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
    }
}
