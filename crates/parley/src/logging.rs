//! Log output for the server process.
//!
//! Console and file output are independent layers on one `Registry`;
//! either, both, or neither may be enabled. The file is plain text with
//! no ANSI colours and is never rotated.

use std::fs;
use std::io::ErrorKind;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::{LogConfig, ParleyError};

/// Name of the log file inside [`LogConfig::directory`].
pub const LOG_FILE_NAME: &str = "server.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the file writer alive. Dropping it flushes pending log lines, so
/// hold it until the server has stopped.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Installs the global subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over [`LogConfig::filter`]. With both
/// outputs disabled nothing is installed. Fails if a global subscriber is
/// already set.
pub fn init(config: &LogConfig) -> Result<LogGuard, ParleyError> {
    if config.clean_on_start {
        match fs::remove_dir_all(&config.directory) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
    }

    if !config.to_console && !config.to_files {
        return Ok(LogGuard { _file: None });
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| ParleyError::Logging(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.to_console {
        layers.push(Box::new(
            tracing_subscriber::fmt::layer().with_target(false),
        ));
    }

    let mut file_guard = None;
    if config.to_files {
        fs::create_dir_all(&config.directory)?;
        let appender =
            tracing_appender::rolling::never(&config.directory, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(Box::new(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        ));
        file_guard = Some(guard);
    }

    layers.push(Box::new(filter));

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| ParleyError::Logging(e.to_string()))?;

    Ok(LogGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("parley-logging-{tag}-{}", std::process::id()))
    }

    #[test]
    fn test_init_with_no_outputs_installs_nothing() {
        let config = LogConfig {
            to_console: false,
            to_files: false,
            directory: scratch_dir("none"),
            ..LogConfig::default()
        };
        let _guard = init(&config).expect("nothing to install");
        assert!(!config.directory.exists());
    }

    #[test]
    fn test_init_clean_on_start_removes_old_logs() {
        let dir = scratch_dir("clean");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(LOG_FILE_NAME), b"old run").unwrap();

        let config = LogConfig {
            to_console: false,
            to_files: false,
            clean_on_start: true,
            directory: dir.clone(),
            ..LogConfig::default()
        };
        let _guard = init(&config).unwrap();

        assert!(!dir.exists());
    }

    #[test]
    fn test_init_clean_on_start_tolerates_missing_dir() {
        let config = LogConfig {
            to_console: false,
            clean_on_start: true,
            directory: scratch_dir("missing"),
            ..LogConfig::default()
        };
        assert!(init(&config).is_ok());
    }
}
