//! Log setup. The interactive shell owns the terminal, so logs go to a daily
//! rolling file instead of stderr.

use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "taskflow.log";

/// Installs the global subscriber. `RUST_LOG` wins over `level`.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(level: &str, log_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("⚠️  Warning: Could not create log directory {}: {}", log_dir.display(), e);
        return None;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("taskflow={}", level)));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}
