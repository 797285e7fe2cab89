//! Tracing setup: compact stdout output plus a daily-rotated file under
//! `<data-dir>/logs`.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. The returned guard must stay
/// alive for the process lifetime or buffered file output is lost.
///
/// `RUST_LOG` controls filtering and defaults to `info`.
pub fn init(data_dir: &Path) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = tracing_appender::rolling::daily(&log_dir, "crawlmap.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false)
        .compact();

    let stdout_layer = fmt::layer().with_target(false).compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    tracing::debug!(dir = %log_dir.display(), "logging initialized");

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    #[test]
    fn log_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        // The subscriber can only be installed once per process, so only the
        // directory handling is exercised here.
        std::fs::create_dir_all(&log_dir).unwrap();
        assert!(log_dir.exists());
    }
}
