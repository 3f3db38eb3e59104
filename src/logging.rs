use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
///
/// Console output goes to stderr so that command output on stdout stays
/// machine-readable. The returned guard must be kept alive for the file
/// layer to flush.
pub fn init_logging(log_dir: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("address_validator=info"));

    // No writable log directory: console only
    let (file_layer, guard) = match fs::create_dir_all(log_dir) {
        Ok(()) => {
            // Create a non-blocking file appender for daily log rotation
            let file_appender = tracing_appender::rolling::daily(log_dir, "address_validator.log");
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

            // Create a JSON layer for file logging
            let layer = fmt::layer().json().with_writer(non_blocking_writer);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        let guard = init_logging(&log_dir);
        assert!(guard.is_some());
        tracing::info!(check = "logging", "Logging initialized");
        drop(guard);

        let files: Vec<_> = fs::read_dir(&log_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("address_validator.log"));
    }
}
