use crate::config::LoggingConfig;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber with an env filter, a stderr console layer
/// and an optional daily-rolling file layer.
///
/// Keep the returned guard alive for the life of the process so buffered
/// file output is flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let log_dir = std::env::var("LINESMITH_LOG_DIR")
        .ok()
        .map(PathBuf::from)
        .or_else(|| config.log_dir.clone());

    // `rolling::daily` panics if it cannot create the first file, so check writability first
    let mut guard = None;
    let file_layer = log_dir.and_then(|dir| {
        let writable = std::fs::create_dir_all(&dir).is_ok()
            && std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(".linesmith_write_test"))
                .is_ok();
        if !writable {
            eprintln!(
                "Warning: Could not write to log directory {}, file logging disabled",
                dir.display()
            );
            return None;
        }
        let _ = std::fs::remove_file(dir.join(".linesmith_write_test"));

        let file_appender = tracing_appender::rolling::daily(&dir, "linesmith.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
    });

    let json_layer = config
        .json
        .then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
        });
    let console_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });

    // Already-installed subscribers (tests, embedding) are left in place
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init();

    guard
}
