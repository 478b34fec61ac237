use supportflow_core::config::{LogFormat, LoggingConfig};
use tracing::Level;

/// Installs the global subscriber writing to stderr. Later calls are no-ops so every
/// command may call it after loading its config.
pub fn init_logging(config: &LoggingConfig) {
    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    let installed = match config.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .compact()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .pretty()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .json()
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(event_name = "cli.logging.initialized", level = %log_level, "logging ready");
    }
}
