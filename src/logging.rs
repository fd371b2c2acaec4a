/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;
use crate::error::{Result, SummaryError};

/// Crates whose events the default filter lets through
const LOG_TARGETS: [&str; 3] = [
    "vision_summary",
    "summary_count_sensor",
    "summary_count_classifier",
];

/// Effective level after the verbose flag is applied
pub fn effective_level(config: &LoggingConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.level.to_tracing_level()
    }
}

/// Filter directives for our own crates at `level`
pub fn default_directives(level: Level) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize structured logging based on configuration.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let directives = default_directives(effective_level(config));

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directives))
        .map_err(|e| SummaryError::Config(format!("Failed to create log filter: {}", e)))?;

    if let Some(ref log_path) = config.file {
        init_file_logging(log_path, env_filter)
    } else {
        init_stderr_logging(env_filter)
    }
}

/// Compact human-readable lines on stderr, leaving stdout for readings
fn init_stderr_logging(env_filter: EnvFilter) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| SummaryError::Config(format!("Failed to install logger: {}", e)))
}

/// JSON lines to a file
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path)
        .map_err(|e| SummaryError::Config(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| SummaryError::Config(format!("Failed to install logger: {}", e)))
}

/// Route our crates' debug output to the test harness
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(Level::DEBUG)));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();
    });
}
