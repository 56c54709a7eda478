//! Logging configuration for the kontext CLI
//!
//! Standard output carries shell code that the caller evaluates, so every
//! log line goes to stderr. An optional file layer captures debug output.

use kontext_core::{Error, Result};
use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system
///
/// # Arguments
/// * `verbose` - Enable debug level logging on stderr
/// * `log_file` - Optional path to append logs to
///
/// # Examples
/// ```ignore
/// // Warnings and info on stderr
/// init(false, None)?;
///
/// // Debug output, mirrored to a file
/// init(true, Some(Path::new("kontext.log")))?;
/// ```
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    // RUST_LOG wins over the verbosity flag
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "kontext={level},kontext_core={level},kontext_config={level},kontext_engine={level}"
        ))
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .without_time()
        .compact()
        .with_ansi(true)
        .with_filter(env_filter);

    let file_layer = match log_file {
        Some(log_path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
                .map_err(|e| Error::file_io("open log file", log_path, e))?;

            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .pretty()
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to initialise logging: {e}")))
}
