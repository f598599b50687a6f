use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Timestamp format at the head of every log line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::new(format!("{}={}", crate::PROGRAM_NAME, level))
}

/// Builds the subscriber used for the whole run
///
/// Log lines carry a local timestamp. When `log_file` is set lines are
/// appended to it (created if missing) without colour codes; otherwise they
/// go to stdout. `RUST_LOG` overrides the level chosen by `verbose`.
///
/// # Errors
/// Returns an error if the log file cannot be opened for appending.
pub fn build(log_file: Option<&Path>, verbose: bool) -> io::Result<impl Subscriber + Send + Sync> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(io::stdout),
    };

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_target(false)
        .with_ansi(log_file.is_none())
        .with_writer(writer)
        .finish())
}

/// Installs the run subscriber globally
///
/// # Errors
/// Returns an error if the log file cannot be opened or a global
/// subscriber is already installed.
pub fn init(log_file: Option<&Path>, verbose: bool) -> io::Result<()> {
    let subscriber = build(log_file, verbose)?;
    tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)
}
