//! One guarded relay pass over the root directory.

use std::path::Path;

use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::InstanceError;
use crate::instance::{default_lock_path, InstanceGuard};
use crate::protocols::{SessionFactory, TransportFactory};
use crate::relay::{RelayOptions, RootRunner, RunSummary};

/// How a pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another instance holds the lock; nothing was touched
    AlreadyRunning,
    Completed(RunSummary),
}

impl RunOutcome {
    /// Process exit status; an overlapping run that stood down is not a failure
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::AlreadyRunning | RunOutcome::Completed(_) => 0,
        }
    }
}

/// Runs one pass with real FTP/SFTP sessions, as configured by `cli`
pub fn run(cli: &Cli) -> Result<RunOutcome, InstanceError> {
    let lock_path = cli.lock_file.clone().unwrap_or_else(default_lock_path);
    run_with(
        &cli.options(),
        &cli.root_dir,
        &lock_path,
        &SessionFactory::default(),
    )
}

/// Runs one pass under the single-instance lock at `lock_path`
///
/// The lock is released on every exit path, including a panic unwinding
/// out of the root runner.
///
/// # Errors
/// Only lock file I/O failures; per-directory failures are logged by the
/// runner and counted in the summary.
pub fn run_with(
    options: &RelayOptions,
    root: &Path,
    lock_path: &Path,
    factory: &dyn TransportFactory,
) -> Result<RunOutcome, InstanceError> {
    let guard = match InstanceGuard::acquire(lock_path) {
        Ok(guard) => guard,
        Err(e @ InstanceError::AlreadyRunning { .. }) => {
            warn!(error = %e, "Refusing to start");
            return Ok(RunOutcome::AlreadyRunning);
        }
        Err(e) => return Err(e),
    };

    let summary = RootRunner::new(options, factory).run(root);
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Run finished"
    );

    guard.release()?;
    Ok(RunOutcome::Completed(summary))
}
