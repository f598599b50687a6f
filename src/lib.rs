//! TDS Relay Utility Library
//!
//! This library contains the core logic for the tdsrelay utility, which
//! forwards data files from per-directory staging queues to one or more
//! FTP/SFTP ingestion hosts: destination configuration parsing, candidate
//! selection and customer validation, collision-free uploads, file
//! lifecycle handling, logging, command-line handling and single-instance
//! management.

pub mod app;
pub mod cli;
pub mod config;
pub mod customer;
pub mod eligibility;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod logging;
pub mod naming;
pub mod outcome;
pub mod protocols;
pub mod relay;
pub mod upload;

pub use app::{run, RunOutcome};
pub use cli::{parse_args, Cli};
pub use config::{parse_destinations, Destination, Mode};
pub use error::{ConfigError, InstanceError, RelayError, TransportError, ValidationError};
pub use instance::InstanceGuard;
pub use relay::{RelayOptions, RootRunner, SubfolderRunner};

/// Name of the program used for:
/// - Log banners
/// - The single-instance lock file ({runtime dir}/{PROGRAM_NAME}.lock)
pub const PROGRAM_NAME: &str = "tdsrelay";

/// Current version of the program (from Cargo.toml)
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration file expected inside every staging directory
pub const CONFIG_FILE_NAME: &str = ".config.ini";

/// Suffix of in-flight remote uploads and of local files still being written
pub const TEMP_SUFFIX: &str = ".tmp";

/// Sub-directory holding files that need manual handling
pub const QUARANTINE_DIR: &str = "quarantined";

/// Sub-directory holding delivered files (unless run with `--backup`)
pub const ARCHIVE_DIR: &str = "transferred";

/// Extension accepted when not running in all-pass mode
pub const DATA_EXTENSION: &str = "dat";

/// Default minimum file age before a file is picked up (seconds)
pub const DEFAULT_DELAY_SECS: u64 = 120;
