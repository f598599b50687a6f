use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::eligibility::SelectionMode;
use crate::relay::RelayOptions;
use crate::DEFAULT_DELAY_SECS;

/// Forwards staged data files to the FTP/SFTP hosts configured per directory
#[derive(Parser, Debug, Clone)]
#[command(name = "tdsrelay")]
#[command(version)]
pub struct Cli {
    /// Root directory holding the staging directories
    #[arg(short = 'r', long, value_name = "PATH")]
    pub root_dir: PathBuf,

    /// Treat the root itself as the only staging directory
    #[arg(long)]
    pub search_root: bool,

    /// Do not check the customer embedded in each data file
    #[arg(long)]
    pub no_validate_customer: bool,

    /// Delete delivered files instead of keeping them in `transferred/`
    #[arg(long)]
    pub backup: bool,

    /// Pick up every `*.*` file, not only `*.dat`
    #[arg(long)]
    pub all_pass: bool,

    /// Minimum file age in seconds before a file is picked up
    #[arg(
        long,
        value_name = "SECONDS",
        num_args = 0..=1,
        default_value_t = DEFAULT_DELAY_SECS,
        default_missing_value = "120"
    )]
    pub delay: u64,

    /// Append log output to this file instead of stdout
    #[arg(short = 'l', long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Single-instance lock file (default: per-user runtime directory)
    #[arg(long, value_name = "PATH")]
    pub lock_file: Option<PathBuf>,

    /// Log debug detail
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Run options derived from the flags
    pub fn options(&self) -> RelayOptions {
        RelayOptions {
            search_root: self.search_root,
            validate_customer: !self.no_validate_customer,
            backup: !self.backup,
            selection: if self.all_pass {
                SelectionMode::Permissive
            } else {
                SelectionMode::Strict
            },
            delay: Duration::from_secs(self.delay),
        }
    }
}

/// Parses the process arguments; exits with usage on error or `--help`
pub fn parse_args() -> Cli {
    Cli::parse()
}
