use std::process::ExitCode;

use tdsrelay::{logging, parse_args, run, PROGRAM_NAME, PROGRAM_VERSION};
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = parse_args();
    if let Err(e) = logging::init(cli.log_file.as_deref(), cli.verbose) {
        eprintln!("Error: cannot set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("{} version {} started", PROGRAM_NAME, PROGRAM_VERSION);
    let options = cli.options();
    info!(
        root = %cli.root_dir.display(),
        search_root = options.search_root,
        validate_customer = options.validate_customer,
        archive = options.backup,
        selection = ?options.selection,
        delay_secs = options.delay.as_secs(),
        "Options"
    );

    // The instance guard lives inside `run`, so it is released before we
    // get here on every path.
    let code = match run(&cli) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            error!(error = %e, "Instance lock error");
            ExitCode::FAILURE
        }
    };

    info!("{} terminated", PROGRAM_NAME);
    code
}
