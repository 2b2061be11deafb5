//! Binary entry point: resolve settings, start logging, then run the chosen
//! command (the dashboard when none is given).
use academia_maestro::cli::{self, Cli, Command};
use academia_maestro::config::Config;
use academia_maestro::logging::init_logging;
use clap::Parser;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = Config::resolve(args.db_path, args.log_path, args.lesson_price)?;
    init_logging(&config.log_path)?;
    info!(db = %config.db_path.display(), "academia-maestro starting");

    let command = args.command.unwrap_or(Command::Dashboard {
        from: None,
        to: None,
    });
    let result = cli::run(command, &config);
    if let Err(err) = &result {
        error!(error = format!("{err:#}"), "command failed");
    }
    result
}
