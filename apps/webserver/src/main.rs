use webserver::app::run;
use webserver::cli::Cli;
use webserver::error::WebserverError;
use webserver::logger::initialize as LoggerInitialize;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal.
    let dotenv = dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = start_logging(&cli) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }
    if let Some(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn start_logging(cli: &Cli) -> Result<(), WebserverError> {
    if let Some(log_dir) = &cli.log_dir {
        create_dir_all(log_dir).map_err(|e| WebserverError::Webserver {
            message: format!("Failed to create log directory: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
    }
    LoggerInitialize(cli.log_dir.as_deref(), cli.log_level)
}
