mod cli;
mod commands;
mod error;
mod logging;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use gvm_backend::GvmError;
use gvm_core::{GoDevReleaseSource, HttpArchiveFetcher, Manager};
use gvm_platform::{GvmPaths, Platform};

use crate::cli::Cli;
use crate::error::{CliError, EXIT_INTERNAL};
use crate::settings::Settings;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("error: failed to start async runtime: {error}");
            return ExitCode::from(EXIT_INTERNAL);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let paths = match cli.root {
        Some(root) => GvmPaths::new(root),
        None => GvmPaths::from_env()?,
    };
    let settings = Settings::load(&paths.settings_file());
    logging::init_logging(
        &paths,
        settings.debug_logging,
        cli.verbose,
        settings.max_log_size_bytes,
    );
    log::debug!(
        "gvm {} using root {}",
        env!("CARGO_PKG_VERSION"),
        paths.root().display()
    );

    let options = settings.http_options();
    let source =
        GoDevReleaseSource::new(&options, Platform::current()).map_err(GvmError::from)?;
    let fetcher = HttpArchiveFetcher::new(&options).map_err(GvmError::from)?;
    let manager = Manager::new(paths, Box::new(source), Box::new(fetcher));

    commands::run(cli.command, &manager, &settings).await
}
