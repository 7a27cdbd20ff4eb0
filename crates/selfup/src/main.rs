mod cli;
mod error;
mod logging;
mod settings;

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{error, warn};
use selfup_core::{Applier, GithubResolver, run_update_cycle_with};
use selfup_resolver::ResolveRequest;
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::error::AppError;
use crate::settings::Settings;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let (mut settings, settings_error) = match loaded {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    cli.override_settings(&mut settings);

    logging::init_logging(settings.debug_logging, settings.max_log_size_bytes);
    if let Some(e) = settings_error {
        warn!("{e}; continuing with defaults and command-line flags");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&settings, &cli.current_version, cli.target.as_deref())) {
        Ok(true) => {
            println!("Updated; the new version takes effect on the next start.");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("Already up to date ({}).", cli.current_version);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(
    settings: &Settings,
    current_version: &str,
    target: Option<&Path>,
) -> Result<bool, AppError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.http_timeout_secs))
        .build()
        .map_err(AppError::HttpClient)?;
    let resolver = GithubResolver::new(client, settings.github_options())?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, abandoning update check");
                cancel.cancel();
            }
        }
    });

    let applier = match target {
        Some(path) => Applier::new().with_target(path),
        None => Applier::new(),
    };
    let request = ResolveRequest::new(current_version).with_cancel(cancel);
    Ok(run_update_cycle_with(&resolver, &request, &applier).await?)
}
