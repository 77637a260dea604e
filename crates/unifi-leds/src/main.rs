mod cli;
mod commands;
mod error;
mod output;
mod registry;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::registry::FileRegistry;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let path = cli
        .global
        .config
        .clone()
        .unwrap_or_else(unifi_leds_config::config_path);
    let config = unifi_leds_config::load_config(Some(&path))
        .map_err(|e| CliError::from_config(e, &path))?;

    match cli.command {
        // No controller connection needed
        Command::Config => {
            config
                .validate()
                .map_err(|e| CliError::from_config(e, &path))?;
            let rendered = config
                .to_redacted_toml()
                .map_err(|e| CliError::from_config(e, &path))?;
            print!("{rendered}");
            Ok(())
        }

        cmd => {
            let platform_config = unifi_leds_config::to_platform_config(&config)
                .map_err(|e| CliError::from_config(e, &path))?;
            let registry = Arc::new(FileRegistry::open(config.accessories_path())?);
            tracing::debug!(
                command = ?cmd,
                accessories = %registry.path().display(),
                "dispatching command"
            );
            commands::dispatch(cmd, platform_config, registry, &cli.global).await
        }
    }
}
