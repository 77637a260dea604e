//! Command dispatch: bridges CLI args -> platform operations -> output.

pub mod devices;
pub mod run;

use std::sync::Arc;

use unifi_leds_core::{Platform, PlatformConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::registry::FileRegistry;

/// Dispatch a controller-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: PlatformConfig,
    registry: Arc<FileRegistry>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let platform = Platform::new(config, registry.clone())?;

    let result = match cmd {
        Command::Run => run::run(&platform).await,
        Command::Discover => run::discover(&platform, &registry).await,
        Command::Set { id, state } => run::set(&platform, &id, state.is_on()).await,
        Command::Devices => devices::list(&platform, global).await,
        Command::Device { mac } => devices::show(&platform, &mac, global).await,
        // Config is handled before dispatch
        Command::Config => Ok(()),
    };

    // `run` already shut down; for one-shot commands this just logs out.
    platform.shutdown().await;
    result
}
