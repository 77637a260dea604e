//! Platform lifecycle handlers.

use tracing::info;

use unifi_leds_core::{DiscoveryOutcome, Platform};

use crate::error::CliError;
use crate::registry::FileRegistry;

/// `unifi-leds run`: start the platform and keep it running until Ctrl-C.
pub async fn run(platform: &Platform) -> Result<(), CliError> {
    platform.start().await;
    info!("platform running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    Ok(())
}

/// `unifi-leds discover`: one discovery cycle against the accessory file.
pub async fn discover(platform: &Platform, registry: &FileRegistry) -> Result<(), CliError> {
    match platform.discover_devices().await {
        DiscoveryOutcome::Completed(summary) => {
            println!(
                "{} devices cached; accessories: {summary}",
                platform.cache().len()
            );
            for entry in registry.entries() {
                let marker = if entry.not_responding { " (not responding)" } else { "" };
                println!(
                    "  {}  {}{marker}",
                    entry.accessory.device_id(),
                    entry.accessory.display_name
                );
            }
            Ok(())
        }
        outcome => Err(CliError::Discovery {
            outcome: outcome.to_string(),
        }),
    }
}

/// `unifi-leds set <id> <on|off>`
pub async fn set(platform: &Platform, id: &str, on: bool) -> Result<(), CliError> {
    platform.connect().await?;
    platform.set_led(id, on).await?;
    println!("LED {} for {id}", if on { "on" } else { "off" });
    Ok(())
}
