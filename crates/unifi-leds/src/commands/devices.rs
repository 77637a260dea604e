//! Device listing handlers.

use unifi_leds_core::Platform;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// `unifi-leds devices`
pub async fn list(platform: &Platform, global: &GlobalOpts) -> Result<(), CliError> {
    let mut devices = platform.inventory().await?;
    devices.sort_by(|a, b| a.site.cmp(&b.site).then_with(|| a.display_name().cmp(b.display_name())));

    println!("{}", output::render_devices(global.output, &devices)?);
    Ok(())
}

/// `unifi-leds device <mac>`
pub async fn show(platform: &Platform, mac: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let device = platform.device_by_mac(mac).await?;
    println!("{}", output::render_device(global.output, &device)?);
    Ok(())
}
