//! Output formatting: table or JSON.

use tabled::{Table, Tabled, settings::Style};

use unifi_leds_core::Device;

use crate::cli::OutputFormat;
use crate::error::CliError;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "LED")]
    led: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id.clone(),
            name: d.display_name().to_owned(),
            model: d.model.clone().unwrap_or_else(|| "-".into()),
            class: d.class().to_string(),
            site: d.site.clone(),
            led: led_label(d.led_on()).into(),
            last_seen: d
                .last_seen_at()
                .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

fn led_label(state: Option<bool>) -> &'static str {
    match state {
        Some(true) => "on",
        Some(false) => "off",
        None => "unknown",
    }
}

pub fn render_devices(format: OutputFormat, devices: &[Device]) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<DeviceRow> = devices.iter().map(DeviceRow::from).collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(devices)?),
    }
}

pub fn render_device(format: OutputFormat, device: &Device) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let info = device.accessory_info();
            let lines = [
                ("ID", device.id.clone()),
                ("Name", device.display_name().to_owned()),
                ("MAC", device.mac.clone().unwrap_or_else(|| "-".into())),
                ("Model", info.model),
                ("Serial", info.serial),
                ("Firmware", info.firmware_version.unwrap_or_else(|| "-".into())),
                ("Class", device.class().to_string()),
                ("Site", device.site.clone()),
                ("LED", led_label(device.led_on()).into()),
                ("Ready", device.is_ready().to_string()),
            ];
            Ok(lines
                .iter()
                .map(|(k, v)| format!("{k:<10} {v}"))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(device)?),
    }
}
