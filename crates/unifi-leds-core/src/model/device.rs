// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unifi_leds_api::{DeviceClass, LedOverride, StatDevice};

use crate::error::CoreError;

pub const MANUFACTURER: &str = "Ubiquiti";

/// LED state, shaped by device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Led {
    /// Flat `led_override` flag.
    AccessPoint { mode: Option<LedOverride> },
    /// Nested `ledSettings.enabled` flag.
    Gateway { enabled: Option<bool> },
}

impl Led {
    pub fn class(&self) -> DeviceClass {
        match self {
            Self::AccessPoint { .. } => DeviceClass::AccessPoint,
            Self::Gateway { .. } => DeviceClass::Gateway,
        }
    }

    /// Current on/off state, `None` when the controller did not report one.
    pub fn is_on(&self) -> Option<bool> {
        match *self {
            Self::AccessPoint { mode } => mode.map(LedOverride::is_on),
            Self::Gateway { enabled } => enabled,
        }
    }

    /// The state after a successful write of `on`.
    pub fn with_state(self, on: bool) -> Self {
        match self {
            Self::AccessPoint { .. } => Self::AccessPoint {
                mode: Some(if on { LedOverride::On } else { LedOverride::Off }),
            },
            Self::Gateway { .. } => Self::Gateway { enabled: Some(on) },
        }
    }
}

/// A controller-managed device with a drivable LED.
///
/// Always carries the internal name of the site it was fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub site: String,
    pub mac: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub firmware_version: Option<String>,
    /// Last contact, seconds since the epoch.
    pub last_seen: Option<i64>,
    /// Uptime in seconds.
    pub uptime: Option<i64>,
    /// Raw controller state code (1 = online).
    pub state: Option<i64>,
    pub led: Led,
}

impl Device {
    pub fn class(&self) -> DeviceClass {
        self.led.class()
    }

    /// Display name for the accessory: the device name, else model, else id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.model.as_deref())
            .unwrap_or(&self.id)
    }

    pub fn led_on(&self) -> Option<bool> {
        self.led.is_on()
    }

    /// Whether the controller currently reports this device as live:
    /// positive last-contact and uptime, or an explicit online state.
    pub fn is_ready(&self) -> bool {
        let live = self.last_seen.is_some_and(|t| t > 0) && self.uptime.is_some_and(|u| u > 0);
        live || self.state == Some(1)
    }

    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen
            .filter(|t| *t > 0)
            .and_then(|t| DateTime::from_timestamp(t, 0))
    }

    pub fn accessory_info(&self) -> AccessoryInfo {
        AccessoryInfo {
            manufacturer: MANUFACTURER.into(),
            model: self.model.clone().unwrap_or_else(|| "Unknown".into()),
            serial: self
                .serial
                .clone()
                .or_else(|| self.mac.clone())
                .unwrap_or_else(|| self.id.clone()),
            firmware_version: self.firmware_version.clone(),
        }
    }
}

/// Descriptive information shown by the automation host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryInfo {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware_version: Option<String>,
}

impl TryFrom<StatDevice> for Device {
    type Error = CoreError;

    fn try_from(raw: StatDevice) -> Result<Self, Self::Error> {
        let led = match raw.device_class() {
            Some(DeviceClass::AccessPoint) => Led::AccessPoint {
                mode: raw.led_override(),
            },
            Some(DeviceClass::Gateway) => Led::Gateway {
                enabled: raw.led_enabled(),
            },
            None => {
                return Err(CoreError::Api {
                    message: format!(
                        "device {} has no controllable LED (type {:?}, model {:?})",
                        raw.id.as_deref().unwrap_or("<unknown>"),
                        raw.device_type,
                        raw.model
                    ),
                    status: None,
                });
            }
        };

        let Some(id) = raw.id.filter(|id| !id.is_empty()) else {
            return Err(CoreError::Api {
                message: "device record has no id".into(),
                status: None,
            });
        };
        let Some(site) = raw.site.filter(|s| !s.is_empty()) else {
            return Err(CoreError::Api {
                message: format!("device {id} is not tagged with a site"),
                status: None,
            });
        };

        Ok(Self {
            id,
            site,
            mac: raw.mac,
            name: raw.name,
            model: raw.model,
            serial: raw.serial,
            firmware_version: raw.version,
            last_seen: raw.last_seen,
            uptime: raw.uptime,
            state: raw.state,
            led,
        })
    }
}
