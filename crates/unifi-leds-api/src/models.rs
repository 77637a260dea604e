// Controller wire types
//
// Models for the network application's JSON API. Fields use
// `#[serde(default)]` liberally because the API is inconsistent about
// field presence across firmware versions and device families.

use serde::{Deserialize, Serialize};

/// Gateway models whose LED ring is driven through `ledSettings`.
///
/// Other `udm`-type consoles have no controllable indicator.
pub const LED_GATEWAY_MODELS: [&str; 2] = ["UDR", "UDM"];

// ── Device ───────────────────────────────────────────────────────────

/// The two device classes whose LEDs this crate can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    #[strum(to_string = "access point")]
    AccessPoint,
    #[strum(to_string = "gateway")]
    Gateway,
}

/// Access-point LED override as stored by the controller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LedOverride {
    On,
    Off,
    /// Follow the site-wide LED setting (which is on unless changed).
    Default,
}

impl LedOverride {
    pub fn is_on(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Nested LED settings carried by LED-capable gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedSettings {
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Device record from `stat/device`.
///
/// The endpoint returns 100+ fields per device. Only the ones this crate
/// reasons about are modelled; everything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatDevice {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// 0=offline, 1=online, 2=pending, 4=upgrading, 5=provisioning
    #[serde(default)]
    pub state: Option<i64>,
    /// Last contact, seconds since the epoch.
    #[serde(default)]
    pub last_seen: Option<i64>,
    #[serde(default)]
    pub uptime: Option<i64>,
    /// Raw `led_override` value; see [`StatDevice::led_override`].
    #[serde(default, rename = "led_override")]
    pub led_override_raw: Option<String>,
    #[serde(default, rename = "ledSettings")]
    pub led_settings: Option<LedSettings>,
    /// Internal name of the site this record was fetched from.
    /// Not part of the controller payload; set by the inventory fetcher.
    #[serde(default)]
    pub site: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StatDevice {
    /// Classify this record, or `None` when its LED cannot be driven.
    pub fn device_class(&self) -> Option<DeviceClass> {
        match self.device_type.as_deref()? {
            "uap" => Some(DeviceClass::AccessPoint),
            "udm" => {
                let model = self.model.as_deref()?;
                LED_GATEWAY_MODELS
                    .contains(&model)
                    .then_some(DeviceClass::Gateway)
            }
            _ => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.device_class().is_some()
    }

    /// Parsed access-point LED override. Unknown values yield `None`.
    pub fn led_override(&self) -> Option<LedOverride> {
        self.led_override_raw.as_deref()?.parse().ok()
    }

    /// Gateway LED flag from the nested `ledSettings` object.
    pub fn led_enabled(&self) -> Option<bool> {
        self.led_settings.and_then(|s| s.enabled)
    }
}

// ── LED updates ──────────────────────────────────────────────────────

/// Body for `PUT rest/device/{id}`. The shape depends on the device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LedUpdate {
    AccessPoint {
        led_override: LedOverride,
    },
    Gateway {
        #[serde(rename = "ledSettings")]
        led_settings: LedSettingsUpdate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedSettingsUpdate {
    pub enabled: bool,
}

impl LedUpdate {
    pub fn new(class: DeviceClass, on: bool) -> Self {
        match class {
            DeviceClass::AccessPoint => Self::AccessPoint {
                led_override: if on { LedOverride::On } else { LedOverride::Off },
            },
            DeviceClass::Gateway => Self::Gateway {
                led_settings: LedSettingsUpdate { enabled: on },
            },
        }
    }
}

// ── Site ─────────────────────────────────────────────────────────────

/// Site record from `self/sites`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteRecord {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// Internal reference used in API paths (e.g. `"default"`).
    #[serde(default)]
    pub name: Option<String>,
    /// Human-facing description (e.g. `"Home"`).
    #[serde(default)]
    pub desc: Option<String>,
}

// ── Response envelope ────────────────────────────────────────────────

/// The `{ meta: { rc, msg }, data: [...] }` envelope. UniFi OS also
/// reports some failures as `{"error":{"code":N,"message":"..."}}` with
/// HTTP 200, so that shape is folded in here too.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub meta: Option<Meta>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<UnifiOsError>,
}

/// `rc == "ok"` means success.
#[derive(Debug, Deserialize)]
pub(crate) struct Meta {
    pub rc: String,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnifiOsError {
    pub code: u16,
    #[serde(default)]
    pub message: Option<String>,
}
