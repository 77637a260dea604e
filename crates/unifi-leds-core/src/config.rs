// ── Runtime platform configuration ──
//
// Describes which controller to talk to and which devices to expose.
// Carries credential data but never touches disk; the binary builds a
// `PlatformConfig` from `unifi-leds-config` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use unifi_leds_api::{TlsMode, TransportConfig};
use url::Url;

use crate::filter::FilterRules;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs). Default for local controllers.
    #[default]
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Configuration for one platform instance (one controller).
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Controller URL (e.g., `https://192.168.1.1`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// Human site names (descriptions) or internal names.
    pub sites: Vec<String>,
    pub filter: FilterRules,
    /// Period of the background discovery task. Zero disables it.
    pub refresh_interval: Duration,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl PlatformConfig {
    /// Minimal config with defaults for everything but the connection.
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            sites: vec!["default".into()],
            filter: FilterRules::default(),
            refresh_interval: Duration::from_secs(600),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }
}
