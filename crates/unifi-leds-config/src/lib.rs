//! Configuration for unifi-leds.
//!
//! TOML file + `UNIFI_LEDS_*` environment loading, validation, password
//! resolution (env + keyring + plaintext), and translation to
//! `unifi_leds_core::PlatformConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use unifi_leds_core::{FilterRules, PlatformConfig, TlsVerification};

/// Prefix for environment overrides (`UNIFI_LEDS_HOST`, ...).
pub const ENV_PREFIX: &str = "UNIFI_LEDS_";
pub const PASSWORD_ENV: &str = "UNIFI_LEDS_PASSWORD";
const KEYRING_SERVICE: &str = "unifi-leds";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for {username}@{host}")]
    NoCredentials { username: String, host: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Controller base URL (e.g., "https://192.168.1.1").
    pub host: Option<String>,

    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Site descriptions as shown in the controller UI, or internal names.
    #[serde(default = "default_sites")]
    pub sites: Vec<String>,

    /// Only expose these device ids (empty = all).
    #[serde(default)]
    pub include_ids: Vec<String>,

    /// Never expose these device ids. Wins over `include_ids`.
    #[serde(default)]
    pub exclude_ids: Vec<String>,

    /// Minutes between discovery cycles.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Accept self-signed controller certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Path to custom CA certificate. Takes precedence over `insecure`.
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Where the file-backed accessory registry lives.
    pub accessories_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            username: None,
            password: None,
            sites: default_sites(),
            include_ids: Vec::new(),
            exclude_ids: Vec::new(),
            refresh_interval: default_refresh_interval(),
            insecure: default_insecure(),
            ca_cert: None,
            timeout: default_timeout(),
            accessories_path: None,
        }
    }
}

fn default_sites() -> Vec<String> {
    vec!["default".into()]
}
fn default_refresh_interval() -> u64 {
    10
}
fn default_insecure() -> bool {
    true
}
fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| invalid("host", "missing controller URL"))?;
        parse_host(host)?;

        if self.username.as_deref().is_none_or(|u| u.trim().is_empty()) {
            return Err(invalid("username", "missing"));
        }
        if self.sites.is_empty() || self.sites.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("sites", "at least one non-empty site name is required"));
        }
        if self.refresh_interval == 0 {
            return Err(invalid("refresh_interval", "must be a positive number of minutes"));
        }
        if self.timeout == 0 {
            return Err(invalid("timeout", "must be a positive number of seconds"));
        }
        Ok(())
    }

    pub fn tls_verification(&self) -> TlsVerification {
        if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else {
            TlsVerification::SystemDefaults
        }
    }

    /// Registry file location: configured path or the platform data dir.
    pub fn accessories_path(&self) -> PathBuf {
        self.accessories_path
            .clone()
            .unwrap_or_else(|| data_dir().join("accessories.json"))
    }

    /// This config as TOML, with the password redacted.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.password.is_some() {
            shown.password = Some("********".into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

fn parse_host(host: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = host
        .parse()
        .map_err(|_| invalid("host", format!("invalid URL: {host}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("host", format!("expected http(s) URL, got {host}")));
    }
    Ok(url)
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "unifi-leds", "unifi-leds")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn data_dir() -> PathBuf {
    project_dirs().map_or_else(dirs_fallback, |dirs| dirs.data_dir().to_path_buf())
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("unifi-leds");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load defaults, then the TOML file (`path` or the default location),
/// then `UNIFI_LEDS_*` environment overrides. Does not validate.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the controller password: env var, then system keyring
/// (service `unifi-leds`, account `user@host`), then plaintext config.
pub fn resolve_password(config: &Config) -> Result<SecretString, ConfigError> {
    let username = config.username.clone().unwrap_or_default();
    let host = config.host.clone().unwrap_or_default();

    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{username}@{host}")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = config.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials { username, host })
}

// ── Translation ─────────────────────────────────────────────────────

/// Validate and build a `PlatformConfig`, resolving the password.
pub fn to_platform_config(config: &Config) -> Result<PlatformConfig, ConfigError> {
    config.validate()?;
    let password = resolve_password(config)?;
    build_platform_config(config, password)
}

/// Build a `PlatformConfig` with an already-resolved password.
pub fn build_platform_config(
    config: &Config,
    password: SecretString,
) -> Result<PlatformConfig, ConfigError> {
    config.validate()?;
    let url = parse_host(config.host.as_deref().unwrap_or_default())?;

    let mut platform = PlatformConfig::new(url, config.username.clone().unwrap_or_default(), password);
    platform.sites.clone_from(&config.sites);
    platform.filter = FilterRules::new(config.include_ids.clone(), config.exclude_ids.clone());
    platform.refresh_interval = Duration::from_secs(config.refresh_interval.saturating_mul(60));
    platform.tls = config.tls_verification();
    platform.timeout = Duration::from_secs(config.timeout);
    Ok(platform)
}
