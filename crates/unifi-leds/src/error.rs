//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use unifi_leds_config::ConfigError;
use unifi_leds_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to controller at {url}")]
    #[diagnostic(
        code(unifi_leds::connection_failed),
        help(
            "Check that the controller is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(unifi_leds::auth_failed),
        help(
            "Verify username and password. Use a local controller account;\n\
             cloud accounts with two-factor authentication cannot log in."
        )
    )]
    AuthFailed { message: String },

    #[error("No password configured for {username}@{host}")]
    #[diagnostic(
        code(unifi_leds::no_credentials),
        help(
            "Set UNIFI_LEDS_PASSWORD, store it in the system keyring\n\
             (service 'unifi-leds', account '{username}@{host}'), or add\n\
             `password` to the config file."
        )
    )]
    NoCredentials { username: String, host: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Device '{identifier}' not found")]
    #[diagnostic(
        code(unifi_leds::not_found),
        help("Run: unifi-leds devices to see available devices")
    )]
    NotFound { identifier: String },

    #[error("Device '{identifier}' is not responding")]
    #[diagnostic(
        code(unifi_leds::not_responding),
        help("Re-run with -v to see the controller error.")
    )]
    NotResponding { identifier: String },

    #[error("Discovery did not complete: {outcome}")]
    #[diagnostic(code(unifi_leds::discovery))]
    Discovery { outcome: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(unifi_leds::api_error))]
    ApiError { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(unifi_leds::validation),
        help("Expected config at: {path}")
    )]
    Validation {
        field: String,
        reason: String,
        path: String,
    },

    #[error(transparent)]
    #[diagnostic(code(unifi_leds::config))]
    Config(Box<dyn std::error::Error + Send + Sync>),

    // ── Accessory registry ───────────────────────────────────────────
    #[error("Accessory registry error at {path}")]
    #[diagnostic(code(unifi_leds::registry))]
    Registry {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    #[diagnostic(code(unifi_leds::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation {
                field,
                reason,
                path: path.display().to_string(),
            },
            ConfigError::NoCredentials { username, host } => Self::NoCredentials { username, host },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── Conversion from CoreError ────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::DeviceNotFound { identifier } => Self::NotFound { identifier },
            CoreError::NotResponding { identifier } => Self::NotResponding { identifier },
            CoreError::Api { message, .. } | CoreError::Registry { message } => {
                Self::ApiError { message }
            }
            CoreError::Config { message } => Self::Validation {
                field: "configuration".into(),
                reason: message,
                path: unifi_leds_config::config_path().display().to_string(),
            },
        }
    }
}
