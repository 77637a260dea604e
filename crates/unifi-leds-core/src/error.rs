// ── Core error types ──
//
// Errors surfaced by the platform. Transport and payload detail from
// `unifi_leds_api` is folded into a handful of domain variants here.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    /// The accessory cannot answer right now. Surfaced to the automation
    /// host as "not responding"; a background recovery is already running.
    #[error("Device not responding: {identifier}")]
    NotResponding { identifier: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Host errors ──────────────────────────────────────────────────
    /// The accessory registry rejected an operation.
    #[error("Accessory registry error: {message}")]
    Registry { message: String },
}

impl CoreError {
    pub(crate) fn not_responding(identifier: impl Into<String>) -> Self {
        Self::NotResponding {
            identifier: identifier.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<unifi_leds_api::Error> for CoreError {
    fn from(err: unifi_leds_api::Error) -> Self {
        match err {
            unifi_leds_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            unifi_leds_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- re-authentication required".into(),
            },
            unifi_leds_api::Error::Network { url, source } => CoreError::ConnectionFailed {
                url,
                reason: source.to_string(),
            },
            unifi_leds_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            unifi_leds_api::Error::Api {
                message, status, ..
            } => CoreError::Api { message, status },
            unifi_leds_api::Error::Configuration { message } => CoreError::Config { message },
        }
    }
}
