use thiserror::Error;

/// Coarse classification of every [`Error`].
///
/// Callers branch on this when they only care about the failure category
/// (discovery maps all of these to "end the cycle", for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    Authentication,
    Network,
    Api,
    Configuration,
}

/// Top-level error type for the `unifi-leds-api` crate.
///
/// Covers session negotiation, transport, and controller responses.
/// `unifi-leds-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed, the session artifacts were incomplete, or no
    /// session has been established yet.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The controller answered 401 for an authenticated request.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// Host unreachable, connection refused, or DNS failure.
    #[error("Cannot reach controller at {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Controller ──────────────────────────────────────────────────
    /// Any other non-2xx status or malformed payload.
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ── Configuration ───────────────────────────────────────────────
    /// The session is not usable as configured (dialect unset, bad TLS
    /// material, ...).
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    pub(crate) fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub(crate) fn auth(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Wrap a transport failure: connect/DNS problems become
    /// [`Network`](Self::Network), everything else a generic
    /// [`Api`](Self::Api) error that keeps the original as its source.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() {
            let url = err
                .url()
                .map_or_else(|| "<unknown>".into(), ToString::to_string);
            return Self::Network { url, source: err };
        }
        Self::Api {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
            source: Some(Box::new(err)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } | Self::SessionExpired => ErrorKind::Authentication,
            Self::Network { .. } => ErrorKind::Network,
            Self::Api { .. } => ErrorKind::Api,
            Self::InvalidUrl(_) | Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Returns `true` if a fresh login might resolve this error.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if the controller answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: Some(404), .. })
    }

    /// Returns `true` if the controller rejected the site name itself.
    pub fn is_unknown_site(&self) -> bool {
        match self {
            Self::Api { message, .. } => {
                message.contains("api.err.NoSiteContext") || message.contains("api.err.InvalidSite")
            }
            _ => false,
        }
    }
}
