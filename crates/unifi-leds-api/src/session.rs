// Session negotiation
//
// Owns the authenticated channel to one controller: dialect detection,
// login, session artifact extraction (cookie, CSRF claim), site map
// loading, and the single re-authentication retry on 401.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::{ArcSwap, ArcSwapOption};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cookie::Cookie;
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::dialect::ApiDialect;
use crate::error::{Error, ErrorKind};
use crate::models::Envelope;
use crate::sites::SiteMap;
use crate::transport::TransportConfig;

/// Name of the cookie carrying the UniFi OS session JWT.
const TOKEN_COOKIE: &str = "TOKEN";
const CSRF_HEADER: &str = "X-CSRF-Token";
const UPDATED_CSRF_HEADER: &str = "X-Updated-CSRF-Token";

// ── Requests ─────────────────────────────────────────────────────────

/// A controller endpoint, resolved to a path only once the dialect is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    DeviceList { site: String },
    DeviceUpdate { site: String, device_id: String },
    DeviceByMac { site: String, mac: String },
    SiteList,
}

impl Endpoint {
    pub fn path(&self, dialect: ApiDialect) -> String {
        match self {
            Self::DeviceList { site } => dialect.device_list(site),
            Self::DeviceUpdate { site, device_id } => dialect.device_update(site, device_id),
            Self::DeviceByMac { site, mac } => dialect.device_by_mac(site, mac),
            Self::SiteList => dialect.site_list(),
        }
    }
}

/// One HTTP call issued through the negotiated channel.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: Endpoint) -> Self {
        Self {
            method: Method::GET,
            endpoint,
            body: None,
        }
    }

    pub fn put(endpoint: Endpoint, body: Value) -> Self {
        Self {
            method: Method::PUT,
            endpoint,
            body: Some(body),
        }
    }
}

// ── Auth artifacts ───────────────────────────────────────────────────

/// Credentials attached to every request. Replaced wholesale, never
/// mutated in place, so readers always see a consistent pair.
#[derive(Debug, Clone)]
struct AuthArtifacts {
    cookie: String,
    csrf_token: Option<String>,
    /// Bumped on every successful login; lets concurrent 401 handlers tell
    /// whether someone else already re-authenticated.
    generation: u64,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(rename = "csrfToken", default)]
    csrf_token: Option<String>,
}

// ── Session ──────────────────────────────────────────────────────────

/// Authenticated channel to a single controller.
///
/// One instance per controller connection: the detected dialect, session
/// artifacts and site map are owned here and never shared across hosts.
pub struct Session {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    /// Fixed by the first successful login probe.
    dialect: OnceLock<ApiDialect>,
    artifacts: ArcSwapOption<AuthArtifacts>,
    sites: ArcSwap<SiteMap>,
    /// Serialises (re-)authentication.
    auth_lock: Mutex<()>,
    generation: AtomicU64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("dialect", &self.dialect.get())
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session for the controller at `base_url`. Does not connect;
    /// call [`authenticate()`](Self::authenticate) first.
    pub fn new(
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, username, password))
    }

    /// Create a session around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username: username.into(),
            password,
            dialect: OnceLock::new(),
            artifacts: ArcSwapOption::empty(),
            sites: ArcSwap::from_pointee(SiteMap::default()),
            auth_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The detected dialect, if any login has succeeded yet.
    pub fn detected_dialect(&self) -> Option<ApiDialect> {
        self.dialect.get().copied()
    }

    /// The detected dialect, or a configuration error when it is still unknown.
    pub fn dialect(&self) -> Result<ApiDialect, Error> {
        self.detected_dialect().ok_or_else(|| Error::Configuration {
            message: "controller API dialect has not been detected -- authenticate first".into(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.artifacts.load().is_some()
    }

    /// Snapshot of the site map loaded by the last authentication.
    pub fn site_map(&self) -> Arc<SiteMap> {
        self.sites.load_full()
    }

    /// Map a human site description (or internal name) to the internal
    /// name. Unknown names log a warning and yield `None`.
    pub fn resolve_site_name(&self, name: &str) -> Option<String> {
        self.sites.load().resolve(name)
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Log in (detecting the dialect on first use) and reload the site map.
    ///
    /// Either fully succeeds or leaves the session unauthenticated.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let _guard = self.auth_lock.lock().await;
        self.authenticate_locked().await
    }

    /// The previous artifacts and site map stay in use until the new login
    /// succeeds; any failure discards both.
    async fn authenticate_locked(&self) -> Result<(), Error> {
        let dialect = match self.login().await {
            Ok((dialect, artifacts)) => {
                self.artifacts.store(Some(Arc::new(artifacts)));
                dialect
            }
            Err(e) => {
                self.invalidate();
                return Err(e);
            }
        };

        if let Err(e) = self.load_sites().await {
            self.invalidate();
            return Err(e);
        }

        info!(
            %dialect,
            sites = self.sites.load().len(),
            "authenticated with controller"
        );
        Ok(())
    }

    fn invalidate(&self) {
        self.artifacts.store(None);
        self.sites.store(Arc::new(SiteMap::default()));
    }

    /// Log in against the known dialect, or probe both login endpoints.
    async fn login(&self) -> Result<(ApiDialect, AuthArtifacts), Error> {
        if let Some(&dialect) = self.dialect.get() {
            let headers = self.post_login(dialect).await?;
            return Ok((dialect, self.extract_artifacts(dialect, &headers)?));
        }

        let mut failures = Vec::new();
        for dialect in ApiDialect::DETECTION_ORDER {
            match self.post_login(dialect).await {
                Ok(headers) => {
                    let dialect = *self.dialect.get_or_init(|| dialect);
                    info!(%dialect, "detected controller API dialect");
                    return Ok((dialect, self.extract_artifacts(dialect, &headers)?));
                }
                Err(e) => {
                    debug!(%dialect, error = %e, "login probe failed");
                    failures.push(e);
                }
            }
        }

        // Nothing answered at all: report the transport problem as such.
        if failures.iter().all(|e| e.kind() == ErrorKind::Network) {
            if let Some(e) = failures.pop() {
                return Err(e);
            }
        }

        let detail = failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::auth(format!(
            "unable to detect controller API dialect ({detail})"
        )))
    }

    /// POST credentials to the dialect's login endpoint, returning the
    /// response headers on a 2xx.
    async fn post_login(&self, dialect: ApiDialect) -> Result<HeaderMap, Error> {
        let url = self.url(dialect.login_path())?;
        debug!(%url, "logging in");

        let body = json!({
            "username": self.username,
            "password": self.password.expose_secret(),
            "remember": true,
        });

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::from_transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::auth(format!(
                "login rejected at {} (HTTP {status})",
                dialect.login_path()
            )));
        }

        Ok(resp.headers().clone())
    }

    /// Pull the session cookie (and, for UniFi OS, the CSRF claim) out of a
    /// successful login response.
    fn extract_artifacts(
        &self,
        dialect: ApiDialect,
        headers: &HeaderMap,
    ) -> Result<AuthArtifacts, Error> {
        let cookies: Vec<Cookie<'static>> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| Cookie::parse(raw.to_owned()).ok())
            .collect();

        if cookies.is_empty() {
            return Err(Error::auth("login response carried no session cookie"));
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        if !dialect.uses_csrf_token() {
            let cookie = join_cookies(cookies.iter());
            let csrf_token = headers
                .get(CSRF_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            return Ok(AuthArtifacts {
                cookie,
                csrf_token,
                generation,
            });
        }

        let token = cookies
            .iter()
            .find(|c| c.name() == TOKEN_COOKIE)
            .ok_or_else(|| Error::auth("login response carried no TOKEN cookie"))?;
        let csrf_token = csrf_from_token(token.value())?;

        // Every other cookie as returned, plus the token set explicitly.
        let mut cookie = join_cookies(cookies.iter().filter(|c| c.name() != TOKEN_COOKIE));
        if !cookie.is_empty() {
            cookie.push_str("; ");
        }
        cookie.push_str(&format!("{TOKEN_COOKIE}={}", token.value()));

        Ok(AuthArtifacts {
            cookie,
            csrf_token: Some(csrf_token),
            generation,
        })
    }

    /// Replace the site map with the controller's current site list.
    ///
    /// Runs under the auth lock, so it bypasses the 401 retry path.
    async fn load_sites(&self) -> Result<(), Error> {
        let artifacts = self
            .artifacts
            .load_full()
            .ok_or_else(|| Error::auth("no session established"))?;
        let payload = self
            .send(&ApiRequest::get(Endpoint::SiteList), &artifacts)
            .await?;

        let map = SiteMap::from_payload(payload)?;
        debug!(entries = map.len(), "site map loaded");
        self.sites.store(Arc::new(map));
        Ok(())
    }

    /// End the session. Best-effort: failures are logged, never returned.
    pub async fn logout(&self) {
        let _guard = self.auth_lock.lock().await;
        let Some(artifacts) = self.artifacts.swap(None) else {
            return;
        };
        let Some(dialect) = self.detected_dialect() else {
            return;
        };

        let url = match self.url(dialect.logout_path()) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "logout skipped");
                return;
            }
        };

        let mut builder = self.http.post(url).header(COOKIE, &artifacts.cookie);
        if let Some(token) = &artifacts.csrf_token {
            builder = builder.header(CSRF_HEADER, token);
        }
        match builder.send().await {
            Ok(_) => debug!("logged out"),
            Err(e) => warn!(error = %e, "logout failed (non-fatal)"),
        }
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Issue one request through the negotiated channel and return the
    /// unwrapped `data` payload.
    ///
    /// A 401 triggers exactly one re-authentication followed by one retry;
    /// the retry's outcome is returned as-is.
    pub async fn request(&self, req: &ApiRequest) -> Result<Value, Error> {
        let artifacts = match self.artifacts.load_full() {
            Some(artifacts) => artifacts,
            // A login may be in flight; wait for it before giving up.
            None => {
                let _guard = self.auth_lock.lock().await;
                self.artifacts
                    .load_full()
                    .ok_or_else(|| Error::auth("no session established -- authenticate first"))?
            }
        };

        match self.send(req, &artifacts).await {
            Err(Error::SessionExpired) => {
                debug!(endpoint = ?req.endpoint, "session expired, re-authenticating");
                self.reauthenticate(artifacts.generation).await?;
                let artifacts = self
                    .artifacts
                    .load_full()
                    .ok_or_else(|| Error::auth("no session after re-authentication"))?;
                self.send(req, &artifacts).await
            }
            other => other,
        }
    }

    /// Re-authenticate unless another caller already replaced the artifacts
    /// that produced the 401.
    async fn reauthenticate(&self, stale_generation: u64) -> Result<(), Error> {
        let _guard = self.auth_lock.lock().await;
        if let Some(current) = self.artifacts.load_full() {
            if current.generation != stale_generation {
                debug!("session already refreshed by a concurrent request");
                return Ok(());
            }
        }
        self.authenticate_locked().await
    }

    async fn send(&self, req: &ApiRequest, artifacts: &AuthArtifacts) -> Result<Value, Error> {
        let dialect = self.dialect()?;
        let url = self.url(&req.endpoint.path(dialect))?;
        debug!(method = %req.method, %url, "controller request");

        let mut builder = self
            .http
            .request(req.method.clone(), url)
            .header(COOKIE, &artifacts.cookie);
        if let Some(token) = &artifacts.csrf_token {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(Error::from_transport)?;
        self.rotate_csrf(resp.headers());
        parse_payload(resp).await
    }

    /// UniFi OS may hand out a fresh CSRF token on any response.
    fn rotate_csrf(&self, headers: &HeaderMap) {
        let Some(token) = headers
            .get(UPDATED_CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };

        self.artifacts.rcu(|current| {
            current.as_ref().map(|a| {
                if a.csrf_token.is_none() {
                    return Arc::clone(a);
                }
                Arc::new(AuthArtifacts {
                    csrf_token: Some(token.to_owned()),
                    ..AuthArtifacts::clone(a)
                })
            })
        });
        trace!("CSRF token rotated");
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn join_cookies<'a>(cookies: impl Iterator<Item = &'a Cookie<'static>>) -> String {
    cookies
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Decode the JWT payload and return its `csrfToken` claim.
pub(crate) fn csrf_from_token(token: &str) -> Result<String, Error> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::auth("session token is not a JWT"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::auth(format!("session token payload is not base64url: {e}")))?;
    let claims: TokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| Error::auth(format!("session token payload is not JSON: {e}")))?;

    claims
        .csrf_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::auth("session token carries no CSRF claim"))
}

/// Map a response to the unwrapped payload or a typed error.
async fn parse_payload(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::SessionExpired);
    }

    let body = resp.text().await.map_err(Error::from_transport)?;

    if !status.is_success() {
        let detail = serde_json::from_str::<Envelope>(&body)
            .ok()
            .and_then(|env| env.meta.and_then(|m| m.msg))
            .unwrap_or_else(|| body.chars().take(200).collect());
        return Err(Error::Api {
            message: format!("HTTP {status}: {detail}"),
            status: Some(status.as_u16()),
            source: None,
        });
    }

    let value: Value = serde_json::from_str(&body).map_err(|e| Error::Api {
        message: format!("malformed response body: {e}"),
        status: Some(status.as_u16()),
        source: Some(Box::new(e)),
    })?;

    let is_envelope = value
        .as_object()
        .is_some_and(|o| o.contains_key("meta") || o.contains_key("error"));
    if !is_envelope {
        return Ok(value);
    }

    let envelope: Envelope = serde_json::from_value(value).map_err(|e| Error::Api {
        message: format!("unexpected response envelope: {e}"),
        status: Some(status.as_u16()),
        source: Some(Box::new(e)),
    })?;

    if let Some(err) = envelope.error {
        if err.code == 401 {
            return Err(Error::SessionExpired);
        }
        return Err(Error::Api {
            message: format!(
                "UniFi OS error {}: {}",
                err.code,
                err.message.unwrap_or_default()
            ),
            status: Some(err.code),
            source: None,
        });
    }

    if let Some(meta) = envelope.meta {
        if meta.rc != "ok" {
            return Err(Error::Api {
                message: meta.msg.unwrap_or_else(|| format!("rc={}", meta.rc)),
                status: Some(status.as_u16()),
                source: None,
            });
        }
    }

    Ok(envelope.data.unwrap_or(Value::Null))
}
