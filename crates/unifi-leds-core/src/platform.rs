// ── Platform facade ──
//
// One `Platform` per controller. Owns the session, the device cache and
// the background discovery task, and answers LED get/set calls from the
// automation host.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use unifi_leds_api::{LedUpdate, Session};

use crate::accessory::AccessoryRegistry;
use crate::cache::DeviceCache;
use crate::config::PlatformConfig;
use crate::error::CoreError;
use crate::model::Device;

/// LED switch platform for a single controller.
///
/// Cheaply cloneable via `Arc<PlatformInner>`.
#[derive(Clone)]
pub struct Platform {
    pub(crate) inner: Arc<PlatformInner>,
}

pub(crate) struct PlatformInner {
    pub(crate) config: PlatformConfig,
    pub(crate) session: Session,
    pub(crate) cache: DeviceCache,
    pub(crate) registry: Arc<dyn AccessoryRegistry>,
    /// Set while a recovery runs; further requests are skipped.
    pub(crate) recovering: AtomicBool,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("url", &self.inner.config.url.as_str())
            .field("sites", &self.inner.config.sites)
            .field("cached_devices", &self.inner.cache.len())
            .finish_non_exhaustive()
    }
}

impl Platform {
    /// Create a platform from configuration. Does NOT connect -- call
    /// [`start()`](Self::start) to run discovery and the refresh task.
    pub fn new(
        config: PlatformConfig,
        registry: Arc<dyn AccessoryRegistry>,
    ) -> Result<Self, CoreError> {
        let session = Session::new(
            config.url.clone(),
            config.username.clone(),
            config.password.clone(),
            &config.transport(),
        )?;

        Ok(Self {
            inner: Arc::new(PlatformInner {
                config,
                session,
                cache: DeviceCache::new(),
                registry,
                recovering: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn cache(&self) -> &DeviceCache {
        &self.inner.cache
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Run the first discovery cycle, then spawn the periodic one.
    pub async fn start(&self) {
        let outcome = self.discover_devices().await;
        info!(%outcome, "initial discovery finished");

        let interval = self.inner.config.refresh_interval;
        if interval.is_zero() {
            debug!("periodic discovery disabled");
            return;
        }

        let handle = tokio::spawn(refresh_task(
            self.clone(),
            interval,
            self.inner.cancel.child_token(),
        ));
        self.inner.task_handles.lock().await.push(handle);
    }

    /// Stop background work and end the controller session.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.session.logout().await;
        info!("platform shut down");
    }

    /// Authenticate without running discovery.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner.session.authenticate().await?;
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Live, filtered inventory. Touches neither the cache nor the registry.
    pub async fn inventory(&self) -> Result<Vec<Device>, CoreError> {
        self.connect().await?;
        let sites = self.resolved_sites()?;
        let raw = unifi_leds_api::fetch_devices(&self.inner.session, &sites).await?;
        Ok(crate::discovery::to_devices(self.inner.config.filter.apply(raw)))
    }

    /// Look a device up by MAC across the configured sites.
    pub async fn device_by_mac(&self, mac: &str) -> Result<Device, CoreError> {
        self.connect().await?;
        for site in self.resolved_sites()? {
            match self.inner.session.get_device_by_mac(&site, mac).await {
                Ok(Some(raw)) if raw.is_supported() => return Device::try_from(raw),
                Ok(_) => {}
                Err(e) if e.is_not_found() || e.is_unknown_site() => {
                    debug!(site = %site, mac, error = %e, "device not on site");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CoreError::DeviceNotFound {
            identifier: mac.to_owned(),
        })
    }

    // ── LED switch ───────────────────────────────────────────────────

    /// Current LED state, answered from the cache.
    ///
    /// An unknown device or unreported state yields
    /// [`CoreError::NotResponding`] and starts a background recovery.
    pub fn led_state(&self, device_id: &str) -> Result<bool, CoreError> {
        let state = self
            .inner
            .cache
            .get_device_by_id(device_id)
            .and_then(|d| d.led_on());

        state.ok_or_else(|| {
            warn!(device_id, "LED state unavailable");
            self.spawn_recovery();
            CoreError::not_responding(device_id)
        })
    }

    /// Switch an LED on or off with a live controller write.
    ///
    /// The cache is updated only after the controller accepts the change.
    pub async fn set_led(&self, device_id: &str, on: bool) -> Result<(), CoreError> {
        match self.write_led(device_id, on).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(device_id, on, error = %e, "LED update failed");
                self.spawn_recovery();
                Err(CoreError::not_responding(device_id))
            }
        }
    }

    async fn write_led(&self, device_id: &str, on: bool) -> Result<(), CoreError> {
        let device = match self.inner.cache.get_device_by_id(device_id) {
            Some(device) => device,
            None => Arc::new(self.lookup_device(device_id).await?),
        };

        let update = LedUpdate::new(device.class(), on);
        self.inner
            .session
            .update_led(&device.site, &device.id, update)
            .await?;

        self.inner
            .cache
            .update_device(device_id, |d| d.led = d.led.with_state(on));
        info!(device_id, on, "LED updated");
        Ok(())
    }

    /// Cache miss: fetch the device live across the configured sites.
    async fn lookup_device(&self, device_id: &str) -> Result<Device, CoreError> {
        let sites = self.resolved_sites()?;
        let raw = unifi_leds_api::get_access_point(&self.inner.session, device_id, &sites)
            .await?
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: device_id.to_owned(),
            })?;
        Device::try_from(raw)
    }

    /// Map configured site names to internal names, dropping unknown ones.
    pub(crate) fn resolve_sites(&self) -> Vec<String> {
        let mut resolved: Vec<String> = Vec::new();
        for name in &self.inner.config.sites {
            if let Some(internal) = self.inner.session.resolve_site_name(name) {
                if !resolved.contains(&internal) {
                    resolved.push(internal);
                }
            }
        }
        resolved
    }

    pub(crate) fn resolved_sites(&self) -> Result<Vec<String>, CoreError> {
        let sites = self.resolve_sites();
        if sites.is_empty() {
            return Err(CoreError::Config {
                message: format!(
                    "none of the configured sites exist on the controller: {:?}",
                    self.inner.config.sites
                ),
            });
        }
        Ok(sites)
    }
}

/// Run discovery on a fixed interval until cancelled.
async fn refresh_task(platform: Platform, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let outcome = platform.discover_devices().await;
                debug!(%outcome, "periodic discovery finished");
            }
        }
    }
}
