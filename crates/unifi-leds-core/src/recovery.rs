// ── Recovery ──
//
// Best-effort inventory refresh triggered by a failing LED get/set.
// Unlike discovery it keeps only devices the controller reports as live,
// and it never replaces the cache with an empty inventory.

use std::fmt;
use std::sync::atomic::Ordering;

use tracing::{debug, error, info, warn};

use crate::discovery::to_devices;
use crate::error::CoreError;
use crate::platform::Platform;

/// How a recovery attempt ended.
#[derive(Debug)]
pub enum RecoveryOutcome {
    /// Cache replaced with this many ready devices.
    Refreshed(usize),
    /// The controller answered but reported no live device; cache untouched.
    NoReadyDevices,
    /// Another recovery was already running.
    Skipped,
    Failed(CoreError),
}

impl fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refreshed(n) => write!(f, "refreshed {n} devices"),
            Self::NoReadyDevices => f.write_str("no ready devices"),
            Self::Skipped => f.write_str("skipped (already running)"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Clears the in-flight flag when the recovery ends, however it ends.
struct InFlight<'a>(&'a Platform);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.inner.recovering.store(false, Ordering::Release);
    }
}

impl Platform {
    /// Re-authenticate and refresh the cache with ready devices only.
    ///
    /// Never returns an error; every outcome is logged.
    pub async fn force_immediate_cache_refresh(&self) -> RecoveryOutcome {
        if self
            .inner
            .recovering
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("recovery already in progress");
            return RecoveryOutcome::Skipped;
        }
        let _in_flight = InFlight(self);

        match self.refresh_ready_devices().await {
            Ok(0) => {
                warn!("recovery: controller reports no ready devices, keeping cache");
                RecoveryOutcome::NoReadyDevices
            }
            Ok(n) => {
                info!(devices = n, "recovery: cache refreshed");
                RecoveryOutcome::Refreshed(n)
            }
            Err(e) => {
                error!(error = %e, "recovery failed");
                RecoveryOutcome::Failed(e)
            }
        }
    }

    async fn refresh_ready_devices(&self) -> Result<usize, CoreError> {
        let inner = &self.inner;
        inner.session.authenticate().await?;

        let sites = self.resolved_sites()?;

        let raw = unifi_leds_api::fetch_devices(&inner.session, &sites).await?;
        let ready: Vec<_> = to_devices(inner.config.filter.apply(raw))
            .into_iter()
            .filter(|d| d.is_ready())
            .collect();

        if ready.is_empty() {
            return Ok(0);
        }
        let count = ready.len();
        inner.cache.set_devices(ready);
        Ok(count)
    }

    /// Run a recovery in the background.
    pub(crate) fn spawn_recovery(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, recovery not started");
            return;
        };
        let platform = self.clone();
        runtime.spawn(async move {
            let outcome = platform.force_immediate_cache_refresh().await;
            debug!(%outcome, "background recovery finished");
        });
    }
}
