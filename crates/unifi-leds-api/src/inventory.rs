// Multi-site device inventory
//
// Fetches every configured site concurrently and keeps only devices with a
// drivable LED. One site failing never cancels its siblings.

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::models::StatDevice;
use crate::session::Session;

/// Fetch supported devices from each internal site name, tagging every
/// device with the site it came from.
///
/// Per-site failures are logged and skipped. An empty aggregate is an error:
/// zero devices across every queried site almost always means total failure.
pub async fn fetch_devices(session: &Session, sites: &[String]) -> Result<Vec<StatDevice>, Error> {
    let results = join_all(sites.iter().map(|site| async move {
        (site.as_str(), session.list_site_devices(site).await)
    }))
    .await;

    let mut devices = Vec::new();
    for (site, result) in results {
        match result {
            Ok(list) => {
                let before = devices.len();
                devices.extend(list.into_iter().filter(StatDevice::is_supported).map(|mut d| {
                    d.site = Some(site.to_owned());
                    d
                }));
                debug!(site, supported = devices.len() - before, "site fetched");
            }
            Err(e) if e.is_unknown_site() => {
                warn!(site, error = %e, "controller does not recognise site, skipping");
            }
            Err(e) if e.is_not_found() => {
                debug!(site, "device list endpoint not found for site, skipping");
            }
            Err(e) => {
                warn!(site, error = %e, "failed to fetch devices for site, skipping");
            }
        }
    }

    if devices.is_empty() {
        return Err(Error::api("no devices obtained from any site"));
    }

    info!(count = devices.len(), sites = sites.len(), "device inventory fetched");
    Ok(devices)
}

/// Locate one supported device by id across `sites`.
///
/// There is no by-id endpoint, so this performs a full fetch.
pub async fn get_access_point(
    session: &Session,
    device_id: &str,
    sites: &[String],
) -> Result<Option<StatDevice>, Error> {
    let devices = fetch_devices(session, sites).await?;
    Ok(devices
        .into_iter()
        .find(|d| d.id.as_deref() == Some(device_id)))
}
