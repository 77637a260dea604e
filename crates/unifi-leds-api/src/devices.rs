// Device endpoints
//
// Thin wrappers over `stat/device` and `rest/device` on a negotiated
// session. Dialect prefixing happens in `Endpoint::path`.

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::models::{LedUpdate, StatDevice};
use crate::session::{ApiRequest, Endpoint, Session};

impl Session {
    /// List every device on one site, unfiltered.
    ///
    /// `GET /api/s/{site}/stat/device`
    pub async fn list_site_devices(&self, site: &str) -> Result<Vec<StatDevice>, Error> {
        let payload = self
            .request(&ApiRequest::get(Endpoint::DeviceList {
                site: site.to_owned(),
            }))
            .await?;
        let devices = decode_devices(payload)?;
        debug!(site, count = devices.len(), "listed site devices");
        Ok(devices)
    }

    /// Fetch one device by MAC. `Ok(None)` when the controller returns no record.
    ///
    /// `GET /api/s/{site}/stat/device/{mac}`
    pub async fn get_device_by_mac(
        &self,
        site: &str,
        mac: &str,
    ) -> Result<Option<StatDevice>, Error> {
        let payload = self
            .request(&ApiRequest::get(Endpoint::DeviceByMac {
                site: site.to_owned(),
                mac: mac.to_owned(),
            }))
            .await?;
        let device = decode_devices(payload)?.into_iter().next().map(|mut d| {
            d.site = Some(site.to_owned());
            d
        });
        Ok(device)
    }

    /// Write an LED state.
    ///
    /// `PUT /api/s/{site}/rest/device/{id}`
    pub async fn update_led(
        &self,
        site: &str,
        device_id: &str,
        update: LedUpdate,
    ) -> Result<(), Error> {
        let body = serde_json::to_value(update).map_err(|e| Error::Api {
            message: format!("failed to encode LED update: {e}"),
            status: None,
            source: Some(Box::new(e)),
        })?;
        debug!(site, device_id, ?update, "updating LED");
        self.request(&ApiRequest::put(
            Endpoint::DeviceUpdate {
                site: site.to_owned(),
                device_id: device_id.to_owned(),
            },
            body,
        ))
        .await?;
        Ok(())
    }
}

/// Decode a device-list payload. Records that fail to decode are dropped.
fn decode_devices(payload: Value) -> Result<Vec<StatDevice>, Error> {
    let Value::Array(items) = payload else {
        return Err(Error::api(
            "unexpected data structure in device list (expected an array)",
        ));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(device) => Some(device),
            Err(e) => {
                debug!(error = %e, "skipping undecodable device record");
                None
            }
        })
        .collect())
}
