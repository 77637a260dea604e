// ── Device cache ──
//
// Latest inventory snapshot, read by LED get/set handlers between
// refreshes. Writers replace the whole map in one atomic swap, so readers
// never observe a half-applied refresh.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::Device;

type Snapshot = HashMap<String, Arc<Device>>;

/// Device inventory keyed by controller id.
pub struct DeviceCache {
    devices: ArcSwap<Snapshot>,
    /// Time of the last full replace, `None` until the first one.
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl Default for DeviceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceCache {
    pub fn new() -> Self {
        let (last_refresh, _) = watch::channel(None);
        Self {
            devices: ArcSwap::from_pointee(HashMap::new()),
            last_refresh,
        }
    }

    /// Replace the whole inventory. On duplicate ids the later device wins.
    pub fn set_devices(&self, devices: impl IntoIterator<Item = Device>) {
        let snapshot: Snapshot = devices
            .into_iter()
            .map(|d| (d.id.clone(), Arc::new(d)))
            .collect();
        self.devices.store(Arc::new(snapshot));
        self.last_refresh.send_replace(Some(Utc::now()));
    }

    pub fn get_device_by_id(&self, id: &str) -> Option<Arc<Device>> {
        self.devices.load().get(id).cloned()
    }

    pub fn get_all_devices(&self) -> Vec<Arc<Device>> {
        self.devices.load().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.devices.store(Arc::new(HashMap::new()));
    }

    /// Apply `f` to one cached device. Returns `false` when the id is not
    /// cached. A concurrent full replace may discard the update; the next
    /// refresh corrects it.
    pub fn update_device(&self, id: &str, f: impl Fn(&mut Device)) -> bool {
        let mut found = false;
        self.devices.rcu(|current| {
            let mut next = Snapshot::clone(current);
            found = match next.get_mut(id) {
                Some(device) => {
                    f(Arc::make_mut(device));
                    true
                }
                None => false,
            };
            next
        });
        found
    }

    pub fn len(&self) -> usize {
        self.devices.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.load().is_empty()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    /// Subscribe to refresh timestamps.
    pub fn subscribe(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_refresh.subscribe()
    }
}
