// ── Discovery and reconciliation ──
//
// One discovery cycle: authenticate, resolve sites, fetch, filter, replace
// the cache, then diff the live inventory against registered accessories.
// The diff itself is the pure `reconcile()` planner so it can be tested
// without a controller.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::accessory::RegisteredAccessory;
use crate::error::CoreError;
use crate::filter::FilterRules;
use crate::model::Device;
use crate::platform::Platform;

// ── Planner ──────────────────────────────────────────────────────────

/// Why an accessory is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RemovalReason {
    Excluded,
    NotIncluded,
}

/// One change to the registered accessory set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Register a new accessory for a device seen for the first time.
    Create(RegisteredAccessory),
    /// Rebind an existing accessory to the current device.
    Restore(RegisteredAccessory),
    Remove { uuid: Uuid, reason: RemovalReason },
}

/// Counts of applied actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub restored: usize,
    pub removed: usize,
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} restored, {} removed",
            self.created, self.restored, self.removed
        )
    }
}

fn removal_reason(rules: &FilterRules, device_id: &str) -> Option<RemovalReason> {
    if rules.is_excluded(device_id) {
        Some(RemovalReason::Excluded)
    } else if !rules.is_included(device_id) {
        Some(RemovalReason::NotIncluded)
    } else {
        None
    }
}

/// Plan the accessory changes for one cycle.
///
/// Live devices are visited first: an allowed device restores its existing
/// accessory or creates one, a disallowed one removes it. A cleanup pass
/// then removes any remaining accessory whose device id is excluded or
/// missing from a non-empty include list, which catches devices that have
/// left the inventory. Registered accessories for vanished but still
/// allowed devices are left alone.
pub fn reconcile(
    devices: &[Device],
    registered: &[RegisteredAccessory],
    rules: &FilterRules,
    uuid_for: impl Fn(&str) -> Uuid,
) -> Vec<ReconcileAction> {
    let known: HashSet<Uuid> = registered.iter().map(|a| a.uuid).collect();
    let mut handled: HashSet<Uuid> = HashSet::new();
    let mut actions = Vec::new();

    for device in devices {
        let uuid = uuid_for(&device.id);
        if !handled.insert(uuid) {
            continue;
        }

        let reason = removal_reason(rules, &device.id);
        match (known.contains(&uuid), reason) {
            (true, None) => {
                actions.push(ReconcileAction::Restore(RegisteredAccessory::new(
                    uuid,
                    device.clone(),
                )));
            }
            (true, Some(reason)) => actions.push(ReconcileAction::Remove { uuid, reason }),
            (false, None) => {
                actions.push(ReconcileAction::Create(RegisteredAccessory::new(
                    uuid,
                    device.clone(),
                )));
            }
            (false, Some(_)) => {}
        }
    }

    for accessory in registered {
        if handled.contains(&accessory.uuid) {
            continue;
        }
        if let Some(reason) = removal_reason(rules, accessory.device_id()) {
            handled.insert(accessory.uuid);
            actions.push(ReconcileAction::Remove {
                uuid: accessory.uuid,
                reason,
            });
        }
    }

    actions
}

// ── Discovery cycle ──────────────────────────────────────────────────

/// How a discovery cycle ended.
#[derive(Debug)]
pub enum DiscoveryOutcome {
    Completed(ReconcileSummary),
    /// Login failed; accessories marked not responding, cache cleared.
    AuthenticationFailed(CoreError),
    /// None of the configured sites exist on the controller.
    NoSites,
    /// Inventory fetch failed; accessories marked not responding, cache cleared.
    FetchFailed(CoreError),
}

impl DiscoveryOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl fmt::Display for DiscoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(summary) => write!(f, "completed ({summary})"),
            Self::AuthenticationFailed(e) => write!(f, "authentication failed: {e}"),
            Self::NoSites => f.write_str("no configured site found on controller"),
            Self::FetchFailed(e) => write!(f, "device fetch failed: {e}"),
        }
    }
}

impl Platform {
    /// Run one discovery cycle. Never fails; the outcome says how it ended.
    pub async fn discover_devices(&self) -> DiscoveryOutcome {
        let inner = &self.inner;

        if let Err(e) = inner.session.authenticate().await {
            error!(error = %e, "discovery: authentication failed");
            self.mark_all_not_responding();
            inner.cache.clear();
            return DiscoveryOutcome::AuthenticationFailed(e.into());
        }

        let sites = self.resolve_sites();
        if sites.is_empty() {
            error!(configured = ?inner.config.sites, "discovery: no configured site resolved");
            return DiscoveryOutcome::NoSites;
        }

        let raw = match unifi_leds_api::fetch_devices(&inner.session, &sites).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "discovery: device fetch failed");
                self.mark_all_not_responding();
                inner.cache.clear();
                return DiscoveryOutcome::FetchFailed(e.into());
            }
        };

        let devices = to_devices(inner.config.filter.apply(raw));
        inner.cache.set_devices(devices.iter().cloned());
        if devices.is_empty() {
            warn!("discovery: no devices left after filtering");
        }

        let registered = inner.registry.registered();
        let actions = reconcile(&devices, &registered, &inner.config.filter, |seed| {
            inner.registry.uuid_for(seed)
        });
        let summary = self.apply_actions(actions);

        info!(
            devices = devices.len(),
            %summary,
            "discovery complete"
        );
        DiscoveryOutcome::Completed(summary)
    }

    fn apply_actions(&self, actions: Vec<ReconcileAction>) -> ReconcileSummary {
        let registry = &self.inner.registry;
        let mut summary = ReconcileSummary::default();

        for action in actions {
            match action {
                ReconcileAction::Create(accessory) => {
                    let (uuid, name) = (accessory.uuid, accessory.display_name.clone());
                    match registry.register(accessory) {
                        Ok(()) => {
                            info!(%uuid, name = %name, "accessory registered");
                            summary.created += 1;
                        }
                        Err(e) => warn!(%uuid, error = %e, "failed to register accessory"),
                    }
                }
                ReconcileAction::Restore(accessory) => {
                    let uuid = accessory.uuid;
                    match registry.restore(accessory) {
                        Ok(()) => {
                            debug!(%uuid, "accessory restored");
                            summary.restored += 1;
                        }
                        Err(e) => warn!(%uuid, error = %e, "failed to restore accessory"),
                    }
                }
                ReconcileAction::Remove { uuid, reason } => match registry.unregister(uuid) {
                    Ok(()) => {
                        info!(%uuid, %reason, "accessory removed");
                        summary.removed += 1;
                    }
                    Err(e) => warn!(%uuid, error = %e, "failed to remove accessory"),
                },
            }
        }

        summary
    }

    fn mark_all_not_responding(&self) {
        for accessory in self.inner.registry.registered() {
            self.inner.registry.mark_not_responding(accessory.uuid);
        }
    }
}

/// Convert filtered wire devices; records that cannot convert are dropped.
pub(crate) fn to_devices(raw: Vec<unifi_leds_api::StatDevice>) -> Vec<Device> {
    raw.into_iter()
        .filter_map(|d| match Device::try_from(d) {
            Ok(device) => Some(device),
            Err(e) => {
                debug!(error = %e, "skipping device");
                None
            }
        })
        .collect()
}
