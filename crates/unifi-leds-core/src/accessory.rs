// ── Accessory boundary ──
//
// The automation host owns registered accessories. The platform only sees
// them through `AccessoryRegistry`: it enumerates what the host restored
// from its own storage and asks for creates, rebinds and removals.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::Device;

/// Namespace for accessory UUIDs derived from device ids.
pub const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x8f1e_4c6a_2b7d_5e90_a3c1_d46f_0b29_e817);

/// Derive the stable accessory UUID for a device id.
pub fn accessory_uuid(device_id: &str) -> Uuid {
    Uuid::new_v5(&ACCESSORY_NAMESPACE, device_id.as_bytes())
}

/// An accessory known to the host, with the device context stored alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredAccessory {
    pub uuid: Uuid,
    pub display_name: String,
    pub device: Device,
}

impl RegisteredAccessory {
    pub fn new(uuid: Uuid, device: Device) -> Self {
        Self {
            uuid,
            display_name: device.display_name().to_owned(),
            device,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device.id
    }
}

/// Host-side accessory store.
pub trait AccessoryRegistry: Send + Sync {
    /// Every accessory currently registered.
    fn registered(&self) -> Vec<RegisteredAccessory>;

    /// Register a new accessory.
    fn register(&self, accessory: RegisteredAccessory) -> Result<(), CoreError>;

    /// Rebind an existing accessory to its current device without
    /// registering it again.
    fn restore(&self, accessory: RegisteredAccessory) -> Result<(), CoreError>;

    fn unregister(&self, uuid: Uuid) -> Result<(), CoreError>;

    /// Flag an accessory as unreachable until its next restore.
    fn mark_not_responding(&self, uuid: Uuid);

    /// Deterministic UUID for a seed (the device id).
    fn uuid_for(&self, seed: &str) -> Uuid {
        accessory_uuid(seed)
    }
}
