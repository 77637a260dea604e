// ── Domain model ──

pub mod device;

pub use device::{AccessoryInfo, Device, Led, MANUFACTURER};
