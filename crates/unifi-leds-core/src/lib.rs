//! LED switch platform on top of `unifi-leds-api`.
//!
//! - **[`Platform`]** -- one per controller. [`start()`](Platform::start)
//!   runs discovery and spawns the periodic refresh;
//!   [`led_state()`](Platform::led_state) and [`set_led()`](Platform::set_led)
//!   serve the automation host.
//!
//! - **[`DeviceCache`]** -- atomic full-replace inventory snapshot.
//!
//! - **Discovery** ([`discovery`]) -- authenticate, fetch, filter, cache, then
//!   reconcile against the host's [`AccessoryRegistry`] through the pure
//!   [`reconcile()`] planner.
//!
//! - **Recovery** ([`recovery`]) -- best-effort refresh after a failed
//!   get/set, restricted to devices the controller reports as live.

pub mod accessory;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod model;
pub mod platform;
pub mod recovery;

// ── Primary re-exports ──────────────────────────────────────────────
pub use accessory::{AccessoryRegistry, RegisteredAccessory, accessory_uuid};
pub use cache::DeviceCache;
pub use config::{PlatformConfig, TlsVerification};
pub use discovery::{
    DiscoveryOutcome, ReconcileAction, ReconcileSummary, RemovalReason, reconcile,
};
pub use error::CoreError;
pub use filter::{FilterRules, filter_relevant_aps};
pub use model::{AccessoryInfo, Device, Led};
pub use platform::Platform;
pub use recovery::RecoveryOutcome;
