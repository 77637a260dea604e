// unifi-leds-api: Session negotiation and device inventory for UniFi controllers
//
// Speaks both controller dialects (UniFi OS and the classic Network
// Application), detecting which one a host uses at first login.

pub mod devices;
pub mod dialect;
pub mod error;
pub mod inventory;
pub mod models;
pub mod session;
pub mod sites;
pub mod transport;

pub use dialect::ApiDialect;
pub use error::{Error, ErrorKind};
pub use inventory::{fetch_devices, get_access_point};
pub use models::{DeviceClass, LedOverride, LedSettings, LedUpdate, SiteRecord, StatDevice};
pub use session::{ApiRequest, Endpoint, Session};
pub use sites::SiteMap;
pub use transport::{TlsMode, TransportConfig};
