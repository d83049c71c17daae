//! USB access for the DMX bridge
//!
//! - [`transport`]: the traits a session drives
//! - [`protocol`]: configuration, interface, endpoint and handshake constants
//! - [`filter`]: vendor/product pairs accepted by the selection prompt
//! - [`pairing`]: remembered devices for auto-connect
//! - [`native`]: `nusb` backend (feature `nusb`)
//! - [`mock`]: recording backend for tests and dry runs

pub mod filter;
pub mod mock;
#[cfg(feature = "nusb")]
pub mod native;
pub mod pairing;
pub mod protocol;
pub mod transport;

pub use filter::{default_filters, DeviceFilter, DEFAULT_FILTERS};
pub use mock::{CallLog, MockCall, MockDevice, MockStep, MockTransport};
#[cfg(feature = "nusb")]
pub use native::{ByIndex, DeviceChooser, FirstCandidate, NusbDevice, NusbTransport};
pub use pairing::{PairedDevice, PairingStore};
pub use transport::{
    ControlSetup, Recipient, RequestType, TransportError, TransportResult, UsbDevice,
    UsbDeviceInfo, UsbTransport,
};
