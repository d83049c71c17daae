//! usbdmx Control - USB session and DMX output
//!
//! This crate drives a USB DMX512 bridge (an Arduino Leonardo class board
//! running the DMX sketch) from the host:
//! - **USB**: device filters, selection, pairing, and the `nusb` backend
//! - **Session**: the connect / send / disconnect state machine
//! - **DMX**: fixture profiles and colour parsing
//! - **Controller**: a universe bound to a session
//!
//! ## Feature Flags
//!
//! - `nusb` (default): real hardware backend. Without it only the transport
//!   traits and the recording mock are built.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use usbdmx_control::usb::{MockDevice, MockTransport};
//! use usbdmx_control::DmxController;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> usbdmx_control::Result<()> {
//! let transport = Arc::new(MockTransport::new());
//! transport.add_selectable(MockDevice::new(0x2341, 0x8036));
//!
//! let mut controller = DmxController::new(transport);
//! controller.enable().await?;
//! controller.connect().await?;
//! controller.update_universe(1, [255u8, 0, 0]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`usb`] - transport traits, filters, pairing, backends
//! - [`session`] - device session state machine
//! - [`dmx`] - fixtures and colours
//! - [`controller`] - universe plus session
//! - [`error`] - Error types

#![allow(missing_docs)]

/// Universe plus session
pub mod controller;
/// DMX fixtures and colours
pub mod dmx;
/// Error types
pub mod error;
/// Device session state machine
pub mod session;
/// USB transport layer
pub mod usb;

// Re-exports
pub use controller::DmxController;
pub use error::{ControlError, Result, Stage};
pub use session::{DeviceSession, SessionState};
