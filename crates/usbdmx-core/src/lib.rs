//! usbdmx Core - universe model and shared configuration
//!
//! This crate holds everything that does not touch USB:
//! - **Universe**: the 512 channel DMX snapshot and its bounded update rules
//! - **Logging**: the serializable logging configuration used by the binary
//!
//! ## Quick Start
//!
//! ```rust
//! use usbdmx_core::Universe;
//!
//! let mut universe = Universe::new();
//! // Red, green and blue of a PAR patched at channel 1
//! let snapshot = universe.update(1, vec![255u8, 0, 0]).unwrap();
//! assert_eq!(snapshot.len(), 512);
//! ```

#![warn(missing_docs)]

/// Logging configuration
pub mod logging;
/// DMX512 universe model
pub mod universe;

pub use logging::LogConfig;
pub use universe::{ChannelValue, Universe, UniverseError, UNIVERSE_SIZE};
