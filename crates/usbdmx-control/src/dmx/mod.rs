//! DMX helpers on top of the universe
//!
//! Fixture profiles turn semantic settings (colour, UV, dimmer, strobe) into
//! channel writes at a patched start address.
//!
//! ## Example Usage
//!
//! ```rust
//! use usbdmx_control::dmx::{parse_hex_color, Fixture, FixtureProfile};
//! use usbdmx_core::Universe;
//!
//! # fn main() -> usbdmx_control::Result<()> {
//! let par = Fixture::new(1, "Flat PAR".to_string(), FixtureProfile::flat_par(), 1);
//! let mut universe = Universe::new();
//!
//! let (r, g, b) = parse_hex_color("#ff0000")?;
//! par.set_rgb(&mut universe, r, g, b)?;
//! par.set_dimmer(&mut universe, 255)?;
//!
//! assert_eq!(&universe.as_bytes()[..6], &[255, 0, 0, 0, 255, 0]);
//! # Ok(())
//! # }
//! ```

pub mod color;
pub mod fixtures;

pub use color::parse_hex_color;
pub use fixtures::{ChannelType, Fixture, FixtureChannel, FixtureProfile};
