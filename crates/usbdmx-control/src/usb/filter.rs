//! Device filters
//!
//! Only devices whose (vendor id, product id) pair is in the filter list are
//! offered for pairing. Matching is exact; there are no wildcards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A whitelisted (vendor id, product id) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceFilter {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Exact-pair match
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Known ATmega32U4 boards that run the DMX bridge firmware
pub const DEFAULT_FILTERS: [DeviceFilter; 7] = [
    // Arduino LLC, Leonardo
    DeviceFilter::new(0x2341, 0x8036),
    // Arduino LLC, Leonardo bootloader
    DeviceFilter::new(0x2341, 0x0036),
    // Arduino SRL, Leonardo
    DeviceFilter::new(0x2a03, 0x8036),
    // Arduino SRL, Leonardo bootloader
    DeviceFilter::new(0x2a03, 0x0036),
    // Arduino SRL, Leonardo ETH bootloader
    DeviceFilter::new(0x2a03, 0x0040),
    // Arduino SRL, Leonardo ETH
    DeviceFilter::new(0x2a03, 0x8040),
    // Seeed Studio, Seeeduino Lite
    DeviceFilter::new(0x2886, 0x8002),
];

/// The default filter table as an owned list
pub fn default_filters() -> Vec<DeviceFilter> {
    DEFAULT_FILTERS.to_vec()
}

/// True when any filter matches the given ids
pub fn any_matches(filters: &[DeviceFilter], vendor_id: u16, product_id: u16) -> bool {
    filters.iter().any(|f| f.matches(vendor_id, product_id))
}
