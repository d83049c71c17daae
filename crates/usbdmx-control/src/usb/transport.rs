//! Transport seam
//!
//! The session never talks to an OS USB stack directly. It drives these two
//! traits, which the `nusb` backend implements for real hardware and
//! [`super::mock`] implements for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::filter::{any_matches, DeviceFilter};

/// Errors reported by a transport implementation
#[derive(Error, Debug)]
pub enum TransportError {
    /// The resource is held by another process or session
    #[error("resource busy")]
    Busy,

    /// The operation needs an open device or claimed interface
    #[error("device is not open")]
    NotOpen,

    /// The device went away
    #[error("device disconnected")]
    Disconnected,

    /// The transfer did not complete in time
    #[error("transfer timed out")]
    Timeout,

    /// OS level I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transfer completed with an error status
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

/// Result type for transport calls
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Type field of a control request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Standard,
    Class,
    Vendor,
}

/// Recipient field of a control request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
}

/// Setup packet of an OUT control transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSetup {
    pub request_type: RequestType,
    pub recipient: Recipient,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

/// Descriptor level facts about a device, readable without opening it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsbDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer_name: Option<String>,
    pub product_name: Option<String>,
    pub serial_number: Option<String>,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    /// bcdDevice
    pub device_version: u16,
    /// bcdUSB
    pub usb_version: u16,
}

impl UsbDeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            ..Default::default()
        }
    }

    /// True when the device passes the filter list
    pub fn matches(&self, filters: &[DeviceFilter]) -> bool {
        any_matches(filters, self.vendor_id, self.product_id)
    }

    /// Best human readable name
    pub fn display_name(&self) -> String {
        match (&self.manufacturer_name, &self.product_name) {
            (Some(m), Some(p)) => format!("{} {}", m, p),
            (None, Some(p)) => p.clone(),
            _ => format!("{:04x}:{:04x}", self.vendor_id, self.product_id),
        }
    }

    /// Split a BCD version into (major, minor, subminor)
    pub fn bcd_parts(bcd: u16) -> (u8, u8, u8) {
        (
            (bcd >> 8) as u8,
            ((bcd >> 4) & 0x0f) as u8,
            (bcd & 0x0f) as u8,
        )
    }
}

impl fmt::Display for UsbDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (dev_major, dev_minor, dev_sub) = Self::bcd_parts(self.device_version);
        let (usb_major, usb_minor, usb_sub) = Self::bcd_parts(self.usb_version);
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

        writeln!(f, "Vendor ID:          0x{:04x}", self.vendor_id)?;
        writeln!(f, "Manufacturer Name:  {}", opt(&self.manufacturer_name))?;
        writeln!(f, "Product ID:         0x{:04x}", self.product_id)?;
        writeln!(f, "Product Name:       {}", opt(&self.product_name))?;
        writeln!(f, "Serial Number:      {}", opt(&self.serial_number))?;
        writeln!(f, "Device Class:       0x{:02x}", self.device_class)?;
        writeln!(f, "Device Subclass:    0x{:02x}", self.device_subclass)?;
        writeln!(f, "Device Protocol:    0x{:02x}", self.device_protocol)?;
        writeln!(
            f,
            "Device Version:     {}.{}.{}",
            dev_major, dev_minor, dev_sub
        )?;
        write!(f, "USB Version:        {}.{}.{}", usb_major, usb_minor, usb_sub)
    }
}

/// Host side USB capability: device selection and the list of paired devices
#[async_trait]
pub trait UsbTransport: Send + Sync {
    /// Offer the devices matching `filters` for selection.
    ///
    /// `Ok(None)` means the user declined to pick one.
    async fn request_device(
        &self,
        filters: &[DeviceFilter],
    ) -> TransportResult<Option<Box<dyn UsbDevice>>>;

    /// Devices the host has been paired with earlier and that are attached now
    async fn paired_devices(&self) -> TransportResult<Vec<Box<dyn UsbDevice>>>;
}

/// A selected device. Every method maps onto one USB level operation.
#[async_trait]
pub trait UsbDevice: Send {
    fn info(&self) -> &UsbDeviceInfo;

    /// Active configuration value, `None` when the device is unconfigured
    fn configuration(&self) -> Option<u8>;

    async fn open(&mut self) -> TransportResult<()>;

    async fn select_configuration(&mut self, value: u8) -> TransportResult<()>;

    /// Claim an interface exclusively. Returns [`TransportError::Busy`] when
    /// someone else holds it.
    async fn claim_interface(&mut self, number: u8) -> TransportResult<()>;

    async fn control_transfer_out(
        &mut self,
        setup: ControlSetup,
        data: &[u8],
    ) -> TransportResult<()>;

    /// Bulk OUT transfer, returns the number of bytes written
    async fn transfer_out(&mut self, endpoint: u8, data: &[u8]) -> TransportResult<usize>;

    async fn close(&mut self) -> TransportResult<()>;
}
