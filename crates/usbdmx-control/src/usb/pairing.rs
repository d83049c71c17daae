//! Remembered device identities
//!
//! A device picked through the selection prompt is "paired": its identity is
//! stored so that later sessions can reconnect without asking again.
//! Disconnecting never removes a pairing.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::transport::UsbDeviceInfo;
use crate::Result;

/// Identity of a paired device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Distinguishes two boards of the same model; `None` matches any serial
    #[serde(default)]
    pub serial_number: Option<String>,
}

impl PairedDevice {
    pub fn from_info(info: &UsbDeviceInfo) -> Self {
        Self {
            vendor_id: info.vendor_id,
            product_id: info.product_id,
            serial_number: info.serial_number.clone(),
        }
    }

    pub fn matches(&self, info: &UsbDeviceInfo) -> bool {
        self.vendor_id == info.vendor_id
            && self.product_id == info.product_id
            && match &self.serial_number {
                Some(serial) => info.serial_number.as_deref() == Some(serial.as_str()),
                None => true,
            }
    }
}

/// Ordered list of paired devices, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingStore {
    #[serde(default)]
    devices: Vec<PairedDevice>,
}

impl PairingStore {
    /// `<config dir>/usbdmx/paired.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("usbdmx");
            p.push("paired.json");
            p
        })
    }

    /// Load from `path`; a missing or unreadable file yields an empty store
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path).map(|content| serde_json::from_str(&content)) {
            Ok(Ok(store)) => store,
            Ok(Err(e)) => {
                tracing::warn!("Ignoring malformed pairing file {:?}: {}", path, e);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read pairing file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Pair a device. Returns false if it was already paired.
    pub fn remember(&mut self, info: &UsbDeviceInfo) -> bool {
        if self.contains(info) {
            return false;
        }
        self.devices.push(PairedDevice::from_info(info));
        true
    }

    /// Remove every pairing matching `info`
    pub fn forget(&mut self, info: &UsbDeviceInfo) -> usize {
        let before = self.devices.len();
        self.devices.retain(|d| !d.matches(info));
        before - self.devices.len()
    }

    pub fn contains(&self, info: &UsbDeviceInfo) -> bool {
        self.position(info).is_some()
    }

    /// Pairing order of `info`, used to rank attached devices
    pub fn position(&self, info: &UsbDeviceInfo) -> Option<usize> {
        self.devices.iter().position(|d| d.matches(info))
    }

    pub fn devices(&self) -> &[PairedDevice] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
