//! Host USB backend built on [`nusb`]
//!
//! There is no browser chooser on a native host, so selection goes through a
//! [`DeviceChooser`]. Whatever it picks is remembered in the
//! [`PairingStore`], and [`UsbTransport::paired_devices`] returns attached
//! devices from that store in pairing order.

use async_trait::async_trait;
use nusb::transfer::{ControlOut, ControlType, TransferError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::filter::DeviceFilter;
use super::pairing::PairingStore;
use super::transport::{
    ControlSetup, Recipient, RequestType, TransportError, TransportResult, UsbDevice,
    UsbDeviceInfo, UsbTransport,
};

/// Per-transfer timeout applied by the backend
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_millis(1000);

/// Picks one device out of the candidates that passed the filters
pub trait DeviceChooser: Send + Sync {
    /// Index into `candidates`, or `None` to decline
    fn choose(&self, candidates: &[UsbDeviceInfo]) -> Option<usize>;
}

impl<F> DeviceChooser for F
where
    F: Fn(&[UsbDeviceInfo]) -> Option<usize> + Send + Sync,
{
    fn choose(&self, candidates: &[UsbDeviceInfo]) -> Option<usize> {
        self(candidates)
    }
}

/// Always picks the first candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl DeviceChooser for FirstCandidate {
    fn choose(&self, candidates: &[UsbDeviceInfo]) -> Option<usize> {
        (!candidates.is_empty()).then_some(0)
    }
}

/// Picks a fixed position in the candidate list
#[derive(Debug, Clone, Copy)]
pub struct ByIndex(pub usize);

impl DeviceChooser for ByIndex {
    fn choose(&self, candidates: &[UsbDeviceInfo]) -> Option<usize> {
        (self.0 < candidates.len()).then_some(self.0)
    }
}

/// [`UsbTransport`] for real hardware
pub struct NusbTransport {
    chooser: Mutex<Box<dyn DeviceChooser>>,
    pairing: Mutex<PairingStore>,
    pairing_path: Option<PathBuf>,
    timeout: Duration,
}

impl Default for NusbTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl NusbTransport {
    /// Backend using the pairing file in the user config directory
    pub fn new() -> Self {
        Self::with_pairing_path(PairingStore::default_path())
    }

    /// Backend with an explicit pairing file; `None` keeps pairings in memory
    pub fn with_pairing_path(pairing_path: Option<PathBuf>) -> Self {
        let pairing = pairing_path
            .as_deref()
            .map(PairingStore::load)
            .unwrap_or_default();

        Self {
            chooser: Mutex::new(Box::new(FirstCandidate)),
            pairing: Mutex::new(pairing),
            pairing_path,
            timeout: DEFAULT_TRANSFER_TIMEOUT,
        }
    }

    pub fn set_chooser(&self, chooser: impl DeviceChooser + 'static) {
        *self.chooser.lock() = Box::new(chooser);
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Snapshot of the pairing store
    pub fn pairing(&self) -> PairingStore {
        self.pairing.lock().clone()
    }

    /// Attached devices that pass `filters`, in enumeration order
    pub fn candidates(&self, filters: &[DeviceFilter]) -> TransportResult<Vec<UsbDeviceInfo>> {
        Ok(attached_devices()?
            .into_iter()
            .map(|(_, info)| info)
            .filter(|info| info.matches(filters))
            .collect())
    }

    fn remember(&self, info: &UsbDeviceInfo) {
        let mut pairing = self.pairing.lock();
        if !pairing.remember(info) {
            return;
        }
        info!("Paired with {}", info.display_name());
        if let Some(path) = &self.pairing_path {
            if let Err(e) = pairing.save(path) {
                warn!("Failed to save pairing file {:?}: {}", path, e);
            }
        }
    }

    fn wrap(&self, raw: nusb::DeviceInfo, info: UsbDeviceInfo) -> Box<dyn UsbDevice> {
        Box::new(NusbDevice {
            raw,
            info,
            device: None,
            interface: None,
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl UsbTransport for NusbTransport {
    async fn request_device(
        &self,
        filters: &[DeviceFilter],
    ) -> TransportResult<Option<Box<dyn UsbDevice>>> {
        let mut candidates: Vec<_> = attached_devices()?
            .into_iter()
            .filter(|(_, info)| info.matches(filters))
            .collect();
        debug!("{} device(s) match the filter list", candidates.len());

        let infos: Vec<UsbDeviceInfo> = candidates.iter().map(|(_, info)| info.clone()).collect();
        let Some(index) = self.chooser.lock().choose(&infos) else {
            return Ok(None);
        };
        if index >= candidates.len() {
            return Ok(None);
        }

        let (raw, info) = candidates.swap_remove(index);
        self.remember(&info);
        Ok(Some(self.wrap(raw, info)))
    }

    async fn paired_devices(&self) -> TransportResult<Vec<Box<dyn UsbDevice>>> {
        let mut paired: Vec<(usize, nusb::DeviceInfo, UsbDeviceInfo)> = {
            let pairing = self.pairing.lock();
            attached_devices()?
                .into_iter()
                .filter_map(|(raw, info)| pairing.position(&info).map(|pos| (pos, raw, info)))
                .collect()
        };
        paired.sort_by_key(|(pos, _, _)| *pos);

        Ok(paired
            .into_iter()
            .map(|(_, raw, info)| self.wrap(raw, info))
            .collect())
    }
}

/// A device found through `nusb`
pub struct NusbDevice {
    raw: nusb::DeviceInfo,
    info: UsbDeviceInfo,
    device: Option<nusb::Device>,
    interface: Option<nusb::Interface>,
    timeout: Duration,
}

impl NusbDevice {
    fn device(&self) -> TransportResult<&nusb::Device> {
        self.device.as_ref().ok_or(TransportError::NotOpen)
    }

    fn interface(&self) -> TransportResult<&nusb::Interface> {
        self.interface.as_ref().ok_or(TransportError::NotOpen)
    }
}

#[async_trait]
impl UsbDevice for NusbDevice {
    fn info(&self) -> &UsbDeviceInfo {
        &self.info
    }

    fn configuration(&self) -> Option<u8> {
        self.device
            .as_ref()
            .and_then(|d| d.active_configuration().ok())
            .map(|c| c.configuration_value())
    }

    async fn open(&mut self) -> TransportResult<()> {
        if self.device.is_none() {
            self.device = Some(self.raw.open()?);
        }
        Ok(())
    }

    async fn select_configuration(&mut self, value: u8) -> TransportResult<()> {
        self.device()?.set_configuration(value)?;
        Ok(())
    }

    async fn claim_interface(&mut self, number: u8) -> TransportResult<()> {
        let interface = self.device()?.claim_interface(number).map_err(|e| {
            if is_busy(&e) {
                TransportError::Busy
            } else {
                TransportError::Io(e)
            }
        })?;
        self.interface = Some(interface);
        Ok(())
    }

    async fn control_transfer_out(
        &mut self,
        setup: ControlSetup,
        data: &[u8],
    ) -> TransportResult<()> {
        let transfer = self.interface()?.control_out(ControlOut {
            control_type: control_type(setup.request_type),
            recipient: recipient(setup.recipient),
            request: setup.request,
            value: setup.value,
            index: setup.index,
            data,
        });

        tokio::time::timeout(self.timeout, transfer)
            .await
            .map_err(|_| TransportError::Timeout)?
            .into_result()
            .map_err(transfer_error)?;
        Ok(())
    }

    async fn transfer_out(&mut self, endpoint: u8, data: &[u8]) -> TransportResult<usize> {
        let transfer = self.interface()?.bulk_out(endpoint, data.to_vec());

        let response = tokio::time::timeout(self.timeout, transfer)
            .await
            .map_err(|_| TransportError::Timeout)?
            .into_result()
            .map_err(transfer_error)?;
        Ok(response.actual_length())
    }

    async fn close(&mut self) -> TransportResult<()> {
        // Dropping the handles releases the interface and closes the device.
        self.interface = None;
        self.device = None;
        Ok(())
    }
}

fn attached_devices() -> TransportResult<Vec<(nusb::DeviceInfo, UsbDeviceInfo)>> {
    Ok(nusb::list_devices()?
        .map(|raw| {
            let info = describe(&raw);
            (raw, info)
        })
        .collect())
}

fn describe(raw: &nusb::DeviceInfo) -> UsbDeviceInfo {
    UsbDeviceInfo {
        vendor_id: raw.vendor_id(),
        product_id: raw.product_id(),
        manufacturer_name: raw.manufacturer_string().map(str::to_string),
        product_name: raw.product_string().map(str::to_string),
        serial_number: raw.serial_number().map(str::to_string),
        device_class: raw.class(),
        device_subclass: raw.subclass(),
        device_protocol: raw.protocol(),
        device_version: raw.device_version(),
        usb_version: raw.usb_version(),
    }
}

fn control_type(request_type: RequestType) -> ControlType {
    match request_type {
        RequestType::Standard => ControlType::Standard,
        RequestType::Class => ControlType::Class,
        RequestType::Vendor => ControlType::Vendor,
    }
}

fn recipient(recipient: Recipient) -> nusb::transfer::Recipient {
    match recipient {
        Recipient::Device => nusb::transfer::Recipient::Device,
        Recipient::Interface => nusb::transfer::Recipient::Interface,
        Recipient::Endpoint => nusb::transfer::Recipient::Endpoint,
        Recipient::Other => nusb::transfer::Recipient::Other,
    }
}

fn transfer_error(e: TransferError) -> TransportError {
    match e {
        TransferError::Disconnected => TransportError::Disconnected,
        other => TransportError::Transfer(other.to_string()),
    }
}

fn is_busy(e: &std::io::Error) -> bool {
    // EBUSY on Linux and macOS
    cfg!(unix) && e.raw_os_error() == Some(16)
}
