//! In-memory transport that records every USB operation
//!
//! Used by the test suites and handy for running the console without
//! hardware. Every handle the transport hands out is a clone of the
//! registered device, so all of them append to the same [`CallLog`] the test
//! holds on to.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use super::filter::DeviceFilter;
use super::transport::{
    ControlSetup, TransportError, TransportResult, UsbDevice, UsbDeviceInfo, UsbTransport,
};

/// One recorded device operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Open,
    SelectConfiguration(u8),
    ClaimInterface(u8),
    ControlTransferOut(ControlSetup),
    TransferOut { endpoint: u8, data: Vec<u8> },
    Close,
}

/// Operation kinds, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStep {
    Open,
    SelectConfiguration,
    ClaimInterface,
    ControlTransferOut,
    TransferOut,
    Close,
}

/// Shared, append-only record of device calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<MockCall>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<MockCall> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Payloads of every bulk transfer, in order
    pub fn transfers(&self) -> Vec<(u8, Vec<u8>)> {
        self.0
            .lock()
            .iter()
            .filter_map(|call| match call {
                MockCall::TransferOut { endpoint, data } => Some((*endpoint, data.clone())),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: MockCall) {
        self.0.lock().push(call);
    }
}

/// A fake device. Clones share the call log.
#[derive(Debug, Clone)]
pub struct MockDevice {
    info: UsbDeviceInfo,
    configuration: Option<u8>,
    fail_at: Option<MockStep>,
    busy_interfaces: Vec<u8>,
    log: CallLog,
}

impl MockDevice {
    /// An unconfigured device with the given ids
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self::with_info(UsbDeviceInfo::new(vendor_id, product_id))
    }

    pub fn with_info(info: UsbDeviceInfo) -> Self {
        Self {
            info,
            configuration: None,
            fail_at: None,
            busy_interfaces: Vec::new(),
            log: CallLog::default(),
        }
    }

    /// Report an already active configuration
    pub fn configured(mut self, value: u8) -> Self {
        self.configuration = Some(value);
        self
    }

    /// Fail the given operation with a transfer error
    pub fn failing_at(mut self, step: MockStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// Pretend another session holds `interface`
    pub fn with_busy_interface(mut self, interface: u8) -> Self {
        self.busy_interfaces.push(interface);
        self
    }

    /// Handle on the call history that outlives the device
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn record(&self, step: MockStep, call: MockCall) -> TransportResult<()> {
        self.log.push(call);
        if self.fail_at == Some(step) {
            return Err(TransportError::Transfer(format!("injected {:?} failure", step)));
        }
        Ok(())
    }
}

#[async_trait]
impl UsbDevice for MockDevice {
    fn info(&self) -> &UsbDeviceInfo {
        &self.info
    }

    fn configuration(&self) -> Option<u8> {
        self.configuration
    }

    async fn open(&mut self) -> TransportResult<()> {
        self.record(MockStep::Open, MockCall::Open)
    }

    async fn select_configuration(&mut self, value: u8) -> TransportResult<()> {
        self.record(
            MockStep::SelectConfiguration,
            MockCall::SelectConfiguration(value),
        )?;
        self.configuration = Some(value);
        Ok(())
    }

    async fn claim_interface(&mut self, number: u8) -> TransportResult<()> {
        self.record(MockStep::ClaimInterface, MockCall::ClaimInterface(number))?;
        if self.busy_interfaces.contains(&number) {
            return Err(TransportError::Busy);
        }
        Ok(())
    }

    async fn control_transfer_out(
        &mut self,
        setup: ControlSetup,
        _data: &[u8],
    ) -> TransportResult<()> {
        self.record(
            MockStep::ControlTransferOut,
            MockCall::ControlTransferOut(setup),
        )
    }

    async fn transfer_out(&mut self, endpoint: u8, data: &[u8]) -> TransportResult<usize> {
        self.record(
            MockStep::TransferOut,
            MockCall::TransferOut {
                endpoint,
                data: data.to_vec(),
            },
        )?;
        Ok(data.len())
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.record(MockStep::Close, MockCall::Close)
    }
}

/// A fake host USB stack
///
/// `request_device` hands out the first selectable device that passes the
/// filters (the simulated user always picks the top entry), or `None` when
/// nothing matches or [`MockTransport::cancel_next`] was called. A picked
/// device is paired from then on. Pairings are never consumed: every
/// `paired_devices` call returns fresh handles onto the same devices.
#[derive(Debug, Default)]
pub struct MockTransport {
    selectable: Mutex<Vec<MockDevice>>,
    paired: Mutex<Vec<MockDevice>>,
    requests: Mutex<Vec<Vec<DeviceFilter>>>,
    cancel: Mutex<bool>,
    fail_request: Mutex<bool>,
    fail_lookup: Mutex<bool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a device show up in the selection prompt
    pub fn add_selectable(&self, device: MockDevice) {
        self.selectable.lock().push(device);
    }

    /// Make a device show up as previously paired
    pub fn add_paired(&self, device: MockDevice) {
        self.pair(&device);
    }

    /// The next selection prompt is dismissed by the user
    pub fn cancel_next(&self) {
        *self.cancel.lock() = true;
    }

    /// The next selection prompt fails before showing anything
    pub fn fail_next_request(&self) {
        *self.fail_request.lock() = true;
    }

    /// The next paired device lookup fails
    pub fn fail_next_lookup(&self) {
        *self.fail_lookup.lock() = true;
    }

    /// Filter lists presented to the selection prompt so far
    pub fn requests(&self) -> Vec<Vec<DeviceFilter>> {
        self.requests.lock().clone()
    }

    /// Selectable devices that pass `filters`, in prompt order
    pub fn candidates(&self, filters: &[DeviceFilter]) -> Vec<UsbDeviceInfo> {
        self.selectable
            .lock()
            .iter()
            .filter(|d| d.info.matches(filters))
            .map(|d| d.info.clone())
            .collect()
    }

    /// Descriptors of every paired device, in pairing order
    pub fn paired(&self) -> Vec<UsbDeviceInfo> {
        self.paired.lock().iter().map(|d| d.info.clone()).collect()
    }

    fn pair(&self, device: &MockDevice) {
        let mut paired = self.paired.lock();
        if !paired.iter().any(|d| d.info == device.info) {
            paired.push(device.clone());
        }
    }
}

#[async_trait]
impl UsbTransport for MockTransport {
    async fn request_device(
        &self,
        filters: &[DeviceFilter],
    ) -> TransportResult<Option<Box<dyn UsbDevice>>> {
        self.requests.lock().push(filters.to_vec());

        if std::mem::take(&mut *self.fail_request.lock()) {
            return Err(TransportError::Other(
                "injected selection failure".to_string(),
            ));
        }
        if std::mem::take(&mut *self.cancel.lock()) {
            return Ok(None);
        }

        let picked = self
            .selectable
            .lock()
            .iter()
            .find(|d| d.info.matches(filters))
            .cloned();
        let Some(device) = picked else {
            return Ok(None);
        };

        self.pair(&device);
        Ok(Some(Box::new(device) as Box<dyn UsbDevice>))
    }

    async fn paired_devices(&self) -> TransportResult<Vec<Box<dyn UsbDevice>>> {
        if std::mem::take(&mut *self.fail_lookup.lock()) {
            return Err(TransportError::Other("injected lookup failure".to_string()));
        }

        Ok(self
            .paired
            .lock()
            .iter()
            .cloned()
            .map(|d| Box::new(d) as Box<dyn UsbDevice>)
            .collect())
    }
}
