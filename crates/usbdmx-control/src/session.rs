//! USB session with the DMX bridge
//!
//! A [`DeviceSession`] owns at most one device handle and walks it through
//!
//! ```text
//! Idle -> Selecting -> Open -> Configured -> Ready -> Idle
//!                         \________\_________\-> Faulted
//! ```
//!
//! Every step of the connect sequence is its own fallible stage. A failure is
//! returned to the caller tagged with that stage and leaves the session
//! `Faulted`; nothing is retried or rolled back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use usbdmx_core::UNIVERSE_SIZE;

use crate::error::{ControlError, Result, Stage};
use crate::usb::protocol::{self, CONFIGURATION_VALUE, DATA_ENDPOINT, DATA_INTERFACE};
use crate::usb::{default_filters, DeviceFilter, TransportError, UsbDevice, UsbDeviceInfo, UsbTransport};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No device bound
    Idle,
    /// Waiting for the device chooser
    Selecting,
    /// Device bound but not configured
    Open,
    /// Interface claimed and handshake sent
    Configured,
    /// Accepting universe transfers
    Ready,
    /// Unusable; discard the session
    Faulted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Selecting => "selecting",
            SessionState::Open => "open",
            SessionState::Configured => "configured",
            SessionState::Ready => "ready",
            SessionState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Exclusive session with one DMX bridge
pub struct DeviceSession {
    transport: Arc<dyn UsbTransport>,
    filters: Vec<DeviceFilter>,
    device: Option<Box<dyn UsbDevice>>,
    state: SessionState,
}

impl DeviceSession {
    /// Session using the default filter table
    pub fn new(transport: Arc<dyn UsbTransport>) -> Self {
        Self::with_filters(transport, default_filters())
    }

    /// Session restricted to `filters`
    pub fn with_filters(transport: Arc<dyn UsbTransport>, filters: Vec<DeviceFilter>) -> Self {
        Self {
            transport,
            filters,
            device: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn filters(&self) -> &[DeviceFilter] {
        &self.filters
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Descriptor info of the bound device
    pub fn device_info(&self) -> Option<&UsbDeviceInfo> {
        self.device.as_deref().map(|d| d.info())
    }

    /// Ask the user to pick a device and bind it. Call [`connect`](Self::connect) next.
    pub async fn enable(&mut self) -> Result<()> {
        self.ensure_selectable()?;
        let previous = self.state;
        self.state = SessionState::Selecting;

        match self.transport.request_device(&self.filters).await {
            Ok(Some(device)) => {
                info!("Selected {}", device.info().display_name());
                self.bind(device);
                Ok(())
            }
            Ok(None) => {
                self.state = previous;
                info!("No USB device was selected");
                Err(ControlError::NoDeviceSelected)
            }
            Err(e) => {
                self.state = previous;
                warn!("Device selection failed: {}", e);
                Err(ControlError::transport(Stage::Select, e))
            }
        }
    }

    /// Bind the first already paired device and connect to it
    pub async fn auto_connect(&mut self) -> Result<()> {
        self.ensure_selectable()?;

        let mut paired = self
            .transport
            .paired_devices()
            .await
            .map_err(|e| ControlError::transport(Stage::PairedLookup, e))?;

        if paired.is_empty() {
            debug!("No paired device attached");
            return Err(ControlError::NoPairedDevice);
        }

        let device = paired.swap_remove(0);
        info!("Found paired device {}", device.info().display_name());
        self.bind(device);
        self.connect().await
    }

    /// Open the bound device, claim the DMX interface and announce the host.
    ///
    /// Connecting a session that is already ready does nothing.
    pub async fn connect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Faulted => return Err(ControlError::Faulted),
            _ => {}
        }

        let Some(device) = self.device.as_deref_mut() else {
            return Err(ControlError::NotConnected);
        };

        match Self::handshake(device).await {
            Ok(()) => {
                self.state = SessionState::Configured;
                debug!("Interface {} claimed, host present", DATA_INTERFACE);
                self.state = SessionState::Ready;
                info!("USB session ready");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Faulted;
                error!("Connect failed: {}", e);
                Err(e)
            }
        }
    }

    /// Send a universe buffer on the data endpoint.
    ///
    /// Buffers shorter than 512 bytes are padded with zeros.
    pub async fn send(&mut self, data: &[u8]) -> Result<usize> {
        if self.state != SessionState::Ready {
            return Err(ControlError::NotConnected);
        }
        let Some(device) = self.device.as_deref_mut() else {
            return Err(ControlError::NotConnected);
        };
        if data.len() > UNIVERSE_SIZE {
            return Err(ControlError::OutOfRange {
                channel: 1,
                len: data.len(),
            });
        }

        let mut buffer = [0u8; UNIVERSE_SIZE];
        buffer[..data.len()].copy_from_slice(data);

        let written = device
            .transfer_out(DATA_ENDPOINT, &buffer)
            .await
            .map_err(|e| {
                warn!("Universe transfer failed: {}", e);
                ControlError::transport(Stage::Transfer, e)
            })?;
        debug!("Sent {} bytes on endpoint {}", written, DATA_ENDPOINT);
        Ok(written)
    }

    /// Tell the device the host is leaving and close the handle.
    ///
    /// The device stays paired, so [`auto_connect`](Self::auto_connect) can
    /// find it again later.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(device) = self.device.as_deref_mut() else {
            return Err(ControlError::NotConnected);
        };

        let result = match self.state {
            SessionState::Configured | SessionState::Ready => Self::release(device).await,
            // Nothing was claimed, only the handle needs closing.
            _ => device
                .close()
                .await
                .map_err(|e| ControlError::transport(Stage::Close, e)),
        };

        match result {
            Ok(()) => {
                self.device = None;
                if self.state != SessionState::Faulted {
                    self.state = SessionState::Idle;
                }
                info!("Disconnected, device is still paired");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Faulted;
                error!("Disconnect failed: {}", e);
                Err(e)
            }
        }
    }

    fn ensure_selectable(&self) -> Result<()> {
        match self.state {
            SessionState::Faulted => Err(ControlError::Faulted),
            SessionState::Configured | SessionState::Ready => Err(ControlError::AlreadyConnected),
            _ => Ok(()),
        }
    }

    fn bind(&mut self, device: Box<dyn UsbDevice>) {
        self.device = Some(device);
        self.state = SessionState::Open;
    }

    async fn handshake(device: &mut dyn UsbDevice) -> Result<()> {
        device
            .open()
            .await
            .map_err(|e| ControlError::transport(Stage::Open, e))?;

        if device.configuration().is_none() {
            device
                .select_configuration(CONFIGURATION_VALUE)
                .await
                .map_err(|e| ControlError::transport(Stage::SelectConfiguration, e))?;
        }

        device
            .claim_interface(DATA_INTERFACE)
            .await
            .map_err(|e| match e {
                TransportError::Busy => ControlError::InterfaceUnavailable {
                    interface: DATA_INTERFACE,
                },
                other => ControlError::transport(Stage::ClaimInterface, other),
            })?;

        device
            .control_transfer_out(protocol::line_state(true), &[])
            .await
            .map_err(|e| ControlError::transport(Stage::Handshake, e))
    }

    async fn release(device: &mut dyn UsbDevice) -> Result<()> {
        device
            .control_transfer_out(protocol::line_state(false), &[])
            .await
            .map_err(|e| ControlError::transport(Stage::Release, e))?;

        device
            .close()
            .await
            .map_err(|e| ControlError::transport(Stage::Close, e))
    }
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("state", &self.state)
            .field("device", &self.device_info())
            .field("filters", &self.filters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::mock::{MockCall, MockDevice, MockStep, MockTransport};

    fn leonardo() -> MockDevice {
        MockDevice::new(0x2341, 0x8036)
    }

    #[tokio::test]
    async fn test_fresh_session_is_idle() {
        let session = DeviceSession::new(Arc::new(MockTransport::new()));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.has_device());
        assert_eq!(session.filters().len(), 7);
    }

    #[tokio::test]
    async fn test_enable_binds_device() {
        let transport = Arc::new(MockTransport::new());
        transport.add_selectable(leonardo());

        let mut session = DeviceSession::new(transport.clone());
        session.enable().await.unwrap();

        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.device_info().map(|i| i.product_id), Some(0x8036));
        assert_eq!(transport.requests(), vec![default_filters()]);
    }

    #[tokio::test]
    async fn test_enable_cancelled() {
        let transport = Arc::new(MockTransport::new());
        transport.add_selectable(leonardo());
        transport.cancel_next();

        let mut session = DeviceSession::new(transport);
        let err = session.enable().await.unwrap_err();

        assert!(matches!(err, ControlError::NoDeviceSelected));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.has_device());
    }

    #[tokio::test]
    async fn test_enable_filters_out_unknown_devices() {
        let transport = Arc::new(MockTransport::new());
        transport.add_selectable(MockDevice::new(0x1234, 0x5678));

        let mut session = DeviceSession::new(transport);
        assert!(matches!(
            session.enable().await,
            Err(ControlError::NoDeviceSelected)
        ));
    }

    #[tokio::test]
    async fn test_connect_without_device() {
        let mut session = DeviceSession::new(Arc::new(MockTransport::new()));
        assert!(matches!(
            session.connect().await,
            Err(ControlError::NotConnected)
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_connect_skips_configuration_when_active() {
        let transport = Arc::new(MockTransport::new());
        let device = leonardo().configured(1);
        let log = device.log();
        transport.add_selectable(device);

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();
        session.connect().await.unwrap();

        assert_eq!(
            log.calls(),
            vec![
                MockCall::Open,
                MockCall::ClaimInterface(2),
                MockCall::ControlTransferOut(protocol::line_state(true)),
            ]
        );
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn test_connect_twice_is_noop() {
        let transport = Arc::new(MockTransport::new());
        let device = leonardo();
        let log = device.log();
        transport.add_selectable(device);

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();
        session.connect().await.unwrap();
        let calls = log.len();

        session.connect().await.unwrap();
        assert_eq!(log.len(), calls);
    }

    #[tokio::test]
    async fn test_busy_interface() {
        let transport = Arc::new(MockTransport::new());
        transport.add_selectable(leonardo().with_busy_interface(2));

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();

        assert!(matches!(
            session.connect().await,
            Err(ControlError::InterfaceUnavailable { interface: 2 })
        ));
        assert_eq!(session.state(), SessionState::Faulted);
        assert!(matches!(
            session.connect().await,
            Err(ControlError::Faulted)
        ));
        assert!(matches!(
            session.enable().await,
            Err(ControlError::Faulted)
        ));
    }

    #[tokio::test]
    async fn test_enable_while_ready() {
        let transport = Arc::new(MockTransport::new());
        transport.add_selectable(leonardo());

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();
        session.connect().await.unwrap();

        assert!(matches!(
            session.enable().await,
            Err(ControlError::AlreadyConnected)
        ));
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn test_send_pads_short_buffers() {
        let transport = Arc::new(MockTransport::new());
        let device = leonardo();
        let log = device.log();
        transport.add_selectable(device);

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();
        session.connect().await.unwrap();

        assert_eq!(session.send(&[1, 2, 3]).await.unwrap(), 512);

        let transfers = log.transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].0, 4);
        assert_eq!(transfers[0].1.len(), 512);
        assert_eq!(&transfers[0].1[..4], &[1, 2, 3, 0]);
    }

    #[tokio::test]
    async fn test_send_rejects_oversized_buffers() {
        let transport = Arc::new(MockTransport::new());
        let device = leonardo();
        let log = device.log();
        transport.add_selectable(device);

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();
        session.connect().await.unwrap();

        assert!(matches!(
            session.send(&[0u8; 513]).await,
            Err(ControlError::OutOfRange { len: 513, .. })
        ));
        assert!(log.transfers().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let transport = Arc::new(MockTransport::new());
        transport.add_selectable(leonardo().failing_at(MockStep::TransferOut));

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();
        session.connect().await.unwrap();

        let err = session.send(&[0u8; 512]).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Transfer));
        // A failed transfer does not tear the session down
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn test_send_on_open_session() {
        let transport = Arc::new(MockTransport::new());
        let device = leonardo();
        let log = device.log();
        transport.add_selectable(device);

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();

        assert!(matches!(
            session.send(&[0u8; 512]).await,
            Err(ControlError::NotConnected)
        ));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_unconnected_device_only_closes() {
        let transport = Arc::new(MockTransport::new());
        let device = leonardo();
        let log = device.log();
        transport.add_selectable(device);

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();
        session.disconnect().await.unwrap();

        assert_eq!(log.calls(), vec![MockCall::Close]);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.has_device());
    }

    #[tokio::test]
    async fn test_disconnect_failure_faults_session() {
        let transport = Arc::new(MockTransport::new());
        transport.add_selectable(leonardo().failing_at(MockStep::Close));

        let mut session = DeviceSession::new(transport);
        session.enable().await.unwrap();
        session.connect().await.unwrap();

        let err = session.disconnect().await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Close));
        assert_eq!(session.state(), SessionState::Faulted);
    }

    #[tokio::test]
    async fn test_disconnect_without_device() {
        let mut session = DeviceSession::new(Arc::new(MockTransport::new()));
        assert!(matches!(
            session.disconnect().await,
            Err(ControlError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_auto_connect_lookup_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_next_lookup();

        let mut session = DeviceSession::new(transport);
        let err = session.auto_connect().await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::PairedLookup));
        assert_eq!(session.state(), SessionState::Idle);
    }
}
