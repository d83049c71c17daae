//! Universe plus session
//!
//! Every update writes the universe first and then sends the full snapshot.
//! The two steps are not atomic: if the transfer fails the universe keeps the
//! new values, and [`DmxController::resend`] pushes them again once the
//! session is back.

use std::sync::Arc;
use tracing::debug;
use usbdmx_core::{ChannelValue, Universe};

use crate::dmx::Fixture;
use crate::error::Result;
use crate::session::{DeviceSession, SessionState};
use crate::usb::{DeviceFilter, UsbDeviceInfo, UsbTransport};

/// Drives one DMX universe through one USB session
#[derive(Debug)]
pub struct DmxController {
    session: DeviceSession,
    universe: Universe,
}

impl DmxController {
    /// Controller with the default filter table and a dark universe
    pub fn new(transport: Arc<dyn UsbTransport>) -> Self {
        Self::with_session(DeviceSession::new(transport))
    }

    /// Controller restricted to `filters`
    pub fn with_filters(transport: Arc<dyn UsbTransport>, filters: Vec<DeviceFilter>) -> Self {
        Self::with_session(DeviceSession::with_filters(transport, filters))
    }

    pub fn with_session(session: DeviceSession) -> Self {
        Self {
            session,
            universe: Universe::new(),
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut DeviceSession {
        &mut self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn device_info(&self) -> Option<&UsbDeviceInfo> {
        self.session.device_info()
    }

    /// See [`DeviceSession::enable`]
    pub async fn enable(&mut self) -> Result<()> {
        self.session.enable().await
    }

    /// See [`DeviceSession::auto_connect`]
    pub async fn auto_connect(&mut self) -> Result<()> {
        self.session.auto_connect().await
    }

    /// See [`DeviceSession::connect`]
    pub async fn connect(&mut self) -> Result<()> {
        self.session.connect().await
    }

    /// See [`DeviceSession::disconnect`]
    pub async fn disconnect(&mut self) -> Result<()> {
        self.session.disconnect().await
    }

    /// Write `value` at `channel` (1-based) and send the whole universe.
    ///
    /// Out of range updates fail before anything is written or sent.
    pub async fn update_universe(
        &mut self,
        channel: u16,
        value: impl Into<ChannelValue>,
    ) -> Result<()> {
        self.universe.update(channel, value)?;
        debug!("Universe updated at channel {}", channel);
        self.resend().await
    }

    /// [`update_universe`](Self::update_universe) for JSON numbers or arrays
    pub async fn update_universe_dynamic(
        &mut self,
        channel: u16,
        value: &serde_json::Value,
    ) -> Result<()> {
        self.universe.update_dynamic(channel, value)?;
        self.resend().await
    }

    /// Apply a fixture setting to the universe and send it.
    ///
    /// ```rust,no_run
    /// # use usbdmx_control::{DmxController, dmx::{Fixture, FixtureProfile}};
    /// # async fn demo(controller: &mut DmxController) -> usbdmx_control::Result<()> {
    /// let par = Fixture::new(1, "PAR".to_string(), FixtureProfile::flat_par(), 1);
    /// controller.update_fixture(&par, |f, u| f.set_uv(u, 128)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn update_fixture<F>(&mut self, fixture: &Fixture, apply: F) -> Result<()>
    where
        F: FnOnce(&Fixture, &mut Universe) -> Result<()>,
    {
        fixture.validate()?;
        apply(fixture, &mut self.universe)?;
        debug!("Fixture '{}' updated", fixture.name);
        self.resend().await
    }

    /// Set every channel to 0 and send
    pub async fn blackout(&mut self) -> Result<()> {
        self.universe.clear();
        self.resend().await
    }

    /// Send the current universe again
    pub async fn resend(&mut self) -> Result<()> {
        self.session.send(self.universe.as_bytes()).await?;
        Ok(())
    }
}
