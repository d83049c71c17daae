//! Interactive console state
//!
//! Holds the controller and the Flat PAR the colour commands address, and
//! turns parsed [`Command`]s into controller calls. Errors are returned to
//! the caller for display; none of them end the session.

use anyhow::{bail, Result};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};
use usbdmx_control::dmx::{Fixture, FixtureProfile};
use usbdmx_control::usb::{
    ByIndex, DeviceFilter, FirstCandidate, MockDevice, MockTransport, NusbTransport,
    UsbDeviceInfo, UsbTransport,
};
use usbdmx_control::{ControlError, DmxController};

use crate::commands::{Command, HELP};

/// USB backend the console talks to
#[derive(Clone)]
pub enum Backend {
    Native(Arc<NusbTransport>),
    /// Simulated bridge, nothing leaves the process
    DryRun(Arc<MockTransport>),
}

impl Backend {
    /// A mock stack with one attached Leonardo that is already paired
    pub fn dry_run() -> Self {
        let transport = MockTransport::new();
        let leonardo = MockDevice::with_info(UsbDeviceInfo {
            manufacturer_name: Some("Arduino LLC".to_string()),
            product_name: Some("Arduino Leonardo (simulated)".to_string()),
            ..UsbDeviceInfo::new(0x2341, 0x8036)
        });
        transport.add_selectable(leonardo.clone());
        transport.add_paired(leonardo);
        Backend::DryRun(Arc::new(transport))
    }

    fn transport(&self) -> Arc<dyn UsbTransport> {
        match self {
            Backend::Native(t) => t.clone() as Arc<dyn UsbTransport>,
            Backend::DryRun(t) => t.clone() as Arc<dyn UsbTransport>,
        }
    }
}

/// What the console loop should do after a command
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Done,
    Quit,
}

pub struct Console {
    backend: Backend,
    controller: DmxController,
    filters: Vec<DeviceFilter>,
    par: Fixture,
}

impl Console {
    pub fn new(backend: Backend, filters: Vec<DeviceFilter>, fixture_address: u16) -> Self {
        let controller = DmxController::with_filters(backend.transport(), filters.clone());
        let par = Fixture::new(
            1,
            "Flat PAR".to_string(),
            FixtureProfile::flat_par(),
            fixture_address,
        );
        Self {
            backend,
            controller,
            filters,
            par,
        }
    }

    pub fn controller(&self) -> &DmxController {
        &self.controller
    }

    /// Reconnect to a paired bridge. Finding none is not an error.
    pub async fn startup(&mut self) -> Result<()> {
        match self.controller.auto_connect().await {
            Ok(()) => {
                if let Some(info) = self.controller.device_info() {
                    info!("Connected to paired device {}", info.display_name());
                }
                Ok(())
            }
            Err(ControlError::NoPairedDevice) => {
                info!("No paired device attached, use 'enable' to pick one");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Disconnect if a device is still bound
    pub async fn shutdown(&mut self) {
        if !self.controller.session().has_device() {
            return;
        }
        if let Err(e) = self.controller.disconnect().await {
            warn!("Disconnect on exit failed: {}", e);
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Devices => self.devices().map(Reply::Text),
            Command::Enable(index) => {
                if let Backend::Native(transport) = &self.backend {
                    match index {
                        Some(n) => transport.set_chooser(ByIndex(n)),
                        None => transport.set_chooser(FirstCandidate),
                    }
                }
                self.controller.enable().await?;
                let name = self
                    .controller
                    .device_info()
                    .map(|i| i.display_name())
                    .unwrap_or_default();
                Ok(Reply::Text(format!("Selected {}, now 'connect'", name)))
            }
            Command::Connect => {
                self.controller.connect().await?;
                Ok(Reply::Text("Connected".to_string()))
            }
            Command::Disconnect => {
                self.controller.disconnect().await?;
                Ok(Reply::Text("Disconnected".to_string()))
            }
            Command::Set { channel, values } => {
                self.controller.update_universe(channel, values).await?;
                Ok(Reply::Done)
            }
            Command::Color(r, g, b) => {
                self.controller
                    .update_fixture(&self.par, |f, u| f.set_rgb(u, r, g, b))
                    .await?;
                Ok(Reply::Done)
            }
            Command::Uv(v) => {
                self.controller
                    .update_fixture(&self.par, |f, u| f.set_uv(u, v))
                    .await?;
                Ok(Reply::Done)
            }
            Command::Dimmer(v) => {
                self.controller
                    .update_fixture(&self.par, |f, u| f.set_dimmer(u, v))
                    .await?;
                Ok(Reply::Done)
            }
            Command::Strobe(v) => {
                self.controller
                    .update_fixture(&self.par, |f, u| f.set_strobe(u, v))
                    .await?;
                Ok(Reply::Done)
            }
            Command::Blackout => {
                self.controller.blackout().await?;
                Ok(Reply::Done)
            }
            Command::Resend => {
                self.controller.resend().await?;
                Ok(Reply::Done)
            }
            Command::Info => Ok(Reply::Text(match self.controller.device_info() {
                Some(info) => info.to_string(),
                None => "No device bound".to_string(),
            })),
            Command::Universe => Ok(Reply::Text(self.universe_summary())),
            Command::State => Ok(Reply::Text(self.controller.state().to_string())),
            Command::Help => Ok(Reply::Text(HELP.to_string())),
            Command::Quit => Ok(Reply::Quit),
        }
    }

    fn devices(&self) -> Result<String> {
        let candidates = match &self.backend {
            Backend::Native(transport) => transport.candidates(&self.filters)?,
            Backend::DryRun(transport) => transport.candidates(&self.filters),
        };
        if candidates.is_empty() {
            bail!("No matching USB device attached");
        }

        let mut out = String::new();
        for (i, info) in candidates.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}: {:04x}:{:04x} {}",
                i,
                info.vendor_id,
                info.product_id,
                info.display_name()
            );
        }
        Ok(out.trim_end().to_string())
    }

    fn universe_summary(&self) -> String {
        let active: Vec<String> = self
            .controller
            .universe()
            .as_bytes()
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(i, v)| format!("{}={}", i + 1, v))
            .collect();

        if active.is_empty() {
            "All channels at 0".to_string()
        } else {
            active.join(" ")
        }
    }
}
