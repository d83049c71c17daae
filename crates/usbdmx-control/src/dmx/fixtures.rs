//! DMX fixture profiles

use serde::{Deserialize, Serialize};
use usbdmx_core::{Universe, UNIVERSE_SIZE};

use crate::error::{ControlError, Result};

/// DMX fixture profile defining channel layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureProfile {
    pub name: String,
    pub manufacturer: String,
    pub channels: Vec<FixtureChannel>,
}

/// A channel in a fixture profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureChannel {
    pub name: String,
    pub channel_type: ChannelType,
    pub default_value: u8,
}

impl FixtureChannel {
    fn new(channel_type: ChannelType) -> Self {
        Self {
            name: channel_type.label().to_string(),
            channel_type,
            default_value: 0,
        }
    }
}

/// Type of DMX channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelType {
    Dimmer,
    Red,
    Green,
    Blue,
    Amber,
    White,
    Uv,
    Strobe,
    Generic,
}

impl ChannelType {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelType::Dimmer => "Dimmer",
            ChannelType::Red => "Red",
            ChannelType::Green => "Green",
            ChannelType::Blue => "Blue",
            ChannelType::Amber => "Amber",
            ChannelType::White => "White",
            ChannelType::Uv => "UV",
            ChannelType::Strobe => "Strobe",
            ChannelType::Generic => "Generic",
        }
    }
}

impl FixtureProfile {
    fn generic(name: &str, layout: &[ChannelType]) -> Self {
        Self {
            name: name.to_string(),
            manufacturer: "Generic".to_string(),
            channels: layout.iter().copied().map(FixtureChannel::new).collect(),
        }
    }

    /// Create a generic dimmer fixture (1 channel)
    pub fn generic_dimmer() -> Self {
        Self::generic("Generic Dimmer", &[ChannelType::Dimmer])
    }

    /// Create an RGB fixture (3 channels)
    pub fn rgb_par() -> Self {
        Self::generic(
            "RGB Par",
            &[ChannelType::Red, ChannelType::Green, ChannelType::Blue],
        )
    }

    /// Create a 6 channel Flat PAR: red, green, blue, UV, dimmer, strobe
    pub fn flat_par() -> Self {
        Self::generic(
            "Flat PAR",
            &[
                ChannelType::Red,
                ChannelType::Green,
                ChannelType::Blue,
                ChannelType::Uv,
                ChannelType::Dimmer,
                ChannelType::Strobe,
            ],
        )
    }

    /// Get the number of channels this fixture uses
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Offset of the first channel of `channel_type`, 0 based
    pub fn offset_of(&self, channel_type: ChannelType) -> Option<usize> {
        self.channels
            .iter()
            .position(|c| c.channel_type == channel_type)
    }
}

/// A fixture instance patched at a starting DMX address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u32,
    pub name: String,
    pub profile: FixtureProfile,
    pub start_address: u16, // 1-512
}

impl Fixture {
    /// Create a new fixture instance
    pub fn new(id: u32, name: String, profile: FixtureProfile, start_address: u16) -> Self {
        Self {
            id,
            name,
            profile,
            start_address,
        }
    }

    /// Last channel the fixture occupies. Not bounded by the universe, so a
    /// fixture patched near `u16::MAX` reports an end past it.
    pub fn end_address(&self) -> usize {
        (self.start_address as usize + self.profile.channel_count()).saturating_sub(1)
    }

    /// Check that every channel of the fixture lands inside the universe
    pub fn validate(&self) -> Result<()> {
        if self.start_address == 0 || self.end_address() > UNIVERSE_SIZE {
            return Err(ControlError::OutOfRange {
                channel: self.start_address,
                len: self.profile.channel_count(),
            });
        }
        Ok(())
    }

    /// Set every channel of the given type
    pub fn set_channel_value(
        &self,
        universe: &mut Universe,
        channel_type: ChannelType,
        value: u8,
    ) -> Result<()> {
        for (i, channel) in self.profile.channels.iter().enumerate() {
            if channel.channel_type == channel_type {
                universe.update(self.start_address.saturating_add(i as u16), value)?;
            }
        }
        Ok(())
    }

    /// Set RGB values
    pub fn set_rgb(&self, universe: &mut Universe, r: u8, g: u8, b: u8) -> Result<()> {
        self.set_channel_value(universe, ChannelType::Red, r)?;
        self.set_channel_value(universe, ChannelType::Green, g)?;
        self.set_channel_value(universe, ChannelType::Blue, b)
    }

    pub fn set_uv(&self, universe: &mut Universe, value: u8) -> Result<()> {
        self.set_channel_value(universe, ChannelType::Uv, value)
    }

    /// Set dimmer value. At 0 no colour or UV is visible.
    pub fn set_dimmer(&self, universe: &mut Universe, value: u8) -> Result<()> {
        self.set_channel_value(universe, ChannelType::Dimmer, value)
    }

    /// Set strobe rate, 0 disables flashing
    pub fn set_strobe(&self, universe: &mut Universe, value: u8) -> Result<()> {
        self.set_channel_value(universe, ChannelType::Strobe, value)
    }

    /// Write every channel's default value
    pub fn apply_defaults(&self, universe: &mut Universe) -> Result<()> {
        self.validate()?;
        let defaults: Vec<u8> = self
            .profile
            .channels
            .iter()
            .map(|c| c.default_value)
            .collect();
        universe.update(self.start_address, defaults)?;
        Ok(())
    }
}
