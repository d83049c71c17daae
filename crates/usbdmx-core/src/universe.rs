//! DMX512 universe model
//!
//! A universe is a fixed block of 512 channel values. Channels are addressed
//! 1..=512 on the wire and in every public API; the backing array is 0-based.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of channels in a DMX512 universe
pub const UNIVERSE_SIZE: usize = 512;

/// Errors produced while mutating a universe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UniverseError {
    /// The update would touch a channel outside 1..=512
    #[error("channel {channel} with {len} value(s) does not fit into the 512 channel universe")]
    OutOfRange {
        /// First channel of the update (1-based)
        channel: u16,
        /// Number of channels the update would write
        len: usize,
    },

    /// The value is neither a single channel value nor a sequence of values
    #[error("value is not a channel value (0-255) or a list of channel values: {0}")]
    InvalidValueType(String),

    /// Universe built from a sequence that is not 512 values long
    #[error("a universe holds exactly 512 channels, got {0}")]
    InvalidLength(usize),
}

/// Result type for universe operations
pub type Result<T> = std::result::Result<T, UniverseError>;

/// Value written by a universe update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelValue {
    /// Replace exactly one channel
    Single(u8),
    /// Overwrite consecutive channels starting at the addressed one
    Multi(Vec<u8>),
}

impl ChannelValue {
    /// Number of channels this value writes
    pub fn len(&self) -> usize {
        match self {
            ChannelValue::Single(_) => 1,
            ChannelValue::Multi(values) => values.len(),
        }
    }

    /// True for an empty `Multi` value
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn byte_from_json(value: &serde_json::Value) -> Option<u8> {
        value.as_u64().and_then(|v| u8::try_from(v).ok())
    }
}

impl From<u8> for ChannelValue {
    fn from(v: u8) -> Self {
        ChannelValue::Single(v)
    }
}

impl From<Vec<u8>> for ChannelValue {
    fn from(v: Vec<u8>) -> Self {
        ChannelValue::Multi(v)
    }
}

impl From<&[u8]> for ChannelValue {
    fn from(v: &[u8]) -> Self {
        ChannelValue::Multi(v.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for ChannelValue {
    fn from(v: [u8; N]) -> Self {
        ChannelValue::Multi(v.to_vec())
    }
}

impl TryFrom<&serde_json::Value> for ChannelValue {
    type Error = UniverseError;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        let invalid = || UniverseError::InvalidValueType(value.to_string());

        match value {
            serde_json::Value::Number(_) => Self::byte_from_json(value)
                .map(ChannelValue::Single)
                .ok_or_else(invalid),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Self::byte_from_json)
                .collect::<Option<Vec<u8>>>()
                .map(ChannelValue::Multi)
                .ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

/// The 512 channel values of one DMX universe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Universe {
    channels: [u8; UNIVERSE_SIZE],
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

impl Universe {
    /// Create a universe with every channel at 0
    pub fn new() -> Self {
        Self {
            channels: [0u8; UNIVERSE_SIZE],
        }
    }

    /// Create a universe from exactly 512 channel values
    pub fn from_slice(values: &[u8]) -> Result<Self> {
        let channels: [u8; UNIVERSE_SIZE] = values
            .try_into()
            .map_err(|_| UniverseError::InvalidLength(values.len()))?;
        Ok(Self { channels })
    }

    /// Write `value` starting at `channel` (1-based) and return the full snapshot.
    ///
    /// A `Multi` value overwrites `len` consecutive channels. Nothing is
    /// written when any part of the update falls outside 1..=512.
    pub fn update(
        &mut self,
        channel: u16,
        value: impl Into<ChannelValue>,
    ) -> Result<&[u8; UNIVERSE_SIZE]> {
        let value = value.into();
        let offset = Self::offset(channel, value.len())?;

        match value {
            ChannelValue::Single(v) => self.channels[offset] = v,
            ChannelValue::Multi(values) => {
                self.channels[offset..offset + values.len()].copy_from_slice(&values);
            }
        }

        tracing::trace!("Universe updated at channel {}", channel);
        Ok(&self.channels)
    }

    /// Same as [`Universe::update`] for loosely typed input (JSON numbers or arrays)
    pub fn update_dynamic(
        &mut self,
        channel: u16,
        value: &serde_json::Value,
    ) -> Result<&[u8; UNIVERSE_SIZE]> {
        let value = ChannelValue::try_from(value)?;
        self.update(channel, value)
    }

    /// Value of a single channel (1-based)
    pub fn get(&self, channel: u16) -> Option<u8> {
        Self::offset(channel, 1).ok().map(|i| self.channels[i])
    }

    /// Set every channel to 0
    pub fn clear(&mut self) {
        self.channels = [0u8; UNIVERSE_SIZE];
    }

    /// Current snapshot
    pub fn as_bytes(&self) -> &[u8; UNIVERSE_SIZE] {
        &self.channels
    }

    /// Owned copy of the current snapshot, ready for a bulk transfer
    pub fn to_vec(&self) -> Vec<u8> {
        self.channels.to_vec()
    }

    fn offset(channel: u16, len: usize) -> Result<usize> {
        let out_of_range = UniverseError::OutOfRange { channel, len };
        if channel == 0 {
            return Err(out_of_range);
        }
        let offset = channel as usize - 1;
        // An empty update still has to address a real channel.
        if offset + len.max(1) > UNIVERSE_SIZE {
            return Err(out_of_range);
        }
        Ok(offset)
    }
}

impl TryFrom<Vec<u8>> for Universe {
    type Error = UniverseError;

    fn try_from(values: Vec<u8>) -> Result<Self> {
        Self::from_slice(&values)
    }
}

impl From<Universe> for Vec<u8> {
    fn from(universe: Universe) -> Self {
        universe.to_vec()
    }
}

impl AsRef<[u8]> for Universe {
    fn as_ref(&self) -> &[u8] {
        &self.channels
    }
}
