//! Error types for the controller
use std::fmt;
use thiserror::Error;
use usbdmx_core::UniverseError;

use crate::usb::TransportError;

/// Stage of a session operation, attached to transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Presenting the device chooser
    Select,
    /// Looking up already paired devices
    PairedLookup,
    Open,
    SelectConfiguration,
    ClaimInterface,
    /// SET_CONTROL_LINE_STATE(present)
    Handshake,
    /// Bulk transfer of a universe
    Transfer,
    /// SET_CONTROL_LINE_STATE(absent)
    Release,
    Close,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Select => "device selection",
            Stage::PairedLookup => "paired device lookup",
            Stage::Open => "open",
            Stage::SelectConfiguration => "select configuration",
            Stage::ClaimInterface => "claim interface",
            Stage::Handshake => "host-present handshake",
            Stage::Transfer => "bulk transfer",
            Stage::Release => "host-absent handshake",
            Stage::Close => "close",
        };
        f.write_str(name)
    }
}

/// Controller errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// The user declined or cancelled device selection
    #[error("No USB device was selected")]
    NoDeviceSelected,

    /// Auto-connect found no previously paired device
    #[error("No paired USB device is connected to the computer")]
    NoPairedDevice,

    /// The operation needs a bound (or ready) session
    #[error("USB device is not connected")]
    NotConnected,

    /// A device is already connected; disconnect first
    #[error("USB device is already connected")]
    AlreadyConnected,

    /// A previous connect failed part way; the session must be discarded
    #[error("Session is faulted and must be recreated")]
    Faulted,

    /// The DMX interface is claimed by another session
    #[error("Interface {interface} is claimed by another session")]
    InterfaceUnavailable { interface: u8 },

    /// Lower level USB failure
    #[error("USB {stage} failed: {source}")]
    TransportFailure {
        stage: Stage,
        #[source]
        source: TransportError,
    },

    /// Channel update past channel 512
    #[error("Channel {channel} with {len} value(s) exceeds the 512 channel universe")]
    OutOfRange { channel: u16, len: usize },

    /// Value is neither a channel value nor a list of channel values
    #[error("Could not update universe, value is not a channel value or a list of them: {0}")]
    InvalidValueType(String),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ControlError {
    /// Wrap a transport error with the stage it happened in
    pub fn transport(stage: Stage, source: TransportError) -> Self {
        Self::TransportFailure { stage, source }
    }

    /// Stage of a transport failure
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::TransportFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<UniverseError> for ControlError {
    fn from(e: UniverseError) -> Self {
        match e {
            UniverseError::OutOfRange { channel, len } => Self::OutOfRange { channel, len },
            UniverseError::InvalidValueType(v) => Self::InvalidValueType(v),
            other => Self::InvalidParameter(other.to_string()),
        }
    }
}

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ControlError>;
