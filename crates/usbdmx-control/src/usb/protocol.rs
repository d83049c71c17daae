//! Wire contract with the controller firmware
//!
//! The firmware exposes a CDC-style function on interface 2. The host toggles
//! DTR through SET_CONTROL_LINE_STATE to announce itself, and universes go out
//! as 512 byte bulk transfers on endpoint 4.

use super::transport::{ControlSetup, Recipient, RequestType};

/// Configuration selected when the OS has not picked one
pub const CONFIGURATION_VALUE: u8 = 1;

/// Interface carrying the DMX data endpoint
pub const DATA_INTERFACE: u8 = 2;

/// Bulk OUT endpoint receiving universe buffers
pub const DATA_ENDPOINT: u8 = 4;

/// CDC SET_CONTROL_LINE_STATE
pub const SET_CONTROL_LINE_STATE: u8 = 0x22;

/// Line state value: host present
pub const LINE_STATE_PRESENT: u16 = 0x01;

/// Line state value: host gone
pub const LINE_STATE_ABSENT: u16 = 0x00;

/// Control transfer telling the firmware whether the host is present
pub fn line_state(present: bool) -> ControlSetup {
    ControlSetup {
        request_type: RequestType::Class,
        recipient: Recipient::Interface,
        request: SET_CONTROL_LINE_STATE,
        value: if present {
            LINE_STATE_PRESENT
        } else {
            LINE_STATE_ABSENT
        },
        index: DATA_INTERFACE as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_state_setup() {
        let present = line_state(true);
        assert_eq!(present.request_type, RequestType::Class);
        assert_eq!(present.recipient, Recipient::Interface);
        assert_eq!(present.request, 0x22);
        assert_eq!(present.value, 0x01);
        assert_eq!(present.index, 0x02);

        let absent = line_state(false);
        assert_eq!(absent.value, 0x00);
        assert_eq!(absent.index, 0x02);
    }
}
