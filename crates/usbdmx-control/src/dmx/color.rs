//! Colour input for RGB fixtures

use crate::error::{ControlError, Result};

/// Parse `#rrggbb` (the leading `#` is optional) into red, green and blue
pub fn parse_hex_color(input: &str) -> Result<(u8, u8, u8)> {
    let digits = input.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);

    let mut rgb = [0u8; 3];
    hex::decode_to_slice(digits, &mut rgb).map_err(|e| {
        ControlError::InvalidParameter(format!("'{}' is not a #rrggbb colour: {}", input, e))
    })?;
    Ok((rgb[0], rgb[1], rgb[2]))
}
