use std::fmt;

use num_enum::{FromPrimitive, IntoPrimitive};

/// Status code carried by a `RESP` packet.
///
/// Bytes outside the defined range decode to [`Response::Unknown`]; the raw
/// value is never passed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Response {
    /// Command was successful.
    Ok = 0,
    /// Command was not known.
    UnknownCommand = 1,
    /// Invalid command parameters.
    InvalidParameter = 2,
    /// Bad version information when setting the radar parameter structure.
    InvalidRpstVersion = 3,
    /// Framing, sync or parity error on the UART.
    UartError = 4,
    /// Sensor is already fetching frame data.
    SensorBusy = 5,
    /// Response code not known.
    #[num_enum(default)]
    Unknown = 0xFF,
}

impl Response {
    /// First code value with no defined meaning.
    pub const MAX_DEFINED: u8 = 6;

    pub fn from_byte(code: u8) -> Self {
        Self::from_primitive(code)
    }

    pub fn is_ok(self) -> bool {
        self == Response::Ok
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Response::Ok => "OK",
            Response::UnknownCommand => "unknown command",
            Response::InvalidParameter => "invalid parameter",
            Response::InvalidRpstVersion => "invalid RPST version",
            Response::UartError => "UART error",
            Response::SensorBusy => "sensor busy",
            Response::Unknown => "unknown response",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defined_codes_map_to_names() {
        let expected = [
            Response::Ok,
            Response::UnknownCommand,
            Response::InvalidParameter,
            Response::InvalidRpstVersion,
            Response::UartError,
            Response::SensorBusy,
        ];
        for (code, response) in expected.into_iter().enumerate() {
            assert_eq!(Response::from_byte(code as u8), response);
        }
    }

    #[test]
    fn out_of_range_codes_collapse_to_unknown() {
        for code in Response::MAX_DEFINED..=u8::MAX {
            assert_eq!(Response::from_byte(code), Response::Unknown, "code {code}");
        }
    }

    #[test]
    fn only_ok_is_ok() {
        assert!(Response::Ok.is_ok());
        assert!(!Response::SensorBusy.is_ok());
        assert_eq!(u8::from(Response::InvalidParameter), 2);
        assert_eq!(Response::UartError.to_string(), "UART error");
    }
}
