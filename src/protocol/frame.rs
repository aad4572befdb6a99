/// Outbound command frames and inbound response frames
///
/// Outbound: `[command, length, parameter, payload...]` where `length` is the
/// SMBus byte count (parameter byte + payload). Write Buffer carries no
/// parameter byte, Read Buffer is the bare command byte.
///
/// Inbound: `[length, result, payload...]` where `length` counts the result
/// byte plus the payload the device actually produced.

use super::commands::{Command, ResultCode};
use crate::error::Error;

/// Largest payload a single frame carries (a full scratch buffer load)
pub const MAX_PAYLOAD: usize = 80;

/// Length byte + result byte preceding every response payload
pub const RESPONSE_HEADER_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    command: Command,
    parameter: Option<u8>,
    payload: Vec<u8>,
}

impl CommandFrame {
    /// Frame with a parameter byte and optional payload
    pub fn new(command: Command, parameter: u8, payload: &[u8]) -> Result<Self, Error> {
        Self::build(command, Some(parameter), payload)
    }

    /// Frame whose SMBus length doubles as the parameter (Write Buffer)
    pub fn without_parameter(command: Command, payload: &[u8]) -> Result<Self, Error> {
        Self::build(command, None, payload)
    }

    fn build(command: Command, parameter: Option<u8>, payload: &[u8]) -> Result<Self, Error> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::InvalidLength {
                expected: MAX_PAYLOAD,
                actual: payload.len(),
            });
        }
        Ok(Self {
            command,
            parameter,
            payload: payload.to_vec(),
        })
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn parameter(&self) -> Option<u8> {
        self.parameter
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// SMBus length byte: everything after the length byte itself
    pub fn length(&self) -> u8 {
        (self.parameter.is_some() as usize + self.payload.len()) as u8
    }

    /// Serialize to the bytes put on the bus
    pub fn encode(&self) -> Vec<u8> {
        if self.command == Command::ReadBuffer {
            return vec![self.command.code()];
        }

        let mut frame = Vec::with_capacity(3 + self.payload.len());
        frame.push(self.command.code());
        frame.push(self.length());
        if let Some(parameter) = self.parameter {
            frame.push(parameter);
        }
        frame.extend_from_slice(&self.payload);
        frame
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub length: u8,
    pub result: ResultCode,
    pub payload: Vec<u8>,
}

impl ResponseFrame {
    /// Decode raw response bytes
    ///
    /// The payload is trimmed to what the length byte announces, so a
    /// response read with a larger buffer than the device filled (e.g. an
    /// HMAC read into a signature-sized buffer) carries no trailing junk.
    pub fn decode(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() < RESPONSE_HEADER_LEN {
            return Err(Error::Communication {
                expected: RESPONSE_HEADER_LEN,
                actual: raw.len(),
            });
        }

        let length = raw[0];
        let result = ResultCode::from_byte(raw[1]);
        let available = raw.len() - RESPONSE_HEADER_LEN;
        let announced = (length as usize).saturating_sub(1);
        let payload = raw[RESPONSE_HEADER_LEN..RESPONSE_HEADER_LEN + announced.min(available)].to_vec();

        Ok(Self {
            length,
            result,
            payload,
        })
    }

    /// Payload of a successful response, or the failing result as an error
    pub fn into_payload(self) -> Result<Vec<u8>, Error> {
        if self.result.is_success() {
            Ok(self.payload)
        } else {
            Err(Error::Device(self.result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_read_memory_frame() {
        let frame = CommandFrame::new(Command::ReadMemory, 28, &[]).unwrap();
        assert_eq!(frame.length(), 1);
        assert_eq!(frame.encode(), hex!("69 01 1C"));
    }

    #[test]
    fn test_write_memory_frame_length() {
        let data = [0xA5u8; 32];
        let frame = CommandFrame::new(Command::WriteMemory, 3, &data).unwrap();
        assert_eq!(frame.length(), 33);

        let encoded = frame.encode();
        assert_eq!(encoded.len(), 35);
        assert_eq!(&encoded[..3], &hex!("96 21 03"));
        assert_eq!(&encoded[3..], &data);
    }

    #[test]
    fn test_write_buffer_frame_has_no_parameter() {
        let frame = CommandFrame::without_parameter(Command::WriteBuffer, &hex!("01 02 03")).unwrap();
        assert_eq!(frame.parameter(), None);
        assert_eq!(frame.encode(), hex!("87 03 01 02 03"));
    }

    #[test]
    fn test_read_buffer_frame_is_bare_command() {
        let frame = CommandFrame::without_parameter(Command::ReadBuffer, &[]).unwrap();
        assert_eq!(frame.encode(), hex!("5A"));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let data = [0u8; MAX_PAYLOAD + 1];
        let err = CommandFrame::without_parameter(Command::WriteBuffer, &data).unwrap_err();
        assert!(matches!(err, Error::InvalidLength { expected: 80, actual: 81 }));
    }

    #[test]
    fn test_decode_response() {
        let frame = ResponseFrame::decode(&hex!("03 AA 10 20")).unwrap();
        assert_eq!(frame.length, 3);
        assert_eq!(frame.result, ResultCode::Success);
        assert_eq!(frame.payload, hex!("10 20"));
    }

    #[test]
    fn test_decode_trims_to_announced_length() {
        // failure responses only carry the result byte
        let frame = ResponseFrame::decode(&hex!("01 55 FF FF FF")).unwrap();
        assert_eq!(frame.result, ResultCode::FailProtection);
        assert!(frame.payload.is_empty());
        assert!(matches!(
            frame.into_payload(),
            Err(Error::Device(ResultCode::FailProtection))
        ));
    }

    #[test]
    fn test_decode_unknown_result() {
        let frame = ResponseFrame::decode(&hex!("01 42")).unwrap();
        assert_eq!(frame.result, ResultCode::Unknown(0x42));
    }

    #[test]
    fn test_decode_short_response() {
        assert!(matches!(
            ResponseFrame::decode(&hex!("01")),
            Err(Error::Communication { expected: 2, actual: 1 })
        ));
    }
}
