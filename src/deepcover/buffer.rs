/// Scratch buffer and RNG access
///
/// The scratch buffer is not page addressed and has no protection; it
/// stages challenges and messages for the buffer-based commands.

use embedded_hal::delay::DelayNs;
use log::debug;

use super::DeepCover;
use crate::error::Error;
use crate::protocol::commands::Command;
use crate::protocol::frame::CommandFrame;
use crate::transport::Transport;

/// Hardware size of the scratch buffer
pub const BUFFER_SIZE: usize = 80;

/// Largest single RNG read
pub const MAX_RANDOM_LEN: usize = 64;

impl<T: Transport, D: DelayNs> DeepCover<T, D> {
    /// Load the scratch buffer, returning the number of data bytes written
    pub fn write_buffer(&mut self, data: &[u8]) -> Result<usize, Error> {
        if data.len() > BUFFER_SIZE {
            return Err(Error::InvalidLength {
                expected: BUFFER_SIZE,
                actual: data.len(),
            });
        }
        let frame = CommandFrame::without_parameter(Command::WriteBuffer, data)?;
        self.send_command(&frame)?;
        Ok(data.len())
    }

    /// Read back the scratch buffer
    ///
    /// `max_len` of 0 or above the buffer size reads the whole buffer. The
    /// response is `[length, data...]` with no result byte.
    pub fn read_buffer(&mut self, max_len: usize) -> Result<Vec<u8>, Error> {
        let len = if max_len == 0 || max_len > BUFFER_SIZE {
            BUFFER_SIZE
        } else {
            max_len
        };

        let frame = CommandFrame::without_parameter(Command::ReadBuffer, &[])?;
        self.send_command(&frame)?;
        let raw = self.receive_raw(len + 1)?;

        let available = (raw[0] as usize).min(len);
        debug!("Read buffer: {available} of {len} bytes valid");
        Ok(raw[1..1 + available].to_vec())
    }

    /// Read `len` bytes (1..=64) from the hardware RNG
    pub fn read_random(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        if len == 0 || len > MAX_RANDOM_LEN {
            return Err(Error::InvalidLength {
                expected: MAX_RANDOM_LEN,
                actual: len,
            });
        }
        let frame = CommandFrame::new(Command::ReadRandom, (len - 1) as u8, &[])?;
        let payload = self.transact(&frame, len)?.into_payload()?;
        if payload.len() < len {
            return Err(Error::Communication {
                expected: len,
                actual: payload.len(),
            });
        }
        Ok(payload)
    }
}
