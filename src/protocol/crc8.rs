//! Dallas/Maxim 1-Wire CRC8 (reflected polynomial 0x8C)
//!
//! A block carrying its own CRC byte as the last element validates when
//! the accumulator ends at zero.

use crc::{Crc, Digest, CRC_8_MAXIM_DOW};

static CRC_MAXIM: Crc<u8> = Crc::<u8>::new(&CRC_8_MAXIM_DOW);

/// Running CRC8 accumulator, reset to zero for every validation pass
#[derive(Clone)]
pub struct Crc8 {
    digest: Digest<'static, u8>,
}

impl Default for Crc8 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc8 {
    pub fn new() -> Self {
        Self {
            digest: CRC_MAXIM.digest(),
        }
    }

    /// Feed one byte and return the updated accumulator
    pub fn update(&mut self, byte: u8) -> u8 {
        self.update_slice(&[byte])
    }

    pub fn update_slice(&mut self, data: &[u8]) -> u8 {
        self.digest.update(data);
        self.value()
    }

    pub fn value(&self) -> u8 {
        self.digest.clone().finalize()
    }
}

/// CRC8 of `data` starting from a zeroed accumulator
pub fn checksum(data: &[u8]) -> u8 {
    CRC_MAXIM.checksum(data)
}

/// True when `data` (payload followed by its CRC byte) leaves a zero residue
pub fn validate(data: &[u8]) -> bool {
    checksum(data) == 0
}
