/// Unique device identity (ROM ID) from the ROM options page

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::DeepCover;
use crate::error::Error;
use crate::memory::{PageRole, MAN_ID_OFFSET, ROM_ID_OFFSET};
use crate::protocol::crc8;
use crate::transport::Transport;

/// Expected DS28C36 family code (bit 7 is a device attribute, not family)
pub const FAMILY_CODE: u8 = 0x4C;
const FAMILY_MASK: u8 = 0x7F;

const ROM_OPTIONS_PAGE: u8 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// Raw 8-byte ROM ID, returned even when validation fails
    pub rom_id: [u8; 8],
    /// Manufacturer ID
    pub man_id: [u8; 2],
    /// CRC8 over the ROM ID leaves a zero residue
    pub crc_valid: bool,
    /// Family code matches the DS28C36
    pub family_valid: bool,
}

impl Identity {
    pub fn from_rom_options(page: &[u8; 32]) -> Self {
        let mut rom_id = [0u8; 8];
        rom_id.copy_from_slice(&page[ROM_ID_OFFSET..ROM_ID_OFFSET + 8]);
        let mut man_id = [0u8; 2];
        man_id.copy_from_slice(&page[MAN_ID_OFFSET..MAN_ID_OFFSET + 2]);

        Self {
            rom_id,
            man_id,
            crc_valid: crc8::validate(&rom_id),
            family_valid: rom_id[0] & FAMILY_MASK == FAMILY_CODE,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.crc_valid && self.family_valid
    }

    pub fn family_code(&self) -> u8 {
        self.rom_id[0] & FAMILY_MASK
    }
}

impl<T: Transport, D: DelayNs> DeepCover<T, D> {
    /// Read and check the device ROM ID
    ///
    /// CRC or family code mismatches are logged and flagged in the returned
    /// `Identity`, never raised: the raw bytes are still useful for
    /// diagnostics and the caller decides whether to trust them.
    pub fn get_identity(&mut self, verbose: bool) -> Result<Identity, Error> {
        debug_assert_eq!(PageRole::of(ROM_OPTIONS_PAGE), Some(PageRole::RomOptions));
        let page = self.read_page(ROM_OPTIONS_PAGE)?;
        let identity = Identity::from_rom_options(&page);

        if !identity.crc_valid {
            warn!("CRC-8 of ROM ID {} failed", hex::encode_upper(identity.rom_id));
        } else if !identity.family_valid {
            warn!(
                "ROM ID {} has family code {:#04X}, expected {:#04X}",
                hex::encode_upper(identity.rom_id),
                identity.family_code(),
                FAMILY_CODE
            );
        } else if verbose {
            info!("ROM ID {} is valid", hex::encode_upper(identity.rom_id));
        }

        Ok(identity)
    }
}
