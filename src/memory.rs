/// DS28C36 page memory model
///
/// 32 pages of 32 bytes. Pages 0-13 are general purpose user memory,
/// 14-27 hold certificates, keys, secrets and the decrement counter, 28-31
/// are ROM options, GPIO control and the public key S pair.

use core::fmt;

use bitflags::bitflags;

use crate::error::Error;

pub const PAGE_COUNT: usize = 32;
pub const PAGE_SIZE: usize = 32;

/// Byte offset of the 8-byte ROM ID inside the ROM options page
pub const ROM_ID_OFFSET: usize = 24;
/// Byte offset of the 2-byte manufacturer ID inside the ROM options page
pub const MAN_ID_OFFSET: usize = 22;

/// Validate a page index coming from an untyped source (CLI, FFI...)
pub fn page_index(index: i64) -> Result<u8, Error> {
    if (0..PAGE_COUNT as i64).contains(&index) {
        Ok(index as u8)
    } else {
        Err(Error::InvalidPageIndex(index))
    }
}

/// Function assigned to a page by the device memory map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRole {
    Unused,
    EcdhCertR,
    EcdhCertS,
    PubKeyAX,
    PubKeyAY,
    PubKeyBX,
    PubKeyBY,
    PubKeyCX,
    PubKeyCY,
    PrivKeyA,
    PrivKeyB,
    PrivKeyC,
    SecretA,
    SecretB,
    DecrementCounter,
    RomOptions,
    GpioControl,
    PubKeySX,
    PubKeySY,
}

impl PageRole {
    pub fn of(page: u8) -> Option<Self> {
        let role = match page {
            0..=13 => Self::Unused,
            14 => Self::EcdhCertR,
            15 => Self::EcdhCertS,
            16 => Self::PubKeyAX,
            17 => Self::PubKeyAY,
            18 => Self::PubKeyBX,
            19 => Self::PubKeyBY,
            20 => Self::PubKeyCX,
            21 => Self::PubKeyCY,
            22 => Self::PrivKeyA,
            23 => Self::PrivKeyB,
            24 => Self::PrivKeyC,
            25 => Self::SecretA,
            26 => Self::SecretB,
            27 => Self::DecrementCounter,
            28 => Self::RomOptions,
            29 => Self::GpioControl,
            30 => Self::PubKeySX,
            31 => Self::PubKeySY,
            _ => return None,
        };
        Some(role)
    }

    /// Fixed page index of a special-purpose role; `None` for `Unused`
    pub fn page(self) -> Option<u8> {
        let page = match self {
            Self::Unused => return None,
            Self::EcdhCertR => 14,
            Self::EcdhCertS => 15,
            Self::PubKeyAX => 16,
            Self::PubKeyAY => 17,
            Self::PubKeyBX => 18,
            Self::PubKeyBY => 19,
            Self::PubKeyCX => 20,
            Self::PubKeyCY => 21,
            Self::PrivKeyA => 22,
            Self::PrivKeyB => 23,
            Self::PrivKeyC => 24,
            Self::SecretA => 25,
            Self::SecretB => 26,
            Self::DecrementCounter => 27,
            Self::RomOptions => 28,
            Self::GpioControl => 29,
            Self::PubKeySX => 30,
            Self::PubKeySY => 31,
        };
        Some(page)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unused => "not used",
            Self::EcdhCertR => "ECDH_CERT_R",
            Self::EcdhCertS => "ECDH_CERT_S",
            Self::PubKeyAX => "PUB_KEY_AX",
            Self::PubKeyAY => "PUB_KEY_AY",
            Self::PubKeyBX => "PUB_KEY_BX",
            Self::PubKeyBY => "PUB_KEY_BY",
            Self::PubKeyCX => "PUB_KEY_CX",
            Self::PubKeyCY => "PUB_KEY_CY",
            Self::PrivKeyA => "PRIV_KEY_A",
            Self::PrivKeyB => "PRIV_KEY_B",
            Self::PrivKeyC => "PRIV_KEY_C",
            Self::SecretA => "SECRET_A",
            Self::SecretB => "SECRET_B",
            Self::DecrementCounter => "DECREMENT_CNT",
            Self::RomOptions => "ROM_OPTIONS",
            Self::GpioControl => "GPIO_CONTROL",
            Self::PubKeySX => "PUB_KEY_SX",
            Self::PubKeySY => "PUB_KEY_SY",
        }
    }
}

impl fmt::Display for PageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// True for the certificate/key/secret/counter block (pages 14-27)
pub fn is_key_page(page: u8) -> bool {
    (14..=27).contains(&page)
}

bitflags! {
    /// Page protection byte
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ProtectionFlags: u8 {
        /// Read protection (key pages have RP set by default)
        const READ_PROTECT         = 0x01;
        /// Write protection
        const WRITE_PROTECT        = 0x02;
        /// EPROM emulation mode (not applicable to key pages)
        const EPROM_EMULATION      = 0x04;
        /// Authenticated write protection, HMAC (not applicable to key pages)
        const AUTH_WRITE_HMAC      = 0x08;
        /// Encrypted and authenticated write protection, HMAC (not applicable to key pages)
        const ENC_AUTH_WRITE_HMAC  = 0x10;
        /// Designated authority public key, only on the authority key page
        const DESIGNATED_AUTHORITY = 0x20;
        /// Encrypted read/write with the ECDH shared key
        const ECDH_ENCRYPTED       = 0x40;
        /// Authenticated write protection, ECDSA (not applicable to key pages)
        const AUTH_WRITE_ECDSA     = 0x80;
    }
}

impl ProtectionFlags {
    /// Flags the device ignores on key pages
    pub const NOT_FOR_KEY_PAGES: Self = Self::EPROM_EMULATION
        .union(Self::AUTH_WRITE_HMAC)
        .union(Self::ENC_AUTH_WRITE_HMAC)
        .union(Self::AUTH_WRITE_ECDSA);

    /// Decode a raw protection byte, keeping every bit
    pub fn from_byte(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }

    /// Flags that actually take effect on `page`
    ///
    /// Inapplicable bits on key pages are dropped rather than reported as
    /// an error.
    pub fn effective(self, page: u8) -> Self {
        if is_key_page(page) {
            self.difference(Self::NOT_FOR_KEY_PAGES)
        } else {
            self
        }
    }
}

/// Public key page pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySet {
    A,
    B,
    C,
    S,
}

impl KeySet {
    /// (X page, Y page)
    pub fn pages(self) -> (PageRole, PageRole) {
        match self {
            Self::A => (PageRole::PubKeyAX, PageRole::PubKeyAY),
            Self::B => (PageRole::PubKeyBX, PageRole::PubKeyBY),
            Self::C => (PageRole::PubKeyCX, PageRole::PubKeyCY),
            Self::S => (PageRole::PubKeySX, PageRole::PubKeySY),
        }
    }
}

/// Snapshot of one page as read from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: u8,
    pub role: PageRole,
    pub protection: ProtectionFlags,
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    pub fn is_readable(&self) -> bool {
        !self.protection.contains(ProtectionFlags::READ_PROTECT)
    }

    pub fn is_writable(&self) -> bool {
        !self.protection.contains(ProtectionFlags::WRITE_PROTECT)
    }
}
