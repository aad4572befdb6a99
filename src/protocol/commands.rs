/// Command, result and authority definitions for the DS28C36 I2C protocol

use core::fmt;

/// Device command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Read a 32-byte memory page
    ReadMemory = 0x69,
    /// Write a 32-byte memory page
    WriteMemory = 0x96,
    /// Read the scratch buffer
    ReadBuffer = 0x5A,
    /// Load the scratch buffer
    WriteBuffer = 0x87,
    /// Read the protection byte of a page
    ReadPageProtection = 0xAA,
    /// Set protection bits on a page
    SetPageProtection = 0xC3,
    /// Decrement the one-way counter in page 27
    DecrementCounter = 0xC9,
    /// Read bytes from the hardware RNG
    ReadRandom = 0xD2,
    /// Encrypted read of a memory page
    EncryptedReadMemory = 0x4B,
    /// Compute and read page authentication (HMAC or ECDSA)
    ComputeAndReadAuth = 0xA5,
    /// Authenticated SHA-256 memory write
    AuthSha2Write = 0x99,
    /// Compute and lock SHA-256 secret
    ComputeLockSha2Secret = 0x3C,
    /// Generate an ECC key pair
    GenerateEcdsaKey = 0xCB,
    /// Compute multiblock hash
    ComputeMultiblockHash = 0x33,
    /// Verify an ECDSA signature
    VerifyEcdsaSignature = 0x59,
    /// Authenticate ECDSA public key
    AuthEcdsaPublicKey = 0xA8,
    /// Authenticated ECDSA memory write
    AuthEcdsaWrite = 0x89,
}

impl From<Command> for u8 {
    fn from(command: Command) -> u8 {
        command as u8
    }
}

impl Command {
    /// Get the 8-bit command code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Create from raw command code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x69 => Some(Self::ReadMemory),
            0x96 => Some(Self::WriteMemory),
            0x5A => Some(Self::ReadBuffer),
            0x87 => Some(Self::WriteBuffer),
            0xAA => Some(Self::ReadPageProtection),
            0xC3 => Some(Self::SetPageProtection),
            0xC9 => Some(Self::DecrementCounter),
            0xD2 => Some(Self::ReadRandom),
            0x4B => Some(Self::EncryptedReadMemory),
            0xA5 => Some(Self::ComputeAndReadAuth),
            0x99 => Some(Self::AuthSha2Write),
            0x3C => Some(Self::ComputeLockSha2Secret),
            0xCB => Some(Self::GenerateEcdsaKey),
            0x33 => Some(Self::ComputeMultiblockHash),
            0x59 => Some(Self::VerifyEcdsaSignature),
            0xA8 => Some(Self::AuthEcdsaPublicKey),
            0x89 => Some(Self::AuthEcdsaWrite),
            _ => None,
        }
    }
}

/// Result byte returned by the device after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success,
    /// Page protection prevented the operation
    FailProtection,
    FailParameter,
    FailInvalidSequence,
    /// HMAC or signature verification failed
    FailVerify,
    FailEcdsa,
    FailCommunication,
    Unknown(u8),
}

impl ResultCode {
    pub const SUCCESS: u8 = 0xAA;
    pub const FAIL_PROTECTION: u8 = 0x55;
    pub const FAIL_PARAMETER: u8 = 0x77;
    pub const FAIL_INVALID_SEQUENCE: u8 = 0x33;
    pub const FAIL_VERIFY: u8 = 0x00;
    pub const FAIL_ECDSA: u8 = 0x22;
    pub const FAIL_COMMUNICATION: u8 = 0x11;

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            Self::SUCCESS => Self::Success,
            Self::FAIL_PROTECTION => Self::FailProtection,
            Self::FAIL_PARAMETER => Self::FailParameter,
            Self::FAIL_INVALID_SEQUENCE => Self::FailInvalidSequence,
            Self::FAIL_VERIFY => Self::FailVerify,
            Self::FAIL_ECDSA => Self::FailEcdsa,
            Self::FAIL_COMMUNICATION => Self::FailCommunication,
            other => Self::Unknown(other),
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            Self::Success => Self::SUCCESS,
            Self::FailProtection => Self::FAIL_PROTECTION,
            Self::FailParameter => Self::FAIL_PARAMETER,
            Self::FailInvalidSequence => Self::FAIL_INVALID_SEQUENCE,
            Self::FailVerify => Self::FAIL_VERIFY,
            Self::FailEcdsa => Self::FAIL_ECDSA,
            Self::FailCommunication => Self::FAIL_COMMUNICATION,
            Self::Unknown(byte) => byte,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<u8> for ResultCode {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(byte) => write!(f, "unknown result {byte:#04X}"),
            other => write!(f, "{other:?} ({:#04X})", other.byte()),
        }
    }
}

/// Authority type (AT) field of Compute and Read Page Authentication
///
/// Selects the secret or private key and whether the device answers with
/// an HMAC or an ECDSA signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AuthorityType {
    /// HMAC using SHA2 Secret A (000b)
    HmacSecretA = 0x00,
    /// HMAC using SHA2 Secret B (001b)
    HmacSecretB = 0x01,
    /// HMAC using SHA2 Secret S (010b)
    HmacSecretS = 0x02,
    /// ECDSA page signature using Private Key A (011b)
    EcdsaKeyA = 0x03,
    /// ECDSA page signature using Private Key B (100b)
    EcdsaKeyB = 0x04,
    /// ECDSA page signature using Private Key C (101b), invalid if AUTH protection is set
    EcdsaKeyC = 0x05,
}

impl AuthorityType {
    pub fn bits(self) -> u8 {
        self as u8
    }

    pub fn is_ecdsa(self) -> bool {
        matches!(self, Self::EcdsaKeyA | Self::EcdsaKeyB | Self::EcdsaKeyC)
    }

    /// Number of payload bytes the device produces for this authority
    pub fn output_len(self) -> usize {
        if self.is_ecdsa() { 64 } else { 32 }
    }

    /// Pack the authority type and page index into the command parameter byte
    pub fn parameter(self, page: u8) -> u8 {
        ((self.bits() & 0x07) << 5) | (page & 0x1F)
    }
}
