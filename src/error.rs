use thiserror::Error as DeriveError;
use embedded_hal::i2c::ErrorKind;

use crate::protocol::commands::ResultCode;

#[cfg(feature = "ftdi")]
use libftd2xx::FtStatus;

#[derive(DeriveError, Debug)]
pub enum Error {
    #[error("Page index {0} out of range (expected 0..32)")]
    InvalidPageIndex(i64),

    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    Communication { expected: usize, actual: usize },

    #[error("I2C bus error: {0:?}")]
    Bus(ErrorKind),

    #[error("Device returned {0}")]
    Device(ResultCode),

    #[error("Unable to open bus device: {0}")]
    Open(String),

    #[cfg(feature = "ftdi")]
    #[error("FTDI Status: {0}")]
    FtStatus(#[from] FtStatus),

    #[error("Public key pages do not hold a valid P-256 point")]
    InvalidPublicKey,

    #[error("Malformed ECDSA signature")]
    InvalidSignature,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::Bus(kind)
    }
}
