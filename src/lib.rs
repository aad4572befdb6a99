pub mod config;
pub mod deepcover;
pub mod error;
pub mod memory;
pub mod protocol;
pub mod transport;

#[cfg(feature = "ftdi")]
pub mod i2c;
#[cfg(feature = "verify")]
pub mod verify;

#[cfg(test)]
mod mock;

pub use embedded_hal::delay as eh_delay;
pub use embedded_hal::i2c as eh_i2c;

pub use config::Config;
pub use deepcover::{AuthOutput, AuthenticationResult, DeepCover, Identity, PublicKey, Signature};
pub use error::Error;
pub use memory::{KeySet, Page, PageRole, ProtectionFlags};
pub use protocol::commands::{AuthorityType, Command, ResultCode};
pub use protocol::timing::SettleTimes;
pub use transport::{I2cTransport, Transport, DEFAULT_ADDRESS};

#[cfg(feature = "std")]
pub use transport::StdDelay;

#[cfg(feature = "linux")]
pub use deepcover::LinuxDeepCover;
#[cfg(feature = "ftdi")]
pub use deepcover::FtdiDeepCover;

#[cfg(feature = "ftdi")]
pub use i2c::i2c_bitbang::{BitbangPins, I2cFtBitbang};
#[cfg(feature = "ftdi")]
pub use libftd2xx::{Ft232h, Ft4232h, FtdiCommon};
