/// Driver configuration
use crate::protocol::timing::SettleTimes;
use crate::transport::DEFAULT_ADDRESS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// 7-bit I2C address of the device
    pub address: u8,
    /// Per-command settle times
    pub timing: SettleTimes,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            timing: SettleTimes::default(),
        }
    }
}

impl Config {
    pub fn with_address(address: u8) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }
}
