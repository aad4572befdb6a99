/// High-level DS28C36 DeepCover driver
///
/// Every operation is one blocking transaction: write a command frame, wait
/// the command's settle time, read the response. The driver owns its
/// transport and all operations take `&mut self`, so two transactions can
/// never interleave on the same handle. Share a driver between threads by
/// wrapping it in a `Mutex`, which then guards the whole write, delay, read
/// sequence.

use embedded_hal::delay::DelayNs;
use log::{debug, trace};

use crate::config::Config;
use crate::error::Error;
use crate::protocol::frame::{CommandFrame, ResponseFrame, RESPONSE_HEADER_LEN};
use crate::protocol::timing::SettleTimes;
use crate::transport::{settle, Transport};

pub mod auth;
pub mod buffer;
pub mod identity;
pub mod pages;

pub use auth::{AuthOutput, AuthenticationResult, PublicKey, Signature};
pub use identity::Identity;

/// DS28C36 driver - works with any transport
pub struct DeepCover<T: Transport, D: DelayNs> {
    transport: T,
    delay: D,
    timing: SettleTimes,
}

impl<T: Transport, D: DelayNs> DeepCover<T, D> {
    /// Create a driver with the device's default settle times
    pub fn new(transport: T, delay: D) -> Self {
        Self::with_timing(transport, delay, SettleTimes::default())
    }

    pub fn with_timing(transport: T, delay: D, timing: SettleTimes) -> Self {
        Self {
            transport,
            delay,
            timing,
        }
    }

    pub fn timing(&self) -> &SettleTimes {
        &self.timing
    }

    /// Tear the driver down and hand back the transport and delay
    pub fn release(self) -> (T, D) {
        (self.transport, self.delay)
    }

    /// Put a command frame on the bus
    ///
    /// A partially written frame is a communication failure; the whole
    /// transaction has to be re-issued by the caller.
    pub fn send_command(&mut self, frame: &CommandFrame) -> Result<(), Error> {
        let bytes = frame.encode();
        trace!("TX {:?}: {}", frame.command(), hex::encode_upper(&bytes));

        let written = self.transport.write(&bytes)?;
        if written != bytes.len() {
            return Err(Error::Communication {
                expected: bytes.len(),
                actual: written,
            });
        }
        Ok(())
    }

    /// Read `expected_len` payload bytes plus the length and result header
    ///
    /// The result byte is not interpreted here; which codes are acceptable
    /// depends on the command.
    pub fn receive_response(&mut self, expected_len: usize) -> Result<ResponseFrame, Error> {
        let raw = self.receive_raw(expected_len + RESPONSE_HEADER_LEN)?;
        let response = ResponseFrame::decode(&raw)?;
        debug!("RX result {} ({} payload bytes)", response.result, response.payload.len());
        Ok(response)
    }

    /// Read exactly `len` bytes from the transport
    pub(crate) fn receive_raw(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let mut raw = vec![0u8; len];
        let count = self.transport.read(&mut raw)?;
        if count < len {
            return Err(Error::Communication {
                expected: len,
                actual: count,
            });
        }
        trace!("RX: {}", hex::encode_upper(&raw));
        Ok(raw)
    }

    /// Send `frame`, wait its settle time and read the response
    pub(crate) fn transact(&mut self, frame: &CommandFrame, expected_len: usize) -> Result<ResponseFrame, Error> {
        self.send_command(frame)?;
        self.wait(frame);
        self.receive_response(expected_len)
    }

    fn wait(&mut self, frame: &CommandFrame) {
        let duration = self.timing.get(frame.command());
        if !duration.is_zero() {
            debug!("{:?}: settling for {} us", frame.command(), duration.as_micros());
        }
        settle(&mut self.delay, duration);
    }
}

#[cfg(feature = "linux")]
mod linux {
    use std::path::Path;

    use linux_embedded_hal::I2cdev;

    use super::DeepCover;
    use crate::config::Config;
    use crate::error::Error;
    use crate::transport::{I2cTransport, StdDelay};

    /// Driver bound to a Linux `/dev/i2c-N` character device
    pub type LinuxDeepCover = DeepCover<I2cTransport<I2cdev>, StdDelay>;

    impl LinuxDeepCover {
        /// Open the bus device and bind the driver to `config.address`
        ///
        /// The file descriptor is closed when the driver is dropped.
        pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self, Error> {
            let path = path.as_ref();
            let bus = I2cdev::new(path)
                .map_err(|e| Error::Open(format!("{}: {e}", path.display())))?;
            log::debug!("Opened {} for device {:#04X}", path.display(), config.address);
            Ok(DeepCover::from_config(
                I2cTransport::new(bus, config.address),
                StdDelay,
                config,
            ))
        }
    }
}

#[cfg(feature = "linux")]
pub use linux::LinuxDeepCover;

#[cfg(feature = "ftdi")]
mod ftdi {
    use libftd2xx::Ftdi;

    use super::DeepCover;
    use crate::config::Config;
    use crate::error::Error;
    use crate::i2c::i2c_bitbang::{BitbangPins, I2cFtBitbang};
    use crate::transport::{I2cTransport, StdDelay};

    /// Driver behind an FTDI port bitbanging the I2C lines
    pub type FtdiDeepCover = DeepCover<I2cTransport<I2cFtBitbang<Ftdi>>, StdDelay>;

    impl FtdiDeepCover {
        /// Open the FTDI interface whose USB description matches `description`
        pub fn open_ftdi(description: &str, pins: BitbangPins, config: &Config) -> Result<Self, Error> {
            let device = Ftdi::with_description(description)?;
            log::debug!("Opened FTDI '{description}' for device {:#04X}", config.address);
            Ok(DeepCover::from_config(
                I2cTransport::new(I2cFtBitbang::with_pins(device, pins), config.address),
                StdDelay,
                config,
            ))
        }
    }
}

#[cfg(feature = "ftdi")]
pub use ftdi::FtdiDeepCover;

impl<T: Transport, D: DelayNs> DeepCover<T, D> {
    /// Create a driver using the settle times from `config`
    ///
    /// The address in `config` is applied by whoever builds the transport.
    pub fn from_config(transport: T, delay: D, config: &Config) -> Self {
        Self::with_timing(transport, delay, config.timing.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use hex_literal::hex;

    use crate::mock::{BusEvent, EventLog, RecordingDelay, SimulatedDevice};
    use crate::protocol::commands::{Command, ResultCode};

    pub(crate) type TestDriver = DeepCover<SimulatedDevice, RecordingDelay>;

    pub(crate) fn driver() -> (TestDriver, EventLog) {
        let events: EventLog = Rc::new(RefCell::new(Vec::new()));
        let device = SimulatedDevice::new(events.clone());
        let delay = RecordingDelay::new(events.clone());
        (DeepCover::new(device, delay), events)
    }

    pub(crate) fn device(driver: &mut TestDriver) -> &mut SimulatedDevice {
        &mut driver.transport
    }

    #[test]
    fn test_transaction_sequence() {
        let (mut dc, events) = driver();
        let frame = CommandFrame::new(Command::ReadMemory, 3, &[]).unwrap();
        let response = dc.transact(&frame, 32).unwrap();

        assert_eq!(response.result, ResultCode::Success);
        assert_eq!(
            *events.borrow(),
            vec![
                BusEvent::Write(hex!("69 01 03").to_vec()),
                BusEvent::Delay(Duration::from_micros(1_500)),
                BusEvent::Read(34),
            ]
        );
    }

    #[test]
    fn test_short_read_is_fatal() {
        let (mut dc, _) = driver();
        device(&mut dc).short_read = Some(10);

        let frame = CommandFrame::new(Command::ReadMemory, 0, &[]).unwrap();
        let err = dc.transact(&frame, 32).unwrap_err();
        assert!(matches!(err, Error::Communication { expected: 34, actual: 10 }));
    }

    #[test]
    fn test_result_not_interpreted_by_framer() {
        let (mut dc, _) = driver();
        device(&mut dc).forced_result = Some(ResultCode::FailInvalidSequence);

        let frame = CommandFrame::new(Command::ReadMemory, 0, &[]).unwrap();
        let response = dc.transact(&frame, 32).unwrap();
        assert_eq!(response.result, ResultCode::FailInvalidSequence);
        assert!(response.payload.is_empty());
    }

    #[test]
    fn test_custom_timing_used() {
        let events: EventLog = Rc::new(RefCell::new(Vec::new()));
        let mut config = Config::default();
        config.timing.set(Command::ReadMemory, Duration::from_millis(3));
        let mut dc = DeepCover::from_config(
            SimulatedDevice::new(events.clone()),
            RecordingDelay::new(events.clone()),
            &config,
        );

        dc.read_page(0).unwrap();
        assert!(events.borrow().contains(&BusEvent::Delay(Duration::from_millis(3))));
    }

    #[test]
    fn test_long_timing_override_kept_whole() {
        let events: EventLog = Rc::new(RefCell::new(Vec::new()));
        let mut config = Config::default();
        let long = Duration::from_micros((1u64 << 32) + 100);
        config.timing.set(Command::WriteMemory, long);
        let mut dc = DeepCover::from_config(
            SimulatedDevice::new(events.clone()),
            RecordingDelay::new(events.clone()),
            &config,
        );

        dc.write_page(1, &[0x22; 32]).unwrap();
        let waited: Duration = events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                BusEvent::Delay(d) => Some(*d),
                _ => None,
            })
            .sum();
        assert_eq!(waited, long);
    }

    #[test]
    fn test_release_returns_transport() {
        let (mut dc, _) = driver();
        dc.write_page(4, &[0x11; 32]).unwrap();
        let (device, _delay) = dc.release();
        assert_eq!(device.pages[4], [0x11; 32]);
    }
}
