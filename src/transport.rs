/// Transport abstraction - the byte pipe beneath the command framer
///
/// A transport is already bound to the device address. It moves raw bytes
/// in one direction per call and knows nothing about framing or retries.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};

use crate::error::Error;

/// Default 7-bit I2C address of the DS28C36
pub const DEFAULT_ADDRESS: u8 = 0x1B;

pub trait Transport {
    /// Write `bytes` in one bus transaction, returning the count accepted
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Error>;

    /// Read up to `buffer.len()` bytes in one bus transaction
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        (**self).write(bytes)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        (**self).read(buffer)
    }
}

/// Transport over any embedded-hal 1.0 I2C bus
pub struct I2cTransport<I2C> {
    bus: I2C,
    address: u8,
}

impl<I2C: I2c> I2cTransport<I2C> {
    pub fn new(bus: I2C, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give the bus back
    pub fn release(self) -> I2C {
        self.bus
    }
}

impl<I2C: I2c> Transport for I2cTransport<I2C> {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        self.bus
            .write(self.address, bytes)
            .map_err(|e| Error::Bus(e.kind()))?;
        Ok(bytes.len())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        self.bus
            .read(self.address, buffer)
            .map_err(|e| Error::Bus(e.kind()))?;
        Ok(buffer.len())
    }
}

/// Blocking delay backed by the OS scheduler
#[cfg(feature = "std")]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

#[cfg(feature = "std")]
impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Wait out a settle time on any `DelayNs` provider
///
/// Rounds up to whole microseconds and splits waits longer than one
/// `delay_us` call can express, so the delay is never shortened.
pub(crate) fn settle<D: DelayNs>(delay: &mut D, duration: Duration) {
    let mut remaining = duration.as_nanos().div_ceil(1_000);
    while remaining > 0 {
        let chunk = remaining.min(u32::MAX as u128) as u32;
        delay.delay_us(chunk);
        remaining -= chunk as u128;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

    /// Minimal I2C bus answering reads from a canned buffer
    struct CannedBus {
        writes: Vec<(u8, Vec<u8>)>,
        response: Vec<u8>,
        nack: bool,
    }

    impl ErrorType for CannedBus {
        type Error = ErrorKind;
    }

    impl I2c for CannedBus {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
            if self.nack {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for op in operations {
                match op {
                    Operation::Write(wr) => self.writes.push((address, wr.to_vec())),
                    Operation::Read(rd) => {
                        let n = rd.len().min(self.response.len());
                        rd[..n].copy_from_slice(&self.response[..n]);
                    }
                }
            }
            Ok(())
        }
    }

    /// Sums every requested delay
    #[derive(Default)]
    struct TotalDelay {
        ns: u128,
        calls: usize,
    }

    impl DelayNs for TotalDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.ns += ns as u128;
            self.calls += 1;
        }
    }

    #[test]
    fn test_settle_long_delay_not_truncated() {
        let mut delay = TotalDelay::default();
        let requested = Duration::from_micros((1u64 << 32) + 100);
        settle(&mut delay, requested);
        assert_eq!(delay.ns, requested.as_nanos());
    }

    #[test]
    fn test_settle_rounds_up_to_microseconds() {
        let mut delay = TotalDelay::default();
        settle(&mut delay, Duration::from_nanos(1_500));
        assert_eq!(delay.ns, 2_000);

        let mut delay = TotalDelay::default();
        settle(&mut delay, Duration::ZERO);
        assert_eq!(delay.calls, 0);
    }

    #[test]
    fn test_i2c_transport_addresses_device() {
        let bus = CannedBus { writes: vec![], response: vec![0x01, 0xAA], nack: false };
        let mut transport = I2cTransport::new(bus, DEFAULT_ADDRESS);

        assert_eq!(transport.write(&[0x69, 0x01, 0x00]).unwrap(), 3);
        let mut buf = [0u8; 2];
        assert_eq!(transport.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [0x01, 0xAA]);

        let bus = transport.release();
        assert_eq!(bus.writes, vec![(0x1B, vec![0x69, 0x01, 0x00])]);
    }

    #[test]
    fn test_i2c_transport_maps_bus_errors() {
        let bus = CannedBus { writes: vec![], response: vec![], nack: true };
        let mut transport = I2cTransport::new(bus, DEFAULT_ADDRESS);
        let err = transport.write(&[0x5A]).unwrap_err();
        assert!(matches!(
            err,
            Error::Bus(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
        ));
    }
}
