use std::time::Duration;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use libftd2xx::{BitMode, FtStatus, FtdiCommon};
use log::{error, trace};

const BITMODE: libftd2xx::BitMode = BitMode::SyncBitbang;

/// SCL/SDA assignment on the FTDI bitbang port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitbangPins {
    pub scl: u8,
    pub sda: u8,
}

impl BitbangPins {
    /// SCL on bit 6, SDA on bit 7 (CDBUS6/CDBUS7 on an FT4232H)
    pub const CDBUS6_7: Self = Self {
        scl: 1 << 6,
        sda: 1 << 7,
    };

    fn mask(&self) -> u8 {
        self.scl | self.sda
    }
}

impl Default for BitbangPins {
    fn default() -> Self {
        Self::CDBUS6_7
    }
}

/// Address byte following a START
fn address_byte(address: u8, read: bool) -> u8 {
    (address << 1) | read as u8
}

/// Open-drain I2C master bitbanged on an FTDI port
///
/// Lines are never driven high: a high level is produced by switching the
/// pin to input and letting the pull-up do the work.
pub struct I2cFtBitbang<FT: FtdiCommon> {
    device: FT,
    pins: BitbangPins,
    gpio_val: u8,
    gpio_dir: u8,
    /// Half of one SCL period
    half_period: Duration,
}

impl<FT: FtdiCommon> I2cFtBitbang<FT> {
    pub fn new(device: FT) -> Self {
        Self::with_pins(device, BitbangPins::default())
    }

    pub fn with_pins(device: FT, pins: BitbangPins) -> Self {
        Self {
            device,
            pins,
            gpio_val: pins.mask(), // Both high
            gpio_dir: 0,           // Both as input (high, open-drain)
            half_period: Duration::from_nanos(800),
        }
    }

    pub fn release(self) -> FT {
        self.device
    }

    fn gpio_write(&mut self, values: u8, direction: u8) -> Result<(), FtStatus> {
        self.device.set_bit_mode(direction, BITMODE)?;
        self.device.write(&[values])?;
        Ok(())
    }

    fn gpio_read(&mut self) -> Result<u8, FtStatus> {
        self.device.bit_mode()
    }

    /// Sleep for `quarters` quarter SCL periods
    fn delay(&self, quarters: u32) {
        std::thread::sleep(self.half_period * quarters / 2);
    }

    /* Release SDA (input, pulled high) */
    fn sda_high(&mut self) -> Result<(), FtStatus> {
        self.gpio_val |= self.pins.sda;
        self.gpio_dir &= !self.pins.sda;
        self.gpio_write(self.gpio_val, self.gpio_dir)
    }

    /* Drive SDA low */
    fn sda_low(&mut self) -> Result<(), FtStatus> {
        self.gpio_val &= !self.pins.sda;
        self.gpio_dir |= self.pins.sda;
        self.gpio_write(self.gpio_val, self.gpio_dir)
    }

    fn scl_high(&mut self) -> Result<(), FtStatus> {
        self.gpio_val |= self.pins.scl;
        self.gpio_dir &= !self.pins.scl;
        self.gpio_write(self.gpio_val, self.gpio_dir)
    }

    fn scl_low(&mut self) -> Result<(), FtStatus> {
        self.gpio_val &= !self.pins.scl;
        self.gpio_dir |= self.pins.scl;
        self.gpio_write(self.gpio_val, self.gpio_dir)
    }

    fn start(&mut self) -> Result<(), FtStatus> {
        // SDA falling while SCL is high
        self.sda_high()?;
        self.scl_high()?;
        self.delay(2);
        self.sda_low()?;
        self.delay(2);
        self.scl_low()?;
        self.delay(2);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), FtStatus> {
        // SDA rising while SCL is high
        self.sda_low()?;
        self.delay(2);
        self.scl_high()?;
        self.delay(2);
        self.sda_high()?;
        self.delay(2);
        Ok(())
    }

    /// Clock out one byte, returning whether the target acknowledged it
    fn tx_byte(&mut self, mut byte: u8) -> Result<bool, FtStatus> {
        for _ in 0..8 {
            if byte & 0x80 != 0 {
                self.sda_high()?;
            } else {
                self.sda_low()?;
            }
            byte <<= 1;
            self.delay(1);
            self.scl_high()?;
            self.delay(2);
            self.scl_low()?;
            self.delay(1);
        }

        // Release SDA for ACK
        self.sda_high()?;
        self.delay(1);
        self.scl_high()?;
        self.delay(2);
        let pins = self.gpio_read()?;
        self.scl_low()?;
        self.delay(1);

        Ok(pins & self.pins.sda == 0)
    }

    fn rx_byte(&mut self, send_nack: bool) -> Result<u8, FtStatus> {
        let mut data = 0u8;

        self.sda_high()?;
        for _ in 0..8 {
            data <<= 1;
            self.scl_high()?;
            self.delay(2);
            if self.gpio_read()? & self.pins.sda != 0 {
                data |= 1;
            }
            self.scl_low()?;
            self.delay(2);
        }

        if send_nack {
            self.sda_high()?;
        } else {
            self.sda_low()?;
        }
        self.delay(1);
        self.scl_high()?;
        self.delay(2);
        self.scl_low()?;
        self.delay(1);
        self.sda_high()?;

        Ok(data)
    }

    fn run(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        for op in operations {
            // repeated START between operations, single STOP at the end
            self.start().map_err(ft_error)?;
            match op {
                Operation::Read(rd) => {
                    if !self.tx_byte(address_byte(address, true)).map_err(ft_error)? {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                    }
                    let len = rd.len();
                    for (i, byte) in rd.iter_mut().enumerate() {
                        // last byte is NACKed to end the read
                        *byte = self.rx_byte(i + 1 == len).map_err(ft_error)?;
                    }
                    trace!("I2C {address:#04X} read {} bytes", len);
                }
                Operation::Write(wr) => {
                    if !self.tx_byte(address_byte(address, false)).map_err(ft_error)? {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                    }
                    for &b in wr.iter() {
                        if !self.tx_byte(b).map_err(ft_error)? {
                            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                        }
                    }
                    trace!("I2C {address:#04X} wrote {} bytes", wr.len());
                }
            }
        }
        Ok(())
    }
}

fn ft_error(status: FtStatus) -> ErrorKind {
    error!("FTDI Status: {status}");
    ErrorKind::Other
}

impl<FT: FtdiCommon> ErrorType for I2cFtBitbang<FT> {
    type Error = ErrorKind;
}

impl<FT: FtdiCommon> I2c for I2cFtBitbang<FT> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let result = self.run(address, operations);
        // always release the bus, even after a NACK
        let stopped = self.stop().map_err(ft_error);
        result.and(stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_byte() {
        assert_eq!(address_byte(0x1B, false), 0x36);
        assert_eq!(address_byte(0x1B, true), 0x37);
    }

    #[test]
    fn test_default_pins() {
        let pins = BitbangPins::default();
        assert_eq!(pins.mask(), 0xC0);
        assert_eq!(pins, BitbangPins::CDBUS6_7);
    }
}
