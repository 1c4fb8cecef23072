/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

use embedded_hal as hal;

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

use super::SensorInterface;
use crate::Error;

/// Register access over a two-wire bus.
/// Every transfer is addressed to the device's fixed bus address.
pub struct I2cInterface<I2C> {
    /// i2c port
    i2c_port: I2C,
    /// address for i2c communications
    address: u8,
}

impl<I2C, CommE> I2cInterface<I2C>
where
    I2C: hal::i2c::I2c<Error = CommE>,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c_port: i2c,
            address,
        }
    }

    /// The bus address this interface talks to
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release owned resources
    pub fn release(self) -> I2C {
        self.i2c_port
    }
}

impl<I2C, CommE> SensorInterface for I2cInterface<I2C>
where
    I2C: hal::i2c::I2c<Error = CommE>,
{
    type InterfaceError = Error<CommE>;

    fn setup(&mut self) -> Result<(), Self::InterfaceError> {
        // one byte read from the current register pointer; zero length
        // transfers are not accepted by every hal
        let mut first: [u8; 1] = [0; 1];
        self.i2c_port
            .read(self.address, &mut first)
            .map_err(Error::BusOpen)?;

        #[cfg(feature = "rttdebug")]
        rprintln!("i2c open 0x{:x}", self.address);

        Ok(())
    }

    fn register_select(&mut self, reg: u8) -> Result<(), Self::InterfaceError> {
        self.i2c_port
            .write(self.address, &[reg])
            .map_err(Error::Comm)
    }

    fn read_block(&mut self, buffer: &mut [u8]) -> Result<(), Self::InterfaceError> {
        self.i2c_port
            .read(self.address, buffer)
            .map_err(Error::Comm)?;

        #[cfg(feature = "rttdebug")]
        rprintln!("read {:x?}", buffer);

        Ok(())
    }

    fn register_write(&mut self, reg: u8, val: u8) -> Result<(), Self::InterfaceError> {
        #[cfg(feature = "rttdebug")]
        rprintln!("write reg 0x{:x} 0x{:x}", reg, val);

        let block: [u8; 2] = [reg, val];
        self.i2c_port
            .write(self.address, &block)
            .map_err(Error::Comm)
    }
}
