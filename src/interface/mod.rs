/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

pub mod i2c;

pub use self::i2c::I2cInterface;

/// A method of communicating with the sensor
pub trait SensorInterface {
    /// Interface error type
    type InterfaceError;

    /// Open the channel to the device.
    /// Called once per driver lifetime, before any register access.
    /// Must only use transfers with a non-empty payload.
    fn setup(&mut self) -> Result<(), Self::InterfaceError>;

    /// Point the device's register address at `reg` without transferring data
    fn register_select(&mut self, reg: u8) -> Result<(), Self::InterfaceError>;

    /// Read consecutive bytes starting at the currently selected register
    fn read_block(&mut self, buffer: &mut [u8]) -> Result<(), Self::InterfaceError>;

    /// Write a single register
    fn register_write(&mut self, reg: u8, val: u8) -> Result<(), Self::InterfaceError>;

    /// Read a single register
    fn register_read(&mut self, reg: u8) -> Result<u8, Self::InterfaceError> {
        let mut block: [u8; 1] = [0; 1];
        self.register_select(reg)?;
        self.read_block(&mut block)?;
        Ok(block[0])
    }

    /// Read three consecutive registers starting at `reg`
    fn read_vec3_u8(&mut self, reg: u8) -> Result<[u8; 3], Self::InterfaceError> {
        let mut block: [u8; 3] = [0; 3];
        self.register_select(reg)?;
        self.read_block(&mut block)?;
        Ok(block)
    }
}
