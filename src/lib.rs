/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Polled sensor registry, with a driver for the MMA7660 three axis
//! accelerometer.
//!
//! Drivers implement [`Sensor`] and are registered with a [`Registry`].
//! A [`Poller`] then calls [`Registry::scan_all`] once per tick, leaving
//! each sensor's latest reading available to the application.

#![cfg_attr(not(test), no_std)]

use core::fmt::{self, Write};

use embedded_hal as hal;

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

pub mod calibration;
mod interface;
pub mod poller;
pub mod registry;
pub mod sensor;

pub use calibration::{AccelLookup, CalibrationTable};
pub use interface::{I2cInterface, SensorInterface};
pub use poller::{Poller, POLL_INTERVAL_MS};
pub use registry::{Descriptor, Registry, RegistryError, ScanSummary, SensorId, SensorState};
pub use sensor::{Capabilities, Sensor, SensorError, SensorValue};

/// Errors in this crate
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<CommE> {
    /// Device did not answer when opening the bus
    BusOpen(CommE),
    /// Sensor communication error
    Comm(CommE),
    /// Reading does not fit the destination buffer
    BufferTooSmall,
    /// Initialization previously failed
    SensorDisabled,
}

impl<CommE> Error<CommE> {
    /// The bus-independent kind of this error
    pub fn kind(&self) -> SensorError {
        match self {
            Error::BusOpen(_) => SensorError::BusOpenFailure,
            Error::Comm(_) => SensorError::BusIoFailure,
            Error::BufferTooSmall => SensorError::BufferTooSmall,
            Error::SensorDisabled => SensorError::SensorDisabled,
        }
    }
}

impl<CommE: fmt::Debug> fmt::Display for Error<CommE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BusOpen(e) => write!(f, "bus open failed: {:?}", e),
            Error::Comm(e) => write!(f, "bus transfer failed: {:?}", e),
            Error::BufferTooSmall => f.write_str("buffer too small"),
            Error::SensorDisabled => f.write_str("sensor disabled"),
        }
    }
}

impl<CommE: fmt::Debug> core::error::Error for Error<CommE> {}

pub struct Builder {}

impl Builder {
    /// Create a new driver using I2C interface at the default address
    pub fn new_i2c<I2C, CommE>(i2c: I2C) -> Mma7660<I2cInterface<I2C>>
    where
        I2C: hal::i2c::I2c<Error = CommE>,
    {
        Self::new_i2c_with_config(i2c, Mma7660Config::default())
    }

    /// Create a new driver using I2C interface with explicit settings
    pub fn new_i2c_with_config<I2C, CommE>(
        i2c: I2C,
        config: Mma7660Config,
    ) -> Mma7660<I2cInterface<I2C>>
    where
        I2C: hal::i2c::I2c<Error = CommE>,
    {
        let iface = interface::I2cInterface::new(i2c, config.address);
        Mma7660::new_with_interface(iface, config)
    }
}

/// Driver settings
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mma7660Config {
    /// Bus address of the device
    pub address: u8,
    /// Sample rate programmed during init
    pub sample_rate: SampleRate,
}

impl Default for Mma7660Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            sample_rate: SampleRate::default(),
        }
    }
}

/// Lifecycle of the driver.
/// `Disabled` is terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    Uninitialized,
    Active,
    Disabled,
}

pub struct Mma7660<SI> {
    pub(crate) si: SI,
    pub(crate) config: Mma7660Config,
    pub(crate) state: DriverState,
    pub(crate) table: CalibrationTable,
}

impl<SI, CommE> Mma7660<SI>
where
    SI: SensorInterface<InterfaceError = Error<CommE>>,
{
    /// Key under which this sensor's readings are published
    pub const PROPERTY: &'static str = "MMA7660-Accelerometer-XYZ";

    pub(crate) fn new_with_interface(sensor_interface: SI, config: Mma7660Config) -> Self {
        Self {
            si: sensor_interface,
            config,
            state: DriverState::Uninitialized,
            table: CalibrationTable::new(),
        }
    }

    /// Replace the calibration table, e.g. with [`CalibrationTable::accumulated`]
    pub fn with_table(mut self, table: CalibrationTable) -> Self {
        self.table = table;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    /// Open the bus and bring the device into active sampling.
    /// Any failure leaves the driver disabled.
    pub fn setup(&mut self) -> Result<(), SI::InterfaceError> {
        if self.state == DriverState::Disabled {
            return Err(Error::SensorDisabled);
        }

        match self.configure() {
            Ok(()) => {
                self.state = DriverState::Active;
                Ok(())
            }
            Err(e) => {
                #[cfg(feature = "rttdebug")]
                rprintln!("mma7660 init failed");
                self.state = DriverState::Disabled;
                Err(e)
            }
        }
    }

    fn configure(&mut self) -> Result<(), SI::InterfaceError> {
        self.si.setup()?;
        // SR may only be written in standby
        self.set_mode(Mode::Standby)?;
        self.set_sample_rate(self.config.sample_rate)?;
        self.set_mode(Mode::Active)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SI::InterfaceError> {
        self.si.register_write(REG_MODE, mode as u8)
    }

    pub fn set_sample_rate(&mut self, rate: SampleRate) -> Result<(), SI::InterfaceError> {
        self.config.sample_rate = rate;
        self.si.register_write(REG_SR, rate as u8)
    }

    /// Read a single register
    pub fn register_read(&mut self, reg: u8) -> Result<u8, SI::InterfaceError> {
        self.check_enabled()?;
        self.si.register_read(reg)
    }

    /// Read the three axes as signed counts in [-32, 31]
    pub fn get_xyz(&mut self) -> Result<[i8; 3], SI::InterfaceError> {
        self.check_enabled()?;
        let raw = self.si.read_vec3_u8(REG_XOUT)?;
        Ok([
            axis_count(raw[0]),
            axis_count(raw[1]),
            axis_count(raw[2]),
        ])
    }

    /// Read the three axes, in g
    pub fn get_acceleration(&mut self) -> Result<[f32; 3], SI::InterfaceError> {
        let xyz = self.get_xyz()?;
        Ok([
            self.table.lookup(xyz[0]).g,
            self.table.lookup(xyz[1]).g,
            self.table.lookup(xyz[2]).g,
        ])
    }

    /// Sample the axes and render them as `"x,y,z"` into `value`.
    /// `value` is untouched on error.
    pub fn read_into(&mut self, value: &mut SensorValue) -> Result<(), SI::InterfaceError> {
        let [x, y, z] = self.get_xyz()?;

        let mut rendered = SensorValue::new();
        write!(rendered, "{},{},{}", x, y, z).map_err(|_| Error::BufferTooSmall)?;

        #[cfg(feature = "rttdebug")]
        rprintln!("Accelerometer:X={},Y={},Z={}", x, y, z);

        *value = rendered;
        Ok(())
    }

    /// Register this driver under [`Self::PROPERTY`]
    pub fn register<'a, const N: usize>(
        &'a mut self,
        registry: &mut Registry<'a, N>,
    ) -> Result<SensorId, RegistryError>
    where
        SI: 'a,
    {
        registry.register(self)
    }

    /// Release owned resources
    pub fn release(self) -> SI {
        self.si
    }

    fn check_enabled(&self) -> Result<(), SI::InterfaceError> {
        if self.state == DriverState::Disabled {
            Err(Error::SensorDisabled)
        } else {
            Ok(())
        }
    }
}

impl<SI, CommE> Sensor for Mma7660<SI>
where
    SI: SensorInterface<InterfaceError = Error<CommE>>,
{
    fn property(&self) -> &'static str {
        Self::PROPERTY
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::INIT | Capabilities::READ
    }

    fn init(&mut self) -> Result<(), SensorError> {
        self.setup().map_err(|e| e.kind())
    }

    fn read(&mut self, current: &mut SensorValue) -> Result<(), SensorError> {
        self.read_into(current).map_err(|e| e.kind())
    }
}

/// Convert one axis byte to a signed count.
/// The count sits in the top six bits as a 6-bit two's-complement number.
pub fn axis_count(raw: u8) -> i8 {
    (raw as i8) >> 2
}

/// Default bus address
pub const DEFAULT_ADDRESS: u8 = 0x4C;

/// Registers
///
const REG_XOUT: u8 = 0x00;
// const REG_YOUT: u8 = 0x01;
// const REG_ZOUT: u8 = 0x02;
// const REG_TILT: u8 = 0x03;
const REG_MODE: u8 = 0x07;
const REG_SR: u8 = 0x08;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Operating mode, MODE register bit 0
pub enum Mode {
    /// Registers writable, no sampling
    Standby = 0x00,
    /// Continuous sampling
    Active = 0x01,
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Samples per second in active and auto-sleep modes (SR register AMSR bits)
pub enum SampleRate {
    AutoSleep120 = 0x00,
    AutoSleep64 = 0x01,
    AutoSleep32 = 0x02,
    AutoSleep16 = 0x03,
    AutoSleep8 = 0x04,
    AutoSleep4 = 0x05,
    AutoSleep2 = 0x06,
    AutoSleep1 = 0x07,
}

impl Default for SampleRate {
    fn default() -> Self {
        SampleRate::AutoSleep32
    }
}

impl SampleRate {
    /// Nominal samples per second
    pub fn hz(&self) -> u8 {
        match self {
            Self::AutoSleep120 => 120,
            Self::AutoSleep64 => 64,
            Self::AutoSleep32 => 32,
            Self::AutoSleep16 => 16,
            Self::AutoSleep8 => 8,
            Self::AutoSleep4 => 4,
            Self::AutoSleep2 => 2,
            Self::AutoSleep1 => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDR: u8 = DEFAULT_ADDRESS;

    fn init_transactions() -> Vec<I2cTransaction> {
        vec![
            I2cTransaction::read(ADDR, vec![0]),
            I2cTransaction::write(ADDR, vec![REG_MODE, 0x00]),
            I2cTransaction::write(ADDR, vec![REG_SR, 0x02]),
            I2cTransaction::write(ADDR, vec![REG_MODE, 0x01]),
        ]
    }

    #[test]
    fn axis_count_matches_six_bit_twos_complement() {
        for raw in 0..=255u8 {
            let top = raw >> 2;
            let expected = if top & 0x20 != 0 {
                top as i16 - 64
            } else {
                top as i16
            };
            let count = axis_count(raw);
            assert_eq!(count as i16, expected, "raw {}", raw);
            assert!((-32..=31).contains(&count));
        }
        assert_eq!(axis_count(4), 1);
        assert_eq!(axis_count(0xFC), -1);
        assert_eq!(axis_count(0x80), -32);
    }

    #[test]
    fn setup_sequence() {
        let mut i2c = I2cMock::new(&init_transactions());
        let mut accel = Builder::new_i2c(i2c.clone());
        assert_eq!(accel.state(), DriverState::Uninitialized);
        accel.setup().unwrap();
        assert_eq!(accel.state(), DriverState::Active);
        i2c.done();
    }

    #[test]
    fn setup_uses_configured_rate() {
        let config = Mma7660Config {
            address: 0x4D,
            sample_rate: SampleRate::AutoSleep8,
        };
        let expectations = [
            I2cTransaction::read(0x4D, vec![0]),
            I2cTransaction::write(0x4D, vec![REG_MODE, 0x00]),
            I2cTransaction::write(0x4D, vec![REG_SR, 0x04]),
            I2cTransaction::write(0x4D, vec![REG_MODE, 0x01]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut accel = Builder::new_i2c_with_config(i2c.clone(), config);
        accel.setup().unwrap();
        i2c.done();
    }

    #[test]
    fn bus_open_failure_disables() {
        let expectations = [I2cTransaction::read(ADDR, vec![0]).with_error(ErrorKind::Other)];
        let mut i2c = I2cMock::new(&expectations);
        let mut accel = Builder::new_i2c(i2c.clone());

        let err = accel.setup().unwrap_err();
        assert_eq!(err.kind(), SensorError::BusOpenFailure);
        assert_eq!(accel.state(), DriverState::Disabled);

        // no further bus traffic once disabled
        assert!(matches!(accel.setup(), Err(Error::SensorDisabled)));
        assert!(matches!(accel.get_xyz(), Err(Error::SensorDisabled)));
        i2c.done();
    }

    #[test]
    fn config_write_failure_disables() {
        let expectations = [
            I2cTransaction::read(ADDR, vec![0]),
            I2cTransaction::write(ADDR, vec![REG_MODE, 0x00]).with_error(ErrorKind::Other),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut accel = Builder::new_i2c(i2c.clone());
        assert_eq!(accel.setup().unwrap_err().kind(), SensorError::BusIoFailure);
        assert_eq!(accel.state(), DriverState::Disabled);
        i2c.done();
    }

    #[test]
    fn read_renders_counts() {
        let mut expectations = init_transactions();
        expectations.push(I2cTransaction::write(ADDR, vec![REG_XOUT]));
        expectations.push(I2cTransaction::read(ADDR, vec![4, 0xFC, 0x80]));
        let mut i2c = I2cMock::new(&expectations);
        let mut accel = Builder::new_i2c(i2c.clone());
        accel.setup().unwrap();

        let mut value = SensorValue::new();
        accel.read_into(&mut value).unwrap();
        assert_eq!(value.as_str(), "1,-1,-32");
        i2c.done();
    }

    #[test]
    fn read_failure_keeps_value() {
        let mut expectations = init_transactions();
        expectations.push(I2cTransaction::write(ADDR, vec![REG_XOUT]));
        expectations.push(I2cTransaction::read(ADDR, vec![0, 0, 0]).with_error(ErrorKind::Other));
        let mut i2c = I2cMock::new(&expectations);
        let mut accel = Builder::new_i2c(i2c.clone());
        accel.setup().unwrap();

        let mut value = SensorValue::new();
        value.push_str("3,2,1").unwrap();
        let err = Sensor::read(&mut accel, &mut value).unwrap_err();
        assert_eq!(err, SensorError::BusIoFailure);
        assert_eq!(value.as_str(), "3,2,1");
        assert_eq!(accel.state(), DriverState::Active);
        i2c.done();
    }

    #[test]
    fn acceleration_through_table() {
        let expectations = [
            I2cTransaction::write(ADDR, vec![REG_XOUT]),
            I2cTransaction::read(ADDR, vec![0, 4, 0xFC]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut accel = Builder::new_i2c(i2c.clone());

        let g = accel.get_acceleration().unwrap();
        assert_eq!(g[0], 0.0);
        assert!((g[1] - calibration::G_STEP).abs() < 1e-6);
        assert!((g[2] + calibration::G_STEP).abs() < 1e-6);
        i2c.done();
    }

    #[test]
    fn single_register_read() {
        let expectations = [
            I2cTransaction::write(ADDR, vec![REG_MODE]),
            I2cTransaction::read(ADDR, vec![0x01]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut accel = Builder::new_i2c(i2c.clone());
        assert_eq!(accel.register_read(REG_MODE).unwrap(), Mode::Active as u8);
        i2c.done();
    }

    #[test]
    fn sensor_contract() {
        let mut i2c = I2cMock::new(&[]);
        let accel = Builder::new_i2c(i2c.clone());
        assert_eq!(accel.property(), "MMA7660-Accelerometer-XYZ");
        let caps = accel.capabilities();
        assert!(caps.contains(Capabilities::INIT | Capabilities::READ));
        assert!(!caps.contains(Capabilities::WRITE));
        assert!(!caps.contains(Capabilities::EXIT));
        assert_eq!(SampleRate::default().hz(), 32);
        i2c.done();
    }
}
