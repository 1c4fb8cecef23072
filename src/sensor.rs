/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! The lifecycle contract every sensor driver implements.

use core::fmt;

/// Capacity of a [`SensorValue`], in bytes
pub const VALUE_LEN: usize = 32;

/// Textual encoding of one reading, e.g. `"x,y,z"` for a three axis sensor
pub type SensorValue = heapless::String<VALUE_LEN>;

/// Bus-independent failure reported by a sensor to the registry
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Device not reachable when opening the bus
    BusOpenFailure,
    /// A bus write or read did not complete
    BusIoFailure,
    /// The reading does not fit in a [`SensorValue`]
    BufferTooSmall,
    /// The sensor failed initialization and no longer accepts requests
    SensorDisabled,
    /// The sensor does not provide the requested capability
    Unsupported,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::BusOpenFailure => "sensor not reachable on the bus",
            Self::BusIoFailure => "bus transfer failed",
            Self::BufferTooSmall => "reading does not fit the value buffer",
            Self::SensorDisabled => "sensor is disabled",
            Self::Unsupported => "operation not supported by sensor",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for SensorError {}

/// The set of optional lifecycle operations a sensor provides.
/// Operations outside the set are skipped by the registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const INIT: Self = Self(1 << 0);
    pub const READ: Self = Self(1 << 1);
    pub const WRITE: Self = Self(1 << 2);
    pub const EXIT: Self = Self(1 << 3);

    /// Combine two capability sets
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

/// A device that can be registered with the [`Registry`](crate::Registry).
///
/// The registry only calls the operations listed in
/// [`capabilities()`](Sensor::capabilities); the default bodies exist so
/// that implementors only write the operations they support.
pub trait Sensor {
    /// Key identifying this sensor, unique within a registry
    fn property(&self) -> &'static str;

    /// Operations this sensor implements
    fn capabilities(&self) -> Capabilities;

    /// Bring the device up. Called once, before the first read is expected to succeed.
    fn init(&mut self) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }

    /// Sample the device into `current`.
    ///
    /// # For implementors
    ///
    /// `current` must be left untouched when an error is returned.
    fn read(&mut self, _current: &mut SensorValue) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }

    /// Push a textual value to the device
    fn write(&mut self, _value: &str) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }

    /// Release the device
    fn exit(&mut self) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }
}
