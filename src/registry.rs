/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Fixed-capacity, insertion-ordered collection of registered sensors.

use core::fmt;

use heapless::Vec;

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

use crate::sensor::{Capabilities, Sensor, SensorError, SensorValue};

/// Stable handle to a registered sensor
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorId(usize);

impl SensorId {
    /// Position in registration order
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorState {
    /// Registered, init not run yet. Reads are still attempted.
    Registered,
    Active,
    /// Init failed, or the sensor reported itself disabled. Never polled again.
    Disabled,
    /// Exit has run
    Stopped,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// No room for another sensor
    Full,
    /// A sensor with the same property is already registered
    DuplicateProperty,
    /// The id does not belong to this registry
    UnknownSensor,
    /// The rendered message does not fit the destination
    BufferTooSmall,
    /// The sensor rejected the request
    Sensor(SensorError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("registry full"),
            Self::DuplicateProperty => f.write_str("property already registered"),
            Self::UnknownSensor => f.write_str("unknown sensor"),
            Self::BufferTooSmall => f.write_str("message buffer too small"),
            Self::Sensor(e) => write!(f, "sensor error: {}", e),
        }
    }
}

impl core::error::Error for RegistryError {}

impl From<SensorError> for RegistryError {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

/// Outcome of a registry-wide lifecycle pass
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanSummary {
    /// Sensors whose operation succeeded
    pub succeeded: usize,
    /// Sensors whose operation failed
    pub failed: usize,
}

/// The registry's record for one sensor
pub struct Descriptor<'a> {
    sensor: &'a mut dyn Sensor,
    property: &'static str,
    capabilities: Capabilities,
    current: SensorValue,
    previous: SensorValue,
    state: SensorState,
    error_count: u32,
    last_error: Option<SensorError>,
}

impl<'a> Descriptor<'a> {
    fn new(sensor: &'a mut dyn Sensor) -> Self {
        Self {
            property: sensor.property(),
            capabilities: sensor.capabilities(),
            sensor,
            current: SensorValue::new(),
            previous: SensorValue::new(),
            state: SensorState::Registered,
            error_count: 0,
            last_error: None,
        }
    }

    pub fn property(&self) -> &'static str {
        self.property
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Latest successful reading, empty until the first one
    pub fn current_value(&self) -> &str {
        &self.current
    }

    /// Reading before [`current_value`](Self::current_value)
    pub fn previous_value(&self) -> &str {
        &self.previous
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    /// Number of failed reads
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn last_error(&self) -> Option<SensorError> {
        self.last_error
    }

    fn pollable(&self) -> bool {
        matches!(self.state, SensorState::Registered | SensorState::Active)
            && self.capabilities.contains(Capabilities::READ)
    }

    fn init(&mut self) -> Result<(), SensorError> {
        if !self.capabilities.contains(Capabilities::INIT) {
            self.state = SensorState::Active;
            return Ok(());
        }

        match self.sensor.init() {
            Ok(()) => {
                self.state = SensorState::Active;
                Ok(())
            }
            Err(e) => {
                #[cfg(feature = "rttdebug")]
                rprintln!("{} init failed: {}", self.property, e);
                self.state = SensorState::Disabled;
                self.last_error = Some(e);
                Err(e)
            }
        }
    }

    fn scan(&mut self) -> Result<(), SensorError> {
        let last = self.current.clone();
        match self.sensor.read(&mut self.current) {
            Ok(()) => {
                self.previous = last;
                Ok(())
            }
            Err(e) => {
                #[cfg(feature = "rttdebug")]
                rprintln!("{} read failed: {}", self.property, e);
                self.error_count = self.error_count.saturating_add(1);
                self.last_error = Some(e);
                if e == SensorError::SensorDisabled {
                    self.state = SensorState::Disabled;
                }
                Err(e)
            }
        }
    }

    /// Render `{"<property>":"<current value>"}`
    fn render(&self, dest: &mut [u8]) -> Result<usize, RegistryError> {
        let parts: [&[u8]; 5] = [
            b"{\"",
            self.property.as_bytes(),
            b"\":\"",
            self.current.as_bytes(),
            b"\"}",
        ];
        let needed: usize = parts.iter().map(|p| p.len()).sum();
        if dest.len() < needed {
            return Err(RegistryError::BufferTooSmall);
        }

        let mut pos = 0;
        for part in parts {
            dest[pos..pos + part.len()].copy_from_slice(part);
            pos += part.len();
        }
        Ok(pos)
    }
}

/// Holds up to `N` sensors in registration order.
///
/// Sensors are borrowed for the registry's lifetime, so drivers can live
/// in static storage and no allocator is needed.
pub struct Registry<'a, const N: usize> {
    descriptors: Vec<Descriptor<'a>, N>,
}

impl<'a, const N: usize> Default for Registry<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> Registry<'a, N> {
    pub const fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Append a sensor. Its property must not already be registered.
    pub fn register(&mut self, sensor: &'a mut dyn Sensor) -> Result<SensorId, RegistryError> {
        let property = sensor.property();
        if self.find(property).is_some() {
            return Err(RegistryError::DuplicateProperty);
        }

        let id = SensorId(self.descriptors.len());
        self.descriptors
            .push(Descriptor::new(sensor))
            .map_err(|_| RegistryError::Full)?;

        #[cfg(feature = "rttdebug")]
        rprintln!("registered {} as {}", property, id.0);

        Ok(id)
    }

    /// Run init on every sensor not yet initialized.
    /// A failing sensor is disabled; the others are still initialized.
    pub fn initialize_all(&mut self) -> ScanSummary {
        let mut summary = ScanSummary::default();
        for desc in self
            .descriptors
            .iter_mut()
            .filter(|d| d.state == SensorState::Registered)
        {
            match desc.init() {
                Ok(()) => summary.succeeded += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Sample every pollable sensor once, in registration order.
    ///
    /// A successful read moves the old current value into the previous
    /// value. A failed read changes neither and bumps the error count.
    pub fn scan_all(&mut self) -> ScanSummary {
        let mut summary = ScanSummary::default();
        for desc in self.descriptors.iter_mut().filter(|d| d.pollable()) {
            match desc.scan() {
                Ok(()) => summary.succeeded += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Push a value to one sensor
    pub fn write(&mut self, id: SensorId, value: &str) -> Result<(), RegistryError> {
        let desc = self
            .descriptors
            .get_mut(id.0)
            .ok_or(RegistryError::UnknownSensor)?;
        if !matches!(desc.state, SensorState::Registered | SensorState::Active) {
            return Err(SensorError::SensorDisabled.into());
        }
        if !desc.capabilities.contains(Capabilities::WRITE) {
            return Err(SensorError::Unsupported.into());
        }
        desc.sensor.write(value).map_err(RegistryError::from)
    }

    /// Run exit on every sensor that provides it and is still running
    pub fn shutdown_all(&mut self) -> ScanSummary {
        let mut summary = ScanSummary::default();
        for desc in self.descriptors.iter_mut().filter(|d| {
            matches!(d.state, SensorState::Registered | SensorState::Active)
                && d.capabilities.contains(Capabilities::EXIT)
        }) {
            match desc.sensor.exit() {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    desc.last_error = Some(e);
                    summary.failed += 1;
                }
            }
            desc.state = SensorState::Stopped;
        }
        summary
    }

    /// Render a sensor's property and current value into `dest`.
    /// Returns the number of bytes written. Nothing is written on error.
    pub fn format_message(&self, id: SensorId, dest: &mut [u8]) -> Result<usize, RegistryError> {
        self.get(id)
            .ok_or(RegistryError::UnknownSensor)?
            .render(dest)
    }

    pub fn get(&self, id: SensorId) -> Option<&Descriptor<'a>> {
        self.descriptors.get(id.0)
    }

    /// Look up a sensor by property
    pub fn find(&self, property: &str) -> Option<SensorId> {
        self.descriptors
            .iter()
            .position(|d| d.property == property)
            .map(SensorId)
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = (SensorId, &Descriptor<'a>)> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (SensorId(i), d))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }
}
