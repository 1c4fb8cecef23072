/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Raw code to physical unit mapping for the MMA7660.
//!
//! Each axis reports a 6-bit two's-complement code. Codes 0..=31 are
//! positive, 32..=63 negative. The datasheet gives roughly 0.047 g and
//! 2.69 degrees of tilt per count. Beyond ±21 counts the axis saturates
//! for tilt purposes and the angle is reported as [`ANGLE_UNDEFINED`].

/// Acceleration per count, in g
pub const G_STEP: f32 = 0.047;

/// Tilt angle per count, in degrees
pub const ANGLE_STEP: f32 = 2.69;

/// Angle marker for codes with no meaningful tilt
pub const ANGLE_UNDEFINED: f32 = 255.0;

/// Number of distinct 6-bit codes
pub const TABLE_LEN: usize = 64;

/// Number of positive codes (0..=31)
const POSITIVE_CODES: usize = 32;

/// Codes 0..TILT_POSITIVE_END have a positive tilt angle
const TILT_POSITIVE_END: usize = 22;

/// Codes TILT_NEGATIVE_START..64 have a negative tilt angle
const TILT_NEGATIVE_START: usize = 43;

/// Physical quantities for a single raw code
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccelLookup {
    /// Linear acceleration, in g
    pub g: f32,
    /// Angle from the XY plane, in degrees
    pub xy_angle: f32,
    /// Angle from the Z axis, in degrees
    pub z_angle: f32,
}

impl AccelLookup {
    /// Return `(xy_angle, z_angle)`, or `None` when this code is in the
    /// band where tilt is not defined
    pub fn tilt(&self) -> Option<(f32, f32)> {
        if self.xy_angle == ANGLE_UNDEFINED {
            None
        } else {
            Some((self.xy_angle, self.z_angle))
        }
    }
}

/// Lookup table built once per driver, read-only afterwards
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationTable {
    entries: [AccelLookup; TABLE_LEN],
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationTable {
    /// Build the table, computing each entry directly from its code
    pub fn new() -> Self {
        let mut entries = [AccelLookup::default(); TABLE_LEN];

        for (code, entry) in entries.iter_mut().enumerate() {
            entry.g = if code < POSITIVE_CODES {
                code as f32 * G_STEP
            } else {
                -((TABLE_LEN - code) as f32) * G_STEP
            };

            if code < TILT_POSITIVE_END {
                let angle = code as f32 * ANGLE_STEP;
                entry.xy_angle = angle;
                entry.z_angle = 90.0 - angle;
            } else if code >= TILT_NEGATIVE_START {
                let angle = (TABLE_LEN - code) as f32 * ANGLE_STEP;
                entry.xy_angle = -angle;
                entry.z_angle = -(90.0 - angle);
            } else {
                entry.xy_angle = ANGLE_UNDEFINED;
                entry.z_angle = ANGLE_UNDEFINED;
            }
        }

        Self { entries }
    }

    /// Build the table by running sums, one step per code.
    ///
    /// Values drift from [`CalibrationTable::new`] in the last few bits, and
    /// match calibration data produced by earlier firmware bit for bit.
    pub fn accumulated() -> Self {
        let mut entries = [AccelLookup::default(); TABLE_LEN];
        // single precision accumulator, double precision step
        let step = |acc: f32, delta: f64| (acc as f64 + delta) as f32;
        let g_step = 0.047_f64;
        let angle_step = 2.69_f64;

        let mut val = 0.0_f32;
        for entry in entries.iter_mut().take(POSITIVE_CODES) {
            entry.g = val;
            val = step(val, g_step);
        }

        let mut val = -0.047_f32;
        for entry in entries.iter_mut().skip(POSITIVE_CODES).rev() {
            entry.g = val;
            val = step(val, -g_step);
        }

        let (mut val, mut val_z) = (0.0_f32, 90.0_f32);
        for entry in entries.iter_mut().take(TILT_POSITIVE_END) {
            entry.xy_angle = val;
            entry.z_angle = val_z;
            val = step(val, angle_step);
            val_z = step(val_z, -angle_step);
        }

        let (mut val, mut val_z) = (-2.69_f32, -87.31_f32);
        for entry in entries.iter_mut().skip(TILT_NEGATIVE_START).rev() {
            entry.xy_angle = val;
            entry.z_angle = val_z;
            val = step(val, -angle_step);
            val_z = step(val_z, angle_step);
        }

        for entry in entries
            .iter_mut()
            .take(TILT_NEGATIVE_START)
            .skip(TILT_POSITIVE_END)
        {
            entry.xy_angle = ANGLE_UNDEFINED;
            entry.z_angle = ANGLE_UNDEFINED;
        }

        Self { entries }
    }

    /// Look up a 6-bit code. Bits above the low six are ignored.
    pub fn get(&self, code: u8) -> &AccelLookup {
        &self.entries[(code & 0x3F) as usize]
    }

    /// Look up the signed axis count returned by the driver
    pub fn lookup(&self, count: i8) -> &AccelLookup {
        self.get(count as u8)
    }

    pub fn entries(&self) -> &[AccelLookup; TABLE_LEN] {
        &self.entries
    }
}
