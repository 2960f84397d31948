use crate::hw_def::*;

use core::fmt;

#[cfg(feature = "defmt")]
use defmt::Format;

/// SCD40/SCD41 device driver, blocking flavor
#[cfg(feature = "blocking")]
#[derive(Debug)]
pub struct Scd4x<I2C, Delay> {
    pub(crate) i2c: I2C,
    pub(crate) delay: Delay,
}

/// SCD40/SCD41 device driver, async flavor
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct Scd4xAsync<I2C, Delay> {
    pub(crate) i2c: I2C,
    pub(crate) delay: Delay,
}

/// All possible errors in this crate
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// I²C communication error
    I2c(E),
    /// Invalid input data provided
    InvalidInputData,
    /// Failure of a checksum from the device was detected
    CrcMismatch,
}

/// Raw (still in u16 format) measurement words from the device
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawMeasurement {
    /// CO2 concentration, already in ppm
    pub co2: u16,
    /// unprocessed temperature code
    pub temperature: u16,
    /// unprocessed relative humidity code
    pub humidity: u16,
}

impl RawMeasurement {
    /// CO2 concentration in ppm (the device reports ppm directly)
    pub fn co2_ppm(&self) -> u16 {
        self.co2
    }
    /// Temperature in milli-degrees Celsius
    pub fn millicelsius(&self) -> i32 {
        raw_to_millicelsius(self.temperature)
    }
    /// Relative humidity in milli-percent RH
    pub fn millipercent_rh(&self) -> i32 {
        raw_to_millipercent_rh(self.humidity)
    }
}

/// A measurement from the device after conversion to physical units
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Measurement {
    /// CO2 concentration in ppm
    pub co2_ppm: u16,
    /// temperature in milli-degrees Celsius
    pub temperature_millicelsius: i32,
    /// relative humidity in milli-percent RH
    pub humidity_millipercent: i32,
}

impl From<&RawMeasurement> for Measurement {
    fn from(raw: &RawMeasurement) -> Self {
        Self {
            co2_ppm: raw.co2_ppm(),
            temperature_millicelsius: raw.millicelsius(),
            humidity_millipercent: raw.millipercent_rh(),
        }
    }
}

/// 48-bit serial number of the device, upper 16 bits always zero
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerialNumber(pub u64);

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012X}", self.0)
    }
}

/// Feature-set version of the device
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureSet {
    raw: u16,
    /// major version
    pub major: u8,
    /// minor version
    pub minor: u8,
}

impl From<u16> for FeatureSet {
    fn from(raw: u16) -> Self {
        Self {
            raw,
            major: ((raw & FEATURE_SET_MAJOR_MASK) >> FEATURE_SET_MAJOR_SHIFT) as u8,
            minor: (raw & FEATURE_SET_MINOR_MASK) as u8,
        }
    }
}

impl FeatureSet {
    /// Get the raw feature-set word
    pub fn raw(&self) -> u16 {
        self.raw
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureSet {{ 0x{:04x}; v{}.{} }}", self.raw, self.major, self.minor)
    }
}
