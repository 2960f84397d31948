//! This is a platform-agnostic Rust driver for the Sensirion SCD40 and SCD41 miniature
//! CO2, temperature and relative humidity sensors using the [`embedded-hal`] or
//! [`embedded-hal-async`] traits.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal
//! [`embedded-hal-async`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal-async
//!
//! This driver allows you to:
//! - Probe for the sensor on the bus.
//! - Start and stop periodic measurement in high-performance, low-power and
//!   ultra-low-power mode.
//! - Trigger a single-shot measurement (SCD41).
//! - Read out CO2 (ppm), temperature (milli-degrees Celsius) and relative humidity
//!   (milli-percent RH), converted with the device's fixed-point formulas.
//! - Set the temperature offset, sensor altitude and ambient pressure compensation.
//! - Enable, disable and query automatic self-calibration (ASC).
//! - Perform a forced recalibration (FRC) against a reference CO2 concentration.
//! - Read the 48-bit serial number and the feature-set version.
//! - Persist settings to the sensor's EEPROM, factory-reset and soft-reset the sensor.
//! - blocking API support.
//! - async API support.
//!
//! ## Features
//!
//! - `async`: Enables the async API (`Scd4xAsync`).
//! - `blocking`: Enables the blocking API (`Scd4x`).
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! ## Supported devices: SCD40, SCD41
//!
//! The following description is copied from the manufacturer's datasheet:
//!
//! The SCD4x is Sensirion's next generation miniature CO2 sensor. This sensor builds on
//! the photoacoustic NDIR sensing principle and Sensirion's patented PASens and
//! CMOSens technology to offer high accuracy at an unmatched price and smallest form
//! factor. On-chip signal compensation is realized with the built-in SHT4x humidity and
//! temperature sensor. The SCD41 additionally supports single-shot operation for
//! battery-driven applications.
//!
//! Datasheet:
//!   [SCD4x](https://sensirion.com/media/documents/48C4B7FB/66E05452/CD_DS_SCD4x_Datasheet_D1.pdf)
//!
//! The sensor answers on the fixed I2C address `0x62`. Every command is a 16-bit opcode;
//! argument and response words are 16 bits, each followed by an 8-bit CRC over the two
//! preceding bytes. The driver holds no state of its own: the only implicit state is the
//! measurement mode inside the sensor, and callers are responsible for sequencing (for
//! example, not sending configuration commands while a periodic measurement is running).
//! Access to the shared bus must be serialized externally.
//!
//! To use this driver, import this crate and an `embedded_hal` or `embedded_hal_async`
//! implementation, then instantiate the device.
//!
//! ## Blocking Example:
//!
//! ```no_run
//! use scd4x::{MeasurementMode, Scd4x};
//!
//! // Platform-specific: any embedded_hal::i2c::I2c + embedded_hal::delay::DelayNs
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! # let delay = embedded_hal_mock::eh1::delay::NoopDelay;
//!
//! let mut scd4x = Scd4x::new(i2c, delay);
//!
//! // The sensor ignores commands while a periodic measurement is running, so a
//! // successful stop doubles as a presence check.
//! scd4x.probe().unwrap();
//!
//! scd4x.start_periodic_measurement(MeasurementMode::HighPerformance).unwrap();
//!
//! // Platform-specific: sleep one measurement interval (5 s in high-performance mode)
//!
//! let measurement = scd4x.read_measurement().unwrap();
//! println!("{} ppm CO2, {} m°C, {} m%RH",
//!     measurement.co2_ppm,
//!     measurement.temperature_millicelsius,
//!     measurement.humidity_millipercent);
//! ```
//!
//! ## Async Example:
//!
//! ```no_run
//! use scd4x::{MeasurementMode, Scd4xAsync};
//!
//! // Platform-specific: any embedded_hal_async::i2c::I2c + embedded_hal_async::delay::DelayNs
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! # let delay = embedded_hal_mock::eh1::delay::NoopDelay;
//!
//! # futures::executor::block_on(async {
//! let mut scd4x = Scd4xAsync::new(i2c, delay);
//!
//! scd4x.probe().await.unwrap();
//! scd4x.start_periodic_measurement(MeasurementMode::LowPower).await.unwrap();
//!
//! // Platform-specific: sleep one measurement interval (30 s in low-power mode)
//!
//! let measurement = scd4x.read_measurement().await.unwrap();
//! println!("{} ppm CO2, {} m°C, {} m%RH",
//!     measurement.co2_ppm,
//!     measurement.temperature_millicelsius,
//!     measurement.humidity_millipercent);
//! # });
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

#[cfg(not(any(feature = "async", feature = "blocking")))]
compile_error!("At least one of \"async\" and \"blocking\" features must be enabled");

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

#[cfg(feature = "blocking")]
mod device_impl;
#[cfg(feature = "async")]
mod device_impl_async;
mod fmt;
mod hw_def;
mod types;

pub use crate::{hw_def::*, types::*};
