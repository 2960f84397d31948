use crate::fmt::{trace, warn};
use crate::hw_def::*;
use crate::types::*;

use embedded_hal::{delay::DelayNs, i2c::I2c};

impl<I2C, Delay, E> Scd4x<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Create a new SCD4x driver instance
    pub fn new(i2c: I2C, delay: Delay) -> Self {
        Self { i2c, delay }
    }

    /// Destroy the driver instance and return the owned bus and delay
    pub fn release(self) -> (I2C, Delay) {
        (self.i2c, self.delay)
    }

    /// Write an opcode, then block for the command's settle delay.
    ///
    /// The delay only elapses once the command was accepted; an error returns
    /// immediately with no delay.
    fn send_command(&mut self, cmd: Command) -> Result<(), Error<E>> {
        trace!("scd4x: sending command {}", cmd.opcode());
        self.i2c
            .write(SCD4X_I2C_ADDRESS, &cmd.to_be_bytes())
            .map_err(Error::I2c)?;
        self.delay.delay_us(cmd.settle_delay_us());
        Ok(())
    }

    /// Write an opcode plus one argument word and its CRC, then settle.
    fn send_command_with_arg(&mut self, cmd: Command, arg: u16) -> Result<(), Error<E>> {
        let mut buf = [0u8; 5];
        buf[0..2].copy_from_slice(&cmd.to_be_bytes());
        buf[2..4].copy_from_slice(&arg.to_be_bytes());
        buf[4] = CRC.checksum(&buf[2..4]);
        trace!("scd4x: sending command {} arg {}", cmd.opcode(), arg);
        self.i2c.write(SCD4X_I2C_ADDRESS, &buf).map_err(Error::I2c)?;
        self.delay.delay_us(cmd.settle_delay_us());
        Ok(())
    }

    /// Read `read_vals.len()` words, each validated by a trailing CRC byte.
    fn read_words(&mut self, read_vals: &mut [u16]) -> Result<(), Error<E>> {
        let num_vals = read_vals.len();
        // We are heapless, so have to have an upper bound
        assert!(num_vals <= 3);

        let mut read_buf = [0u8; 9];
        let read_buf_slice = &mut read_buf[0..(3 * num_vals)];
        self.i2c
            .read(SCD4X_I2C_ADDRESS, read_buf_slice)
            .map_err(Error::I2c)?;
        for ii in 0..num_vals {
            let read_word = &read_buf[ii * 3 + 0..=ii * 3 + 1];
            let read_crc = read_buf[ii * 3 + 2];
            let crc_expect = CRC.checksum(read_word);
            if read_crc != crc_expect {
                warn!("scd4x: crc mismatch on word {} of {}", ii, num_vals);
                return Err(Error::CrcMismatch);
            }
            read_vals[ii] = (read_word[0] as u16) << 8 | read_word[1] as u16;
        }
        Ok(())
    }

    /// Write an opcode, wait for the command's settle delay, then read words.
    fn delayed_read_command(&mut self, cmd: Command, read_vals: &mut [u16]) -> Result<(), Error<E>> {
        trace!("scd4x: sending command {}", cmd.opcode());
        self.i2c
            .write(SCD4X_I2C_ADDRESS, &cmd.to_be_bytes())
            .map_err(Error::I2c)?;
        self.delay.delay_us(cmd.settle_delay_us());
        self.read_words(read_vals)
    }

    /// Check if the sensor is present and leave it idle.
    ///
    /// The sensor does not accept commands while a periodic measurement is running, so
    /// probing stops any pending measurement; this is behaviorally identical to
    /// [`stop_periodic_measurement`](Self::stop_periodic_measurement).
    pub fn probe(&mut self) -> Result<(), Error<E>> {
        self.stop_periodic_measurement()
    }

    /// Start a periodic measurement in the given mode.
    ///
    /// Measurement data which is not read out is continuously overwritten. The
    /// measurement mode is saved in non-volatile memory and resumes after repowering.
    pub fn start_periodic_measurement(&mut self, mode: MeasurementMode) -> Result<(), Error<E>> {
        self.send_command(mode.command())
    }

    /// Stop an ongoing periodic measurement.
    pub fn stop_periodic_measurement(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::StopPeriodicMeasurement)
    }

    /// Trigger a single-shot measurement (SCD41 only).
    ///
    /// The result is available to [`read_measurement`](Self::read_measurement) after
    /// [`SINGLE_SHOT_MEASUREMENT_DURATION_US`] microseconds; waiting that long is the
    /// caller's responsibility.
    pub fn measure_single_shot(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::MeasureSingleShot)
    }

    /// Read out the last sample of an ongoing periodic measurement, or the result of a
    /// single-shot measurement, as raw sensor words.
    ///
    /// Transient bus failures (including checksum mismatches) are retried up to
    /// [`READ_MEASUREMENT_NUM_TRIES`] times with a
    /// [`READ_MEASUREMENT_RETRY_DELAY_US`] pause between attempts.
    pub fn read_raw_measurement(&mut self) -> Result<RawMeasurement, Error<E>> {
        let mut words = [0u16; 3];
        let mut tries = 0;
        loop {
            match self.read_words(&mut words) {
                Ok(()) => break,
                Err(err) => {
                    tries += 1;
                    if tries >= READ_MEASUREMENT_NUM_TRIES {
                        return Err(err);
                    }
                    self.delay.delay_us(READ_MEASUREMENT_RETRY_DELAY_US);
                }
            }
        }
        Ok(RawMeasurement {
            co2: words[0],
            temperature: words[1],
            humidity: words[2],
        })
    }

    /// Read out the last measurement, converted to ppm, milli-degrees Celsius and
    /// milli-percent RH.
    ///
    /// See [`read_raw_measurement`](Self::read_raw_measurement) for the retry behavior.
    pub fn read_measurement(&mut self) -> Result<Measurement, Error<E>> {
        let raw = self.read_raw_measurement()?;
        Ok(Measurement::from(&raw))
    }

    /// Set the temperature offset in milli-degrees Celsius.
    ///
    /// The on-board RH/T sensor is influenced by thermal self-heating of the SCD4x and
    /// other components; writing the offset observed in continuous operation of the end
    /// device compensates for it. Only offsets in `[0, 174760)` are permissible,
    /// otherwise [`Error::InvalidInputData`] is returned and nothing is sent.
    pub fn set_temperature_offset(&mut self, offset_millicelsius: i32) -> Result<(), Error<E>> {
        if offset_millicelsius < 0 || offset_millicelsius >= 174_760 {
            return Err(Error::InvalidInputData);
        }
        let word = temperature_offset_word(offset_millicelsius);
        self.send_command_with_arg(Command::SetTemperatureOffset, word)
    }

    /// Set the sensor altitude in meters above sea level.
    ///
    /// 0 meters is the default and disables altitude compensation. The setting is
    /// disregarded once an ambient pressure is set with
    /// [`set_ambient_pressure`](Self::set_ambient_pressure). Saved in non-volatile
    /// memory.
    pub fn set_altitude(&mut self, altitude_meters: u16) -> Result<(), Error<E>> {
        self.send_command_with_arg(Command::SetAltitude, altitude_meters)
    }

    /// Set the ambient pressure in Pascal.
    ///
    /// Overrides any altitude compensation. The device word is `pressure * 100`, so
    /// only pressures up to 655 Pa are representable; larger values are rejected with
    /// [`Error::InvalidInputData`].
    pub fn set_ambient_pressure(&mut self, pressure_pascal: u16) -> Result<(), Error<E>> {
        if pressure_pascal > 655 {
            return Err(Error::InvalidInputData);
        }
        self.send_command_with_arg(Command::SetAmbientPressure, pressure_pascal * 100)
    }

    /// Read whether automatic self-calibration (ASC) is enabled.
    pub fn get_automatic_self_calibration(&mut self) -> Result<bool, Error<E>> {
        let mut word = [0u16; 1];
        self.delayed_read_command(Command::GetAutomaticSelfCalibration, &mut word)?;
        Ok(word[0] != 0)
    }

    /// Enable or disable automatic self-calibration (ASC).
    ///
    /// When activated for the first time the algorithm needs a minimum of 7 days with
    /// at least 1 hour of fresh-air exposure per day to find its initial parameter set.
    /// The ASC state is saved in non-volatile memory.
    pub fn set_automatic_self_calibration(&mut self, enabled: bool) -> Result<(), Error<E>> {
        self.send_command_with_arg(Command::SetAutomaticSelfCalibration, enabled as u16)
    }

    /// Forcibly recalibrate the sensor to a known CO2 concentration (FRC).
    ///
    /// For best results the sensor has to run in a stable environment in continuous
    /// mode for at least two minutes before sending the reference value, which should
    /// be in the range 400..=2000 ppm (not validated here). FRC overwrites the ASC
    /// state and vice-versa. Saved in non-volatile memory.
    pub fn set_forced_recalibration(&mut self, co2_ppm: u16) -> Result<(), Error<E>> {
        self.send_command_with_arg(Command::SetForcedRecalibration, co2_ppm)
    }

    /// Read out the 48-bit serial number.
    pub fn read_serial_number(&mut self) -> Result<SerialNumber, Error<E>> {
        let mut words = [0u16; 3];
        self.delayed_read_command(Command::ReadSerialNumber, &mut words)?;
        Ok(SerialNumber(serial_number_from_words(&words)))
    }

    /// Read the feature-set version.
    pub fn read_feature_set_version(&mut self) -> Result<FeatureSet, Error<E>> {
        let mut word = [0u16; 1];
        self.delayed_read_command(Command::ReadFeatureSetVersion, &mut word)?;
        Ok(FeatureSet::from(word[0]))
    }

    /// Reset all settings to factory defaults.
    ///
    /// Blocks for the full EEPROM erase/rewrite duration (6 s).
    pub fn factory_reset(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::FactoryReset)
    }

    /// Soft-reset the sensor, reloading settings from EEPROM.
    ///
    /// The stop-measurement command must be issued beforehand.
    pub fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::SoftReset)
    }

    /// Commit volatile settings to the sensor's EEPROM.
    ///
    /// Configurations are by default stored in volatile memory only and are lost on a
    /// power cycle. Send this only after all configuration is final, to limit the
    /// number of EEPROM write/erase cycles. Blocks for the full commit duration (6 s).
    pub fn persist_settings(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::PersistSettings)
    }
}
