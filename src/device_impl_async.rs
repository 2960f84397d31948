use crate::fmt::{trace, warn};
use crate::hw_def::*;
use crate::types::*;

use embedded_hal_async::{delay::DelayNs, i2c::I2c};

impl<I2C, Delay, E> Scd4xAsync<I2C, Delay>
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

    /// Write an opcode, then wait the command's settle delay.
    ///
    /// The delay only elapses once the command was accepted; an error returns
    /// immediately with no delay.
    async fn send_command(&mut self, cmd: Command) -> Result<(), Error<E>> {
        trace!("scd4x: sending command {}", cmd.opcode());
        self.i2c
            .write(SCD4X_I2C_ADDRESS, &cmd.to_be_bytes())
            .await
            .map_err(Error::I2c)?;
        self.delay.delay_us(cmd.settle_delay_us()).await;
        Ok(())
    }

    /// Write an opcode plus one argument word and its CRC, then settle.
    async fn send_command_with_arg(&mut self, cmd: Command, arg: u16) -> Result<(), Error<E>> {
        let mut buf = [0u8; 5];
        buf[0..2].copy_from_slice(&cmd.to_be_bytes());
        buf[2..4].copy_from_slice(&arg.to_be_bytes());
        buf[4] = CRC.checksum(&buf[2..4]);
        trace!("scd4x: sending command {} arg {}", cmd.opcode(), arg);
        self.i2c.write(SCD4X_I2C_ADDRESS, &buf).await.map_err(Error::I2c)?;
        self.delay.delay_us(cmd.settle_delay_us()).await;
        Ok(())
    }

    /// Read `read_vals.len()` words, each validated by a trailing CRC byte.
    async fn read_words(&mut self, read_vals: &mut [u16]) -> Result<(), Error<E>> {
        let num_vals = read_vals.len();
        // We are heapless, so have to have an upper bound
        assert!(num_vals <= 3);

        let mut read_buf = [0u8; 9];
        let read_buf_slice = &mut read_buf[0..(3 * num_vals)];
        self.i2c
            .read(SCD4X_I2C_ADDRESS, read_buf_slice)
            .await
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
    async fn delayed_read_command(
        &mut self,
        cmd: Command,
        read_vals: &mut [u16],
    ) -> Result<(), Error<E>> {
        trace!("scd4x: sending command {}", cmd.opcode());
        self.i2c
            .write(SCD4X_I2C_ADDRESS, &cmd.to_be_bytes())
            .await
            .map_err(Error::I2c)?;
        self.delay.delay_us(cmd.settle_delay_us()).await;
        self.read_words(read_vals).await
    }

    /// Check if the sensor is present and leave it idle.
    ///
    /// The sensor does not accept commands while a periodic measurement is running, so
    /// probing stops any pending measurement; this is behaviorally identical to
    /// [`stop_periodic_measurement`](Self::stop_periodic_measurement).
    pub async fn probe(&mut self) -> Result<(), Error<E>> {
        self.stop_periodic_measurement().await
    }

    /// Start a periodic measurement in the given mode.
    ///
    /// Measurement data which is not read out is continuously overwritten. The
    /// measurement mode is saved in non-volatile memory and resumes after repowering.
    pub async fn start_periodic_measurement(
        &mut self,
        mode: MeasurementMode,
    ) -> Result<(), Error<E>> {
        self.send_command(mode.command()).await
    }

    /// Stop an ongoing periodic measurement.
    pub async fn stop_periodic_measurement(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::StopPeriodicMeasurement).await
    }

    /// Trigger a single-shot measurement (SCD41 only).
    ///
    /// The result is available to [`read_measurement`](Self::read_measurement) after
    /// [`SINGLE_SHOT_MEASUREMENT_DURATION_US`] microseconds; waiting that long is the
    /// caller's responsibility.
    pub async fn measure_single_shot(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::MeasureSingleShot).await
    }

    /// Read out the last sample of an ongoing periodic measurement, or the result of a
    /// single-shot measurement, as raw sensor words.
    ///
    /// Transient bus failures (including checksum mismatches) are retried up to
    /// [`READ_MEASUREMENT_NUM_TRIES`] times with a
    /// [`READ_MEASUREMENT_RETRY_DELAY_US`] pause between attempts.
    pub async fn read_raw_measurement(&mut self) -> Result<RawMeasurement, Error<E>> {
        let mut words = [0u16; 3];
        let mut tries = 0;
        loop {
            match self.read_words(&mut words).await {
                Ok(()) => break,
                Err(err) => {
                    tries += 1;
                    if tries >= READ_MEASUREMENT_NUM_TRIES {
                        return Err(err);
                    }
                    self.delay.delay_us(READ_MEASUREMENT_RETRY_DELAY_US).await;
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
    pub async fn read_measurement(&mut self) -> Result<Measurement, Error<E>> {
        let raw = self.read_raw_measurement().await?;
        Ok(Measurement::from(&raw))
    }

    /// Set the temperature offset in milli-degrees Celsius.
    ///
    /// The on-board RH/T sensor is influenced by thermal self-heating of the SCD4x and
    /// other components; writing the offset observed in continuous operation of the end
    /// device compensates for it. Only offsets in `[0, 174760)` are permissible,
    /// otherwise [`Error::InvalidInputData`] is returned and nothing is sent.
    pub async fn set_temperature_offset(
        &mut self,
        offset_millicelsius: i32,
    ) -> Result<(), Error<E>> {
        if offset_millicelsius < 0 || offset_millicelsius >= 174_760 {
            return Err(Error::InvalidInputData);
        }
        let word = temperature_offset_word(offset_millicelsius);
        self.send_command_with_arg(Command::SetTemperatureOffset, word).await
    }

    /// Set the sensor altitude in meters above sea level.
    ///
    /// 0 meters is the default and disables altitude compensation. The setting is
    /// disregarded once an ambient pressure is set with
    /// [`set_ambient_pressure`](Self::set_ambient_pressure). Saved in non-volatile
    /// memory.
    pub async fn set_altitude(&mut self, altitude_meters: u16) -> Result<(), Error<E>> {
        self.send_command_with_arg(Command::SetAltitude, altitude_meters).await
    }

    /// Set the ambient pressure in Pascal.
    ///
    /// Overrides any altitude compensation. The device word is `pressure * 100`, so
    /// only pressures up to 655 Pa are representable; larger values are rejected with
    /// [`Error::InvalidInputData`].
    pub async fn set_ambient_pressure(&mut self, pressure_pascal: u16) -> Result<(), Error<E>> {
        if pressure_pascal > 655 {
            return Err(Error::InvalidInputData);
        }
        self.send_command_with_arg(Command::SetAmbientPressure, pressure_pascal * 100)
            .await
    }

    /// Read whether automatic self-calibration (ASC) is enabled.
    pub async fn get_automatic_self_calibration(&mut self) -> Result<bool, Error<E>> {
        let mut word = [0u16; 1];
        self.delayed_read_command(Command::GetAutomaticSelfCalibration, &mut word)
            .await?;
        Ok(word[0] != 0)
    }

    /// Enable or disable automatic self-calibration (ASC).
    ///
    /// When activated for the first time the algorithm needs a minimum of 7 days with
    /// at least 1 hour of fresh-air exposure per day to find its initial parameter set.
    /// The ASC state is saved in non-volatile memory.
    pub async fn set_automatic_self_calibration(&mut self, enabled: bool) -> Result<(), Error<E>> {
        self.send_command_with_arg(Command::SetAutomaticSelfCalibration, enabled as u16)
            .await
    }

    /// Forcibly recalibrate the sensor to a known CO2 concentration (FRC).
    ///
    /// For best results the sensor has to run in a stable environment in continuous
    /// mode for at least two minutes before sending the reference value, which should
    /// be in the range 400..=2000 ppm (not validated here). FRC overwrites the ASC
    /// state and vice-versa. Saved in non-volatile memory.
    pub async fn set_forced_recalibration(&mut self, co2_ppm: u16) -> Result<(), Error<E>> {
        self.send_command_with_arg(Command::SetForcedRecalibration, co2_ppm).await
    }

    /// Read out the 48-bit serial number.
    pub async fn read_serial_number(&mut self) -> Result<SerialNumber, Error<E>> {
        let mut words = [0u16; 3];
        self.delayed_read_command(Command::ReadSerialNumber, &mut words).await?;
        Ok(SerialNumber(serial_number_from_words(&words)))
    }

    /// Read the feature-set version.
    pub async fn read_feature_set_version(&mut self) -> Result<FeatureSet, Error<E>> {
        let mut word = [0u16; 1];
        self.delayed_read_command(Command::ReadFeatureSetVersion, &mut word).await?;
        Ok(FeatureSet::from(word[0]))
    }

    /// Reset all settings to factory defaults.
    ///
    /// Waits the full EEPROM erase/rewrite duration (6 s).
    pub async fn factory_reset(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::FactoryReset).await
    }

    /// Soft-reset the sensor, reloading settings from EEPROM.
    ///
    /// The stop-measurement command must be issued beforehand.
    pub async fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::SoftReset).await
    }

    /// Commit volatile settings to the sensor's EEPROM.
    ///
    /// Configurations are by default stored in volatile memory only and are lost on a
    /// power cycle. Send this only after all configuration is final, to limit the
    /// number of EEPROM write/erase cycles. Waits the full commit duration (6 s).
    pub async fn persist_settings(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::PersistSettings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use embedded_hal_async::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
    use futures::executor::block_on;

    /// Delay stub that records every requested pause in microseconds.
    #[derive(Debug, Default)]
    struct DelayRecorder {
        us: Vec<u32>,
    }

    impl DelayNs for DelayRecorder {
        async fn delay_ns(&mut self, ns: u32) {
            self.us.push(ns / 1000);
        }

        async fn delay_us(&mut self, us: u32) {
            self.us.push(us);
        }
    }

    fn word_with_crc(word: u16) -> [u8; 3] {
        let bytes = word.to_be_bytes();
        [bytes[0], bytes[1], CRC.checksum(&bytes)]
    }

    fn finish(sensor: Scd4xAsync<I2cMock, DelayRecorder>) -> Vec<u32> {
        let (mut i2c, delay) = sensor.release();
        i2c.done();
        delay.us
    }

    #[test]
    fn probe_issues_stop_measurement() {
        let i2c = I2cMock::new(&[Transaction::write(
            SCD4X_I2C_ADDRESS,
            vec![0x3F, 0x86],
        )]);
        let mut sensor = Scd4xAsync::new(i2c, DelayRecorder::default());
        block_on(sensor.probe()).unwrap();
        assert_eq!(finish(sensor), vec![30_000]);
    }

    #[test]
    fn read_measurement_recovers_after_two_failures() {
        let mut payload = Vec::new();
        for word in [800u16, 27000, 20000] {
            payload.extend_from_slice(&word_with_crc(word));
        }
        let expectations = [
            Transaction::read(SCD4X_I2C_ADDRESS, vec![0u8; 9]).with_error(ErrorKind::Other),
            Transaction::read(SCD4X_I2C_ADDRESS, vec![0u8; 9]).with_error(ErrorKind::Other),
            Transaction::read(SCD4X_I2C_ADDRESS, payload),
        ];
        let mut sensor = Scd4xAsync::new(I2cMock::new(&expectations), DelayRecorder::default());
        let measurement = block_on(sensor.read_measurement()).unwrap();
        assert_eq!(
            measurement,
            Measurement {
                co2_ppm: 800,
                temperature_millicelsius: 27_097,
                humidity_millipercent: 30_517,
            }
        );
        assert_eq!(finish(sensor), vec![100_000, 100_000]);
    }

    #[test]
    fn set_automatic_self_calibration_writes_word_and_settles() {
        let mut expected = Command::SetAutomaticSelfCalibration.to_be_bytes().to_vec();
        expected.extend_from_slice(&word_with_crc(1));
        let i2c = I2cMock::new(&[Transaction::write(SCD4X_I2C_ADDRESS, expected)]);
        let mut sensor = Scd4xAsync::new(i2c, DelayRecorder::default());
        block_on(sensor.set_automatic_self_calibration(true)).unwrap();
        assert_eq!(finish(sensor), vec![10_000]);
    }

    #[test]
    fn read_serial_number_assembles_words() {
        let mut payload = Vec::new();
        for word in [0x1000u16, 0x0100, 0x0010] {
            payload.extend_from_slice(&word_with_crc(word));
        }
        let expectations = [
            Transaction::write(SCD4X_I2C_ADDRESS, vec![0x36, 0x82]),
            Transaction::read(SCD4X_I2C_ADDRESS, payload),
        ];
        let mut sensor = Scd4xAsync::new(I2cMock::new(&expectations), DelayRecorder::default());
        assert_eq!(block_on(sensor.read_serial_number()).unwrap(), SerialNumber(0x10410));
        assert_eq!(finish(sensor), vec![10_000]);
    }

    #[test]
    fn invalid_pressure_sends_nothing() {
        let mut sensor = Scd4xAsync::new(I2cMock::new(&[]), DelayRecorder::default());
        assert_eq!(
            block_on(sensor.set_ambient_pressure(656)),
            Err(Error::InvalidInputData)
        );
        assert_eq!(finish(sensor), Vec::<u32>::new());
    }
}
