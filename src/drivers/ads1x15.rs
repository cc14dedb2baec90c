// ADS1015 (12 bit) and ADS1115 (16 bit) delta-sigma ADCs
//
// Four single-ended or two/four differential inputs behind a multiplexer,
// programmable gain amplifier and selectable data rate. Every read is a
// single-shot conversion: write the config register with the OS bit set,
// wait until OS reads back set (conversion done), read the conversion
// register. Both chips left-align their result in 16 bits, so one scaling
// serves both.
//
// Datasheets:
// https://www.ti.com/lit/ds/symlink/ads1015.pdf
// https://www.ti.com/lit/ds/symlink/ads1115.pdf

use embedded_hal::delay::DelayNs;
use log::trace;

use crate::bus::{BusError, Config, Configurable, Connection, Connector, open};
use crate::device::{Driver, Name, make_name};
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x48;

const POINTER_CONVERSION: u8 = 0x00;
const POINTER_CONFIG: u8 = 0x01;

const CONFIG_OS_SINGLE: u16 = 0x8000;
const CONFIG_MUX_OFFSET: u16 = 12;
const CONFIG_MODE_SINGLE: u16 = 0x0100;
const CONFIG_COMP_QUE_DISABLE: u16 = 0x0003;

// gain code (0 stands for 2/3), PGA config bits, full scale voltage
const GAINS: [(u8, u16, f32); 6] = [
    (0, 0x0000, 6.144),
    (1, 0x0200, 4.096),
    (2, 0x0400, 2.048),
    (4, 0x0600, 1.024),
    (8, 0x0800, 0.512),
    (16, 0x0A00, 0.256),
];

const ADS1015_RATES: [(u16, u16); 7] = [
    (128, 0x0000),
    (250, 0x0020),
    (490, 0x0040),
    (920, 0x0060),
    (1600, 0x0080),
    (2400, 0x00A0),
    (3300, 0x00C0),
];

const ADS1115_RATES: [(u16, u16); 8] = [
    (8, 0x0000),
    (16, 0x0020),
    (32, 0x0040),
    (64, 0x0060),
    (128, 0x0080),
    (250, 0x00A0),
    (475, 0x00C0),
    (860, 0x00E0),
];

const DEFAULT_GAIN: u8 = 1;

const MAX_POLLS: u32 = 2000;
const POLL_INTERVAL_US: u32 = 100;

const INVALID_CHANNEL: &str = "Invalid channel, must be between 0 and 3";
const INVALID_GAIN: &str = "Gain must be one of: 2/3, 1, 2, 4, 8, 16";
const INVALID_RATE: &str = "Invalid data rate.";
const VOLTAGE_TOO_HIGH: &str = "The maximum voltage which can be read is 6.144";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chip {
    Ads1015,
    Ads1115,
}

impl Chip {
    fn rates(self) -> &'static [(u16, u16)] {
        match self {
            Chip::Ads1015 => &ADS1015_RATES,
            Chip::Ads1115 => &ADS1115_RATES,
        }
    }

    fn default_rate(self) -> u16 {
        match self {
            Chip::Ads1015 => 1600,
            Chip::Ads1115 => 128,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Chip::Ads1015 => "ADS1015",
            Chip::Ads1115 => "ADS1115",
        }
    }
}

/// Full scale voltage for a gain code (0 stands for 2/3).
pub fn gain_voltage<E>(gain: u8) -> Result<f32, Error<E>> {
    GAINS
        .iter()
        .find(|g| g.0 == gain)
        .map(|g| g.2)
        .ok_or(Error::InvalidArgument(INVALID_GAIN))
}

fn gain_config<E>(gain: u8) -> Result<u16, Error<E>> {
    GAINS
        .iter()
        .find(|g| g.0 == gain)
        .map(|g| g.1)
        .ok_or(Error::InvalidArgument(INVALID_GAIN))
}

/// Smallest full scale range that still covers `voltage`.
pub fn best_gain_for_voltage<E>(voltage: f32) -> Result<u8, Error<E>> {
    GAINS
        .iter()
        .filter(|g| g.2 >= voltage)
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|g| g.0)
        .ok_or(Error::InvalidArgument(VOLTAGE_TOO_HIGH))
}

enum Input {
    Single(u8),
    Difference(u8),
}

fn parse_description<E>(description: &str) -> Result<Input, Error<E>> {
    match description {
        "0-1" => Ok(Input::Difference(0)),
        "0-3" => Ok(Input::Difference(1)),
        "1-3" => Ok(Input::Difference(2)),
        "2-3" => Ok(Input::Difference(3)),
        "0" => Ok(Input::Single(0)),
        "1" => Ok(Input::Single(1)),
        "2" => Ok(Input::Single(2)),
        "3" => Ok(Input::Single(3)),
        _ => Err(Error::InvalidArgument(INVALID_CHANNEL)),
    }
}

pub struct Ads1x15<C: Connector, D> {
    name: Name,
    connector: C,
    config: Config,
    connection: Option<Connection<C::Bus>>,
    delay: D,
    chip: Chip,
    default_gain: u8,
    default_rate: u16,
    wait_single_cycle: bool,
}

impl<C: Connector, D: DelayNs> Ads1x15<C, D> {
    pub fn new(chip: Chip, connector: C, delay: D) -> Self {
        Self {
            name: make_name(chip.name()),
            connector,
            config: Config::new(),
            connection: None,
            delay,
            chip,
            default_gain: DEFAULT_GAIN,
            default_rate: chip.default_rate(),
            wait_single_cycle: false,
        }
    }

    pub fn ads1015(connector: C, delay: D) -> Self {
        Self::new(Chip::Ads1015, connector, delay)
    }

    pub fn ads1115(connector: C, delay: D) -> Self {
        Self::new(Chip::Ads1115, connector, delay)
    }

    /// Gain used by the `*_with_defaults` reads and `analog_read`.
    pub fn with_gain(mut self, gain: u8) -> Self {
        self.default_gain = gain;
        self
    }

    pub fn with_data_rate(mut self, rate: u16) -> Self {
        self.default_rate = rate;
        self
    }

    /// Sleep one conversion period instead of polling the OS bit.
    pub fn with_wait_single_cycle(mut self) -> Self {
        self.wait_single_cycle = true;
        self
    }

    pub fn chip(&self) -> Chip {
        self.chip
    }

    pub fn default_gain(&self) -> u8 {
        self.default_gain
    }

    pub fn default_data_rate(&self) -> u16 {
        self.default_rate
    }

    fn conn(&mut self) -> Result<&mut Connection<C::Bus>, Error<BusError<C>>> {
        self.connection.as_mut().ok_or(Error::NotStarted)
    }

    fn rate_config(&self, rate: u16) -> Result<u16, Error<BusError<C>>> {
        self.chip
            .rates()
            .iter()
            .find(|r| r.0 == rate)
            .map(|r| r.1)
            .ok_or(Error::InvalidArgument(INVALID_RATE))
    }

    /// Voltage of single-ended input `channel` (0..=3).
    pub fn read(&mut self, channel: u8, gain: u8, rate: u16) -> Result<f32, Error<BusError<C>>> {
        if channel > 3 {
            return Err(Error::InvalidArgument(INVALID_CHANNEL));
        }
        // single-ended inputs are mux 4..7
        self.raw_read(channel + 4, gain, rate)
    }

    /// Differential voltage; `diff` 0: 0-1, 1: 0-3, 2: 1-3, 3: 2-3.
    pub fn read_difference(
        &mut self,
        diff: u8,
        gain: u8,
        rate: u16,
    ) -> Result<f32, Error<BusError<C>>> {
        if diff > 3 {
            return Err(Error::InvalidArgument(INVALID_CHANNEL));
        }
        self.raw_read(diff, gain, rate)
    }

    pub fn read_with_defaults(&mut self, channel: u8) -> Result<f32, Error<BusError<C>>> {
        self.read(channel, self.default_gain, self.default_rate)
    }

    pub fn read_difference_with_defaults(&mut self, diff: u8) -> Result<f32, Error<BusError<C>>> {
        self.read_difference(diff, self.default_gain, self.default_rate)
    }

    /// Reads "0".."3" or "0-1", "0-3", "1-3", "2-3"; the result is scaled
    /// to 0..=1023 of the default gain's full scale.
    pub fn analog_read(&mut self, description: &str) -> Result<i32, Error<BusError<C>>> {
        let volts = match parse_description(description)? {
            Input::Single(ch) => self.read_with_defaults(ch)?,
            Input::Difference(d) => self.read_difference_with_defaults(d)?,
        };
        let full_scale = gain_voltage(self.default_gain)?;
        Ok((volts / full_scale * 1023.0) as i32)
    }

    /// One single-shot conversion on multiplexer setting `mux`.
    pub fn raw_read(&mut self, mux: u8, gain: u8, rate: u16) -> Result<f32, Error<BusError<C>>> {
        let full_scale = gain_voltage(gain)?;
        let config = CONFIG_OS_SINGLE
            | ((mux as u16 & 0x07) << CONFIG_MUX_OFFSET)
            | gain_config(gain)?
            | CONFIG_MODE_SINGLE
            | self.rate_config(rate)?
            | CONFIG_COMP_QUE_DISABLE;
        trace!("ads1x15: config 0x{:04x}", config);

        self.conn()?.write_word_data(POINTER_CONFIG, config)?;

        if self.wait_single_cycle {
            self.delay.delay_us(1_000_000 / rate as u32 + 100);
        } else {
            self.wait_for_conversion()?;
        }

        let raw = self.conn()?.read_word_data(POINTER_CONVERSION)? as i16;
        Ok(raw as f32 / 32768.0 * full_scale)
    }

    fn wait_for_conversion(&mut self) -> Result<(), Error<BusError<C>>> {
        for _ in 0..MAX_POLLS {
            let config = self.conn()?.read_word_data(POINTER_CONFIG)?;
            if config & CONFIG_OS_SINGLE != 0 {
                return Ok(());
            }
            self.delay.delay_us(POLL_INTERVAL_US);
        }
        Err(Error::Timeout)
    }
}

impl<C: Connector, D> Configurable for Ads1x15<C, D> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<C: Connector, D: DelayNs> Driver for Ads1x15<C, D> {
    type Error = Error<BusError<C>>;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.connection = Some(open(&mut self.connector, &self.config, DEFAULT_ADDRESS)?);
        Ok(())
    }

    fn halt(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_gain() {
        assert_eq!(best_gain_for_voltage::<()>(1.5), Ok(2));
        assert_eq!(best_gain_for_voltage::<()>(0.1), Ok(16));
        assert_eq!(best_gain_for_voltage::<()>(5.0), Ok(0));
        assert_eq!(
            best_gain_for_voltage::<()>(20.0),
            Err(Error::InvalidArgument(VOLTAGE_TOO_HIGH))
        );
    }

    #[test]
    fn gain_lookup() {
        assert_eq!(gain_voltage::<()>(0), Ok(6.144));
        assert_eq!(gain_config::<()>(16), Ok(0x0A00));
        assert_eq!(gain_voltage::<()>(21), Err(Error::InvalidArgument(INVALID_GAIN)));
    }
}
