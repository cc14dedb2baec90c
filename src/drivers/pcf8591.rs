// PCF8591 8-bit A/D and D/A converter
//
// Four analog inputs usable as single-ended or differential channels,
// one analog output. The chip has no registers: the first byte of a
// write is the control byte, an optional second byte is the DAC value.
// A read returns the conversion started by the previous read, so the
// first bytes after a mode change are stale and get discarded.
//
// Datasheet: https://www.nxp.com/docs/en/data-sheet/PCF8591.pdf

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::bus::{BusError, Config, Configurable, Connection, Connector, open};
use crate::device::{Driver, Name, make_name};
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x48;

const AION: u8 = 0x04; // auto increment, ADC only
const ANAON: u8 = 0x40; // analog output enable
const ADMASK: u8 = 0x33; // channel and mode bits

const DEFAULT_SKIP: u8 = 2;
const DEFAULT_MAX_MV: i32 = 3300;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    AllSingle = 0x00,
    ThreeDiff = 0x10,
    Mixed = 0x20,
    TwoDiff = 0x30,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeChannel {
    pub mode: Mode,
    pub channel: u8,
}

impl ModeChannel {
    /// Differential inputs deliver two's complement values.
    pub fn is_diff(&self) -> bool {
        match self.mode {
            Mode::TwoDiff | Mode::ThreeDiff => true,
            Mode::Mixed => self.channel == 2,
            Mode::AllSingle => false,
        }
    }
}

const MODE_MAP: &[(&str, Mode, u8)] = &[
    ("s.0", Mode::AllSingle, 0),
    ("0", Mode::AllSingle, 0),
    ("s.1", Mode::AllSingle, 1),
    ("1", Mode::AllSingle, 1),
    ("s.2", Mode::AllSingle, 2),
    ("2", Mode::AllSingle, 2),
    ("s.3", Mode::AllSingle, 3),
    ("3", Mode::AllSingle, 3),
    ("d.0-1", Mode::TwoDiff, 0),
    ("0-1", Mode::TwoDiff, 0),
    ("d.2-3", Mode::TwoDiff, 1),
    ("m.0", Mode::Mixed, 0),
    ("m.1", Mode::Mixed, 1),
    ("m.2-3", Mode::Mixed, 2),
    ("t.0-3", Mode::ThreeDiff, 0),
    ("0-3", Mode::ThreeDiff, 0),
    ("t.1-3", Mode::ThreeDiff, 1),
    ("1-3", Mode::ThreeDiff, 1),
    ("t.2-3", Mode::ThreeDiff, 2),
];

const UNKNOWN_DESCRIPTION: &str = "unknown description for analog read, accepted values: \
    s.0, 0, s.1, 1, s.2, 2, s.3, 3, d.0-1, 0-1, d.2-3, m.0, m.1, m.2-3, \
    t.0-3, 0-3, t.1-3, 1-3, t.2-3";

pub fn parse_mode_channel<E>(description: &str) -> Result<ModeChannel, Error<E>> {
    MODE_MAP
        .iter()
        .find(|(d, _, _)| *d == description)
        .map(|&(_, mode, channel)| ModeChannel { mode, channel })
        .ok_or(Error::InvalidArgument(UNKNOWN_DESCRIPTION))
}

/// Linear mapping of `input` from one range to another; input is clamped.
pub fn rescale(input: i32, from_min: i32, from_max: i32, to_min: i32, to_max: i32) -> i32 {
    if from_max == from_min {
        return to_min;
    }
    let input = input.max(from_min).min(from_max) as i64;
    let (from_min, from_max) = (from_min as i64, from_max as i64);
    let (to_min, to_max) = (to_min as i64, to_max as i64);
    // clamped input keeps the result between to_min and to_max
    ((input - from_min) * (to_max - to_min) / (from_max - from_min) + to_min) as i32
}

pub struct Pcf8591<C: Connector, D> {
    name: Name,
    connector: C,
    config: Config,
    connection: Option<Connection<C::Bus>>,
    delay: D,
    last_ctrl: Option<u8>,
    last_out: Option<u8>,
    additional_skip: u8,
    to_min: [i32; 4],
    to_max: [i32; 4],
    from_min: i32,
    from_max: i32,
}

impl<C: Connector, D: DelayNs> Pcf8591<C, D> {
    pub fn new(connector: C, delay: D) -> Self {
        Self {
            name: make_name("PCF8591"),
            connector,
            config: Config::new(),
            connection: None,
            delay,
            last_ctrl: None,
            last_out: None,
            additional_skip: DEFAULT_SKIP,
            to_min: [0; 4],
            to_max: [DEFAULT_MAX_MV; 4],
            from_min: 0,
            from_max: DEFAULT_MAX_MV,
        }
    }

    /// Bytes discarded after the mandatory stale one before the real read.
    pub fn with_additional_skip(mut self, skip: u8) -> Self {
        self.additional_skip = skip;
        self
    }

    /// Map the full ADC range of `channel` onto `to_min..=to_max`.
    pub fn with_rescale_input(mut self, channel: u8, to_min: i32, to_max: i32) -> Self {
        let ch = (channel & 0x03) as usize;
        self.to_min[ch] = to_min;
        self.to_max[ch] = to_max;
        self
    }

    /// Input range of `analog_write` mapped onto the DAC's 0..=255.
    pub fn with_rescale_output(mut self, from_min: i32, from_max: i32) -> Self {
        self.from_min = from_min;
        self.from_max = from_max;
        self
    }

    fn conn(&mut self) -> Result<&mut Connection<C::Bus>, Error<BusError<C>>> {
        self.connection.as_mut().ok_or(Error::NotStarted)
    }

    /// Reads one input, scaled to millivolts (or the configured range).
    pub fn analog_read(&mut self, description: &str) -> Result<i32, Error<BusError<C>>> {
        let mc = parse_mode_channel(description)?;

        let ctrl = (self.last_ctrl.unwrap_or(0) & !ADMASK) | mc.mode as u8 | (mc.channel & !AION);
        self.write_ctrl(ctrl)?;

        let mut skip = [0u8; 1 + u8::MAX as usize];
        let n = 1 + self.additional_skip as usize;
        self.conn()?.read(&mut skip[..n])?;

        self.delay.delay_ms(1);

        let raw = self.conn()?.read_byte()?;
        Ok(self.rescale_input(raw, mc))
    }

    /// Sets the DAC output; a repeated value is not written again.
    pub fn analog_write(&mut self, value: i32) -> Result<(), Error<BusError<C>>> {
        let out = rescale(value, self.from_min, self.from_max, 0, 255) as u8;
        if self.last_out == Some(out) {
            debug!("pcf8591: write skipped, value unchanged 0x{:02x}", out);
            return Ok(());
        }

        let ctrl = self.last_ctrl.unwrap_or(0) | ANAON;
        self.conn()?.write_byte_data(ctrl, out)?;
        self.last_ctrl = Some(ctrl);
        self.last_out = Some(out);
        Ok(())
    }

    pub fn analog_output_state(&mut self, on: bool) -> Result<(), Error<BusError<C>>> {
        let last = self.last_ctrl.unwrap_or(0);
        let ctrl = if on { last | ANAON } else { last & !ANAON };
        self.write_ctrl(ctrl)
    }

    fn write_ctrl(&mut self, ctrl: u8) -> Result<(), Error<BusError<C>>> {
        if self.last_ctrl == Some(ctrl) {
            debug!("pcf8591: write skipped, control byte unchanged 0x{:02x}", ctrl);
            return Ok(());
        }
        self.conn()?.write_byte(ctrl)?;
        self.last_ctrl = Some(ctrl);
        Ok(())
    }

    fn rescale_input(&self, raw: u8, mc: ModeChannel) -> i32 {
        let ch = mc.channel as usize;
        if mc.is_diff() {
            rescale(raw as i8 as i32, -128, 127, self.to_min[ch], self.to_max[ch])
        } else {
            rescale(raw as i32, 0, 255, self.to_min[ch], self.to_max[ch])
        }
    }
}

impl<C: Connector, D> Configurable for Pcf8591<C, D> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<C: Connector, D: DelayNs> Driver for Pcf8591<C, D> {
    type Error = Error<BusError<C>>;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.connection = Some(open(&mut self.connector, &self.config, DEFAULT_ADDRESS)?);
        self.analog_output_state(false)
    }

    fn halt(&mut self) -> Result<(), Self::Error> {
        self.analog_output_state(false)
    }
}
