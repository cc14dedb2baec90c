// HMC5883L 3-axis digital compass
//
// Config register A holds averaging, output rate and bias, B the gain.
// Data registers are X, Z, Y (not X, Y, Z), each 16 bit MSB first and
// limited to -2048..2047 by the 12-bit ADC (-4096 signals overflow).
//
// Datasheet: https://cdn-shop.adafruit.com/datasheets/HMC5883L_3-Axis_Digital_Compass_IC.pdf

use core::f32::consts::PI;

use micromath::F32Ext;

use crate::bus::{BusError, Config, Configurable, Connection, Connector, open};
use crate::device::{Driver, Name, make_name};
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x1E;

const REG_A: u8 = 0x00;
const REG_B: u8 = 0x01;
const REG_MODE: u8 = 0x02;
const REG_AXIS_X: u8 = 0x03;

const MODE_CONTINUOUS: u8 = 0x00;
const MODE_SINGLE: u8 = 0x01;

const SAMPLES_AVG_BITS: [(u8, u8); 4] = [(1, 0), (2, 1), (4, 2), (8, 3)];

// typical output rate in mHz
const OUTPUT_RATE_BITS: [(u32, u8); 7] = [
    (750, 0),
    (1500, 1),
    (3000, 2),
    (7500, 3),
    (15000, 4),
    (30000, 5),
    (75000, 6),
];

const BIAS_BITS: [(i8, u8); 3] = [(0, 0), (1, 1), (-1, 2)];

// LSB per gauss
const GAIN_BITS: [(u16, u8); 8] = [
    (1370, 0),
    (1090, 1),
    (820, 2),
    (660, 3),
    (440, 4),
    (390, 5),
    (330, 6),
    (230, 7),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeasurementMode {
    #[default]
    Continuous,
    Single,
}

fn lookup<K: PartialEq + Copy, E>(
    table: &[(K, u8)],
    key: K,
    msg: &'static str,
) -> Result<u8, Error<E>> {
    table
        .iter()
        .find(|e| e.0 == key)
        .map(|e| e.1)
        .ok_or(Error::InvalidArgument(msg))
}

/// Heading in radians 0..2π from the horizontal field components.
pub fn heading_from(x: f32, y: f32) -> f32 {
    let heading = F32Ext::atan2(y, x);
    if heading < 0.0 { heading + 2.0 * PI } else { heading }
}

pub struct Hmc5883l<C: Connector> {
    name: Name,
    connector: C,
    config: Config,
    connection: Option<Connection<C::Bus>>,
    samples_avg: u8,
    output_rate: u32,
    apply_bias: i8,
    gain: u16,
    mode: MeasurementMode,
}

impl<C: Connector> Hmc5883l<C> {
    pub fn new(connector: C) -> Self {
        Self {
            name: make_name("HMC5883L"),
            connector,
            config: Config::new(),
            connection: None,
            samples_avg: 8,
            output_rate: 15000,
            apply_bias: 0,
            gain: 390,
            mode: MeasurementMode::default(),
        }
    }

    /// 1, 2, 4 or 8 samples per output.
    pub fn with_samples_averaged(mut self, n: u8) -> Self {
        self.samples_avg = n;
        self
    }

    /// Output rate in mHz (750 up to 75000).
    pub fn with_output_rate(mut self, mhz: u32) -> Self {
        self.output_rate = mhz;
        self
    }

    /// 0 normal, 1 positive, -1 negative bias.
    pub fn with_bias(mut self, bias: i8) -> Self {
        self.apply_bias = bias;
        self
    }

    /// Gain in LSB per gauss (1370 down to 230).
    pub fn with_gain(mut self, gain: u16) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_measurement_mode(mut self, mode: MeasurementMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn gain(&self) -> u16 {
        self.gain
    }

    fn conn(&mut self) -> Result<&mut Connection<C::Bus>, Error<BusError<C>>> {
        self.connection.as_mut().ok_or(Error::NotStarted)
    }

    fn config_registers(&self) -> Result<[u8; 3], Error<BusError<C>>> {
        let avg = lookup(
            &SAMPLES_AVG_BITS,
            self.samples_avg,
            "samples averaged must be 1, 2, 4 or 8",
        )?;
        let rate = lookup(&OUTPUT_RATE_BITS, self.output_rate, "unsupported output rate")?;
        let bias = lookup(&BIAS_BITS, self.apply_bias, "bias must be 0, 1 or -1")?;
        let gain = lookup(&GAIN_BITS, self.gain, "unsupported gain")?;
        let mode = match self.mode {
            MeasurementMode::Continuous => MODE_CONTINUOUS,
            MeasurementMode::Single => MODE_SINGLE,
        };
        Ok([avg << 5 | rate << 2 | bias, gain << 5, mode])
    }

    /// Raw X, Y, Z readings.
    pub fn read_raw_data(&mut self) -> Result<(i16, i16, i16), Error<BusError<C>>> {
        let mut data = [0u8; 6];
        self.conn()?.read_block_data(REG_AXIS_X, &mut data)?;
        let x = i16::from_be_bytes([data[0], data[1]]);
        let z = i16::from_be_bytes([data[2], data[3]]);
        let y = i16::from_be_bytes([data[4], data[5]]);
        Ok((x, y, z))
    }

    /// Field strength X, Y, Z in gauss.
    pub fn read(&mut self) -> Result<(f32, f32, f32), Error<BusError<C>>> {
        let (x, y, z) = self.read_raw_data()?;
        let gain = self.gain as f32;
        Ok((x as f32 / gain, y as f32 / gain, z as f32 / gain))
    }

    /// Heading in radians 0..2π; only meaningful with the chip held level.
    pub fn heading(&mut self) -> Result<f32, Error<BusError<C>>> {
        let (x, y, _) = self.read_raw_data()?;
        Ok(heading_from(x as f32, y as f32))
    }
}

impl<C: Connector> Configurable for Hmc5883l<C> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<C: Connector> Driver for Hmc5883l<C> {
    type Error = Error<BusError<C>>;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        let [a, b, mode] = self.config_registers()?;
        self.connection = Some(open(&mut self.connector, &self.config, DEFAULT_ADDRESS)?);
        let conn = self.conn()?;
        conn.write_byte_data(REG_A, a)?;
        conn.write_byte_data(REG_B, b)?;
        conn.write_byte_data(REG_MODE, mode)
    }

    fn halt(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_quadrants() {
        assert!(heading_from(1.0, 0.0).abs() < 0.01);
        assert!((heading_from(0.0, 1.0) - PI / 2.0).abs() < 0.01);
        assert!((heading_from(-1.0, 0.0) - PI).abs() < 0.01);
        assert!((heading_from(0.0, -1.0) - 3.0 * PI / 2.0).abs() < 0.01);
    }
}
