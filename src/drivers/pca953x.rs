// PCA9530/31/32/33 LED dimmers used as GPIO and two-channel PWM
//
// Each output is selected by two bits in LS0 (LED 0..3) or LS1 (LED 4..7):
// off (high impedance, reads high), on (driven low), or blinking at the
// rate of prescaler/PWM pair 0 or 1. The blink period is (PSC + 1) / 152 s,
// the duty cycle PWM / 256.
//
// Datasheet: https://www.nxp.com/docs/en/data-sheet/PCA9533.pdf

use log::warn;

use crate::bus::{BusError, Config, Configurable, Connection, Connector, open};
use crate::device::{CommandError, Commander, Driver, Name, Params, Value, make_name};
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x63;

#[allow(dead_code)]
mod reg {
    pub const INPUT: u8 = 0x00;
    pub const PSC0: u8 = 0x01;
    pub const PWM0: u8 = 0x02;
    pub const PSC1: u8 = 0x03;
    pub const PWM1: u8 = 0x04;
    pub const LS0: u8 = 0x05;
    pub const LS1: u8 = 0x06; // PCA9531, PCA9532 only
}

const AI_MASK: u8 = 0x10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GpioMode {
    /// output off, pin floats high
    High = 0x00,
    /// output on, pin driven low
    Low = 0x01,
    Pwm0 = 0x02,
    Pwm1 = 0x03,
}

impl GpioMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0x00 => GpioMode::High,
            0x01 => GpioMode::Low,
            0x02 => GpioMode::Pwm0,
            _ => GpioMode::Pwm1,
        }
    }
}

/// A computed register value fell outside the chip's range; carries the
/// clamped value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutOfRange {
    TooSmall(u8),
    TooBig(u8),
}

impl OutOfRange {
    pub fn clamped(self) -> u8 {
        match self {
            OutOfRange::TooSmall(v) | OutOfRange::TooBig(v) => v,
        }
    }
}

/// Prescaler for a blink period; valid from 1/152 s up to 256/152 s.
pub fn calc_psc(period_s: f32) -> Result<u8, OutOfRange> {
    let psc = 152.0 * period_s - 1.0;
    if psc < 0.0 {
        return Err(OutOfRange::TooSmall(0));
    }
    if psc > 255.0 {
        return Err(OutOfRange::TooBig(255));
    }
    Ok((psc + 0.5) as u8)
}

pub fn calc_period(psc: u8) -> f32 {
    (psc as f32 + 1.0) / 152.0
}

pub fn calc_pwm(percent: f32) -> Result<u8, OutOfRange> {
    let pwm = 255.0 * percent / 100.0;
    if pwm < 0.0 {
        return Err(OutOfRange::TooSmall(0));
    }
    if pwm > 255.0 {
        return Err(OutOfRange::TooBig(255));
    }
    Ok((pwm + 0.5) as u8)
}

pub fn calc_duty_cycle_percent(pwm: u8) -> f32 {
    100.0 * pwm as f32 / 255.0
}

fn psc_register(idx: u8) -> u8 {
    if idx > 0 { reg::PSC1 } else { reg::PSC0 }
}

fn pwm_register(idx: u8) -> u8 {
    if idx > 0 { reg::PWM1 } else { reg::PWM0 }
}

pub struct Pca953x<C: Connector> {
    name: Name,
    connector: C,
    config: Config,
    connection: Option<Connection<C::Bus>>,
}

impl<C: Connector> Pca953x<C> {
    pub fn new(connector: C) -> Self {
        Self {
            name: make_name("PCA953x"),
            connector,
            config: Config::new(),
            connection: None,
        }
    }

    fn conn(&mut self) -> Result<&mut Connection<C::Bus>, Error<BusError<C>>> {
        self.connection.as_mut().ok_or(Error::NotStarted)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, Error<BusError<C>>> {
        self.conn()?.read_byte_data(reg & !AI_MASK)
    }

    fn write_register(&mut self, reg: u8, val: u8) -> Result<(), Error<BusError<C>>> {
        self.conn()?.write_byte_data(reg & !AI_MASK, val)
    }

    /// Sets the LED selector bits of output `idx` (0..=7).
    pub fn write_gpio(&mut self, idx: u8, mode: GpioMode) -> Result<(), Error<BusError<C>>> {
        if idx > 7 {
            return Err(Error::InvalidArgument("LED index must be between 0 and 7"));
        }
        let (reg, shift) = if idx > 3 {
            (reg::LS1, (idx - 4) * 2)
        } else {
            (reg::LS0, idx * 2)
        };
        let ls = self.read_register(reg)?;
        let ls = ls & !(0x03 << shift) | (mode as u8) << shift;
        self.write_register(reg, ls)
    }

    /// Current selector mode of output `idx`.
    pub fn gpio_mode(&mut self, idx: u8) -> Result<GpioMode, Error<BusError<C>>> {
        if idx > 7 {
            return Err(Error::InvalidArgument("LED index must be between 0 and 7"));
        }
        let (reg, shift) = if idx > 3 {
            (reg::LS1, (idx - 4) * 2)
        } else {
            (reg::LS0, idx * 2)
        };
        Ok(GpioMode::from_bits(self.read_register(reg)? >> shift))
    }

    /// Input level of pin `idx` as 0 or 1.
    pub fn read_gpio(&mut self, idx: u8) -> Result<u8, Error<BusError<C>>> {
        if idx > 7 {
            return Err(Error::InvalidArgument("LED index must be between 0 and 7"));
        }
        let val = self.read_register(reg::INPUT)?;
        Ok(u8::from(val & (1 << idx) != 0))
    }

    pub fn write_period(&mut self, idx: u8, period_s: f32) -> Result<(), Error<BusError<C>>> {
        let psc = calc_psc(period_s).unwrap_or_else(|e| {
            warn!("pca953x: period {} s out of range ({:?}), limited", period_s, e);
            e.clamped()
        });
        self.write_register(psc_register(idx), psc)
    }

    pub fn period(&mut self, idx: u8) -> Result<f32, Error<BusError<C>>> {
        let psc = self.read_register(psc_register(idx))?;
        Ok(calc_period(psc))
    }

    pub fn write_frequency(&mut self, idx: u8, hz: f32) -> Result<(), Error<BusError<C>>> {
        if hz <= 0.0 {
            return Err(Error::InvalidArgument("frequency must be positive"));
        }
        self.write_period(idx, 1.0 / hz)
    }

    pub fn frequency(&mut self, idx: u8) -> Result<f32, Error<BusError<C>>> {
        Ok(1.0 / self.period(idx)?)
    }

    pub fn write_duty_cycle_percent(
        &mut self,
        idx: u8,
        percent: f32,
    ) -> Result<(), Error<BusError<C>>> {
        let pwm = calc_pwm(percent).unwrap_or_else(|e| {
            warn!("pca953x: duty cycle {}% out of range ({:?}), limited", percent, e);
            e.clamped()
        });
        self.write_register(pwm_register(idx), pwm)
    }

    pub fn duty_cycle_percent(&mut self, idx: u8) -> Result<f32, Error<BusError<C>>> {
        let pwm = self.read_register(pwm_register(idx))?;
        Ok(calc_duty_cycle_percent(pwm))
    }
}

impl<C: Connector> Configurable for Pca953x<C> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<C: Connector> Driver for Pca953x<C> {
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

impl<C: Connector> Commander for Pca953x<C> {
    type BusError = BusError<C>;

    fn commands(&self) -> &'static [&'static str] {
        &["WriteGPIO", "ReadGPIO"]
    }

    fn command(
        &mut self,
        name: &str,
        params: &Params<'_>,
    ) -> Result<Value, CommandError<Self::BusError>> {
        match name {
            "WriteGPIO" => {
                let idx = params.u8("idx")?;
                let mode = GpioMode::from_bits(params.u8("mode")?);
                self.write_gpio(idx, mode)?;
                Ok(Value::None)
            }
            "ReadGPIO" => Ok(Value::U8(self.read_gpio(params.u8("idx")?)?)),
            _ => Err(CommandError::Unknown),
        }
    }
}
