// Hobby servo on a PWM output.
//
// Expects a 50 Hz (20 ms) PWM channel; the pulse width sets the angle,
// 0.5 ms for 0° up to 2.5 ms for 180°.

use core::convert::Infallible;

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use crate::device::{CommandError, Commander, Driver, Name, Params, Value, make_name};
use crate::error::Error;

const FRAME_US: u16 = 20_000;
const MIN_PULSE_US: u16 = 500;
const MAX_PULSE_US: u16 = 2_500;

pub const MAX_ANGLE: u8 = 180;

/// Pulse width in µs for `angle` (0..=180).
pub fn pulse_width_us(angle: u8) -> u16 {
    let angle = angle.min(MAX_ANGLE) as u32;
    let span = (MAX_PULSE_US - MIN_PULSE_US) as u32;
    MIN_PULSE_US + (angle * span / MAX_ANGLE as u32) as u16
}

pub struct Servo<P> {
    name: Name,
    pwm: P,
    angle: u8,
}

impl<P: SetDutyCycle> Servo<P> {
    pub fn new(pwm: P) -> Self {
        Self {
            name: make_name("Servo"),
            pwm,
            angle: 0,
        }
    }

    /// Last commanded angle.
    pub fn angle(&self) -> u8 {
        self.angle
    }

    pub fn move_to(&mut self, angle: u8) -> Result<(), Error<Infallible>> {
        if angle > MAX_ANGLE {
            return Err(Error::InvalidArgument("servo angle must be between 0 and 180"));
        }
        let pulse = pulse_width_us(angle);
        debug!("servo: {}° -> {} us", angle, pulse);
        self.pwm
            .set_duty_cycle_fraction(pulse, FRAME_US)
            .map_err(Error::pwm)?;
        self.angle = angle;
        Ok(())
    }

    pub fn min(&mut self) -> Result<(), Error<Infallible>> {
        self.move_to(0)
    }

    pub fn center(&mut self) -> Result<(), Error<Infallible>> {
        self.move_to(MAX_ANGLE / 2)
    }

    pub fn max(&mut self) -> Result<(), Error<Infallible>> {
        self.move_to(MAX_ANGLE)
    }

    pub fn pwm(&mut self) -> &mut P {
        &mut self.pwm
    }
}

impl<P: SetDutyCycle> Driver for Servo<P> {
    type Error = Error<Infallible>;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn halt(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<P: SetDutyCycle> Commander for Servo<P> {
    type BusError = Infallible;

    fn commands(&self) -> &'static [&'static str] {
        &["Move", "Min", "Center", "Max", "CurrentAngle"]
    }

    fn command(
        &mut self,
        name: &str,
        params: &Params<'_>,
    ) -> Result<Value, CommandError<Self::BusError>> {
        match name {
            "Move" => self.move_to(params.u8("angle")?)?,
            "Min" => self.min()?,
            "Center" => self.center()?,
            "Max" => self.max()?,
            "CurrentAngle" => return Ok(Value::U8(self.angle)),
            _ => return Err(CommandError::Unknown),
        }
        Ok(Value::None)
    }
}
