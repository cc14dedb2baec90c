// MCP23017 16-bit I/O expander, register layout with IOCON.BANK = 0
//
// Each port has direction (IODIR, 1 = input), polarity, pull-up, port
// (GPIO) and output latch (OLAT) registers at interleaved addresses.
// Outputs are written through OLAT, inputs are read from GPIO.
//
// Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf

use log::debug;

use crate::bus::{BusError, Config, Configurable, Connection, Connector, open};
use crate::device::{CommandError, Commander, Driver, Name, Params, Value, make_name};
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x20;

#[allow(dead_code)]
mod reg {
    pub const IODIRA: u8 = 0x00;
    pub const IODIRB: u8 = 0x01;
    pub const IPOLA: u8 = 0x02;
    pub const IPOLB: u8 = 0x03;
    pub const GPINTENA: u8 = 0x04;
    pub const GPINTENB: u8 = 0x05;
    pub const DEFVALA: u8 = 0x06;
    pub const DEFVALB: u8 = 0x07;
    pub const INTCONA: u8 = 0x08;
    pub const INTCONB: u8 = 0x09;
    pub const IOCON: u8 = 0x0A;
    pub const GPPUA: u8 = 0x0C;
    pub const GPPUB: u8 = 0x0D;
    pub const INTFA: u8 = 0x0E;
    pub const INTFB: u8 = 0x0F;
    pub const INTCAPA: u8 = 0x10;
    pub const INTCAPB: u8 = 0x11;
    pub const GPIOA: u8 = 0x12;
    pub const GPIOB: u8 = 0x13;
    pub const OLATA: u8 = 0x14;
    pub const OLATB: u8 = 0x15;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Port {
    A,
    B,
}

impl Port {
    // bank 0: port B register follows port A register
    const fn reg(self, reg_a: u8) -> u8 {
        match self {
            Port::A => reg_a,
            Port::B => reg_a + 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinMode {
    Output = 0,
    Input = 1,
}

fn pin_mask<E>(pin: u8) -> Result<u8, Error<E>> {
    if pin > 7 {
        return Err(Error::InvalidArgument("pin must be between 0 and 7"));
    }
    Ok(1 << pin)
}

pub struct Mcp23017<C: Connector> {
    name: Name,
    connector: C,
    config: Config,
    connection: Option<Connection<C::Bus>>,
    auto_io_dir: bool,
    force_refresh: bool,
}

impl<C: Connector> Mcp23017<C> {
    pub fn new(connector: C) -> Self {
        Self {
            name: make_name("MCP23017"),
            connector,
            config: Config::new(),
            connection: None,
            auto_io_dir: true,
            force_refresh: false,
        }
    }

    /// Leave the pin direction alone on `write_gpio` / `read_gpio`.
    pub fn with_auto_io_dir_off(mut self) -> Self {
        self.auto_io_dir = false;
        self
    }

    /// Write registers even when the value would not change.
    pub fn with_force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    fn conn(&mut self) -> Result<&mut Connection<C::Bus>, Error<BusError<C>>> {
        self.connection.as_mut().ok_or(Error::NotStarted)
    }

    pub fn read_register(&mut self, reg: u8) -> Result<u8, Error<BusError<C>>> {
        self.conn()?.read_byte_data(reg)
    }

    pub fn write_register(&mut self, reg: u8, val: u8) -> Result<(), Error<BusError<C>>> {
        self.conn()?.write_byte_data(reg, val)
    }

    fn update_bit(&mut self, reg: u8, mask: u8, set: bool) -> Result<(), Error<BusError<C>>> {
        let old = self.read_register(reg)?;
        let new = if set { old | mask } else { old & !mask };
        if new == old && !self.force_refresh {
            debug!("mcp23017: write skipped, reg 0x{:02x} unchanged 0x{:02x}", reg, old);
            return Ok(());
        }
        self.write_register(reg, new)
    }

    pub fn pin_mode(
        &mut self,
        port: Port,
        pin: u8,
        mode: PinMode,
    ) -> Result<(), Error<BusError<C>>> {
        let mask = pin_mask(pin)?;
        self.update_bit(port.reg(reg::IODIRA), mask, mode == PinMode::Input)
    }

    /// Sets output `pin` high (val != 0) or low.
    pub fn write_gpio(
        &mut self,
        port: Port,
        pin: u8,
        val: u8,
    ) -> Result<(), Error<BusError<C>>> {
        let mask = pin_mask(pin)?;
        if self.auto_io_dir {
            self.pin_mode(port, pin, PinMode::Output)?;
        }
        self.update_bit(port.reg(reg::OLATA), mask, val != 0)
    }

    /// Level of `pin` as 0 or 1, after input polarity.
    pub fn read_gpio(&mut self, port: Port, pin: u8) -> Result<u8, Error<BusError<C>>> {
        let mask = pin_mask(pin)?;
        if self.auto_io_dir {
            self.pin_mode(port, pin, PinMode::Input)?;
        }
        let val = self.read_register(port.reg(reg::GPIOA))?;
        Ok(u8::from(val & mask != 0))
    }

    /// 100 kΩ pull-up on an input pin.
    pub fn set_pull_up(
        &mut self,
        port: Port,
        pin: u8,
        on: bool,
    ) -> Result<(), Error<BusError<C>>> {
        let mask = pin_mask(pin)?;
        self.update_bit(port.reg(reg::GPPUA), mask, on)
    }

    /// Inverted input polarity reads a low pin as 1.
    pub fn set_gpio_polarity(
        &mut self,
        port: Port,
        pin: u8,
        inverted: bool,
    ) -> Result<(), Error<BusError<C>>> {
        let mask = pin_mask(pin)?;
        self.update_bit(port.reg(reg::IPOLA), mask, inverted)
    }
}

impl<C: Connector> Configurable for Mcp23017<C> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<C: Connector> Driver for Mcp23017<C> {
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

fn port_param<E>(params: &Params<'_>) -> Result<Port, CommandError<E>> {
    match params.u8("port")? {
        0 => Ok(Port::A),
        1 => Ok(Port::B),
        _ => Err(CommandError::WrongType("port")),
    }
}

impl<C: Connector> Commander for Mcp23017<C> {
    type BusError = BusError<C>;

    fn commands(&self) -> &'static [&'static str] {
        &["WriteGPIO", "ReadGPIO"]
    }

    /// `port` is 0 for A and 1 for B.
    fn command(
        &mut self,
        name: &str,
        params: &Params<'_>,
    ) -> Result<Value, CommandError<Self::BusError>> {
        match name {
            "WriteGPIO" => {
                let port = port_param(params)?;
                self.write_gpio(port, params.u8("pin")?, params.u8("val")?)?;
                Ok(Value::None)
            }
            "ReadGPIO" => {
                let port = port_param(params)?;
                Ok(Value::U8(self.read_gpio(port, params.u8("pin")?)?))
            }
            _ => Err(CommandError::Unknown),
        }
    }
}
