// PCA9501 8-bit quasi-bidirectional I/O expander with 2 kbit EEPROM
//
// The GPIO port has no registers: a write sets the port latch, a read
// returns the pin levels. A pin reads back as input when its latch bit
// is 1 (weak pull-up). The EEPROM answers on the GPIO address with bit 6
// set.
//
// Datasheet: https://www.nxp.com/docs/en/data-sheet/PCA9501.pdf

use embedded_hal::i2c::I2c;
use log::trace;

use crate::bus::{BusError, Config, Configurable, Connection, Connector, open};
use crate::device::{CommandError, Commander, Driver, Name, Params, Value, make_name};
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x04;

const MEM_ADDRESS_BIT: u8 = 0x40;

pub struct Pca9501<C: Connector> {
    name: Name,
    connector: C,
    config: Config,
    connection: Option<Connection<C::Bus>>,
}

impl<C: Connector> Pca9501<C> {
    pub fn new(connector: C) -> Self {
        Self {
            name: make_name("PCA9501"),
            connector,
            config: Config::new(),
            connection: None,
        }
    }

    fn conn(&mut self) -> Result<&mut Connection<C::Bus>, Error<BusError<C>>> {
        self.connection.as_mut().ok_or(Error::NotStarted)
    }

    fn mem_address(&mut self) -> Result<u8, Error<BusError<C>>> {
        Ok(self.conn()?.address() | MEM_ADDRESS_BIT)
    }

    /// Switches `pin` to output and drives it to `val` (0 or not 0).
    pub fn write_gpio(&mut self, pin: u8, val: u8) -> Result<(), Error<BusError<C>>> {
        let mask = pin_mask(pin)?;
        let conn = self.conn()?;

        let dir = conn.read_byte()?;
        conn.write_byte(dir & !mask)?;

        let port = conn.read_byte()?;
        let port = if val == 0 { port & !mask } else { port | mask };
        conn.write_byte(port)
    }

    /// Switches `pin` to input and returns its level as 0 or 1.
    pub fn read_gpio(&mut self, pin: u8) -> Result<u8, Error<BusError<C>>> {
        let mask = pin_mask(pin)?;
        let conn = self.conn()?;

        let dir = conn.read_byte()?;
        conn.write_byte(dir | mask)?;

        let port = conn.read_byte()?;
        Ok(u8::from(port & mask != 0))
    }

    pub fn read_eeprom(&mut self, address: u8) -> Result<u8, Error<BusError<C>>> {
        let mem = self.mem_address()?;
        let mut buf = [0u8; 1];
        self.conn()?
            .bus()
            .write_read(mem, &[address], &mut buf)
            .map_err(Error::Bus)?;
        trace!("pca9501: eeprom 0x{:02x} read 0x{:02x}", address, buf[0]);
        Ok(buf[0])
    }

    pub fn write_eeprom(&mut self, address: u8, val: u8) -> Result<(), Error<BusError<C>>> {
        let mem = self.mem_address()?;
        trace!("pca9501: eeprom 0x{:02x} write 0x{:02x}", address, val);
        self.conn()?
            .bus()
            .write(mem, &[address, val])
            .map_err(Error::Bus)
    }
}

fn pin_mask<E>(pin: u8) -> Result<u8, Error<E>> {
    if pin > 7 {
        return Err(Error::InvalidArgument("pin must be between 0 and 7"));
    }
    Ok(1 << pin)
}

impl<C: Connector> Configurable for Pca9501<C> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<C: Connector> Driver for Pca9501<C> {
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

const COMMANDS: &[&str] = &["WriteGPIO", "ReadGPIO", "ReadEEPROM", "WriteEEPROM"];

impl<C: Connector> Commander for Pca9501<C> {
    type BusError = BusError<C>;

    fn commands(&self) -> &'static [&'static str] {
        COMMANDS
    }

    fn command(
        &mut self,
        name: &str,
        params: &Params<'_>,
    ) -> Result<Value, CommandError<Self::BusError>> {
        match name {
            "WriteGPIO" => {
                self.write_gpio(params.u8("pin")?, params.u8("val")?)?;
                Ok(Value::None)
            }
            "ReadGPIO" => Ok(Value::U8(self.read_gpio(params.u8("pin")?)?)),
            "ReadEEPROM" => Ok(Value::U8(self.read_eeprom(params.u8("address")?)?)),
            "WriteEEPROM" => {
                self.write_eeprom(params.u8("address")?, params.u8("val")?)?;
                Ok(Value::None)
            }
            _ => Err(CommandError::Unknown),
        }
    }
}
