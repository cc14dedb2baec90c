// Connectors hand out bus handles to drivers.
//
// Shared connectors wrap the bus in a RefCell (single context) or a
// critical-section mutex (shared with interrupt handlers) and hand out
// embedded-hal-bus devices, so several drivers can live on one bus.

use core::cell::RefCell;

use embedded_hal::i2c::{ErrorType, I2c};
use embedded_hal_bus::i2c::{CriticalSectionDevice, RefCellDevice};
use log::debug;

use super::{Config, Connection};
use crate::error::ConnectError;

pub trait Connector {
    type Bus: I2c;

    /// Bus used when the driver config does not name one.
    fn default_bus(&self) -> u8;

    fn connect(&mut self, bus: u8) -> Result<Self::Bus, ConnectError>;
}

/// Error type of the bus handed out by connector `C`.
pub type BusError<C> = <<C as Connector>::Bus as ErrorType>::Error;

/// Resolve bus and address from `config` and connect.
pub fn open<C: Connector>(
    connector: &mut C,
    config: &Config,
    default_address: u8,
) -> Result<Connection<C::Bus>, ConnectError> {
    let bus = config.bus_or_default(connector.default_bus());
    let address = config.address_or_default(default_address);
    debug!("connect bus {} address 0x{:02x}", bus, address);
    Ok(Connection::new(connector.connect(bus)?, address))
}

/// Owns one bus and hands it to exactly one driver.
pub struct Exclusive<I2C> {
    bus: Option<I2C>,
}

impl<I2C: I2c> Exclusive<I2C> {
    pub fn new(bus: I2C) -> Self {
        Self { bus: Some(bus) }
    }
}

impl<I2C: I2c> Connector for Exclusive<I2C> {
    type Bus = I2C;

    fn default_bus(&self) -> u8 {
        0
    }

    fn connect(&mut self, bus: u8) -> Result<I2C, ConnectError> {
        if bus != 0 {
            return Err(ConnectError::BusOutOfRange(bus));
        }
        self.bus.take().ok_or(ConnectError::BusInUse)
    }
}

impl<'a, I2C: I2c> Connector for &'a RefCell<I2C> {
    type Bus = RefCellDevice<'a, I2C>;

    fn default_bus(&self) -> u8 {
        0
    }

    fn connect(&mut self, bus: u8) -> Result<Self::Bus, ConnectError> {
        if bus != 0 {
            return Err(ConnectError::BusOutOfRange(bus));
        }
        Ok(RefCellDevice::new(*self))
    }
}

impl<'a, I2C: I2c> Connector for &'a critical_section::Mutex<RefCell<I2C>> {
    type Bus = CriticalSectionDevice<'a, I2C>;

    fn default_bus(&self) -> u8 {
        0
    }

    fn connect(&mut self, bus: u8) -> Result<Self::Bus, ConnectError> {
        if bus != 0 {
            return Err(ConnectError::BusOutOfRange(bus));
        }
        Ok(CriticalSectionDevice::new(*self))
    }
}
