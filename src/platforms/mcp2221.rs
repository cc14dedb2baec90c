// MCP2221 USB-to-I2C bridge.
//
// The bridge shows up on the host as i2c-dev buses numbered 6..=9. Buses
// are opened on first use through the opener (e.g. a linux-embedded-hal
// `I2cdev::new("/dev/i2c-6")` wrapper) and then shared by every driver
// that borrows the adaptor. `finalize` drops all opened buses, which
// closes them.

use core::cell::{OnceCell, RefCell};

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use log::{debug, info};

use crate::bus::Connector;
use crate::device::{Name, make_name};
use crate::error::ConnectError;

pub const MIN_BUS: u8 = 6;
pub const MAX_BUS: u8 = 9;
pub const DEFAULT_BUS: u8 = 6;

const BUS_COUNT: usize = (MAX_BUS - MIN_BUS + 1) as usize;

fn slot(bus: u8) -> Result<usize, ConnectError> {
    if !(MIN_BUS..=MAX_BUS).contains(&bus) {
        return Err(ConnectError::BusOutOfRange(bus));
    }
    Ok((bus - MIN_BUS) as usize)
}

pub struct Mcp2221Adaptor<I2C, F> {
    name: Name,
    opener: RefCell<F>,
    buses: [OnceCell<RefCell<I2C>>; BUS_COUNT],
}

impl<I2C, F> Mcp2221Adaptor<I2C, F>
where
    I2C: I2c,
    F: FnMut(u8) -> Result<I2C, ConnectError>,
{
    pub fn new(opener: F) -> Self {
        Self {
            name: make_name("MCP2221"),
            opener: RefCell::new(opener),
            buses: [const { OnceCell::new() }; BUS_COUNT],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
    }

    /// Bus `bus`, opened on first request.
    pub fn bus(&self, bus: u8) -> Result<&RefCell<I2C>, ConnectError> {
        let cell = &self.buses[slot(bus)?];
        if cell.get().is_none() {
            debug!("mcp2221: open bus {}", bus);
            let opened = {
                let mut opener = self
                    .opener
                    .try_borrow_mut()
                    .map_err(|_| ConnectError::BusInUse)?;
                (*opener)(bus)?
            };
            // still empty: the opener borrow rules out reentrant opens
            let _ = cell.set(RefCell::new(opened));
        }
        cell.get().ok_or(ConnectError::OpenFailed(bus))
    }

    pub fn is_open(&self, bus: u8) -> bool {
        slot(bus).is_ok_and(|i| self.buses[i].get().is_some())
    }

    /// Closes every opened bus; returns how many were closed.
    pub fn finalize(&mut self) -> usize {
        let mut closed = 0;
        for (i, cell) in self.buses.iter_mut().enumerate() {
            if cell.take().is_some() {
                debug!("mcp2221: closed bus {}", MIN_BUS as usize + i);
                closed += 1;
            }
        }
        info!("mcp2221: finalized, {} bus(es) closed", closed);
        closed
    }
}

impl<'a, I2C, F> Connector for &'a Mcp2221Adaptor<I2C, F>
where
    I2C: I2c,
    F: FnMut(u8) -> Result<I2C, ConnectError>,
{
    type Bus = RefCellDevice<'a, I2C>;

    fn default_bus(&self) -> u8 {
        DEFAULT_BUS
    }

    fn connect(&mut self, bus: u8) -> Result<Self::Bus, ConnectError> {
        let adaptor: &'a Mcp2221Adaptor<I2C, F> = *self;
        Ok(RefCellDevice::new(adaptor.bus(bus)?))
    }
}
