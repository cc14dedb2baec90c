// Bus number and device address overrides for a driver.
//
// Unset fields fall back to the connector's default bus and the chip's
// default address when the driver starts.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    bus: Option<u8>,
    address: Option<u8>,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            bus: None,
            address: None,
        }
    }

    pub fn set_bus(&mut self, bus: u8) {
        self.bus = Some(bus);
    }

    pub fn set_address(&mut self, address: u8) {
        self.address = Some(address);
    }

    pub fn bus_or_default(&self, default: u8) -> u8 {
        self.bus.unwrap_or(default)
    }

    pub fn address_or_default(&self, default: u8) -> u8 {
        self.address.unwrap_or(default)
    }
}

/// Builder-style bus/address options available on every bus driver.
pub trait Configurable {
    fn config(&self) -> &Config;
    fn config_mut(&mut self) -> &mut Config;

    fn with_bus(mut self, bus: u8) -> Self
    where
        Self: Sized,
    {
        self.config_mut().set_bus(bus);
        self
    }

    fn with_address(mut self, address: u8) -> Self
    where
        Self: Sized,
    {
        self.config_mut().set_address(address);
        self
    }
}
