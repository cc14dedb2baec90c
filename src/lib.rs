// chipglue: drivers for small I2C and GPIO chips
//
// Drivers are generic over embedded-hal 1.0 traits. Bus drivers reach
// their chip through a Connector (exclusive bus, shared RefCell or
// critical-section bus, or a host adaptor in platforms/).

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod bus;
pub mod device;
pub mod drivers;
pub mod error;
pub mod platforms;
pub mod sysfs;
pub mod time;

#[cfg(feature = "esp32c3")]
pub mod board;

pub use bus::{BusError, Config, Configurable, Connection, Connector, Exclusive};
pub use device::{CommandError, Commander, Driver, Params, Value};
pub use error::{ConnectError, Error};
pub use time::DateTime;
