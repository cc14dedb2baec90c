// I2C plumbing shared by all bus drivers.
//
// A driver is built with a Connector (the adaptor that owns or shares the
// physical bus) and a Config (bus number / address overrides). On start()
// the driver asks the connector for a bus handle and binds it to the
// resolved address, giving a Connection with SMBus-style register access.

pub mod config;
pub mod connection;
pub mod connector;

pub use config::{Config, Configurable};
pub use connection::Connection;
pub use connector::{BusError, Connector, Exclusive, open};
