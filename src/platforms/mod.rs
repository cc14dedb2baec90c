// Host adaptors that hand out I2C buses to drivers.

pub mod mcp2221;

pub use mcp2221::Mcp2221Adaptor;
