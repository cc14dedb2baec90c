// Chip drivers, board-independent.
//
// Bus drivers take a Connector and open their Connection on start();
// GPIO drivers take embedded-hal pins. Board wiring lives in board/.

pub mod adafruit1109;
pub mod ads1x15;
pub mod hd44780;
pub mod hmc5883l;
pub mod mcp23017;
pub mod pca9501;
pub mod pca953x;
pub mod pcf8583;
pub mod pcf8591;
pub mod sc16is750;
pub mod servo;
pub mod vl53l0x;
