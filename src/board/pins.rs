//! GPIO |     Function    |      Notes
//! -----+-----------------+----------------------------------
//!  0   | LCD D4          | HD44780 data, 4-bit mode
//!  1   | LCD D5          |
//!  2   | LCD D6          | strapping pin, keep floating at boot
//!  3   | LCD D7          | busy flag when RW is wired
//!  4   | I2C0 SDA        | shared: PCF8591, PCF8583, expanders
//!  5   | I2C0 SCL        | 4.7K pull-ups on the sensor board
//!  6   | LCD RS          | register select
//!  7   | LCD EN          | enable, data latched on falling edge
//!      | LCD RW          | tied to GND (write-only)

// ----- I2C0 -----
pub const I2C_SDA: u8 = 4;
pub const I2C_SCL: u8 = 5;
pub const I2C_FREQ_KHZ: u32 = 100;

// ----- HD44780 (4-bit) -----
pub const LCD_RS: u8 = 6;
pub const LCD_EN: u8 = 7;
pub const LCD_D4: u8 = 0;
pub const LCD_D5: u8 = 1;
pub const LCD_D6: u8 = 2;
pub const LCD_D7: u8 = 3;

pub const LCD_COLUMNS: u8 = 16;
pub const LCD_ROWS: u8 = 2;
