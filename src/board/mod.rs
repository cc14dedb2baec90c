//! ESP32-C3 demo board support
//!
//! Maps the demo wiring (see `pins`) to ready-to-use bus and pin handles,
//! so firmware code never touches GPIO numbers.

pub mod pins;

use esp_hal::{
    Blocking,
    delay::Delay,
    gpio::{DriveMode, Flex, Level, Output, OutputConfig, Pull},
    i2c::master::{Config as I2cConfig, ConfigError, I2c},
    peripherals::Peripherals,
    time::Rate,
};

use crate::drivers::hd44780::{BusMode, GpioBus, Hd44780, NoPin};
use pins::{I2C_FREQ_KHZ, LCD_COLUMNS, LCD_ROWS};

// Type Aliases
pub type I2cBus = I2c<'static, Blocking>;
pub type LcdPins = GpioBus<Output<'static>, Output<'static>, NoPin, Flex<'static>, 4>;
pub type Lcd = Hd44780<LcdPins, Delay>;

/// Complete board hardware, ready for driver initialization.
pub struct Board {
    /// Blocking I2C0; wrap in a `RefCell` to share it between drivers.
    pub i2c: I2cBus,
    pub lcd: Lcd,
}

// Open-drain with pull-up: a released data line reads the controller's
// level once RW is wired.
fn data_pin(pin: Flex<'static>) -> Flex<'static> {
    let mut pin = pin;
    let cfg = OutputConfig::default()
        .with_drive_mode(DriveMode::OpenDrain)
        .with_pull(Pull::Up);
    pin.apply_output_config(&cfg);
    pin.set_output_enable(true);
    pin.set_input_enable(true);
    pin
}

impl Board {
    pub fn init(p: Peripherals) -> Result<Self, ConfigError> {
        let cfg = I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQ_KHZ));
        let i2c = I2c::new(p.I2C0, cfg)?
            .with_sda(p.GPIO4)
            .with_scl(p.GPIO5);

        let rs = Output::new(p.GPIO6, Level::Low, OutputConfig::default());
        let en = Output::new(p.GPIO7, Level::Low, OutputConfig::default());
        let data = [
            data_pin(Flex::new(p.GPIO0)),
            data_pin(Flex::new(p.GPIO1)),
            data_pin(Flex::new(p.GPIO2)),
            data_pin(Flex::new(p.GPIO3)),
        ];
        let lcd = Hd44780::new(
            GpioBus::new(rs, en, data),
            Delay::new(),
            LCD_COLUMNS,
            LCD_ROWS,
            BusMode::FourBit,
        );

        Ok(Board { i2c, lcd })
    }
}
