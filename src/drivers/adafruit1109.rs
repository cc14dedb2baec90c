// Adafruit 1109 RGB LCD plate: 16x2 HD44780 behind an MCP23017
//
// Wiring on the expander:
//   port A: 0 select, 1 right, 2 down, 3 up, 4 left (buttons), 6 red, 7 green
//   port B: 0 blue, 1..4 D7..D4, 5 EN, 6 RW, 7 RS
// Backlight LEDs are active low and cannot be dimmed. Buttons pull to GND,
// so they get pull-ups and inverted polarity (pressed reads 1). RW is
// held low: the LCD runs write-only with fixed delays.

use embedded_hal::delay::DelayNs;
use log::debug;

use super::hd44780::{BusMode, Hd44780, LcdBus, Line};
use super::mcp23017::{Mcp23017, PinMode, Port};
use crate::bus::{BusError, Config, Configurable, Connector};
use crate::device::{Driver, Name, make_name};
use crate::error::Error;

const COLUMNS: u8 = 16;
const ROWS: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PortPin {
    port: Port,
    pin: u8,
}

const fn pp(port: Port, pin: u8) -> PortPin {
    PortPin { port, pin }
}

const RED: PortPin = pp(Port::A, 6);
const GREEN: PortPin = pp(Port::A, 7);
const BLUE: PortPin = pp(Port::B, 0);

const SELECT: PortPin = pp(Port::A, 0);
const RIGHT: PortPin = pp(Port::A, 1);
const DOWN: PortPin = pp(Port::A, 2);
const UP: PortPin = pp(Port::A, 3);
const LEFT: PortPin = pp(Port::A, 4);

const RS: PortPin = pp(Port::B, 7);
const RW: PortPin = pp(Port::B, 6);
const EN: PortPin = pp(Port::B, 5);
// D4, D5, D6, D7
const DATA: [PortPin; 4] = [
    pp(Port::B, 4),
    pp(Port::B, 3),
    pp(Port::B, 2),
    pp(Port::B, 1),
];

/// LCD lines routed through the expander's output latches.
pub struct PlateBus<C: Connector> {
    mcp: Mcp23017<C>,
}

impl<C: Connector> PlateBus<C> {
    pub fn expander(&self) -> &Mcp23017<C> {
        &self.mcp
    }

    pub fn expander_mut(&mut self) -> &mut Mcp23017<C> {
        &mut self.mcp
    }

    fn resolve(line: Line) -> Result<PortPin, Error<BusError<C>>> {
        match line {
            Line::Rs => Ok(RS),
            Line::En => Ok(EN),
            Line::Rw => Ok(RW),
            Line::Data(i) => DATA
                .get(i as usize)
                .copied()
                .ok_or(Error::InvalidArgument("no such data line")),
        }
    }
}

impl<C: Connector> LcdBus for PlateBus<C> {
    type BusError = BusError<C>;

    fn set(&mut self, line: Line, high: bool) -> Result<(), Error<BusError<C>>> {
        let p = Self::resolve(line)?;
        self.mcp.write_gpio(p.port, p.pin, u8::from(high))
    }

    fn get(&mut self, line: Line) -> Result<bool, Error<BusError<C>>> {
        let p = Self::resolve(line)?;
        Ok(self.mcp.read_gpio(p.port, p.pin)? != 0)
    }

    fn data_lines(&self) -> u8 {
        DATA.len() as u8
    }

    fn has_rw(&self) -> bool {
        false
    }
}

pub struct Adafruit1109<C: Connector, D> {
    name: Name,
    full_name: Name,
    lcd: Hd44780<PlateBus<C>, D>,
}

impl<C: Connector, D: DelayNs> Adafruit1109<C, D> {
    pub fn new(connector: C, delay: D) -> Self {
        let mcp = Mcp23017::new(connector).with_auto_io_dir_off();
        let lcd = Hd44780::new(PlateBus { mcp }, delay, COLUMNS, ROWS, BusMode::FourBit);
        let mut plate = Self {
            name: make_name("Adafruit1109"),
            full_name: Name::new(),
            lcd,
        };
        plate.update_full_name();
        plate
    }

    // "<plate>_<expander>_<lcd>"
    fn update_full_name(&mut self) {
        let parts = [
            self.name.as_str(),
            self.lcd.bus().mcp.name(),
            self.lcd.name(),
        ];
        let mut full = Name::new();
        'outer: for (i, part) in parts.iter().enumerate() {
            if i > 0 && full.push('_').is_err() {
                break;
            }
            for c in part.chars() {
                if full.push(c).is_err() {
                    break 'outer;
                }
            }
        }
        self.full_name = full;
    }

    pub fn lcd(&mut self) -> &mut Hd44780<PlateBus<C>, D> {
        &mut self.lcd
    }

    pub fn expander(&mut self) -> &mut Mcp23017<C> {
        &mut self.lcd.bus_mut().mcp
    }

    /// Backlight colour; each channel is either fully on or off.
    pub fn set_rgb(&mut self, r: bool, g: bool, b: bool) -> Result<(), Error<BusError<C>>> {
        debug!("adafruit1109: rgb {} {} {}", r, g, b);
        let mcp = self.expander();
        for (p, on) in [(RED, r), (GREEN, g), (BLUE, b)] {
            mcp.write_gpio(p.port, p.pin, u8::from(!on))?;
        }
        Ok(())
    }

    fn button(&mut self, p: PortPin) -> Result<u8, Error<BusError<C>>> {
        self.expander().read_gpio(p.port, p.pin)
    }

    /// 1 while pressed.
    pub fn select_button(&mut self) -> Result<u8, Error<BusError<C>>> {
        self.button(SELECT)
    }

    pub fn up_button(&mut self) -> Result<u8, Error<BusError<C>>> {
        self.button(UP)
    }

    pub fn down_button(&mut self) -> Result<u8, Error<BusError<C>>> {
        self.button(DOWN)
    }

    pub fn left_button(&mut self) -> Result<u8, Error<BusError<C>>> {
        self.button(LEFT)
    }

    pub fn right_button(&mut self) -> Result<u8, Error<BusError<C>>> {
        self.button(RIGHT)
    }

    fn init_button(&mut self, p: PortPin) -> Result<(), Error<BusError<C>>> {
        let mcp = self.expander();
        mcp.pin_mode(p.port, p.pin, PinMode::Input)?;
        mcp.set_pull_up(p.port, p.pin, true)?;
        mcp.set_gpio_polarity(p.port, p.pin, true)
    }
}

impl<C: Connector, D> Configurable for Adafruit1109<C, D> {
    fn config(&self) -> &Config {
        self.lcd.bus().mcp.config()
    }

    fn config_mut(&mut self) -> &mut Config {
        self.lcd.bus_mut().mcp.config_mut()
    }
}

impl<C: Connector, D: DelayNs> Driver for Adafruit1109<C, D> {
    type Error = Error<BusError<C>>;

    fn name(&self) -> &str {
        &self.full_name
    }

    fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
        self.update_full_name();
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.expander().start()?;

        // everything output first, buttons become inputs below
        for pin in 0..8 {
            self.expander().pin_mode(Port::A, pin, PinMode::Output)?;
            self.expander().pin_mode(Port::B, pin, PinMode::Output)?;
        }
        for p in [SELECT, UP, DOWN, LEFT, RIGHT] {
            self.init_button(p)?;
        }

        self.set_rgb(true, true, true)?;
        self.expander().write_gpio(RW.port, RW.pin, 0)?;

        self.lcd.start()
    }

    fn halt(&mut self) -> Result<(), Self::Error> {
        self.expander().halt()
    }
}
