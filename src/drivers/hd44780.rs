// HD44780 character LCD controller
//
// Driven over parallel lines (RS, EN, optional RW, 4 or 8 data lines),
// either wired to MCU pins (GpioBus) or behind a port expander (see
// adafruit1109). A byte is latched on the falling edge of EN; in 4-bit
// mode the high nibble goes first. Without RW the controller cannot be
// read, so fixed delays stand in for the busy flag.
//
// Datasheet: https://www.sparkfun.com/datasheets/LCD/HD44780.pdf

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use log::{debug, info};

use crate::device::{Driver, Name, make_name};
use crate::error::Error;

#[allow(dead_code)]
mod cmd {
    pub const CLEAR_DISPLAY: u8 = 0x01;
    pub const RETURN_HOME: u8 = 0x02;
    pub const ENTRY_MODE_SET: u8 = 0x04;
    pub const DISPLAY_CONTROL: u8 = 0x08;
    pub const CURSOR_SHIFT: u8 = 0x10;
    pub const FUNCTION_SET: u8 = 0x20;
    pub const SET_CGRAM_ADDR: u8 = 0x40;
    pub const SET_DDRAM_ADDR: u8 = 0x80;
}

#[allow(dead_code)]
mod flag {
    // entry mode
    pub const ENTRY_RIGHT: u8 = 0x00;
    pub const ENTRY_LEFT: u8 = 0x02;
    pub const ENTRY_SHIFT_INCREMENT: u8 = 0x01;
    pub const ENTRY_SHIFT_DECREMENT: u8 = 0x00;
    // display control
    pub const DISPLAY_ON: u8 = 0x04;
    pub const CURSOR_ON: u8 = 0x02;
    pub const BLINK_ON: u8 = 0x01;
    // cursor/display shift
    pub const DISPLAY_MOVE: u8 = 0x08;
    pub const CURSOR_MOVE: u8 = 0x00;
    pub const MOVE_RIGHT: u8 = 0x04;
    pub const MOVE_LEFT: u8 = 0x00;
    // function set
    pub const BUS_8BIT: u8 = 0x10;
    pub const BUS_4BIT: u8 = 0x00;
    pub const LINES_2: u8 = 0x08;
    pub const LINES_1: u8 = 0x00;
    pub const DOTS_5X10: u8 = 0x04;
    pub const DOTS_5X8: u8 = 0x00;
}

const SECOND_LINE_OFFSET: u8 = 0x40;

const BUSY_MAX_WAIT: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusMode {
    FourBit,
    EightBit,
}

impl BusMode {
    const fn width(self) -> u8 {
        match self {
            BusMode::FourBit => 4,
            BusMode::EightBit => 8,
        }
    }
}

/// Logical controller line. `Data(i)` counts from the lowest wired data
/// line, so in 4-bit mode `Data(0)` is D4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    Rs,
    En,
    Rw,
    Data(u8),
}

/// Line level access to the controller.
pub trait LcdBus {
    type BusError;

    fn set(&mut self, line: Line, high: bool) -> Result<(), Error<Self::BusError>>;
    fn get(&mut self, line: Line) -> Result<bool, Error<Self::BusError>>;

    /// Number of wired data lines (4 or 8).
    fn data_lines(&self) -> u8;

    /// RW is wired, so the controller can be read.
    fn has_rw(&self) -> bool;
}

/// Placeholder for an unwired RW line (tied to GND).
pub struct NoPin;

impl digital::ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Controller lines wired straight to MCU pins.
///
/// With RW wired the data pins are read back for the busy flag and
/// `read_ac_and_dr`. They must then be open-drain with pull-ups: before a
/// read cycle every data line is driven high, and a released line reads
/// what the controller drives. A push-pull pin reads its own level.
pub struct GpioBus<RS, EN, RW, D, const N: usize> {
    rs: RS,
    en: EN,
    rw: Option<RW>,
    data: [D; N],
}

impl<RS, EN, D, const N: usize> GpioBus<RS, EN, NoPin, D, N> {
    pub fn new(rs: RS, en: EN, data: [D; N]) -> Self {
        Self {
            rs,
            en,
            rw: None,
            data,
        }
    }
}

impl<RS, EN, RW, D, const N: usize> GpioBus<RS, EN, RW, D, N> {
    pub fn with_rw<RW2>(self, rw: RW2) -> GpioBus<RS, EN, RW2, D, N> {
        GpioBus {
            rs: self.rs,
            en: self.en,
            rw: Some(rw),
            data: self.data,
        }
    }
}

fn set_pin<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), Error<Infallible>> {
    let res = if high { pin.set_high() } else { pin.set_low() };
    res.map_err(Error::pin)
}

impl<RS, EN, RW, D, const N: usize> LcdBus for GpioBus<RS, EN, RW, D, N>
where
    RS: OutputPin,
    EN: OutputPin,
    RW: OutputPin,
    D: InputPin + OutputPin,
{
    type BusError = Infallible;

    fn set(&mut self, line: Line, high: bool) -> Result<(), Error<Infallible>> {
        match line {
            Line::Rs => set_pin(&mut self.rs, high),
            Line::En => set_pin(&mut self.en, high),
            Line::Rw => match self.rw.as_mut() {
                Some(rw) => set_pin(rw, high),
                None => Err(Error::InvalidArgument("RW line not wired")),
            },
            Line::Data(i) => match self.data.get_mut(i as usize) {
                Some(pin) => set_pin(pin, high),
                None => Err(Error::InvalidArgument("no such data line")),
            },
        }
    }

    fn get(&mut self, line: Line) -> Result<bool, Error<Infallible>> {
        match line {
            Line::Data(i) => match self.data.get_mut(i as usize) {
                Some(pin) => pin.is_high().map_err(Error::pin),
                None => Err(Error::InvalidArgument("no such data line")),
            },
            _ => Err(Error::InvalidArgument("only data lines can be read")),
        }
    }

    fn data_lines(&self) -> u8 {
        N as u8
    }

    fn has_rw(&self) -> bool {
        self.rw.is_some()
    }
}

pub struct Hd44780<B, D> {
    name: Name,
    bus: B,
    delay: D,
    cols: u8,
    rows: u8,
    row_offsets: [u8; 4],
    mode: BusMode,
    display_ctrl: u8,
    display_func: u8,
    display_mode: u8,
    check_busy_flag: bool,
}

impl<B, D> Hd44780<B, D> {
    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn columns(&self) -> u8 {
        self.cols
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }
}

impl<B: LcdBus, D: DelayNs> Hd44780<B, D> {
    pub fn new(bus: B, delay: D, cols: u8, rows: u8, mode: BusMode) -> Self {
        Self {
            name: make_name("HD44780"),
            bus,
            delay,
            cols,
            rows,
            row_offsets: [
                0x00,
                SECOND_LINE_OFFSET,
                cols,
                SECOND_LINE_OFFSET.wrapping_add(cols),
            ],
            mode,
            display_ctrl: 0,
            display_func: 0,
            display_mode: 0,
            check_busy_flag: false,
        }
    }

    /// Poll the busy flag before each transfer instead of relying on
    /// fixed delays. Needs a wired RW line.
    pub fn set_busy_flag_check(&mut self, on: bool) -> Result<(), Error<B::BusError>> {
        if on && !self.bus.has_rw() {
            return Err(Error::InvalidArgument("busy flag check needs the RW line"));
        }
        self.check_busy_flag = on;
        Ok(())
    }

    /// Writes `text` at the current cursor; '\n' continues on the next row.
    pub fn write(&mut self, text: &str) -> Result<(), Error<B::BusError>> {
        let col = if self.display_mode & flag::ENTRY_LEFT == 0 {
            self.cols.saturating_sub(1)
        } else {
            0
        };
        let mut row = 0;
        for c in text.chars() {
            if c == '\n' {
                row += 1;
                self.set_cursor(col, row)?;
                continue;
            }
            let code = u8::try_from(u32::from(c)).unwrap_or(b'?');
            self.write_char(code)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), Error<B::BusError>> {
        self.send_command(cmd::CLEAR_DISPLAY)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    pub fn home(&mut self) -> Result<(), Error<B::BusError>> {
        self.send_command(cmd::RETURN_HOME)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), Error<B::BusError>> {
        if col >= self.cols || row >= self.rows || row as usize >= self.row_offsets.len() {
            return Err(Error::InvalidArgument("cursor position out of range"));
        }
        let addr = col.wrapping_add(self.row_offsets[row as usize]);
        self.send_command(cmd::SET_DDRAM_ADDR | addr)
    }

    pub fn display(&mut self, on: bool) -> Result<(), Error<B::BusError>> {
        self.update_display_ctrl(flag::DISPLAY_ON, on)
    }

    pub fn cursor(&mut self, on: bool) -> Result<(), Error<B::BusError>> {
        self.update_display_ctrl(flag::CURSOR_ON, on)
    }

    pub fn blink(&mut self, on: bool) -> Result<(), Error<B::BusError>> {
        self.update_display_ctrl(flag::BLINK_ON, on)
    }

    fn update_display_ctrl(&mut self, bit: u8, on: bool) -> Result<(), Error<B::BusError>> {
        if on {
            self.display_ctrl |= bit;
        } else {
            self.display_ctrl &= !bit;
        }
        self.send_command(cmd::DISPLAY_CONTROL | self.display_ctrl)
    }

    pub fn scroll_left(&mut self) -> Result<(), Error<B::BusError>> {
        self.send_command(cmd::CURSOR_SHIFT | flag::DISPLAY_MOVE | flag::MOVE_LEFT)
    }

    pub fn scroll_right(&mut self) -> Result<(), Error<B::BusError>> {
        self.send_command(cmd::CURSOR_SHIFT | flag::DISPLAY_MOVE | flag::MOVE_RIGHT)
    }

    pub fn left_to_right(&mut self) -> Result<(), Error<B::BusError>> {
        self.display_mode |= flag::ENTRY_LEFT;
        self.send_command(cmd::ENTRY_MODE_SET | self.display_mode)
    }

    pub fn right_to_left(&mut self) -> Result<(), Error<B::BusError>> {
        self.display_mode &= !flag::ENTRY_LEFT;
        self.send_command(cmd::ENTRY_MODE_SET | self.display_mode)
    }

    /// Stores a 5x8 glyph as character code `pos` (0..=7).
    pub fn create_char(&mut self, pos: u8, glyph: [u8; 8]) -> Result<(), Error<B::BusError>> {
        if pos > 7 {
            return Err(Error::InvalidArgument(
                "custom character position must be between 0 and 7",
            ));
        }
        self.send_command(cmd::SET_CGRAM_ADDR | pos << 3)?;
        for row in glyph {
            self.write_char(row)?;
        }
        Ok(())
    }

    /// Address counter and data register content. Needs RW.
    pub fn read_ac_and_dr(&mut self) -> Result<(u8, u8), Error<B::BusError>> {
        if !self.bus.has_rw() {
            return Err(Error::InvalidArgument("reading needs the RW line"));
        }
        let ac = self.wait_busy_and_read_ac(false)?;
        let dr = self.read_data_register()?;
        info!("hd44780: AC 0x{:02x}, DR 0x{:02x}", ac, dr);
        Ok((ac, dr))
    }

    pub fn send_command(&mut self, data: u8) -> Result<(), Error<B::BusError>> {
        self.transfer(data, false)
    }

    pub fn write_char(&mut self, data: u8) -> Result<(), Error<B::BusError>> {
        self.transfer(data, true)
    }

    fn transfer(&mut self, data: u8, rs: bool) -> Result<(), Error<B::BusError>> {
        if self.check_busy_flag {
            self.wait_busy_and_read_ac(true)?;
        }
        self.activate_write_mode()?;
        self.bus.set(Line::Rs, rs)?;
        if self.mode == BusMode::FourBit {
            self.write_data_lines(data >> 4)?;
        }
        self.write_data_lines(data)
    }

    fn activate_write_mode(&mut self) -> Result<(), Error<B::BusError>> {
        if self.bus.has_rw() {
            self.bus.set(Line::Rw, false)?;
        }
        Ok(())
    }

    fn write_data_lines(&mut self, data: u8) -> Result<(), Error<B::BusError>> {
        for i in 0..self.mode.width() {
            self.bus.set(Line::Data(i), (data >> i) & 0x01 == 0x01)?;
        }
        self.falling_edge()
    }

    fn read_data_lines(&mut self) -> Result<u8, Error<B::BusError>> {
        let mut data = 0u8;
        for i in 0..self.mode.width() {
            if self.bus.get(Line::Data(i))? {
                data |= 1 << i;
            }
        }
        self.falling_edge()?;
        Ok(data)
    }

    fn falling_edge(&mut self) -> Result<(), Error<B::BusError>> {
        self.bus.set(Line::En, true)?;
        self.delay.delay_us(1);
        self.bus.set(Line::En, false)?;
        self.delay.delay_us(60);
        Ok(())
    }

    // Polls the busy flag with growing back-off. With `only_bf` the read
    // cycle is finished without fetching the address counter.
    fn wait_busy_and_read_ac(&mut self, only_bf: bool) -> Result<u8, Error<B::BusError>> {
        self.bus.set(Line::En, false)?;
        self.bus.set(Line::Rs, false)?;
        self.release_data_lines()?;
        self.bus.set(Line::Rw, true)?;
        self.bus.set(Line::En, true)?;

        let bf_line = Line::Data(self.mode.width() - 1);
        let mut busy = true;
        for i in 1..=BUSY_MAX_WAIT {
            if !self.bus.get(bf_line)? {
                busy = false;
                break;
            }
            debug!("hd44780: busy flag set {}/{}", i, BUSY_MAX_WAIT);
            self.delay.delay_ms(i * i);
        }

        let mut ac = 0;
        if only_bf {
            self.bus.set(Line::En, false)?;
            self.delay.delay_us(1);
            if self.mode == BusMode::FourBit {
                self.falling_edge()?;
            }
        } else {
            ac = self.read_data_lines()?;
            if self.mode == BusMode::FourBit {
                ac = ac << 4 | self.read_data_lines()?;
            }
        }

        if busy {
            return Err(Error::Timeout);
        }
        Ok(ac)
    }

    // Data lines high, so open-drain pins let the controller drive them.
    fn release_data_lines(&mut self) -> Result<(), Error<B::BusError>> {
        for i in 0..self.mode.width() {
            self.bus.set(Line::Data(i), true)?;
        }
        Ok(())
    }

    fn read_data_register(&mut self) -> Result<u8, Error<B::BusError>> {
        self.release_data_lines()?;
        self.bus.set(Line::Rs, true)?;
        self.bus.set(Line::En, true)?;
        let mut dr = self.read_data_lines()?;
        if self.mode == BusMode::FourBit {
            dr = dr << 4 | self.read_data_lines()?;
        }
        Ok(dr)
    }

    // Power-on initialisation by instruction (datasheet figures 23/24).
    fn init(&mut self) -> Result<(), Error<B::BusError>> {
        if self.bus.data_lines() != self.mode.width() {
            return Err(Error::InvalidArgument("data line count does not match bus mode"));
        }

        self.delay.delay_ms(50);
        self.activate_write_mode()?;

        match self.mode {
            BusMode::FourBit => {
                self.write_data_lines(0x03)?;
                self.delay.delay_ms(5);
                self.write_data_lines(0x03)?;
                self.delay.delay_us(100);
                self.write_data_lines(0x03)?;
                self.delay.delay_us(100);
                self.write_data_lines(0x02)?;
            }
            BusMode::EightBit => {
                self.send_command(0x30)?;
                self.delay.delay_ms(5);
                self.send_command(0x30)?;
                self.delay.delay_us(100);
                self.send_command(0x30)?;
            }
        }
        self.delay.delay_us(100);

        let bus = match self.mode {
            BusMode::FourBit => flag::BUS_4BIT,
            BusMode::EightBit => flag::BUS_8BIT,
        };
        let lines = if self.rows > 1 { flag::LINES_2 } else { flag::LINES_1 };
        self.display_func = bus | lines | flag::DOTS_5X8;
        self.display_ctrl = flag::DISPLAY_ON;
        self.display_mode = flag::ENTRY_LEFT | flag::ENTRY_SHIFT_DECREMENT;

        self.delay.delay_ms(1);
        self.send_command(cmd::DISPLAY_CONTROL | self.display_ctrl)?;
        self.delay.delay_ms(5);
        self.send_command(cmd::FUNCTION_SET | self.display_func)?;
        self.send_command(cmd::ENTRY_MODE_SET | self.display_mode)?;

        self.clear()
    }
}

impl<B: LcdBus, D: DelayNs> Driver for Hd44780<B, D> {
    type Error = Error<B::BusError>;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.init()
    }

    fn halt(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
