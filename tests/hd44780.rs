mod common;

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::collections::VecDeque;
use std::rc::Rc;

use chipglue::drivers::hd44780::{BusMode, GpioBus, Hd44780, LcdBus, Line};
use chipglue::{Driver, Error};
use common::{FakePin, NoopDelay};
use embedded_hal::digital::{self, InputPin, OutputPin};

#[derive(Default)]
struct Lines {
    rs: bool,
    en: bool,
    rw: bool,
    data: [bool; 8],
    // (rs, value) on every falling edge of EN while writing
    latched: Vec<(bool, u8)>,
    busy: VecDeque<bool>,
    // values the controller drives, one per read cycle
    output: VecDeque<u8>,
}

#[derive(Clone)]
struct FakeLcd {
    lines: Rc<RefCell<Lines>>,
    width: u8,
    rw: bool,
}

impl FakeLcd {
    fn new(width: u8, rw: bool) -> Self {
        Self {
            lines: Rc::new(RefCell::new(Lines::default())),
            width,
            rw,
        }
    }

    fn latched(&self) -> Vec<(bool, u8)> {
        self.lines.borrow().latched.clone()
    }

    fn clear(&self) {
        self.lines.borrow_mut().latched.clear();
    }

    /// Joins nibble pairs into bytes.
    fn bytes(&self) -> Vec<(bool, u8)> {
        let latched = self.latched();
        if self.width == 8 {
            return latched;
        }
        latched
            .chunks(2)
            .map(|p| (p[0].0, p[0].1 << 4 | p[1].1))
            .collect()
    }
}

impl LcdBus for FakeLcd {
    type BusError = ();

    fn set(&mut self, line: Line, high: bool) -> Result<(), Error<()>> {
        let mut l = self.lines.borrow_mut();
        match line {
            Line::Rs => l.rs = high,
            Line::Rw => l.rw = high,
            Line::En => {
                if l.en && !high && l.rw {
                    l.output.pop_front();
                } else if l.en && !high {
                    let mut value = 0u8;
                    for i in 0..self.width as usize {
                        if l.data[i] {
                            value |= 1 << i;
                        }
                    }
                    let rs = l.rs;
                    l.latched.push((rs, value));
                }
                l.en = high;
            }
            Line::Data(i) => l.data[i as usize] = high,
        }
        Ok(())
    }

    fn get(&mut self, line: Line) -> Result<bool, Error<()>> {
        let mut l = self.lines.borrow_mut();
        match line {
            Line::Data(i) => {
                if let Some(busy) = l.busy.pop_front() {
                    return Ok(busy);
                }
                let driven = l.data[i as usize];
                match l.output.front() {
                    Some(v) if l.rw => Ok(v >> i & 1 == 1),
                    _ => Ok(driven),
                }
            }
            _ => Err(Error::InvalidArgument("not readable")),
        }
    }

    fn data_lines(&self) -> u8 {
        self.width
    }

    fn has_rw(&self) -> bool {
        self.rw
    }
}

fn started(mode: BusMode) -> (Hd44780<FakeLcd, NoopDelay>, FakeLcd) {
    let width = if mode == BusMode::FourBit { 4 } else { 8 };
    let bus = FakeLcd::new(width, false);
    let mut lcd = Hd44780::new(bus.clone(), NoopDelay::new(), 16, 2, mode);
    lcd.start().unwrap();
    (lcd, bus)
}

fn commands(values: &[u8]) -> Vec<(bool, u8)> {
    values.iter().map(|&v| (false, v)).collect()
}

#[test]
fn four_bit_initialisation() {
    let (_lcd, bus) = started(BusMode::FourBit);
    let latched = bus.latched();
    assert_eq!(
        &latched[..4],
        &[(false, 0x03), (false, 0x03), (false, 0x03), (false, 0x02)]
    );
    let tail: Vec<_> = latched[4..]
        .chunks(2)
        .map(|p| (p[0].0, p[0].1 << 4 | p[1].1))
        .collect();
    assert_eq!(tail, commands(&[0x0C, 0x28, 0x06, 0x01]));
}

#[test]
fn eight_bit_initialisation() {
    let (_lcd, bus) = started(BusMode::EightBit);
    assert_eq!(
        bus.latched(),
        commands(&[0x30, 0x30, 0x30, 0x0C, 0x38, 0x06, 0x01])
    );
}

#[test]
fn too_few_data_lines() {
    let bus = FakeLcd::new(4, false);
    let mut lcd = Hd44780::new(bus, NoopDelay::new(), 16, 2, BusMode::EightBit);
    assert!(matches!(lcd.start(), Err(Error::InvalidArgument(_))));
}

#[test]
fn write_text_with_newline() {
    let (mut lcd, bus) = started(BusMode::FourBit);
    bus.clear();
    lcd.write("hi\nyo").unwrap();
    assert_eq!(
        bus.bytes(),
        vec![
            (true, b'h'),
            (true, b'i'),
            (false, 0xC0),
            (true, b'y'),
            (true, b'o'),
        ]
    );
}

#[test]
fn right_to_left_newline_starts_at_last_column() {
    let (mut lcd, bus) = started(BusMode::FourBit);
    lcd.right_to_left().unwrap();
    bus.clear();
    lcd.write("a\nb").unwrap();
    assert_eq!(bus.bytes(), vec![(true, b'a'), (false, 0xCF), (true, b'b')]);
}

#[test]
fn cursor_bounds() {
    let (mut lcd, _bus) = started(BusMode::FourBit);
    assert!(lcd.set_cursor(15, 1).is_ok());
    assert!(matches!(lcd.set_cursor(16, 0), Err(Error::InvalidArgument(_))));
    assert!(matches!(lcd.set_cursor(0, 2), Err(Error::InvalidArgument(_))));
}

#[test]
fn display_controls() {
    let (mut lcd, bus) = started(BusMode::FourBit);
    bus.clear();
    lcd.cursor(true).unwrap();
    lcd.blink(true).unwrap();
    lcd.display(false).unwrap();
    lcd.scroll_left().unwrap();
    lcd.scroll_right().unwrap();
    lcd.home().unwrap();
    lcd.left_to_right().unwrap();
    assert_eq!(
        bus.bytes(),
        commands(&[0x0E, 0x0F, 0x0B, 0x18, 0x1C, 0x02, 0x06])
    );
}

#[test]
fn custom_character() {
    let (mut lcd, bus) = started(BusMode::FourBit);
    bus.clear();
    let glyph = [0x00, 0x0A, 0x1F, 0x1F, 0x0E, 0x04, 0x00, 0x00];
    lcd.create_char(1, glyph).unwrap();
    let bytes = bus.bytes();
    assert_eq!(bytes[0], (false, 0x48));
    let rows: Vec<u8> = bytes[1..].iter().map(|b| b.1).collect();
    assert_eq!(rows, glyph.to_vec());
    assert!(matches!(lcd.create_char(8, glyph), Err(Error::InvalidArgument(_))));
}

#[test]
fn reading_needs_rw_line() {
    let (mut lcd, _bus) = started(BusMode::FourBit);
    assert!(matches!(lcd.set_busy_flag_check(true), Err(Error::InvalidArgument(_))));
    assert!(matches!(lcd.read_ac_and_dr(), Err(Error::InvalidArgument(_))));
}

#[test]
fn busy_flag_wait_backs_off() {
    let bus = FakeLcd::new(4, true);
    let delay = NoopDelay::new();
    let mut lcd = Hd44780::new(bus.clone(), delay.clone(), 16, 2, BusMode::FourBit);
    lcd.start().unwrap();
    lcd.set_busy_flag_check(true).unwrap();

    let before = delay.elapsed_ms();
    bus.lines.borrow_mut().busy.extend([true, true, false]);
    lcd.write_char(b'x').unwrap();
    // 1 ms + 4 ms back-off
    assert_eq!(delay.elapsed_ms() - before, 5);
}

#[test]
fn busy_flag_timeout() {
    let bus = FakeLcd::new(4, true);
    let mut lcd = Hd44780::new(bus.clone(), NoopDelay::new(), 16, 2, BusMode::FourBit);
    lcd.start().unwrap();
    lcd.set_busy_flag_check(true).unwrap();
    bus.lines.borrow_mut().busy.extend([true; 20]);
    assert_eq!(lcd.send_command(0x01), Err(Error::Timeout));
}

#[test]
fn gpio_bus_pulses_enable() {
    let rs = FakePin::new();
    let en = FakePin::new();
    let data = [FakePin::new(), FakePin::new(), FakePin::new(), FakePin::new()];
    let bus = GpioBus::new(rs.clone(), en.clone(), data.clone());
    assert!(!bus.has_rw());

    let mut lcd = Hd44780::new(bus, NoopDelay::new(), 16, 2, BusMode::FourBit);
    lcd.start().unwrap();

    let pulses = en.levels().iter().filter(|&&l| l).count();
    assert_eq!(pulses, 12);
    // clear display is the last command: low nibble 0x1
    assert_eq!(data[0].levels().last(), Some(&true));
    assert_eq!(data[3].levels().last(), Some(&false));
    assert_eq!(rs.levels().last(), Some(&false));
}

#[test]
fn gpio_bus_with_rw() {
    let bus = GpioBus::new(FakePin::new(), FakePin::new(), [FakePin::new(), FakePin::new()])
        .with_rw(FakePin::new());
    assert!(bus.has_rw());
    assert_eq!(bus.data_lines(), 2);
}

#[test]
fn gpio_bus_needs_matching_data_lines() {
    let data: [FakePin; 8] = Default::default();
    let bus = GpioBus::new(FakePin::new(), FakePin::new(), data);
    let mut lcd = Hd44780::new(bus, NoopDelay::new(), 16, 2, BusMode::FourBit);
    assert!(matches!(lcd.start(), Err(Error::InvalidArgument(_))));
}

#[test]
fn read_address_counter_and_data_register() {
    let bus = FakeLcd::new(4, true);
    let mut lcd = Hd44780::new(bus.clone(), NoopDelay::new(), 16, 2, BusMode::FourBit);
    lcd.start().unwrap();
    bus.clear();

    // AC 0x25 then DR 'A', high nibble first
    bus.lines.borrow_mut().output.extend([0x2, 0x5, 0x4, 0x1]);
    assert_eq!(lcd.read_ac_and_dr(), Ok((0x25, b'A')));

    let lines = bus.lines.borrow();
    assert!(lines.output.is_empty());
    assert!(lines.rs);
    assert!(lines.data[..4].iter().all(|&d| d));
    assert!(lines.latched.is_empty());
}

// Data line on an open-drain pin: reads high only while released and not
// pulled low by the controller.
#[derive(Clone)]
struct OpenDrainPin {
    driven: Rc<Cell<bool>>,
    lcd: Rc<Cell<bool>>,
}

impl OpenDrainPin {
    fn new(lcd_level: bool) -> Self {
        Self {
            driven: Rc::new(Cell::new(false)),
            lcd: Rc::new(Cell::new(lcd_level)),
        }
    }
}

impl digital::ErrorType for OpenDrainPin {
    type Error = Infallible;
}

impl OutputPin for OpenDrainPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.driven.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.driven.set(true);
        Ok(())
    }
}

impl InputPin for OpenDrainPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.driven.get() && self.lcd.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|h| !h)
    }
}

#[test]
fn gpio_bus_releases_data_lines_before_reading() {
    // idle controller (BF low) presenting 0b0101 on D4..D7
    let data = [
        OpenDrainPin::new(true),
        OpenDrainPin::new(false),
        OpenDrainPin::new(true),
        OpenDrainPin::new(false),
    ];
    let bus = GpioBus::new(FakePin::new(), FakePin::new(), data.clone()).with_rw(FakePin::new());
    let mut lcd = Hd44780::new(bus, NoopDelay::new(), 16, 2, BusMode::FourBit);
    lcd.start().unwrap();
    lcd.set_busy_flag_check(true).unwrap();

    lcd.write_char(0x08).unwrap();
    lcd.write_char(b'A').unwrap();
    assert_eq!(lcd.read_ac_and_dr(), Ok((0x55, 0x55)));
}
