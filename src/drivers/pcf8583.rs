// PCF8583 clock/calendar with 240 bytes of RAM, usable as event counter
//
// Register 0x00 is the control register; time or counter registers follow
// with auto-increment, RAM starts at 0x10. The chip only stores two bits
// of year, so the full year is kept as an offset in the driver.
//
// Datasheet: https://www.nxp.com/docs/en/data-sheet/PCF8583.pdf

use log::{debug, warn};

use crate::bus::{BusError, Config, Configurable, Connection, Connector, open};
use crate::device::{CommandError, Commander, Driver, Name, Params, Value, make_name};
use crate::error::Error;
use crate::time::DateTime;

pub const DEFAULT_ADDRESS: u8 = 0x50;

#[allow(dead_code)]
mod reg {
    pub const CTRL: u8 = 0x00;
    pub const SUBSEC_D0D1: u8 = 0x01;
    pub const SEC_D2D3: u8 = 0x02;
    pub const MIN_D4D5: u8 = 0x03;
    pub const HOUR: u8 = 0x04;
    pub const YEARDATE: u8 = 0x05;
    pub const WEEKDAYMONTH: u8 = 0x06;
    pub const TIMER: u8 = 0x07;
    pub const ALARMCTRL: u8 = 0x08; // alarm registers follow up to 0x0F
}

#[allow(dead_code)]
mod flag {
    pub const TIMER_FLAG: u8 = 0x01;
    pub const ALARM_FLAG: u8 = 0x02;
    pub const ALARM_ENABLE: u8 = 0x04;
    pub const MASK: u8 = 0x08;
    pub const MODE_CLOCK50: u8 = 0x10;
    pub const MODE_COUNTER: u8 = 0x20;
    pub const MODE_TEST: u8 = 0x30; // also the mask of both mode bits
    pub const HOLD_LAST_COUNT: u8 = 0x40;
    pub const STOP_COUNTING: u8 = 0x80;
}

const RAM_OFFSET: u8 = 0x10;

const CLOCK_DATA_SIZE: usize = 6;
const COUNTER_DATA_SIZE: usize = 3;

/// Operating mode selected by the control register; test mode is not
/// supported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Clock32k = 0x00,
    Clock50 = 0x10,
    Counter = 0x20,
}

fn is_clock_mode(ctrl: u8) -> bool {
    ctrl & flag::MODE_COUNTER == 0
}

fn is_counter_mode(ctrl: u8) -> bool {
    ctrl & flag::MODE_COUNTER != 0 && ctrl & flag::MODE_CLOCK50 == 0
}

fn mode_differs(ctrl: u8, mode: Mode) -> bool {
    ctrl & flag::MODE_TEST != mode as u8 & flag::MODE_TEST
}

/// Two BCD digits; values above 99 are limited to 99.
pub fn encode_bcd(val: u8) -> u8 {
    let val = if val > 99 {
        warn!("pcf8583: BCD value {} exceeds 99, limited", val);
        99
    } else {
        val
    };
    (val / 10) << 4 | val % 10
}

/// Each nibble above 9 is limited to 9.
pub fn decode_bcd(bcd: u8) -> u8 {
    let (mut hi, mut lo) = (bcd >> 4, bcd & 0x0F);
    if hi > 9 {
        warn!("pcf8583: BCD value 0x{:02x} exceeds 0x99 on high digit, limited", bcd);
        hi = 9;
    }
    if lo > 9 {
        warn!("pcf8583: BCD value 0x{:02x} exceeds 0x99 on low digit, limited", bcd);
        lo = 9;
    }
    10 * hi + lo
}

pub struct Pcf8583<C: Connector> {
    name: Name,
    connector: C,
    config: Config,
    connection: Option<Connection<C::Bus>>,
    mode: Mode,
    year_offset: u16,
}

impl<C: Connector> Pcf8583<C> {
    pub fn new(connector: C) -> Self {
        Self {
            name: make_name("PCF8583"),
            connector,
            config: Config::new(),
            connection: None,
            mode: Mode::default(),
            year_offset: 0,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn conn(&mut self) -> Result<&mut Connection<C::Bus>, Error<BusError<C>>> {
        self.connection.as_mut().ok_or(Error::NotStarted)
    }

    /// Sets the clock; the year beyond the chip's two bits is kept here.
    pub fn write_time(&mut self, dt: DateTime) -> Result<(), Error<BusError<C>>> {
        let conn = self.conn()?;
        let ctrl = conn.read_byte_data(reg::CTRL)?;
        if !is_clock_mode(ctrl) {
            return Err(Error::WrongMode(ctrl));
        }
        conn.write(&[
            reg::CTRL,
            ctrl | flag::STOP_COUNTING,
            encode_bcd((dt.millisecond / 10).min(u8::MAX as u16) as u8),
            encode_bcd(dt.second),
            encode_bcd(dt.minute),
            encode_bcd(dt.hour),
            encode_bcd(dt.day), // year bits stay zero
            dt.weekday() << 5 | encode_bcd(dt.month),
        ])?;
        self.year_offset = dt.year;
        self.run(ctrl)
    }

    pub fn read_time(&mut self) -> Result<DateTime, Error<BusError<C>>> {
        let year_offset = self.year_offset;
        let conn = self.conn()?;
        let ctrl = conn.read_byte_data(reg::CTRL)?;
        if !is_clock_mode(ctrl) {
            return Err(Error::WrongMode(ctrl));
        }
        let mut data = [0u8; CLOCK_DATA_SIZE];
        conn.read_block_data(reg::SUBSEC_D0D1, &mut data)?;

        Ok(DateTime {
            year: (data[4] >> 6) as u16 + year_offset,
            month: decode_bcd(data[5] & 0x1F),
            day: decode_bcd(data[4] & 0x3F),
            hour: decode_bcd(data[3]),
            minute: decode_bcd(data[2]),
            second: decode_bcd(data[1]),
            millisecond: decode_bcd(data[0]) as u16 * 10,
        })
    }

    /// Sets the event counter, six decimal digits.
    pub fn write_counter(&mut self, val: u32) -> Result<(), Error<BusError<C>>> {
        let conn = self.conn()?;
        let ctrl = conn.read_byte_data(reg::CTRL)?;
        if !is_counter_mode(ctrl) {
            return Err(Error::WrongMode(ctrl));
        }
        conn.write(&[
            reg::CTRL,
            ctrl | flag::STOP_COUNTING,
            encode_bcd((val % 100) as u8),
            encode_bcd((val / 100 % 100) as u8),
            encode_bcd((val / 10_000 % 100) as u8),
        ])?;
        self.run(ctrl)
    }

    pub fn read_counter(&mut self) -> Result<u32, Error<BusError<C>>> {
        let conn = self.conn()?;
        let ctrl = conn.read_byte_data(reg::CTRL)?;
        if !is_counter_mode(ctrl) {
            return Err(Error::WrongMode(ctrl));
        }
        let mut data = [0u8; COUNTER_DATA_SIZE];
        conn.read_block_data(reg::SUBSEC_D0D1, &mut data)?;

        Ok(decode_bcd(data[0]) as u32
            + decode_bcd(data[1]) as u32 * 100
            + decode_bcd(data[2]) as u32 * 10_000)
    }

    pub fn write_ram(&mut self, address: u8, val: u8) -> Result<(), Error<BusError<C>>> {
        let real = ram_address(address)?;
        self.conn()?.write_byte_data(real, val)
    }

    pub fn read_ram(&mut self, address: u8) -> Result<u8, Error<BusError<C>>> {
        let real = ram_address(address)?;
        self.conn()?.read_byte_data(real)
    }

    fn run(&mut self, ctrl: u8) -> Result<(), Error<BusError<C>>> {
        self.conn()?.write_byte_data(reg::CTRL, ctrl & !flag::STOP_COUNTING)
    }
}

fn ram_address<E>(address: u8) -> Result<u8, Error<E>> {
    address
        .checked_add(RAM_OFFSET)
        .ok_or(Error::InvalidArgument("RAM address overflow"))
}

impl<C: Connector> Configurable for Pcf8583<C> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<C: Connector> Driver for Pcf8583<C> {
    type Error = Error<BusError<C>>;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
    }

    /// Connects and switches the chip into the configured mode if needed.
    fn start(&mut self) -> Result<(), Self::Error> {
        self.connection = Some(open(&mut self.connector, &self.config, DEFAULT_ADDRESS)?);

        let mode = self.mode;
        let conn = self.conn()?;
        let ctrl = conn.read_byte_data(reg::CTRL)?;
        if mode_differs(ctrl, mode) {
            let ctrl = ctrl & !flag::MODE_TEST | mode as u8;
            conn.write_byte_data(reg::CTRL, ctrl)?;
            if is_counter_mode(ctrl) {
                debug!("pcf8583: switched to counter mode 0x{:02x}", ctrl);
            } else {
                debug!("pcf8583: switched to clock mode 0x{:02x}", ctrl);
            }
        }
        Ok(())
    }

    fn halt(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

const COMMANDS: &[&str] = &[
    "WriteTime",
    "ReadTime",
    "WriteCounter",
    "ReadCounter",
    "WriteRAM",
    "ReadRAM",
];

impl<C: Connector> Commander for Pcf8583<C> {
    type BusError = BusError<C>;

    fn commands(&self) -> &'static [&'static str] {
        COMMANDS
    }

    fn command(
        &mut self,
        name: &str,
        params: &Params<'_>,
    ) -> Result<Value, CommandError<Self::BusError>> {
        match name {
            "WriteTime" => {
                self.write_time(params.time("val")?)?;
                Ok(Value::None)
            }
            "ReadTime" => Ok(Value::Time(self.read_time()?)),
            "WriteCounter" => {
                let val = params.i32("val")?;
                let val = u32::try_from(val).map_err(|_| CommandError::WrongType("val"))?;
                self.write_counter(val)?;
                Ok(Value::None)
            }
            "ReadCounter" => Ok(Value::I32(self.read_counter()? as i32)),
            "WriteRAM" => {
                self.write_ram(params.u8("address")?, params.u8("val")?)?;
                Ok(Value::None)
            }
            "ReadRAM" => Ok(Value::U8(self.read_ram(params.u8("address")?)?)),
            _ => Err(CommandError::Unknown),
        }
    }
}
