// SC16IS750 I2C to UART bridge with 8 GPIO pins
//
// Also covers SC16IS760 (higher clock) and SC16IS740 (no GPIO). Two
// address pins select one of 16 addresses 0x48..0x57; both grounded
// gives 0x4D. Registers are addressed by a sub-address byte holding the
// register number in bits 6..3 and the channel (always 0) in bits 2..1.
//
// Datasheet: https://www.nxp.com/docs/en/data-sheet/SC16IS740_750_760.pdf

use log::debug;

use crate::bus::{BusError, Config, Configurable, Connection, Connector, open};
use crate::device::{CommandError, Commander, Driver, Name, Params, Value, make_name};
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x4D;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// receive/transmit holding, divisor latch LSB
    RhrThrDll = 0x00,
    /// interrupt enable, divisor latch MSB
    IerDlh = 0x01,
    /// interrupt identification, FIFO control, enhanced features
    IirFcrEfr = 0x02,
    Lcr = 0x03,
    /// modem control, XON1
    McrXon1 = 0x04,
    /// line status, XON2
    LsrXon2 = 0x05,
    /// modem status, transmission control, XOFF1
    MsrTcrXoff1 = 0x06,
    /// scratchpad, trigger level, XOFF2
    SprTlrXoff2 = 0x07,
    TxLvl = 0x08,
    RxLvl = 0x09,
    IoDir = 0x0A,
    IoState = 0x0B,
    IoIntEna = 0x0C,
    Reserved = 0x0D,
    IoControl = 0x0E,
    Efcr = 0x0F,
}

impl Register {
    const fn sub_address(self) -> u8 {
        (self as u8) << 3
    }
}

const LCR_DIVISOR_LATCH: u8 = 0x80;
const LCR_STOP_BITS: u8 = 0x04;

const FCR_FIFO_ENABLE: u8 = 0x01;
const FCR_RX_RESET: u8 = 0x02;
const FCR_TX_RESET: u8 = 0x04;

const IOCONTROL_SRESET: u8 = 0x08;

/// The TX and RX FIFOs are 64 bytes deep.
pub const FIFO_SIZE: usize = 64;

// one I2C transfer carries at most this many FIFO bytes
const CHUNK: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    /// forced to 1
    Mark,
    /// forced to 0
    Space,
}

impl Parity {
    const fn lcr_bits(self) -> u8 {
        match self {
            Parity::None => 0x00,
            Parity::Odd => 0x08,
            Parity::Even => 0x18,
            Parity::Mark => 0x28,
            Parity::Space => 0x38,
        }
    }
}

/// Line control register value for the given frame format.
pub fn line_control<E>(word_len: u8, parity: Parity, stop_bits: u8) -> Result<u8, Error<E>> {
    if !(5..=8).contains(&word_len) {
        return Err(Error::InvalidArgument("word length must be between 5 and 8"));
    }
    let stop = match stop_bits {
        1 => 0,
        2 => LCR_STOP_BITS,
        _ => return Err(Error::InvalidArgument("stop bits must be 1 or 2")),
    };
    Ok((word_len - 5) | stop | parity.lcr_bits())
}

/// Divisor for the baud rate generator (prescaler 1).
pub fn baud_divisor<E>(crystal_hz: u32, baud: u32) -> Result<u16, Error<E>> {
    if baud == 0 {
        return Err(Error::InvalidArgument("baud rate must not be 0"));
    }
    let divisor = match baud.checked_mul(16) {
        Some(rate) => crystal_hz / rate,
        None => 0,
    };
    if divisor == 0 || divisor > u16::MAX as u32 {
        return Err(Error::InvalidArgument("baud rate not reachable with this crystal"));
    }
    Ok(divisor as u16)
}

pub struct Sc16is750<C: Connector> {
    name: Name,
    connector: C,
    config: Config,
    connection: Option<Connection<C::Bus>>,
}

impl<C: Connector> Sc16is750<C> {
    pub fn new(connector: C) -> Self {
        Self {
            name: make_name("SC16IS750"),
            connector,
            config: Config::new(),
            connection: None,
        }
    }

    fn conn(&mut self) -> Result<&mut Connection<C::Bus>, Error<BusError<C>>> {
        self.connection.as_mut().ok_or(Error::NotStarted)
    }

    pub fn read_register(&mut self, reg: Register) -> Result<u8, Error<BusError<C>>> {
        self.conn()?.read_byte_data(reg.sub_address())
    }

    pub fn write_register(&mut self, reg: Register, val: u8) -> Result<(), Error<BusError<C>>> {
        self.conn()?.write_byte_data(reg.sub_address(), val)
    }

    /// Drives `pin` high (val != 0) or low and makes it an output.
    pub fn write_gpio(&mut self, pin: u8, val: u8) -> Result<(), Error<BusError<C>>> {
        let mask = pin_mask(pin)?;
        let state = self.read_register(Register::IoState)?;
        let state = if val == 0 { state & !mask } else { state | mask };
        self.write_register(Register::IoState, state)?;

        let dir = self.read_register(Register::IoDir)?;
        if dir & mask == 0 {
            self.write_register(Register::IoDir, dir | mask)?;
        }
        Ok(())
    }

    /// Makes `pin` an input and returns its level as 0 or 1.
    pub fn read_gpio(&mut self, pin: u8) -> Result<u8, Error<BusError<C>>> {
        let mask = pin_mask(pin)?;
        let dir = self.read_register(Register::IoDir)?;
        self.write_register(Register::IoDir, dir & !mask)?;
        let state = self.read_register(Register::IoState)?;
        Ok(u8::from(state & mask != 0))
    }

    /// Programs the divisor latch; returns the baud rate actually reached.
    pub fn set_baud_rate(&mut self, crystal_hz: u32, baud: u32) -> Result<u32, Error<BusError<C>>> {
        let divisor = baud_divisor(crystal_hz, baud)?;
        let [dlh, dll] = divisor.to_be_bytes();

        let lcr = self.read_register(Register::Lcr)?;
        self.write_register(Register::Lcr, lcr | LCR_DIVISOR_LATCH)?;
        self.write_register(Register::RhrThrDll, dll)?;
        self.write_register(Register::IerDlh, dlh)?;
        self.write_register(Register::Lcr, lcr & !LCR_DIVISOR_LATCH)?;

        let actual = crystal_hz / (16 * divisor as u32);
        debug!("sc16is750: divisor {} gives {} baud", divisor, actual);
        Ok(actual)
    }

    pub fn set_line(
        &mut self,
        word_len: u8,
        parity: Parity,
        stop_bits: u8,
    ) -> Result<(), Error<BusError<C>>> {
        let lcr = line_control(word_len, parity, stop_bits)?;
        self.write_register(Register::Lcr, lcr)
    }

    /// Enables (and resets) or disables both FIFOs.
    pub fn enable_fifo(&mut self, on: bool) -> Result<(), Error<BusError<C>>> {
        let fcr = if on {
            FCR_FIFO_ENABLE | FCR_RX_RESET | FCR_TX_RESET
        } else {
            0
        };
        self.write_register(Register::IirFcrEfr, fcr)
    }

    /// Free space in the transmit FIFO.
    pub fn tx_level(&mut self) -> Result<u8, Error<BusError<C>>> {
        self.read_register(Register::TxLvl)
    }

    /// Bytes waiting in the receive FIFO.
    pub fn rx_level(&mut self) -> Result<u8, Error<BusError<C>>> {
        self.read_register(Register::RxLvl)
    }

    /// Queues as many bytes as the transmit FIFO takes; returns the count.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize, Error<BusError<C>>> {
        let space = self.tx_level()? as usize;
        let n = data.len().min(space);
        for chunk in data[..n].chunks(CHUNK) {
            self.conn()?
                .write_block_data(Register::RhrThrDll.sub_address(), chunk)?;
        }
        Ok(n)
    }

    /// Drains up to `buf.len()` received bytes; returns the count.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Error<BusError<C>>> {
        let waiting = self.rx_level()? as usize;
        let n = buf.len().min(waiting);
        for chunk in buf[..n].chunks_mut(CHUNK) {
            self.conn()?
                .read_block_data(Register::RhrThrDll.sub_address(), chunk)?;
        }
        Ok(n)
    }

    /// Software reset of UART and GPIO registers.
    pub fn reset(&mut self) -> Result<(), Error<BusError<C>>> {
        self.write_register(Register::IoControl, IOCONTROL_SRESET)
    }
}

fn pin_mask<E>(pin: u8) -> Result<u8, Error<E>> {
    if pin > 7 {
        return Err(Error::InvalidArgument("pin must be between 0 and 7"));
    }
    Ok(1 << pin)
}

impl<C: Connector> Configurable for Sc16is750<C> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<C: Connector> Driver for Sc16is750<C> {
    type Error = Error<BusError<C>>;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.connection = Some(open(&mut self.connector, &self.config, DEFAULT_ADDRESS)?);
        Ok(())
    }

    fn halt(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<C: Connector> Commander for Sc16is750<C> {
    type BusError = BusError<C>;

    fn commands(&self) -> &'static [&'static str] {
        &["WriteGPIO", "ReadGPIO"]
    }

    fn command(
        &mut self,
        name: &str,
        params: &Params<'_>,
    ) -> Result<Value, CommandError<Self::BusError>> {
        match name {
            "WriteGPIO" => {
                self.write_gpio(params.u8("pin")?, params.u8("val")?)?;
                Ok(Value::None)
            }
            "ReadGPIO" => Ok(Value::U8(self.read_gpio(params.u8("pin")?)?)),
            _ => Err(CommandError::Unknown),
        }
    }
}
