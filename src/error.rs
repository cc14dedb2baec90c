// Shared error type for every driver in the crate.
//
// Generic over the bus error `E` so callers keep the HAL's own error
// type; pin errors are folded into `digital::ErrorKind` because a
// driver may own pins of several concrete types.

use core::fmt;

use embedded_hal::{digital, pwm};

/// Adaptor-level failure while handing out a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    /// Requested bus number is not served by this adaptor.
    BusOutOfRange(u8),
    /// The adaptor owns a single bus and it has already been handed out.
    BusInUse,
    /// The platform failed to open the bus device.
    OpenFailed(u8),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::BusOutOfRange(bus) => write!(f, "bus number {} out of range", bus),
            ConnectError::BusInUse => write!(f, "bus already in use"),
            ConnectError::OpenFailed(bus) => write!(f, "failed to open bus {}", bus),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error<E> {
    /// Error reported by the underlying bus.
    Bus(E),
    /// Error reported by a GPIO line.
    Pin(digital::ErrorKind),
    /// Error reported by a PWM channel.
    Pwm(pwm::ErrorKind),
    /// Adaptor could not provide a bus.
    Connect(ConnectError),
    /// Operation used before `start()` established a connection.
    NotStarted,
    /// Argument outside the range the chip accepts.
    InvalidArgument(&'static str),
    /// Chip is configured in a mode that does not support the operation;
    /// carries the control register content.
    WrongMode(u8),
    /// Fewer (or more) bytes than required were transferred.
    ShortTransfer { expected: usize, got: usize },
    /// Chip did not become ready in time.
    Timeout,
    /// Identification/reference register did not hold the expected value.
    UnexpectedId { register: u8, expected: u8, got: u8 },
}

impl<E> Error<E> {
    pub fn pin<P: digital::Error>(err: P) -> Self {
        Error::Pin(err.kind())
    }

    pub fn pwm<P: pwm::Error>(err: P) -> Self {
        Error::Pwm(err.kind())
    }
}

impl<E> From<ConnectError> for Error<E> {
    fn from(err: ConnectError) -> Self {
        Error::Connect(err)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {:?}", e),
            Error::Pin(kind) => write!(f, "pin error: {}", kind),
            Error::Pwm(kind) => write!(f, "pwm error: {}", kind),
            Error::Connect(e) => write!(f, "connect error: {}", e),
            Error::NotStarted => write!(f, "driver not started"),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::WrongMode(ctrl) => write!(f, "device is in wrong mode 0x{:02x}", ctrl),
            Error::ShortTransfer { expected, got } => {
                write!(f, "{} bytes transferred, but {} expected", got, expected)
            }
            Error::Timeout => write!(f, "device not ready in time"),
            Error::UnexpectedId {
                register,
                expected,
                got,
            } => write!(
                f,
                "register 0x{:02x} holds 0x{:02x}, expected 0x{:02x}",
                register, got, expected
            ),
        }
    }
}
