//! Driver lifecycle and named command dispatch.
//!
//! Every driver carries a human readable name (defaults to the chip name),
//! can be started and halted, and optionally exposes a small set of named
//! commands so a host shell or RPC layer can call it without knowing the
//! concrete type.

use core::fmt;

use crate::error::Error;
use crate::time::DateTime;

pub const NAME_CAP: usize = 32;

pub type Name = heapless::String<NAME_CAP>;

/// Build a name, truncated to `NAME_CAP` bytes on a char boundary.
pub fn make_name(s: &str) -> Name {
    let mut name = Name::new();
    for c in s.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    name
}

pub trait Driver {
    type Error;

    fn name(&self) -> &str;
    fn set_name(&mut self, name: &str);

    /// Connect to the device and bring it into its configured state.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Put the device into a safe idle state.
    fn halt(&mut self) -> Result<(), Self::Error>;
}

/// Parameter and result values of named commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    U8(u8),
    I32(i32),
    Float(f32),
    Time(DateTime),
}

/// Named command parameters, e.g. `&[("pin", Value::U8(3))]`.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a>(pub &'a [(&'a str, Value)]);

impl<'a> Params<'a> {
    pub const EMPTY: Params<'static> = Params(&[]);

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.iter().find(|(k, _)| *k == key).map(|&(_, v)| v)
    }

    pub fn u8<E>(&self, key: &'static str) -> Result<u8, CommandError<E>> {
        match self.get(key) {
            Some(Value::U8(v)) => Ok(v),
            Some(_) => Err(CommandError::WrongType(key)),
            None => Err(CommandError::MissingParam(key)),
        }
    }

    pub fn i32<E>(&self, key: &'static str) -> Result<i32, CommandError<E>> {
        match self.get(key) {
            Some(Value::I32(v)) => Ok(v),
            Some(Value::U8(v)) => Ok(v as i32),
            Some(_) => Err(CommandError::WrongType(key)),
            None => Err(CommandError::MissingParam(key)),
        }
    }

    pub fn time<E>(&self, key: &'static str) -> Result<DateTime, CommandError<E>> {
        match self.get(key) {
            Some(Value::Time(v)) => Ok(v),
            Some(_) => Err(CommandError::WrongType(key)),
            None => Err(CommandError::MissingParam(key)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandError<E> {
    Unknown,
    MissingParam(&'static str),
    WrongType(&'static str),
    Driver(Error<E>),
}

impl<E> From<Error<E>> for CommandError<E> {
    fn from(err: Error<E>) -> Self {
        CommandError::Driver(err)
    }
}

impl<E: fmt::Debug> fmt::Display for CommandError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown => write!(f, "unknown command"),
            CommandError::MissingParam(key) => write!(f, "missing parameter '{}'", key),
            CommandError::WrongType(key) => write!(f, "parameter '{}' has wrong type", key),
            CommandError::Driver(e) => write!(f, "{}", e),
        }
    }
}

pub trait Commander {
    type BusError;

    /// Names accepted by `command`.
    fn commands(&self) -> &'static [&'static str];

    fn command(&mut self, name: &str, params: &Params<'_>)
    -> Result<Value, CommandError<Self::BusError>>;
}
