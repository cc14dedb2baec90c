// PWM channel exported through /sys/class/pwm.
//
// Values are written as decimal text; period and duty cycle are in ns.
// The kernel rejects polarity changes on an enabled channel, so we check
// that before touching the file.

use core::fmt::{self, Write as _};

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::{self, ErrorKind, SetDutyCycle};
use heapless::String;
use log::{debug, warn};

use super::fs::{FsError, SysfsAccess};

pub const DEFAULT_CHIP_PATH: &str = "/sys/class/pwm/pwmchip0";

const PATH_CAP: usize = 96;
const READ_CAP: usize = 32;

// settle time for udev rules fixing permissions of a fresh export
const EXPORT_SETTLE_MS: u32 = 100;

type Path = String<PATH_CAP>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Normal,
    Inverted,
}

impl Polarity {
    fn as_str(self) -> &'static str {
        match self {
            Polarity::Normal => "normal",
            Polarity::Inverted => "inverted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmErrorKind {
    Fs(FsError),
    /// Polarity cannot change while the channel runs.
    Enabled,
    /// File content is not what the kernel documents.
    Parse,
    PathTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmError {
    pub op: &'static str,
    pub pin: u8,
    pub kind: PwmErrorKind,
}

impl fmt::Display for PwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for pin {} with ", self.op, self.pin)?;
        match self.kind {
            PwmErrorKind::Fs(e) => write!(f, "{}", e),
            PwmErrorKind::Enabled => write!(f, "cannot set PWM polarity when enabled"),
            PwmErrorKind::Parse => write!(f, "unexpected file content"),
            PwmErrorKind::PathTooLong => write!(f, "path too long"),
        }
    }
}

impl pwm::Error for PwmError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

fn parse_u32(buf: &[u8]) -> Option<u32> {
    let s = core::str::from_utf8(buf).ok()?.trim_end_matches('\n').trim();
    if s.is_empty() {
        return Some(0);
    }
    s.parse().ok()
}

pub struct PwmPin<A, D> {
    fs: A,
    delay: D,
    pin: u8,
    chip_path: Path,
    enabled: bool,
    // last period written or read, backs `SetDutyCycle`
    period: u32,
}

impl<A: SysfsAccess, D: DelayNs> PwmPin<A, D> {
    pub fn new(fs: A, delay: D, pin: u8) -> Self {
        let mut chip_path = Path::new();
        let _ = chip_path.push_str(DEFAULT_CHIP_PATH);
        Self {
            fs,
            delay,
            pin,
            chip_path,
            enabled: false,
            period: 0,
        }
    }

    /// Use another pwmchip directory.
    pub fn with_chip_path(mut self, path: &str) -> Self {
        self.chip_path.clear();
        if self.chip_path.push_str(path).is_err() {
            warn!("pwm: chip path too long, keeping default");
            let _ = self.chip_path.push_str(DEFAULT_CHIP_PATH);
        }
        self
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn err(&self, op: &'static str, kind: PwmErrorKind) -> PwmError {
        PwmError {
            op,
            pin: self.pin,
            kind,
        }
    }

    fn chip_file(&self, op: &'static str, file: &str) -> Result<Path, PwmError> {
        let mut path = Path::new();
        write!(path, "{}/{}", self.chip_path, file)
            .map_err(|_| self.err(op, PwmErrorKind::PathTooLong))?;
        Ok(path)
    }

    fn pin_file(&self, op: &'static str, file: &str) -> Result<Path, PwmError> {
        let mut path = Path::new();
        write!(path, "{}/pwm{}/{}", self.chip_path, self.pin, file)
            .map_err(|_| self.err(op, PwmErrorKind::PathTooLong))?;
        Ok(path)
    }

    fn write_value(&mut self, op: &'static str, path: &str, value: u32) -> Result<(), PwmError> {
        let mut text: String<10> = String::new();
        let _ = write!(text, "{}", value);
        self.fs
            .write(path, text.as_bytes())
            .map_err(|e| self.err(op, PwmErrorKind::Fs(e)))
    }

    fn read_value(&mut self, op: &'static str, path: &str) -> Result<u32, PwmError> {
        let mut buf = [0u8; READ_CAP];
        let n = self
            .fs
            .read(path, &mut buf)
            .map_err(|e| self.err(op, PwmErrorKind::Fs(e)))?;
        parse_u32(&buf[..n]).ok_or(self.err(op, PwmErrorKind::Parse))
    }

    /// Makes the channel available; an already exported channel is fine.
    pub fn export(&mut self) -> Result<(), PwmError> {
        let path = self.chip_file("Export", "export")?;
        match self.write_value("Export", &path, self.pin as u32) {
            Ok(()) => {}
            Err(PwmError {
                kind: PwmErrorKind::Fs(FsError::Busy),
                ..
            }) => debug!("pwm: pin {} already exported", self.pin),
            Err(e) => return Err(e),
        }
        self.delay.delay_ms(EXPORT_SETTLE_MS);
        Ok(())
    }

    pub fn unexport(&mut self) -> Result<(), PwmError> {
        let path = self.chip_file("Unexport", "unexport")?;
        self.write_value("Unexport", &path, self.pin as u32)
    }

    /// Writes only when the state changes.
    pub fn enable(&mut self, on: bool) -> Result<(), PwmError> {
        if self.enabled == on {
            return Ok(());
        }
        let path = self.pin_file("set Enable", "enable")?;
        self.write_value("set Enable", &path, u32::from(on))?;
        self.enabled = on;
        Ok(())
    }

    /// `None` when the driver exposes an empty polarity file.
    pub fn polarity(&mut self) -> Result<Option<Polarity>, PwmError> {
        let path = self.pin_file("Polarity", "polarity")?;
        let mut buf = [0u8; READ_CAP];
        let n = self
            .fs
            .read(&path, &mut buf)
            .map_err(|e| self.err("Polarity", PwmErrorKind::Fs(e)))?;
        match core::str::from_utf8(&buf[..n]).map(str::trim) {
            Ok("") => Ok(None),
            Ok("normal") => Ok(Some(Polarity::Normal)),
            Ok("inverted") => Ok(Some(Polarity::Inverted)),
            _ => Err(self.err("Polarity", PwmErrorKind::Parse)),
        }
    }

    pub fn invert_polarity(&mut self, invert: bool) -> Result<(), PwmError> {
        let polarity = if invert {
            Polarity::Inverted
        } else {
            Polarity::Normal
        };
        self.set_polarity(polarity)
    }

    pub fn set_polarity(&mut self, polarity: Polarity) -> Result<(), PwmError> {
        if self.enabled {
            return Err(self.err("SetPolarity", PwmErrorKind::Enabled));
        }
        let path = self.pin_file("SetPolarity", "polarity")?;
        self.fs
            .write(&path, polarity.as_str().as_bytes())
            .map_err(|e| self.err("SetPolarity", PwmErrorKind::Fs(e)))
    }

    /// Period in ns; an empty file reads as 0.
    pub fn period(&mut self) -> Result<u32, PwmError> {
        let path = self.pin_file("Period", "period")?;
        let period = self.read_value("Period", &path)?;
        self.period = period;
        Ok(period)
    }

    pub fn set_period(&mut self, period: u32) -> Result<(), PwmError> {
        let path = self.pin_file("SetPeriod", "period")?;
        self.write_value("SetPeriod", &path, period)?;
        self.period = period;
        Ok(())
    }

    /// Duty cycle in ns.
    pub fn duty_cycle(&mut self) -> Result<u32, PwmError> {
        let path = self.pin_file("DutyCycle", "duty_cycle")?;
        self.read_value("DutyCycle", &path)
    }

    pub fn set_duty_cycle_ns(&mut self, duty: u32) -> Result<(), PwmError> {
        let path = self.pin_file("SetDutyCycle", "duty_cycle")?;
        self.write_value("SetDutyCycle", &path, duty)
    }
}

impl<A, D> pwm::ErrorType for PwmPin<A, D> {
    type Error = PwmError;
}

// Duty is a fraction of the last known period, so a servo or LED driver
// can run on a sysfs channel once its period is set.
impl<A: SysfsAccess, D: DelayNs> SetDutyCycle for PwmPin<A, D> {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), PwmError> {
        let ns = (self.period as u64 * duty as u64 / u16::MAX as u64) as u32;
        self.set_duty_cycle_ns(ns)
    }
}
