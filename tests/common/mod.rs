// Host-side fakes shared by the integration tests.
//
// FakeI2c models a chip as 256 byte registers with auto-increment: a
// write of [reg, a, b] stores a at reg and b at reg+1, a write-read of
// [reg] returns bytes from reg on. Fixed per-register responses override
// the model, plain reads pop from a queue. Every transfer is logged.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

use chipglue::sysfs::{FsError, SysfsAccess};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, Operation};
use embedded_hal::pwm::{self, SetDutyCycle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeError;

impl i2c::Error for FakeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Write(u8, Vec<u8>),
    Read(u8, usize),
}

#[derive(Default)]
pub struct State {
    pub regs: Vec<u8>,
    pub responses: BTreeMap<u8, VecDeque<Vec<u8>>>,
    pub read_queue: VecDeque<u8>,
    pub log: Vec<Transfer>,
    pub fail_write: bool,
    pub fail_read: bool,
}

#[derive(Clone)]
pub struct FakeI2c {
    state: Rc<RefCell<State>>,
}

impl FakeI2c {
    pub fn new() -> Self {
        let state = State {
            regs: vec![0; 256],
            ..Default::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn set_reg(&self, reg: u8, val: u8) {
        self.state.borrow_mut().regs[reg as usize] = val;
    }

    pub fn reg(&self, reg: u8) -> u8 {
        self.state.borrow().regs[reg as usize]
    }

    /// Next register read of `reg` answers `data` (once per call, FIFO);
    /// the last queued answer repeats.
    pub fn respond(&self, reg: u8, data: &[u8]) {
        self.state
            .borrow_mut()
            .responses
            .entry(reg)
            .or_default()
            .push_back(data.to_vec());
    }

    pub fn queue_reads(&self, data: &[u8]) {
        self.state.borrow_mut().read_queue.extend(data.iter().copied());
    }

    pub fn fail_writes(&self, on: bool) {
        self.state.borrow_mut().fail_write = on;
    }

    pub fn fail_reads(&self, on: bool) {
        self.state.borrow_mut().fail_read = on;
    }

    pub fn log(&self) -> Vec<Transfer> {
        self.state.borrow().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// Payloads of all writes, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|t| match t {
                Transfer::Write(_, data) => Some(data.clone()),
                Transfer::Read(..) => None,
            })
            .collect()
    }

    pub fn reads(&self) -> Vec<usize> {
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|t| match t {
                Transfer::Read(_, n) => Some(*n),
                Transfer::Write(..) => None,
            })
            .collect()
    }

    pub fn addresses(&self) -> Vec<u8> {
        self.state
            .borrow()
            .log
            .iter()
            .map(|t| match t {
                Transfer::Write(a, _) | Transfer::Read(a, _) => *a,
            })
            .collect()
    }
}

impl ErrorType for FakeI2c {
    type Error = FakeError;
}

impl I2c for FakeI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), FakeError> {
        let mut st = self.state.borrow_mut();
        let mut pointer: Option<u8> = None;
        for op in operations {
            match op {
                Operation::Write(data) => {
                    if st.fail_write {
                        return Err(FakeError);
                    }
                    st.log.push(Transfer::Write(address, data.to_vec()));
                    if let Some((&reg, values)) = data.split_first() {
                        pointer = Some(reg);
                        for (i, v) in values.iter().enumerate() {
                            let idx = (reg as usize + i) % 256;
                            st.regs[idx] = *v;
                        }
                    }
                }
                Operation::Read(buf) => {
                    if st.fail_read {
                        return Err(FakeError);
                    }
                    st.log.push(Transfer::Read(address, buf.len()));
                    match pointer {
                        Some(reg) => {
                            let fixed = st.responses.get_mut(&reg).and_then(|q| {
                                if q.len() > 1 { q.pop_front() } else { q.front().cloned() }
                            });
                            for (i, b) in buf.iter_mut().enumerate() {
                                *b = match &fixed {
                                    Some(data) => data.get(i).copied().unwrap_or(0),
                                    None => st.regs[(reg as usize + i) % 256],
                                };
                            }
                        }
                        None => {
                            for b in buf.iter_mut() {
                                *b = st.read_queue.pop_front().unwrap_or(0);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay that only accounts the requested time.
#[derive(Clone, Default)]
pub struct NoopDelay {
    elapsed_ns: Rc<Cell<u64>>,
}

impl NoopDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns.get() / 1_000_000
    }
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + ns as u64);
    }
}

/// GPIO line that remembers every level it was driven to; reads return
/// the last level (or a preset input level).
#[derive(Clone, Default)]
pub struct FakePin {
    levels: Rc<RefCell<Vec<bool>>>,
    input: Rc<Cell<Option<bool>>>,
}

impl FakePin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Vec<bool> {
        self.levels.borrow().clone()
    }

    pub fn set_input(&self, level: bool) {
        self.input.set(Some(level));
    }
}

impl digital::ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

impl InputPin for FakePin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        let last = self.levels.borrow().last().copied().unwrap_or(false);
        Ok(self.input.get().unwrap_or(last))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|h| !h)
    }
}

/// PWM channel with a 0..=1000 duty range.
#[derive(Clone, Default)]
pub struct FakePwm {
    duty: Rc<Cell<u16>>,
}

impl FakePwm {
    pub const MAX: u16 = 1000;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn duty(&self) -> u16 {
        self.duty.get()
    }
}

impl pwm::ErrorType for FakePwm {
    type Error = Infallible;
}

impl SetDutyCycle for FakePwm {
    fn max_duty_cycle(&self) -> u16 {
        Self::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.duty.set(duty);
        Ok(())
    }
}

/// In-memory /sys tree.
#[derive(Default)]
pub struct MemFs {
    pub files: BTreeMap<String, Vec<u8>>,
    pub busy: BTreeSet<String>,
    pub failing: BTreeSet<String>,
    pub writes: Vec<(String, String)>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .get(path)
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }
}

impl SysfsAccess for MemFs {
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
        if self.failing.contains(path) {
            return Err(FsError::Io);
        }
        if self.busy.contains(path) {
            return Err(FsError::Busy);
        }
        self.writes
            .push((path.to_string(), String::from_utf8_lossy(data).into_owned()));
        self.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, FsError> {
        if self.failing.contains(path) {
            return Err(FsError::Io);
        }
        let content = self.files.get(path).ok_or(FsError::NotFound)?;
        let n = content.len().min(buf.len());
        buf[..n].copy_from_slice(&content[..n]);
        Ok(n)
    }
}
