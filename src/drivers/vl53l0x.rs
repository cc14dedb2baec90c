// VL53L0X time-of-flight ranging sensor
//
// The datasheet address 0x52 is the 8-bit write address; on the bus the
// chip answers at 0x29. Start only checks the chip identity by its
// reference registers; the ST reference tuning sequence (SPAD and
// temperature calibration) is not run, so readings come from the chip's
// power-on defaults.
//
// Datasheet: https://www.st.com/resource/en/datasheet/vl53l0x.pdf

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::bus::{BusError, Config, Configurable, Connection, Connector, open};
use crate::device::{Driver, Name, make_name};
use crate::error::Error;

pub const DEFAULT_ADDRESS: u8 = 0x29;

const REG_SYSRANGE_START: u8 = 0x00;
const REG_SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;
const REG_RESULT_INTERRUPT_STATUS: u8 = 0x13;
const REG_RESULT_RANGE_MM: u8 = 0x1E; // RESULT_RANGE_STATUS + 10

/// Reference registers 0xC0..0xC2 and their content after reset.
const REG_REF1: u8 = 0xC0;
const REF1_VALUES: [u8; 3] = [0xEE, 0xAA, 0x10];

const MAX_POLLS: u32 = 100;
const POLL_INTERVAL_MS: u32 = 1;

pub struct Vl53l0x<C: Connector, D> {
    name: Name,
    connector: C,
    config: Config,
    connection: Option<Connection<C::Bus>>,
    delay: D,
}

impl<C: Connector, D: DelayNs> Vl53l0x<C, D> {
    pub fn new(connector: C, delay: D) -> Self {
        Self {
            name: make_name("VL53L0X"),
            connector,
            config: Config::new(),
            connection: None,
            delay,
        }
    }

    fn conn(&mut self) -> Result<&mut Connection<C::Bus>, Error<BusError<C>>> {
        self.connection.as_mut().ok_or(Error::NotStarted)
    }

    fn check_identity(&mut self) -> Result<(), Error<BusError<C>>> {
        let mut data = [0u8; 3];
        self.conn()?.read_block_data(REG_REF1, &mut data)?;
        for (i, (&got, &expected)) in data.iter().zip(REF1_VALUES.iter()).enumerate() {
            if got != expected {
                return Err(Error::UnexpectedId {
                    register: REG_REF1 + i as u8,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Single-shot measurement in millimetres.
    pub fn distance_mm(&mut self) -> Result<u16, Error<BusError<C>>> {
        self.conn()?.write_byte_data(REG_SYSRANGE_START, 0x01)?;

        let mut ready = false;
        for _ in 0..MAX_POLLS {
            let status = self.conn()?.read_byte_data(REG_RESULT_INTERRUPT_STATUS)?;
            if status & 0x07 != 0 {
                ready = true;
                break;
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }
        if !ready {
            return Err(Error::Timeout);
        }

        let conn = self.conn()?;
        let mm = conn.read_word_data(REG_RESULT_RANGE_MM)?;
        conn.write_byte_data(REG_SYSTEM_INTERRUPT_CLEAR, 0x01)?;
        debug!("vl53l0x: {} mm", mm);
        Ok(mm)
    }

    /// Single-shot measurement in centimetres.
    pub fn distance(&mut self) -> Result<u16, Error<BusError<C>>> {
        Ok(self.distance_mm()? / 10)
    }
}

impl<C: Connector, D> Configurable for Vl53l0x<C, D> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<C: Connector, D: DelayNs> Driver for Vl53l0x<C, D> {
    type Error = Error<BusError<C>>;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = make_name(name);
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.connection = Some(open(&mut self.connector, &self.config, DEFAULT_ADDRESS)?);
        self.check_identity()
    }

    fn halt(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
