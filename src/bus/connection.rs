// An I2C bus handle bound to one 7-bit device address.
//
// Register reads go out as a single write-read transaction (repeated
// start): on a shared bus nothing can slip in between the register
// pointer and the data phase. Multi-byte words are MSB first, which is
// what every chip in this crate uses.

use embedded_hal::i2c::I2c;
use log::trace;

use crate::error::Error;

pub struct Connection<I2C> {
    bus: I2C,
    address: u8,
}

impl<I2C, E> Connection<I2C>
where
    I2C: I2c<Error = E>,
{
    pub fn new(bus: I2C, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Raw bus access for chips that answer on a second address.
    pub fn bus(&mut self) -> &mut I2C {
        &mut self.bus
    }

    pub fn release(self) -> I2C {
        self.bus
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<(), Error<E>> {
        self.bus.read(self.address, buf).map_err(Error::Bus)?;
        trace!("i2c 0x{:02x} read {:02x?}", self.address, buf);
        Ok(())
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), Error<E>> {
        trace!("i2c 0x{:02x} write {:02x?}", self.address, data);
        self.bus.write(self.address, data).map_err(Error::Bus)
    }

    pub fn read_byte(&mut self) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.read(&mut buf)?;
        Ok(buf[0])
    }

    pub fn write_byte(&mut self, val: u8) -> Result<(), Error<E>> {
        self.write(&[val])
    }

    pub fn read_byte_data(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.read_block_data(reg, &mut buf)?;
        Ok(buf[0])
    }

    pub fn write_byte_data(&mut self, reg: u8, val: u8) -> Result<(), Error<E>> {
        self.write(&[reg, val])
    }

    pub fn read_word_data(&mut self, reg: u8) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        self.read_block_data(reg, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn write_word_data(&mut self, reg: u8, val: u16) -> Result<(), Error<E>> {
        let [hi, lo] = val.to_be_bytes();
        self.write(&[reg, hi, lo])
    }

    pub fn read_block_data(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<E>> {
        self.bus
            .write_read(self.address, &[reg], buf)
            .map_err(Error::Bus)?;
        trace!("i2c 0x{:02x} reg 0x{:02x} read {:02x?}", self.address, reg, buf);
        Ok(())
    }

    /// Writes `reg` followed by up to 32 data bytes in one transfer.
    pub fn write_block_data(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<E>> {
        const MAX_BLOCK: usize = 32;
        if data.len() > MAX_BLOCK {
            return Err(Error::InvalidArgument("block larger than 32 bytes"));
        }
        let mut frame = [0u8; MAX_BLOCK + 1];
        frame[0] = reg;
        frame[1..=data.len()].copy_from_slice(data);
        self.write(&frame[..=data.len()])
    }
}
