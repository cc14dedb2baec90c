mod common;

use core::cell::RefCell;

use chipglue::bus::{Connection, open};
use chipglue::drivers::pcf8591::Pcf8591;
use chipglue::{Config, ConnectError, Configurable, Connector, Driver, Error, Exclusive};
use common::{FakeI2c, NoopDelay};

#[test]
fn exclusive_bus_is_handed_out_once() {
    let mut conn = Exclusive::new(FakeI2c::new());
    assert_eq!(
        conn.connect(1).err(),
        Some(ConnectError::BusOutOfRange(1))
    );
    assert!(conn.connect(0).is_ok());
    assert_eq!(conn.connect(0).err(), Some(ConnectError::BusInUse));
}

#[test]
fn open_applies_overrides() {
    let i2c = FakeI2c::new();
    let mut cfg = Config::new();
    cfg.set_address(0x4A);
    let mut conn: Connection<FakeI2c> = open(&mut Exclusive::new(i2c.clone()), &cfg, 0x48).unwrap();
    assert_eq!(conn.address(), 0x4A);
    conn.write_word_data(0x01, 0x8583).unwrap();
    assert_eq!(i2c.writes(), vec![vec![0x01, 0x85, 0x83]]);
}

#[test]
fn block_write_is_limited() {
    let mut conn = Connection::new(FakeI2c::new(), 0x50);
    assert!(matches!(
        conn.write_block_data(0x00, &[0u8; 33]),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn drivers_share_refcell_bus() {
    let i2c = FakeI2c::new();
    let bus = RefCell::new(i2c.clone());
    let mut a = Pcf8591::new(&bus, NoopDelay::new());
    let mut b = Pcf8591::new(&bus, NoopDelay::new()).with_address(0x49);
    a.start().unwrap();
    b.start().unwrap();
    a.analog_write(0).unwrap();
    b.analog_write(0).unwrap();
    let addrs = i2c.addresses();
    assert!(addrs.contains(&0x48));
    assert!(addrs.contains(&0x49));

    let mut c = Pcf8591::new(&bus, NoopDelay::new()).with_bus(1);
    assert_eq!(c.start(), Err(Error::Connect(ConnectError::BusOutOfRange(1))));
}

#[test]
fn drivers_share_critical_section_bus() {
    let i2c = FakeI2c::new();
    let bus = critical_section::Mutex::new(RefCell::new(i2c.clone()));
    let mut a = Pcf8591::new(&bus, NoopDelay::new());
    a.start().unwrap();
    a.analog_write(0).unwrap();
    assert!(!i2c.addresses().is_empty());
    assert!(i2c.addresses().iter().all(|&a| a == 0x48));
}
