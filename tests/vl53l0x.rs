mod common;

use chipglue::drivers::vl53l0x::Vl53l0x;
use chipglue::{Driver, Error, Exclusive};
use common::{FakeI2c, NoopDelay};

fn sensor(i2c: &FakeI2c) -> Vl53l0x<Exclusive<FakeI2c>, NoopDelay> {
    i2c.set_reg(0xC0, 0xEE);
    i2c.set_reg(0xC1, 0xAA);
    i2c.set_reg(0xC2, 0x10);
    Vl53l0x::new(Exclusive::new(i2c.clone()), NoopDelay::new())
}

#[test]
fn start_checks_reference_registers() {
    let i2c = FakeI2c::new();
    let mut tof = sensor(&i2c);
    tof.start().unwrap();
    assert_eq!(i2c.addresses()[0], 0x29);
}

#[test]
fn start_rejects_other_chip() {
    let i2c = FakeI2c::new();
    let mut tof = sensor(&i2c);
    i2c.set_reg(0xC1, 0x00);
    assert_eq!(
        tof.start(),
        Err(Error::UnexpectedId {
            register: 0xC1,
            expected: 0xAA,
            got: 0x00
        })
    );
}

#[test]
fn distance_after_ready() {
    let i2c = FakeI2c::new();
    let mut tof = sensor(&i2c);
    tof.start().unwrap();
    i2c.respond(0x13, &[0x00]);
    i2c.respond(0x13, &[0x00]);
    i2c.respond(0x13, &[0x04]);
    i2c.set_reg(0x1E, 0x01);
    i2c.set_reg(0x1F, 0x2C);

    assert_eq!(tof.distance_mm(), Ok(300));
    assert_eq!(i2c.reg(0x00), 0x01);
    assert_eq!(i2c.reg(0x0B), 0x01);
    assert_eq!(tof.distance(), Ok(30));
}

#[test]
fn distance_times_out() {
    let i2c = FakeI2c::new();
    let delay = NoopDelay::new();
    i2c.set_reg(0xC0, 0xEE);
    i2c.set_reg(0xC1, 0xAA);
    i2c.set_reg(0xC2, 0x10);
    let mut tof = Vl53l0x::new(Exclusive::new(i2c.clone()), delay.clone());
    tof.start().unwrap();

    assert_eq!(tof.distance_mm(), Err(Error::Timeout));
    assert_eq!(delay.elapsed_ms(), 100);
}
