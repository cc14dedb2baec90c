mod common;

use chipglue::drivers::pcf8583::{Mode, Pcf8583};
use chipglue::{Commander, DateTime, Driver, Error, Exclusive, Params, Value};
use common::FakeI2c;

fn started(mode: Mode, ctrl: u8) -> (Pcf8583<Exclusive<FakeI2c>>, FakeI2c) {
    let i2c = FakeI2c::new();
    i2c.set_reg(0x00, ctrl);
    let mut rtc = Pcf8583::new(Exclusive::new(i2c.clone())).with_mode(mode);
    rtc.start().unwrap();
    i2c.clear_log();
    (rtc, i2c)
}

#[test]
fn start_keeps_matching_mode() {
    let i2c = FakeI2c::new();
    let mut rtc = Pcf8583::new(Exclusive::new(i2c.clone()));
    rtc.start().unwrap();
    assert!(i2c.writes().iter().all(|w| w.len() == 1));
}

#[test]
fn start_switches_to_counter_mode() {
    let i2c = FakeI2c::new();
    i2c.set_reg(0x00, 0x04);
    let mut rtc = Pcf8583::new(Exclusive::new(i2c.clone())).with_mode(Mode::Counter);
    rtc.start().unwrap();
    assert_eq!(i2c.writes().last(), Some(&vec![0x00, 0x24]));
}

#[test]
fn write_time_stops_writes_and_restarts() {
    let (mut rtc, i2c) = started(Mode::Clock32k, 0x00);
    let dt = DateTime::new(2022, 2, 14, 13, 45, 30).with_millisecond(120);
    rtc.write_time(dt).unwrap();

    let writes = i2c.writes();
    assert_eq!(
        writes[1],
        vec![0x00, 0x80, 0x12, 0x30, 0x45, 0x13, 0x14, 0x22]
    );
    assert_eq!(writes[2], vec![0x00, 0x00]);
}

#[test]
fn read_time_adds_year_offset() {
    let (mut rtc, _i2c) = started(Mode::Clock32k, 0x00);
    let dt = DateTime::new(2022, 2, 14, 13, 45, 30).with_millisecond(120);
    rtc.write_time(dt).unwrap();
    assert_eq!(rtc.read_time(), Ok(dt));
}

#[test]
fn read_time_decodes_registers() {
    let (mut rtc, i2c) = started(Mode::Clock50, 0x10);
    // year bits 1, 24th; weekday 3, December
    i2c.respond(0x01, &[0x99, 0x59, 0x07, 0x23, 0x64, 0x72]);
    let dt = rtc.read_time().unwrap();
    assert_eq!(dt.year, 1);
    assert_eq!(dt.month, 12);
    assert_eq!(dt.day, 24);
    assert_eq!(dt.hour, 23);
    assert_eq!(dt.minute, 7);
    assert_eq!(dt.second, 59);
    assert_eq!(dt.millisecond, 990);
}

#[test]
fn clock_access_fails_in_counter_mode() {
    let (mut rtc, _i2c) = started(Mode::Counter, 0x20);
    assert_eq!(rtc.read_time(), Err(Error::WrongMode(0x20)));
}

#[test]
fn counter_is_written_as_bcd() {
    let (mut rtc, i2c) = started(Mode::Counter, 0x20);
    rtc.write_counter(123_456).unwrap();
    assert_eq!(
        i2c.writes(),
        vec![
            vec![0x00],
            vec![0x00, 0xA0, 0x56, 0x34, 0x12],
            vec![0x00, 0x20],
        ]
    );
    assert_eq!(rtc.read_counter(), Ok(123_456));
}

#[test]
fn counter_access_fails_in_clock_mode() {
    let (mut rtc, _i2c) = started(Mode::Clock32k, 0x00);
    assert_eq!(rtc.write_counter(1), Err(Error::WrongMode(0x00)));
}

#[test]
fn ram_is_offset_by_sixteen() {
    let (mut rtc, i2c) = started(Mode::Clock32k, 0x00);
    rtc.write_ram(0x05, 0xAB).unwrap();
    assert_eq!(i2c.writes(), vec![vec![0x15, 0xAB]]);
    assert_eq!(rtc.read_ram(0x05), Ok(0xAB));
    assert!(matches!(rtc.write_ram(0xF0, 1), Err(Error::InvalidArgument(_))));
}

#[test]
fn commands() {
    let (mut rtc, _i2c) = started(Mode::Clock32k, 0x00);
    let dt = DateTime::new(2023, 7, 1, 8, 0, 0);
    rtc.command("WriteTime", &Params(&[("val", Value::Time(dt))]))
        .unwrap();
    assert_eq!(
        rtc.command("ReadTime", &Params::EMPTY),
        Ok(Value::Time(dt))
    );
    rtc.command(
        "WriteRAM",
        &Params(&[("address", Value::U8(1)), ("val", Value::U8(7))]),
    )
    .unwrap();
    assert_eq!(
        rtc.command("ReadRAM", &Params(&[("address", Value::U8(1))])),
        Ok(Value::U8(7))
    );
    assert!(rtc.command("Nope", &Params::EMPTY).is_err());
}
