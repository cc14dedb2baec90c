mod common;

use chipglue::drivers::servo::Servo;
use chipglue::{CommandError, Commander, Driver, Error, Params, Value};
use common::FakePwm;

#[test]
fn angle_sets_pulse_in_20ms_frame() {
    let pwm = FakePwm::new();
    let mut servo = Servo::new(pwm.clone());
    servo.start().unwrap();

    servo.move_to(90).unwrap();
    assert_eq!(pwm.duty(), 75);
    servo.min().unwrap();
    assert_eq!(pwm.duty(), 25);
    servo.max().unwrap();
    assert_eq!(pwm.duty(), 125);
    assert_eq!(servo.angle(), 180);
}

#[test]
fn angle_above_180_is_rejected() {
    let pwm = FakePwm::new();
    let mut servo = Servo::new(pwm.clone());
    servo.center().unwrap();
    assert!(matches!(servo.move_to(181), Err(Error::InvalidArgument(_))));
    assert_eq!(servo.angle(), 90);
    assert_eq!(pwm.duty(), 75);
}

#[test]
fn commands() {
    let pwm = FakePwm::new();
    let mut servo = Servo::new(pwm.clone());
    servo.set_name("Pan");
    assert_eq!(servo.name(), "Pan");

    servo
        .command("Move", &Params(&[("angle", Value::U8(45))]))
        .unwrap();
    assert_eq!(pwm.duty(), 50);
    assert_eq!(servo.command("CurrentAngle", &Params::EMPTY), Ok(Value::U8(45)));
    assert_eq!(
        servo.command("Move", &Params::EMPTY),
        Err(CommandError::MissingParam("angle"))
    );
    assert_eq!(servo.command("Spin", &Params::EMPTY), Err(CommandError::Unknown));
}
