// Linux sysfs access for PWM channels.

pub mod fs;
pub mod pwm_pin;

#[cfg(feature = "std")]
pub use fs::NativeFs;
pub use fs::{FsError, SysfsAccess};
pub use pwm_pin::{Polarity, PwmError, PwmErrorKind, PwmPin};
