// Calendar date and time as handled by the RTC drivers.
// No time zone; the chips count local wall-clock time.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    pub year: u16,
    /// 1..=12
    pub month: u8,
    /// 1..=31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl DateTime {
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond: 0,
        }
    }

    pub const fn with_millisecond(mut self, ms: u16) -> Self {
        self.millisecond = ms;
        self
    }

    /// Day of the week, Sunday = 0 (Sakamoto).
    pub fn weekday(&self) -> u8 {
        const T: [u16; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];
        let month = self.month.clamp(1, 12) as usize;
        let y = if month < 3 {
            self.year.saturating_sub(1)
        } else {
            self.year
        } as u32;
        let d = y + y / 4 - y / 100 + y / 400 + T[month - 1] as u32 + self.day as u32;
        (d % 7) as u8
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.millisecond
        )
    }
}
