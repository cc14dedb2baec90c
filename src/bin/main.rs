// chipglue demo firmware (ESP32-C3)
//
// Boot: logger -> board -> LCD -> PCF8591 on the shared I2C0 bus.
// Loop, once per second: step the DAC output, read all four inputs,
// log them and show AIN0 on the second LCD row.
//
// Wiring for the YL-40 PCF8591 plate: AOUT -> AIN2.

#![no_std]
#![no_main]

use core::cell::RefCell;
use core::fmt::Write as _;

use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use embedded_hal::delay::DelayNs;
use log::{info, warn};
use static_cell::StaticCell;

use chipglue::board::{Board, I2cBus};
use chipglue::drivers::pcf8591::Pcf8591;
use chipglue::{Configurable, Driver};

esp_bootloader_esp_idf::esp_app_desc!();

const LOOP_MS: u32 = 1000;
const DAC_STEP: i32 = 100;

// brightness, temperature, AOUT loop-back, potentiometer
const INPUTS: [&str; 4] = ["s.0", "s.1", "s.2", "s.3"];

static I2C: StaticCell<RefCell<I2cBus>> = StaticCell::new();

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    info!("booting...");

    let board = Board::init(peripherals).unwrap();
    let mut lcd = board.lcd;
    let i2c: &'static RefCell<I2cBus> = I2C.init(RefCell::new(board.i2c));
    info!("hardware initialized.");

    if let Err(e) = lcd.start() {
        warn!("lcd start failed: {:?}", e);
    }
    let _ = lcd.write("chipglue demo");

    let mut pcf = Pcf8591::new(i2c, Delay::new()).with_bus(0);
    if let Err(e) = pcf.start() {
        warn!("{} start failed: {}", pcf.name(), e);
    }

    let mut delay = Delay::new();
    let mut out = 0;
    loop {
        match pcf.analog_write(out) {
            Ok(()) => info!("written: {} mV", out),
            Err(e) => warn!("write failed: {}", e),
        }
        out = if out + DAC_STEP > 3300 { 0 } else { out + DAC_STEP };

        let mut ain0 = None;
        for (i, desc) in INPUTS.iter().enumerate() {
            match pcf.analog_read(desc) {
                Ok(mv) => {
                    info!("read {}: {} mV", desc, mv);
                    if i == 0 {
                        ain0 = Some(mv);
                    }
                }
                Err(e) => warn!("read {} failed: {}", desc, e),
            }
        }

        if let Some(mv) = ain0 {
            let mut line: heapless::String<16> = heapless::String::new();
            let _ = write!(line, "AIN0 {:>5} mV", mv);
            let _ = lcd.set_cursor(0, 1).and_then(|_| lcd.write(&line));
        }

        delay.delay_ms(LOOP_MS);
    }
}
