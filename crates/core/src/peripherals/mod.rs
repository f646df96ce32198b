//! H8/38606 on-chip peripherals and the devices on its serial bus.
//!
//! - [`Timers`]: shared 32768 Hz clock driving [`TimerB1`] (8-bit system tick)
//!   and [`TimerW`] (16-bit, beeper tone)
//! - [`Rtc`]: real-time clock mirrored from the host wall clock
//! - [`Ssu`]: synchronous serial unit multiplexing the [`Eeprom`],
//!   the [`Accelerometer`] and the LCD controller
//! - [`Sci3`]: asynchronous serial unit driving the infrared port

pub mod accelerometer;
pub mod eeprom;
pub mod rtc;
pub mod sci3;
pub mod ssu;
pub mod timer_b1;
pub mod timer_w;
mod timers;

pub use accelerometer::Accelerometer;
pub use eeprom::Eeprom;
pub use rtc::{Clock, Rtc, SystemClock, WallTime};
pub use sci3::Sci3;
pub use ssu::Ssu;
pub use timer_b1::TimerB1;
pub use timer_w::TimerW;
pub use timers::{Timers, CLOCK_STOP_1_ADDR, CLOCK_STOP_2_ADDR, TIMER_B1_STANDBY, TIMER_W_STANDBY};
