//! Real-time clock.
//!
//! Ticked four times per emulated second. Each tick copies the host's wall
//! clock into the BCD time registers and raises the RTC flags that changed.
//! The host time comes through [`Clock`] so tests can script it.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::interrupts::{
    RTC_FLAG_ADDR, RTC_HALF_SECOND, RTC_HOUR, RTC_MINUTE, RTC_QUARTER_SECOND, RTC_SECOND,
};
use crate::memory::Memory;

pub const RTC_SECOND_ADDR: u32 = 0xF068;
pub const RTC_MINUTE_ADDR: u32 = 0xF069;
pub const RTC_HOUR_ADDR: u32 = 0xF06A;
pub const RTC_DAY_ADDR: u32 = 0xF06B;

const ALL_FLAGS: u8 = RTC_QUARTER_SECOND | RTC_HALF_SECOND | RTC_SECOND | RTC_MINUTE | RTC_HOUR;

/// Wall-clock fields mirrored into the RTC registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WallTime {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    /// Days since Sunday, 0..=6.
    pub weekday: u8,
}

/// Source of host time.
pub trait Clock: Send {
    fn now(&mut self) -> WallTime;
}

/// Host local time, falling back to UTC when the offset cannot be determined.
#[derive(Debug, Default)]
pub struct SystemClock {
    warned: bool,
}

impl Clock for SystemClock {
    fn now(&mut self) -> WallTime {
        let now = match time::OffsetDateTime::now_local() {
            Ok(now) => now,
            Err(e) => {
                if !self.warned {
                    warn!("Local UTC offset unavailable ({}), RTC follows UTC", e);
                    self.warned = true;
                }
                time::OffsetDateTime::now_utc()
            }
        };
        WallTime {
            second: now.second(),
            minute: now.minute(),
            hour: now.hour(),
            weekday: now.weekday().number_days_from_sunday(),
        }
    }
}

fn system_clock() -> Box<dyn Clock> {
    Box::new(SystemClock::default())
}

/// Two-digit packed BCD: tens in the high nibble.
#[inline(always)]
pub fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

#[derive(Serialize, Deserialize)]
pub struct Rtc {
    pub initialized: bool,
    pub quarter_count: u64,
    last: Option<WallTime>,
    #[serde(skip, default = "system_clock")]
    clock: Box<dyn Clock>,
}

impl Rtc {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Rtc {
            initialized: false,
            quarter_count: 0,
            last: None,
            clock,
        }
    }

    /// Swap the time source, keeping counters.
    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    /// Take the counters of `saved`, keeping this RTC's time source.
    pub fn restore(&mut self, saved: Rtc) {
        self.initialized = saved.initialized;
        self.quarter_count = saved.quarter_count;
        self.last = saved.last;
    }

    pub fn reset(&mut self) {
        self.initialized = false;
        self.quarter_count = 0;
        self.last = None;
    }

    /// First-use setup: load the time and raise every flag.
    pub fn initialize(&mut self, mem: &mut Memory) {
        self.initialized = true;
        self.tick(mem);
        let flags = mem.read_byte(RTC_FLAG_ADDR) | ALL_FLAGS;
        mem.write_byte(RTC_FLAG_ADDR, flags);
        debug!("RTC initialized at {:?}", self.last);
    }

    /// Quarter-second tick.
    pub fn tick(&mut self, mem: &mut Memory) {
        let now = self.clock.now();
        mem.write_byte(RTC_SECOND_ADDR, to_bcd(now.second));
        mem.write_byte(RTC_MINUTE_ADDR, to_bcd(now.minute));
        mem.write_byte(RTC_HOUR_ADDR, to_bcd(now.hour));
        mem.write_byte(RTC_DAY_ADDR, to_bcd(now.weekday));

        self.quarter_count += 1;
        let mut flags = mem.read_byte(RTC_FLAG_ADDR) | RTC_QUARTER_SECOND;
        if self.quarter_count % 2 == 0 {
            flags |= RTC_HALF_SECOND;
        }
        if let Some(last) = self.last {
            if now.second != last.second {
                flags |= RTC_SECOND;
            }
            if now.minute != last.minute {
                flags |= RTC_MINUTE;
            }
            if now.hour != last.hour {
                flags |= RTC_HOUR;
            }
        }
        mem.write_byte(RTC_FLAG_ADDR, flags);
        self.last = Some(now);
    }
}

impl Default for Rtc {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Rtc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rtc")
            .field("initialized", &self.initialized)
            .field("quarter_count", &self.quarter_count)
            .field("last", &self.last)
            .finish()
    }
}
