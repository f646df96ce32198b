//! Shared 32768 Hz timer clock for Timer B1 and Timer W.
//!
//! Each timer runs only while its module standby bit and its own counting
//! bit are both set. Both are plain memory bytes the firmware toggles, so
//! `running` is recomputed on every clock rather than cached.

use serde::{Deserialize, Serialize};

use super::{timer_b1::TIMER_B_COUNTING, timer_w::TIMER_W_MODE_COUNTING, TimerB1, TimerW};
use crate::error::Result;
use crate::interrupts::Source;
use crate::memory::Memory;

pub const CLOCK_STOP_1_ADDR: u32 = 0xFFFA;
pub const CLOCK_STOP_2_ADDR: u32 = 0xFFFB;

pub const RTC_STANDBY: u8 = 1 << 0;
pub const FLASH_MEMORY_STANDBY: u8 = 1 << 1;
pub const TIMER_B1_STANDBY: u8 = 1 << 2;
pub const WATCHDOG_STANDBY: u8 = 1 << 2;
pub const TIMER_W_STANDBY: u8 = 1 << 6;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timers {
    pub b1: TimerB1,
    pub w: TimerW,
    pub clock_cycles: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, mem: &mut Memory) {
        let stop1 = mem.read_byte(CLOCK_STOP_1_ADDR) | FLASH_MEMORY_STANDBY | RTC_STANDBY;
        mem.write_byte(CLOCK_STOP_1_ADDR, stop1);
        let stop2 = mem.read_byte(CLOCK_STOP_2_ADDR) | WATCHDOG_STANDBY;
        mem.write_byte(CLOCK_STOP_2_ADDR, stop2);
        self.b1.install(mem);
        self.w.install(mem);
        self.clock_cycles = 0;
    }

    /// One timer clock. Returns a Timer W interrupt request if one was raised
    /// while `masked` is false.
    pub fn tick(&mut self, mem: &mut Memory, masked: bool) -> Result<Option<Source>> {
        self.clock_cycles += 1;

        self.b1.running = mem.read_byte(CLOCK_STOP_1_ADDR) & TIMER_B1_STANDBY != 0
            && TimerB1::mode(mem) & TIMER_B_COUNTING != 0;
        self.w.running = mem.read_byte(CLOCK_STOP_2_ADDR) & TIMER_W_STANDBY != 0
            && TimerW::mode(mem) & TIMER_W_MODE_COUNTING != 0;

        if self.b1.running && self.clock_cycles % TimerB1::clock_rate(mem)? == 0 {
            self.b1.tick(mem);
        }

        let mut request = None;
        if self.w.running && self.clock_cycles % TimerW::clock_rate(mem)? == 0 {
            request = self.w.tick(mem, masked);
        }
        Ok(request)
    }
}
