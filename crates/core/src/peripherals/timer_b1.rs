//! Timer B1: 8-bit up-counter with auto-reload.
//!
//! The counter register doubles as the reload register. A firmware write to
//! it is latched as the reload value (see [`Hook::TimerB1LoadWrite`]), while
//! the timer itself updates the counter through raw memory access so that
//! its own increments never overwrite the latch.
//!
//! [`Hook::TimerB1LoadWrite`]: crate::memory::Hook::TimerB1LoadWrite

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interrupts::{IRR2_ADDR, IRR2_TIMER_B1};
use crate::memory::{Hook, Memory};

pub const TIMER_B_MODE_ADDR: u32 = 0xF0D0;
pub const TIMER_B_COUNTER_ADDR: u32 = 0xF0D1;

/// Mode bit 6: counter runs.
pub const TIMER_B_COUNTING: u8 = 1 << 6;
/// Mode bits that read back as 1 after reset.
pub const TIMER_B_MODE_RESERVED: u8 = 0b0011_1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerB1 {
    /// Recomputed on every timer clock from the standby and mode bits.
    pub running: bool,
    pub load_value: u8,
}

impl TimerB1 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset-state register values and the reload latch hook.
    pub fn install(&mut self, mem: &mut Memory) {
        let mode = mem.read_byte(TIMER_B_MODE_ADDR) | TIMER_B_MODE_RESERVED;
        mem.write_byte(TIMER_B_MODE_ADDR, mode);
        mem.write_byte(TIMER_B_COUNTER_ADDR, 0);
        mem.on_write(TIMER_B_COUNTER_ADDR, Hook::TimerB1LoadWrite);
    }

    #[inline(always)]
    pub fn mode(mem: &Memory) -> u8 {
        mem.read_byte(TIMER_B_MODE_ADDR)
    }

    #[inline(always)]
    pub fn counter(mem: &Memory) -> u8 {
        mem.read_byte(TIMER_B_COUNTER_ADDR)
    }

    /// Timer clocks per count, from the low three mode bits.
    pub fn clock_rate(mem: &Memory) -> Result<u64> {
        match Self::mode(mem) & 0b111 {
            0b111 => Ok(256),
            0b110 => Ok(1024),
            value => Err(Error::UnsupportedClockSelect { timer: "B1", value }),
        }
    }

    /// Count once. On wrap to zero, request the interrupt and reload.
    pub fn tick(&mut self, mem: &mut Memory) {
        let counter = Self::counter(mem).wrapping_add(1);
        if counter == 0 {
            let flags = mem.read_byte(IRR2_ADDR) | IRR2_TIMER_B1;
            mem.write_byte(IRR2_ADDR, flags);
            mem.write_byte(TIMER_B_COUNTER_ADDR, self.load_value);
        } else {
            mem.write_byte(TIMER_B_COUNTER_ADDR, counter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_sets_reserved_bits() {
        let mut mem = Memory::new();
        let mut timer = TimerB1::new();
        timer.install(&mut mem);
        assert_eq!(TimerB1::mode(&mem), TIMER_B_MODE_RESERVED);
        assert_eq!(mem.write_hook(TIMER_B_COUNTER_ADDR), Some(Hook::TimerB1LoadWrite));
    }

    #[test]
    fn test_clock_rates() {
        let mut mem = Memory::new();
        mem.write_byte(TIMER_B_MODE_ADDR, 0b111);
        assert_eq!(TimerB1::clock_rate(&mem).unwrap(), 256);
        mem.write_byte(TIMER_B_MODE_ADDR, 0b110);
        assert_eq!(TimerB1::clock_rate(&mem).unwrap(), 1024);
        mem.write_byte(TIMER_B_MODE_ADDR, 0b010);
        match TimerB1::clock_rate(&mem) {
            Err(Error::UnsupportedClockSelect { timer, value }) => {
                assert_eq!(timer, "B1");
                assert_eq!(value, 0b010);
            }
            other => panic!("Expected UnsupportedClockSelect, got {:?}", other),
        }
    }

    #[test]
    fn test_overflow_reloads_and_flags() {
        let mut mem = Memory::new();
        let mut timer = TimerB1 { running: true, load_value: 0xF0 };
        mem.write_byte(TIMER_B_COUNTER_ADDR, 0xFE);
        timer.tick(&mut mem);
        assert_eq!(TimerB1::counter(&mem), 0xFF);
        assert_eq!(mem.read_byte(IRR2_ADDR) & IRR2_TIMER_B1, 0);
        timer.tick(&mut mem);
        assert_eq!(TimerB1::counter(&mem), 0xF0);
        assert_ne!(mem.read_byte(IRR2_ADDR) & IRR2_TIMER_B1, 0);
    }
}
