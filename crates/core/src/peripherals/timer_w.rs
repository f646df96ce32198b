//! Timer W: 16-bit counter with compare register A and overflow.
//!
//! Used by the firmware as the beeper: register A sets the tone period and
//! B/C the duty, so the board samples it for the audio sink.
//!
//! | Register | Address | Notes                                       |
//! |----------|---------|---------------------------------------------|
//! | TMRW     | 0xF0F0  | bit 7 counting                              |
//! | TCRW     | 0xF0F1  | bit 7 clear on match A, bits 4..6 prescaler |
//! | TIERW    | 0xF0F2  | bit 7 overflow, bit 0 match A               |
//! | TSRW     | 0xF0F3  | bit 7 overflow, bits 0..3 match A..D        |
//! | TCNT     | 0xF0F6  | counter (16-bit)                            |
//! | GRA..GRD | 0xF0F8  | compare registers, 2 bytes apart            |

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interrupts::Source;
use crate::memory::Memory;

pub const TIMER_W_MODE_ADDR: u32 = 0xF0F0;
pub const TIMER_W_CONTROL_ADDR: u32 = 0xF0F1;
pub const TIMER_W_INTERRUPT_ADDR: u32 = 0xF0F2;
pub const TIMER_W_STATUS_ADDR: u32 = 0xF0F3;
pub const TIMER_W_COUNTER_ADDR: u32 = 0xF0F6;
pub const TIMER_W_REGISTER_A_ADDR: u32 = 0xF0F8;
pub const TIMER_W_REGISTER_B_ADDR: u32 = 0xF0FA;
pub const TIMER_W_REGISTER_C_ADDR: u32 = 0xF0FC;
pub const TIMER_W_REGISTER_D_ADDR: u32 = 0xF0FE;

pub const TIMER_W_MODE_COUNTING: u8 = 1 << 7;
pub const TIMER_W_MODE_RESERVED: u8 = 0b0100_1000;
pub const TIMER_W_CONTROL_COUNTER_CLEAR: u8 = 1 << 7;

pub const TIMER_W_STATUS_MATCH_A: u8 = 1 << 0;
pub const TIMER_W_STATUS_OVERFLOW: u8 = 1 << 7;
pub const TIMER_W_STATUS_RESERVED: u8 = 0b0111_0000;

pub const TIMER_W_ENABLE_MATCH_A: u8 = 1 << 0;
pub const TIMER_W_ENABLE_OVERFLOW: u8 = 1 << 7;
pub const TIMER_W_ENABLE_RESERVED: u8 = 0b0111_0000;

/// Tone frequency numerator: `frequency = TONE_CLOCK / GRA`.
pub const TONE_CLOCK: f32 = 31500.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerW {
    pub running: bool,
}

impl TimerW {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, mem: &mut Memory) {
        mem.write_byte(TIMER_W_MODE_ADDR, TIMER_W_MODE_RESERVED);
        mem.write_short(TIMER_W_COUNTER_ADDR, 0);
        mem.write_byte(TIMER_W_INTERRUPT_ADDR, TIMER_W_ENABLE_RESERVED);
        mem.write_byte(TIMER_W_STATUS_ADDR, TIMER_W_STATUS_RESERVED);
        for addr in [
            TIMER_W_REGISTER_A_ADDR,
            TIMER_W_REGISTER_B_ADDR,
            TIMER_W_REGISTER_C_ADDR,
            TIMER_W_REGISTER_D_ADDR,
        ] {
            mem.write_short(addr, 0xFFFF);
        }
    }

    #[inline(always)]
    pub fn mode(mem: &Memory) -> u8 {
        mem.read_byte(TIMER_W_MODE_ADDR)
    }

    #[inline(always)]
    pub fn counter(mem: &Memory) -> u16 {
        mem.read_short(TIMER_W_COUNTER_ADDR)
    }

    #[inline(always)]
    pub fn register_a(mem: &Memory) -> u16 {
        mem.read_short(TIMER_W_REGISTER_A_ADDR)
    }

    /// Timer clocks per count, from control bits 4..6.
    pub fn clock_rate(mem: &Memory) -> Result<u64> {
        match (mem.read_byte(TIMER_W_CONTROL_ADDR) >> 4) & 0b111 {
            0b100 => Ok(1),
            0b101 => Ok(4),
            0b110 => Ok(16),
            value => Err(Error::UnsupportedClockSelect { timer: "W", value }),
        }
    }

    /// Count once and update the status flags. Match A is raised whenever the
    /// counter is at or past register A, so lowering A below the running
    /// count matches on the next tick. When `masked` is false and an
    /// enabled flag is raised, the flag is consumed and [`Source::TimerW`] is
    /// returned for delivery. Overflow is checked before match A; at most
    /// one request is returned per tick since delivery masks interrupts.
    pub fn tick(&mut self, mem: &mut Memory, masked: bool) -> Option<Source> {
        let mut counter = Self::counter(mem);
        if Self::mode(mem) & TIMER_W_MODE_COUNTING != 0 {
            counter = counter.wrapping_add(1);
        }

        let mut status = mem.read_byte(TIMER_W_STATUS_ADDR);
        if counter == 0 {
            status |= TIMER_W_STATUS_OVERFLOW;
        }
        if counter >= Self::register_a(mem) {
            if mem.read_byte(TIMER_W_CONTROL_ADDR) & TIMER_W_CONTROL_COUNTER_CLEAR != 0 {
                counter = 0;
            }
            status |= TIMER_W_STATUS_MATCH_A;
        }

        let mut request = None;
        if !masked {
            let enable = mem.read_byte(TIMER_W_INTERRUPT_ADDR);
            if status & TIMER_W_STATUS_OVERFLOW != 0 && enable & TIMER_W_ENABLE_OVERFLOW != 0 {
                status &= !TIMER_W_STATUS_OVERFLOW;
                request = Some(Source::TimerW);
            } else if status & TIMER_W_STATUS_MATCH_A != 0 && enable & TIMER_W_ENABLE_MATCH_A != 0 {
                status &= !TIMER_W_STATUS_MATCH_A;
                request = Some(Source::TimerW);
            }
        }

        mem.write_short(TIMER_W_COUNTER_ADDR, counter);
        mem.write_byte(TIMER_W_STATUS_ADDR, status);
        request
    }

    /// Beeper frequency in Hz, or 0 when silent.
    pub fn frequency(&self, mem: &Memory) -> f32 {
        let period = Self::register_a(mem);
        if self.running && period != 0 {
            TONE_CLOCK / period as f32
        } else {
            0.0
        }
    }

    /// Full volume when B and C match, a quarter otherwise.
    pub fn volume(mem: &Memory) -> f32 {
        if mem.read_short(TIMER_W_REGISTER_B_ADDR) == mem.read_short(TIMER_W_REGISTER_C_ADDR) {
            1.0
        } else {
            0.25
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(control: u8, enable: u8) -> Memory {
        let mut mem = Memory::new();
        TimerW::new().install(&mut mem);
        mem.write_byte(TIMER_W_MODE_ADDR, TIMER_W_MODE_COUNTING);
        mem.write_byte(TIMER_W_CONTROL_ADDR, control);
        mem.write_byte(TIMER_W_INTERRUPT_ADDR, enable);
        mem
    }

    #[test]
    fn test_install_defaults() {
        let mut mem = Memory::new();
        TimerW::new().install(&mut mem);
        assert_eq!(TimerW::register_a(&mem), 0xFFFF);
        assert_eq!(mem.read_byte(TIMER_W_STATUS_ADDR), TIMER_W_STATUS_RESERVED);
        assert_eq!(TimerW::mode(&mem), TIMER_W_MODE_RESERVED);
    }

    #[test]
    fn test_clock_rates() {
        let mut mem = Memory::new();
        for (bits, rate) in [(0b100u8, 1u64), (0b101, 4), (0b110, 16)] {
            mem.write_byte(TIMER_W_CONTROL_ADDR, bits << 4);
            assert_eq!(TimerW::clock_rate(&mem).unwrap(), rate);
        }
        mem.write_byte(TIMER_W_CONTROL_ADDR, 0b011 << 4);
        assert!(matches!(
            TimerW::clock_rate(&mem),
            Err(Error::UnsupportedClockSelect { timer: "W", value: 0b011 })
        ));
    }

    #[test]
    fn test_match_a_clears_counter_and_interrupts() {
        let mut mem = counting(TIMER_W_CONTROL_COUNTER_CLEAR, TIMER_W_ENABLE_MATCH_A);
        mem.write_short(TIMER_W_REGISTER_A_ADDR, 3);
        let mut timer = TimerW { running: true };
        assert_eq!(timer.tick(&mut mem, false), None);
        assert_eq!(timer.tick(&mut mem, false), None);
        assert_eq!(timer.tick(&mut mem, false), Some(Source::TimerW));
        assert_eq!(TimerW::counter(&mem), 0);
        assert_eq!(mem.read_byte(TIMER_W_STATUS_ADDR) & TIMER_W_STATUS_MATCH_A, 0);
    }

    #[test]
    fn test_masked_match_stays_pending() {
        let mut mem = counting(0, TIMER_W_ENABLE_MATCH_A);
        mem.write_short(TIMER_W_REGISTER_A_ADDR, 1);
        let mut timer = TimerW { running: true };
        assert_eq!(timer.tick(&mut mem, true), None);
        assert_eq!(TimerW::counter(&mem), 1);
        assert_ne!(mem.read_byte(TIMER_W_STATUS_ADDR) & TIMER_W_STATUS_MATCH_A, 0);
        assert_eq!(timer.tick(&mut mem, false), Some(Source::TimerW));
    }

    #[test]
    fn test_register_a_below_counter_matches() {
        let mut mem = counting(TIMER_W_CONTROL_COUNTER_CLEAR, TIMER_W_ENABLE_MATCH_A);
        mem.write_short(TIMER_W_COUNTER_ADDR, 100);
        mem.write_short(TIMER_W_REGISTER_A_ADDR, 50);
        let mut timer = TimerW { running: true };
        assert_eq!(timer.tick(&mut mem, false), Some(Source::TimerW));
        assert_eq!(TimerW::counter(&mem), 0);
    }

    #[test]
    fn test_overflow_delivered_before_match_a() {
        let enable = TIMER_W_ENABLE_OVERFLOW | TIMER_W_ENABLE_MATCH_A;
        let mut mem = counting(0, enable);
        mem.write_short(TIMER_W_COUNTER_ADDR, 0xFFFF);
        mem.write_short(TIMER_W_REGISTER_A_ADDR, 0);
        let mut timer = TimerW { running: true };

        // Wrapping to 0 raises both flags; overflow goes first.
        assert_eq!(timer.tick(&mut mem, false), Some(Source::TimerW));
        let status = mem.read_byte(TIMER_W_STATUS_ADDR);
        assert_eq!(status & TIMER_W_STATUS_OVERFLOW, 0);
        assert_ne!(status & TIMER_W_STATUS_MATCH_A, 0);

        // Match A is still pending and goes out on the next tick.
        assert_eq!(timer.tick(&mut mem, false), Some(Source::TimerW));
        assert_eq!(mem.read_byte(TIMER_W_STATUS_ADDR) & TIMER_W_STATUS_MATCH_A, 0);
    }

    #[test]
    fn test_overflow_flag() {
        let mut mem = counting(0, 0);
        mem.write_short(TIMER_W_COUNTER_ADDR, 0xFFFF);
        mem.write_short(TIMER_W_REGISTER_A_ADDR, 0x1234);
        let mut timer = TimerW { running: true };
        assert_eq!(timer.tick(&mut mem, false), None);
        assert_eq!(TimerW::counter(&mem), 0);
        assert_ne!(mem.read_byte(TIMER_W_STATUS_ADDR) & TIMER_W_STATUS_OVERFLOW, 0);
    }

    #[test]
    fn test_audio_tone() {
        let mut mem = Memory::new();
        TimerW::new().install(&mut mem);
        mem.write_short(TIMER_W_REGISTER_A_ADDR, 63);
        let timer = TimerW { running: true };
        assert_eq!(timer.frequency(&mem), 500.0);
        assert_eq!(TimerW::volume(&mem), 1.0);
        mem.write_short(TIMER_W_REGISTER_B_ADDR, 1);
        assert_eq!(TimerW::volume(&mem), 0.25);
        assert_eq!(TimerW { running: false }.frequency(&mem), 0.0);
    }
}
