//! Interrupt controller registers and the ROM vector table.
//!
//! Enable and request registers are memory-backed; firmware sets and clears
//! them with ordinary bit instructions. The only emulator-owned interrupt
//! state is the context captured on entry ([`SavedContext`]), restored by RTE.
//!
//! | Register | Address | Bits used                               |
//! |----------|---------|-----------------------------------------|
//! | IENR1    | 0xFFF3  | IRQ0 (0), IRQ1 (1), RTC (7)             |
//! | IENR2    | 0xFFF4  | Timer B1 (2)                            |
//! | IRR1     | 0xFFF6  | IRQ0 (0), IRQ1 (1)                      |
//! | IRR2     | 0xFFF7  | Timer B1 (2)                            |
//! | RTCFLG   | 0xF067  | quarter (0) half (1) sec (2) min (3) hour (4) |

use serde::{Deserialize, Serialize};

use crate::flags::Flags;
use crate::memory::Memory;

pub const IENR1_ADDR: u32 = 0xFFF3;
pub const IENR2_ADDR: u32 = 0xFFF4;
pub const IRR1_ADDR: u32 = 0xFFF6;
pub const IRR2_ADDR: u32 = 0xFFF7;
pub const RTC_FLAG_ADDR: u32 = 0xF067;

pub const IENR1_IRQ0: u8 = 1 << 0;
pub const IENR1_IRQ1: u8 = 1 << 1;
pub const IENR1_RTC: u8 = 1 << 7;
pub const IENR2_TIMER_B1: u8 = 1 << 2;

pub const IRR1_IRQ0: u8 = 1 << 0;
pub const IRR1_IRQ1: u8 = 1 << 1;
pub const IRR2_TIMER_B1: u8 = 1 << 2;

pub const RTC_QUARTER_SECOND: u8 = 1 << 0;
pub const RTC_HALF_SECOND: u8 = 1 << 1;
pub const RTC_SECOND: u8 = 1 << 2;
pub const RTC_MINUTE: u8 = 1 << 3;
pub const RTC_HOUR: u8 = 1 << 4;

/// Vector slot addresses. Each slot holds a big-endian 16-bit handler address.
pub mod vector {
    pub const RESET: u32 = 0x0000;
    pub const IRQ0: u32 = 0x0020;
    pub const IRQ1: u32 = 0x0022;
    pub const RTC_QUARTER_SECOND: u32 = 0x002E;
    pub const RTC_HALF_SECOND: u32 = 0x0030;
    pub const RTC_SECOND: u32 = 0x0032;
    pub const RTC_MINUTE: u32 = 0x0034;
    pub const RTC_HOUR: u32 = 0x0036;
    pub const TIMER_B: u32 = 0x0042;
    pub const TIMER_W: u32 = 0x0046;
}

/// Interrupt sources in the order the CPU checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Irq0,
    Irq1,
    RtcQuarterSecond,
    RtcHalfSecond,
    RtcSecond,
    RtcMinute,
    RtcHour,
    TimerB1,
    TimerW,
}

impl Source {
    /// Vector slot holding this source's handler address.
    pub const fn vector(self) -> u32 {
        match self {
            Source::Irq0 => vector::IRQ0,
            Source::Irq1 => vector::IRQ1,
            Source::RtcQuarterSecond => vector::RTC_QUARTER_SECOND,
            Source::RtcHalfSecond => vector::RTC_HALF_SECOND,
            Source::RtcSecond => vector::RTC_SECOND,
            Source::RtcMinute => vector::RTC_MINUTE,
            Source::RtcHour => vector::RTC_HOUR,
            Source::TimerB1 => vector::TIMER_B,
            Source::TimerW => vector::TIMER_W,
        }
    }
}

/// RTC sub-sources, highest priority first.
const RTC_SOURCES: [(u8, Source); 5] = [
    (RTC_QUARTER_SECOND, Source::RtcQuarterSecond),
    (RTC_HALF_SECOND, Source::RtcHalfSecond),
    (RTC_SECOND, Source::RtcSecond),
    (RTC_MINUTE, Source::RtcMinute),
    (RTC_HOUR, Source::RtcHour),
];

/// Handler address stored in a vector slot.
#[inline(always)]
pub fn vector_address(mem: &Memory, slot: u32) -> u32 {
    mem.read_short(slot) as u32
}

/// Highest-priority source that is both enabled and requested.
///
/// IRQ0 > IRQ1 > RTC (quarter > half > second > minute > hour) > Timer B1.
/// Timer W is not polled here; it delivers its interrupt from its own tick.
pub fn pending(mem: &Memory) -> Option<Source> {
    let enable1 = mem.read_byte(IENR1_ADDR);
    let enable2 = mem.read_byte(IENR2_ADDR);
    let flag1 = mem.read_byte(IRR1_ADDR);
    let flag2 = mem.read_byte(IRR2_ADDR);

    if enable1 & IENR1_IRQ0 != 0 && flag1 & IRR1_IRQ0 != 0 {
        return Some(Source::Irq0);
    }
    if enable1 & IENR1_IRQ1 != 0 && flag1 & IRR1_IRQ1 != 0 {
        return Some(Source::Irq1);
    }
    if enable1 & IENR1_RTC != 0 {
        let rtc = mem.read_byte(RTC_FLAG_ADDR);
        if let Some(&(_, source)) = RTC_SOURCES.iter().find(|(bit, _)| rtc & bit != 0) {
            return Some(source);
        }
    }
    if enable2 & IENR2_TIMER_B1 != 0 && flag2 & IRR2_TIMER_B1 != 0 {
        return Some(Source::TimerB1);
    }
    None
}

/// PC and CCR captured on interrupt entry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SavedContext {
    pub pc: u32,
    pub flags: Flags,
}
