//! Condition code register (CCR) and flag computation.
//!
//! | Bit | Flag | Meaning                         |
//! |-----|------|---------------------------------|
//! | 7   | I    | Interrupt mask                  |
//! | 6   | UI   | User bit / interrupt mask       |
//! | 5   | H    | Half-carry                      |
//! | 4   | U    | User bit                        |
//! | 3   | N    | Negative                        |
//! | 2   | Z    | Zero                            |
//! | 1   | V    | Overflow                        |
//! | 0   | C    | Carry                           |
//!
//! The `flags_*` helpers are shared by every arithmetic instruction, so they
//! are parameterized by operand [`Size`] and compute in 64 bits to keep the
//! 32-bit carry visible.

use serde::{Deserialize, Serialize};

pub const CCR_C: u8 = 0;
pub const CCR_V: u8 = 1;
pub const CCR_Z: u8 = 2;
pub const CCR_N: u8 = 3;
pub const CCR_U: u8 = 4;
pub const CCR_H: u8 = 5;
pub const CCR_UI: u8 = 6;
pub const CCR_I: u8 = 7;

/// Operand width of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Byte,
    Word,
    Long,
}

impl Size {
    #[inline(always)]
    pub const fn bits(self) -> u32 {
        match self {
            Size::Byte => 8,
            Size::Word => 16,
            Size::Long => 32,
        }
    }

    #[inline(always)]
    pub const fn mask(self) -> u32 {
        match self {
            Size::Byte => 0xFF,
            Size::Word => 0xFFFF,
            Size::Long => 0xFFFF_FFFF,
        }
    }

    /// The negative-flag bit, which is also the smallest negative value.
    #[inline(always)]
    pub const fn sign(self) -> u32 {
        1 << (self.bits() - 1)
    }

    #[inline(always)]
    pub const fn max_positive(self) -> u32 {
        self.sign() - 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub i: bool,
    pub ui: bool,
    pub h: bool,
    pub u: bool,
    pub n: bool,
    pub z: bool,
    pub v: bool,
    pub c: bool,
}

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packed CCR value.
    pub fn ccr(&self) -> u8 {
        (self.c as u8) << CCR_C
            | (self.v as u8) << CCR_V
            | (self.z as u8) << CCR_Z
            | (self.n as u8) << CCR_N
            | (self.u as u8) << CCR_U
            | (self.h as u8) << CCR_H
            | (self.ui as u8) << CCR_UI
            | (self.i as u8) << CCR_I
    }

    pub fn set_ccr(&mut self, value: u8) {
        let bit = |b: u8| value & (1 << b) != 0;
        self.c = bit(CCR_C);
        self.v = bit(CCR_V);
        self.z = bit(CCR_Z);
        self.n = bit(CCR_N);
        self.u = bit(CCR_U);
        self.h = bit(CCR_H);
        self.ui = bit(CCR_UI);
        self.i = bit(CCR_I);
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = ['I', 'U', 'H', 'U', 'N', 'Z', 'V', 'C'];
        let ccr = self.ccr();
        for (i, name) in names.iter().enumerate() {
            let set = ccr & (0x80 >> i) != 0;
            write!(f, "{}", if set { *name } else { '-' })?;
        }
        Ok(())
    }
}

// --- Flag helpers ---

/// N and Z from `value`, V cleared. Used by moves and logic operations.
#[inline(always)]
pub fn flags_mov(flags: &mut Flags, value: u32, size: Size) {
    let value = value & size.mask();
    flags.n = value & size.sign() != 0;
    flags.z = value == 0;
    flags.v = false;
}

/// Flags for `value + 1`.
#[inline(always)]
pub fn flags_inc(flags: &mut Flags, value: u32, size: Size) {
    let value = value & size.mask();
    let result = value.wrapping_add(1) & size.mask();
    flags.n = result & size.sign() != 0;
    flags.z = result == 0;
    flags.v = value == size.max_positive();
}

/// Flags for `value - 1`.
#[inline(always)]
pub fn flags_dec(flags: &mut Flags, value: u32, size: Size) {
    let value = value & size.mask();
    let result = value.wrapping_sub(1) & size.mask();
    flags.n = result & size.sign() != 0;
    flags.z = result == 0;
    flags.v = value == size.sign();
}

/// Flags for `rd + rs`.
pub fn flags_add(flags: &mut Flags, rd: u32, rs: u32, size: Size) {
    flags_add_wide(flags, rd as u64, rs as u64, size);
}

/// Flags for `rd + rs + C` (ADDX). The carry is folded into the source operand.
pub fn flags_addx(flags: &mut Flags, rd: u32, rs: u32, size: Size) {
    let carry = flags.c as u64;
    flags_add_wide(flags, rd as u64, rs as u64 + carry, size);
}

fn flags_add_wide(flags: &mut Flags, rd: u64, rs: u64, size: Size) {
    let mask = size.mask() as u64;
    let sign = size.sign() as u64;
    let sum = rd + rs;
    let result = sum & mask;

    flags.z = result == 0;
    flags.n = result & sign != 0;
    flags.v = !(rd ^ rs) & (rd ^ result) & sign != 0;
    flags.c = sum > mask;
    flags.h = ((rd ^ rs ^ result) >> (size.bits() / 2)) & 1 != 0;
}

/// Flags for `rd - rs` (SUB, CMP, NEG).
pub fn flags_sub(flags: &mut Flags, rd: u32, rs: u32, size: Size) {
    flags_sub_wide(flags, rd as u64, rs as u64, size);
}

/// Flags for `rd - rs - C` (SUBX). The borrow is folded into the source operand.
pub fn flags_subx(flags: &mut Flags, rd: u32, rs: u32, size: Size) {
    let carry = flags.c as u64;
    flags_sub_wide(flags, rd as u64, rs as u64 + carry, size);
}

fn flags_sub_wide(flags: &mut Flags, rd: u64, rs: u64, size: Size) {
    let mask = size.mask() as u64;
    let sign = size.sign() as u64;
    let rd = rd & mask;
    let result = rd.wrapping_sub(rs) & mask;

    flags.z = result == 0;
    flags.n = result & sign != 0;
    flags.v = (rd ^ rs) & (rd ^ result) & sign != 0;
    flags.c = rs > rd;
    flags.h = ((rd ^ rs ^ result) >> (size.bits() / 2)) & 1 != 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ccr_round_trip() {
        let mut flags = Flags::new();
        for v in 0..=255u8 {
            flags.set_ccr(v);
            assert_eq!(flags.ccr(), v);
        }
    }

    #[test]
    fn test_ccr_bit_order() {
        let mut flags = Flags::new();
        flags.i = true;
        flags.c = true;
        assert_eq!(flags.ccr(), 0x81);
        flags.set_ccr(0b0000_0100);
        assert!(flags.z && !flags.i && !flags.c);
    }

    #[test]
    fn test_copy_does_not_alias() {
        let mut flags = Flags::new();
        let saved = flags;
        flags.z = true;
        assert!(!saved.z);
    }

    #[test]
    fn test_add_signed_overflow_byte() {
        let mut flags = Flags::new();
        flags_add(&mut flags, 0x7F, 0x01, Size::Byte);
        assert!(!flags.z);
        assert!(flags.n);
        assert!(flags.v);
        assert!(!flags.c);
        assert!(flags.h);
    }

    #[test]
    fn test_add_carry_out() {
        let mut flags = Flags::new();
        flags_add(&mut flags, 0xFFFF_FFFF, 1, Size::Long);
        assert!(flags.c && flags.z && !flags.v && !flags.n);
        flags_add(&mut flags, 0x8000, 0x8000, Size::Word);
        assert!(flags.c && flags.z && flags.v);
    }

    #[test]
    fn test_sub_borrow() {
        let mut flags = Flags::new();
        flags_sub(&mut flags, 0x00, 0x01, Size::Byte);
        assert!(flags.c);
        assert!(flags.n);
        assert!(!flags.z);
        assert!(!flags.v);
    }

    #[test]
    fn test_sub_signed_overflow() {
        let mut flags = Flags::new();
        flags_sub(&mut flags, 0x8000, 0x0001, Size::Word);
        assert!(flags.v && !flags.n && !flags.c);
    }

    #[test]
    fn test_add_and_sub_agree_on_overflow() {
        let mut add = Flags::new();
        let mut sub = Flags::new();
        for (rd, rs) in [(0x7Fu32, 0x01u32), (0x80, 0x01), (0x40, 0x40), (0x00, 0x80)] {
            flags_add(&mut add, rd, rs.wrapping_neg() & 0xFF, Size::Byte);
            flags_sub(&mut sub, rd, rs, Size::Byte);
            assert_eq!(add.n, sub.n, "N for {:#x} - {:#x}", rd, rs);
            if rs != 0x80 {
                assert_eq!(add.v, sub.v, "V for {:#x} - {:#x}", rd, rs);
            }
        }
    }

    #[test]
    fn test_carry_variants_fold_carry() {
        let mut flags = Flags::new();
        flags.c = true;
        flags_addx(&mut flags, 0xFF, 0x00, Size::Byte);
        assert!(flags.c && flags.z);

        flags.c = true;
        flags_subx(&mut flags, 0x00, 0x00, Size::Byte);
        assert!(flags.c && flags.n);
    }

    #[test]
    fn test_inc_dec_boundaries() {
        let mut flags = Flags::new();
        flags_inc(&mut flags, 0x7F, Size::Byte);
        assert!(flags.v && flags.n);
        flags_inc(&mut flags, 0xFFFF, Size::Word);
        assert!(!flags.v && flags.z);
        flags_dec(&mut flags, 0x8000_0000, Size::Long);
        assert!(flags.v && !flags.n);
        flags_dec(&mut flags, 1, Size::Long);
        assert!(flags.z && !flags.v);
    }

    #[test]
    fn test_mov_clears_v() {
        let mut flags = Flags::new();
        flags.v = true;
        flags_mov(&mut flags, 0x42, Size::Byte);
        assert!(!flags.v && !flags.z && !flags.n);
        flags_mov(&mut flags, 0x8000, Size::Word);
        assert!(flags.n);
    }

    #[test]
    fn test_display() {
        let mut flags = Flags::new();
        flags.set_ccr(0x84);
        assert_eq!(flags.to_string(), "I----Z--");
    }
}
