//! Third-level table, keyed by `a << 12 | b << 4 | ch` and `cl`.
//!
//! Holds the signed multiply/divide and long logic escapes reached through
//! `01C0`, `01D0` and `01F0`, plus the memory bit-manipulation group
//! (`7C`–`7F`). The latter has a register or address in byte b, so it is
//! matched by pattern instead of by exact key.

use super::ops::{self, BitOp, Logic};
use super::primary::short_absolute;
use super::{op, InstructionTable};
use crate::flags::Size;
use crate::opcodes::Opcodes;
use crate::Board;

/// First byte is 7C, 7D, 7E or 7F.
#[inline(always)]
fn bit_group(first: u32) -> bool {
    (first >> 14) & 0x3F == 0x1F
}

pub(super) fn table() -> InstructionTable {
    let mut t = InstructionTable::new(
        "abcH_cL",
        |o| ((o.a() as u32) << 12) | ((o.b() as u32) << 4) | o.ch() as u32,
        |o| o.cl(),
    );

    // --- Signed multiply and divide ---

    t.register(&[0x1C05], &[0x0], op("MULXS.B", 4, 13, |b, o| ops::mulxs(b, o.dh(), o.dl(), Size::Byte)));
    t.register(&[0x1C05], &[0x2], op("MULXS.W", 4, 22, |b, o| ops::mulxs(b, o.dh(), o.dl(), Size::Word)));
    t.register(&[0x1D05], &[0x1], op("DIVXS.B", 4, 13, |b, o| ops::divxs(b, o.dh(), o.dl(), Size::Byte)));
    t.register(&[0x1D05], &[0x3], op("DIVXS.W", 4, 22, |b, o| ops::divxs(b, o.dh(), o.dl(), Size::Word)));

    // --- Long register logic ---

    t.register(&[0x1F06], &[0x4], op("OR.L", 4, 2, |b, o| logic_long(b, o, Logic::Or)));
    t.register(&[0x1F06], &[0x5], op("XOR.L", 4, 2, |b, o| logic_long(b, o, Logic::Xor)));
    t.register(&[0x1F06], &[0x6], op("AND.L", 4, 2, |b, o| logic_long(b, o, Logic::And)));

    // --- Memory bit manipulation, bit number in a register ---

    let by_register = |first: u32| bit_group(first) && first & 0xF == 0x6;
    t.register_pattern(by_register, &[0x0], op("BSET", 4, 4, |b, o| bit_by_register(b, o, BitOp::Set)));
    t.register_pattern(by_register, &[0x1], op("BNOT", 4, 4, |b, o| bit_by_register(b, o, BitOp::Not)));
    t.register_pattern(by_register, &[0x2], op("BCLR", 4, 4, |b, o| bit_by_register(b, o, BitOp::Clr)));
    t.register_pattern(by_register, &[0x3], op("BTST", 4, 3, |b, o| bit_by_register(b, o, BitOp::Tst)));
    t.register_pattern(by_register, &[0x7], op("BST", 4, 4, |b, o| bit_immediate(b, o, BitOp::St)));

    // --- Memory bit manipulation, immediate bit number ---

    let by_immediate = |first: u32| bit_group(first) && first & 0xF == 0x7;
    t.register_pattern(by_immediate, &[0x0], op("BSET", 4, 4, |b, o| bit_immediate(b, o, BitOp::Set)));
    t.register_pattern(by_immediate, &[0x1], op("BNOT", 4, 4, |b, o| bit_immediate(b, o, BitOp::Not)));
    t.register_pattern(by_immediate, &[0x2], op("BCLR", 4, 4, |b, o| bit_immediate(b, o, BitOp::Clr)));
    t.register_pattern(by_immediate, &[0x3], op("BTST", 4, 3, |b, o| bit_immediate(b, o, BitOp::Tst)));
    t.register_pattern(by_immediate, &[0x4], op("BOR", 4, 3, |b, o| bit_immediate(b, o, BitOp::Or)));
    t.register_pattern(by_immediate, &[0x5], op("BXOR", 4, 3, |b, o| bit_immediate(b, o, BitOp::Xor)));
    t.register_pattern(by_immediate, &[0x6], op("BAND", 4, 3, |b, o| bit_immediate(b, o, BitOp::And)));
    t.register_pattern(by_immediate, &[0x7], op("BLD", 4, 3, |b, o| bit_immediate(b, o, BitOp::Ld)));

    t
}

fn logic_long(b: &mut Board, o: &Opcodes, logic: Logic) {
    let src = b.cpu.regs.get32(o.dh());
    ops::logic(b, logic, o.dl(), src, Size::Long);
}

/// `7C`/`7D` address through ERn in bH; `7E`/`7F` use `@aa:8` in byte b.
#[inline(always)]
fn operand_address(b: &Board, o: &Opcodes) -> u32 {
    if o.a() & 0xFE == 0x7C {
        b.cpu.regs.get32(o.bh())
    } else {
        short_absolute(o.b())
    }
}

fn bit_by_register(b: &mut Board, o: &Opcodes, bit_op: BitOp) {
    let addr = operand_address(b, o);
    let bit = b.cpu.regs.get8(o.dh()) & 7;
    ops::bit_mem(b, bit_op, addr, bit, false);
}

fn bit_immediate(b: &mut Board, o: &Opcodes, bit_op: BitOp) {
    let addr = operand_address(b, o);
    let invert = o.dh() & 8 != 0;
    ops::bit_mem(b, bit_op, addr, o.dh() & 7, invert);
}
