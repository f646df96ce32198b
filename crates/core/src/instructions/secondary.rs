//! Second-level table, keyed by the whole first byte and the high nibble of
//! the second.

use log::error;

use super::ops::{self, Logic, Shift, CONDITION_NAMES};
use super::{op, Entry, InstructionTable, TableId, NIBBLES};
use crate::flags::Size;
use crate::opcodes::Opcodes;
use crate::Board;

/// Execution function for a one-bit shift of `Rd` (low nibble of byte b).
macro_rules! shift {
    ($kind:expr, $size:expr) => {
        |b: &mut Board, o: &Opcodes| ops::shift(b, $kind, o.bl(), $size)
    };
}

pub(super) fn table() -> InstructionTable {
    let mut t = InstructionTable::new("a_bH", |o| o.a() as u32, |o| o.bh());

    // --- 01: MOV.L, SLEEP and the 01C0/01D0/01F0 escapes ---

    t.register(&[0x01], &[0x0], op("MOV.L", 0, 2, mov_long));
    t.register(&[0x01], &[0x8], op("SLEEP", 2, 1, |b, _| b.cpu.sleep = true));
    t.register(&[0x01], &[0xC, 0xD, 0xF], Entry::Table(TableId::Tertiary));

    // --- 0A/0B: increment and long add ---

    t.register(&[0x0A], &[0x0], op("INC.B", 2, 1, |b, o| ops::inc(b, o.bl(), 1, Size::Byte)));
    t.register(&[0x0A], &[0x8, 0x9, 0xA, 0xB, 0xC, 0xD, 0xE, 0xF], op("ADD.L", 2, 1, |b, o| {
        let src = b.cpu.regs.get32(o.bh());
        ops::add(b, o.bl(), src, Size::Long);
    }));
    t.register(&[0x0B], &[0x0], op("ADDS", 2, 1, |b, o| ops::adds(b, o.bl(), 1)));
    t.register(&[0x0B], &[0x8], op("ADDS", 2, 1, |b, o| ops::adds(b, o.bl(), 2)));
    t.register(&[0x0B], &[0x9], op("ADDS", 2, 1, |b, o| ops::adds(b, o.bl(), 4)));
    t.register(&[0x0B], &[0x5], op("INC.W", 2, 1, |b, o| ops::inc(b, o.bl(), 1, Size::Word)));
    t.register(&[0x0B], &[0xD], op("INC.W", 2, 1, |b, o| ops::inc(b, o.bl(), 2, Size::Word)));
    t.register(&[0x0B], &[0x7], op("INC.L", 2, 1, |b, o| ops::inc(b, o.bl(), 1, Size::Long)));
    t.register(&[0x0B], &[0xF], op("INC.L", 2, 1, |b, o| ops::inc(b, o.bl(), 2, Size::Long)));

    // --- 0F: DAA and long move ---

    t.register(&[0x0F], &[0x0], op("DAA", 2, 1, |b, o| {
        let value = b.cpu.regs.get8(o.bl());
        let result = ops::daa_value(&mut b.cpu.flags, value);
        b.cpu.regs.set8(o.bl(), result as u32);
    }));
    t.register(&[0x0F], &[0x8, 0x9, 0xA, 0xB, 0xC, 0xD, 0xE, 0xF], op("MOV.L", 2, 1, |b, o| {
        let src = b.cpu.regs.get32(o.bh());
        ops::mov_reg(b, o.bl(), src, Size::Long);
    }));

    // --- 10-13: shifts and rotates ---

    t.register(&[0x10], &[0x0], op("SHLL.B", 2, 1, shift!(Shift::Shll, Size::Byte)));
    t.register(&[0x10], &[0x1], op("SHLL.W", 2, 1, shift!(Shift::Shll, Size::Word)));
    t.register(&[0x10], &[0x3], op("SHLL.L", 2, 1, shift!(Shift::Shll, Size::Long)));
    t.register(&[0x10], &[0x8], op("SHAL.B", 2, 1, shift!(Shift::Shal, Size::Byte)));
    t.register(&[0x10], &[0x9], op("SHAL.W", 2, 1, shift!(Shift::Shal, Size::Word)));
    t.register(&[0x10], &[0xB], op("SHAL.L", 2, 1, shift!(Shift::Shal, Size::Long)));

    t.register(&[0x11], &[0x0], op("SHLR.B", 2, 1, shift!(Shift::Shlr, Size::Byte)));
    t.register(&[0x11], &[0x1], op("SHLR.W", 2, 1, shift!(Shift::Shlr, Size::Word)));
    t.register(&[0x11], &[0x3], op("SHLR.L", 2, 1, shift!(Shift::Shlr, Size::Long)));
    t.register(&[0x11], &[0x8], op("SHAR.B", 2, 1, shift!(Shift::Shar, Size::Byte)));
    t.register(&[0x11], &[0x9], op("SHAR.W", 2, 1, shift!(Shift::Shar, Size::Word)));
    t.register(&[0x11], &[0xB], op("SHAR.L", 2, 1, shift!(Shift::Shar, Size::Long)));

    t.register(&[0x12], &[0x0], op("ROTXL.B", 2, 1, shift!(Shift::Rotxl, Size::Byte)));
    t.register(&[0x12], &[0x1], op("ROTXL.W", 2, 1, shift!(Shift::Rotxl, Size::Word)));
    t.register(&[0x12], &[0x3], op("ROTXL.L", 2, 1, shift!(Shift::Rotxl, Size::Long)));
    t.register(&[0x12], &[0x8], op("ROTL.B", 2, 1, shift!(Shift::Rotl, Size::Byte)));
    t.register(&[0x12], &[0x9], op("ROTL.W", 2, 1, shift!(Shift::Rotl, Size::Word)));
    t.register(&[0x12], &[0xB], op("ROTL.L", 2, 1, shift!(Shift::Rotl, Size::Long)));

    t.register(&[0x13], &[0x0], op("ROTXR.B", 2, 1, shift!(Shift::Rotxr, Size::Byte)));
    t.register(&[0x13], &[0x1], op("ROTXR.W", 2, 1, shift!(Shift::Rotxr, Size::Word)));
    t.register(&[0x13], &[0x3], op("ROTXR.L", 2, 1, shift!(Shift::Rotxr, Size::Long)));
    t.register(&[0x13], &[0x8], op("ROTR.B", 2, 1, shift!(Shift::Rotr, Size::Byte)));
    t.register(&[0x13], &[0x9], op("ROTR.W", 2, 1, shift!(Shift::Rotr, Size::Word)));
    t.register(&[0x13], &[0xB], op("ROTR.L", 2, 1, shift!(Shift::Rotr, Size::Long)));

    // --- 17: NOT, NEG and extensions ---

    t.register(&[0x17], &[0x0], op("NOT.B", 2, 1, |b, o| ops::not(b, o.bl(), Size::Byte)));
    t.register(&[0x17], &[0x1], op("NOT.W", 2, 1, |b, o| ops::not(b, o.bl(), Size::Word)));
    t.register(&[0x17], &[0x3], op("NOT.L", 2, 1, |b, o| ops::not(b, o.bl(), Size::Long)));
    t.register(&[0x17], &[0x5], op("EXTU.W", 2, 1, |b, o| ops::extu(b, o.bl(), Size::Word)));
    t.register(&[0x17], &[0x7], op("EXTU.L", 2, 1, |b, o| ops::extu(b, o.bl(), Size::Long)));
    t.register(&[0x17], &[0x8], op("NEG.B", 2, 1, |b, o| ops::neg(b, o.bl(), Size::Byte)));
    t.register(&[0x17], &[0x9], op("NEG.W", 2, 1, |b, o| ops::neg(b, o.bl(), Size::Word)));
    t.register(&[0x17], &[0xB], op("NEG.L", 2, 1, |b, o| ops::neg(b, o.bl(), Size::Long)));
    t.register(&[0x17], &[0xD], op("EXTS.W", 2, 1, |b, o| ops::exts(b, o.bl(), Size::Word)));
    t.register(&[0x17], &[0xF], op("EXTS.L", 2, 1, |b, o| ops::exts(b, o.bl(), Size::Long)));

    // --- 1A/1B: decrement and long subtract ---

    t.register(&[0x1A], &[0x0], op("DEC.B", 2, 1, |b, o| ops::dec(b, o.bl(), 1, Size::Byte)));
    t.register(&[0x1A], &[0x8, 0x9, 0xA, 0xB, 0xC, 0xD, 0xE, 0xF], op("SUB.L", 2, 1, |b, o| {
        let src = b.cpu.regs.get32(o.bh());
        ops::sub(b, o.bl(), src, Size::Long);
    }));
    t.register(&[0x1B], &[0x0], op("SUBS", 2, 1, |b, o| ops::subs(b, o.bl(), 1)));
    t.register(&[0x1B], &[0x8], op("SUBS", 2, 1, |b, o| ops::subs(b, o.bl(), 2)));
    t.register(&[0x1B], &[0x9], op("SUBS", 2, 1, |b, o| ops::subs(b, o.bl(), 4)));
    t.register(&[0x1B], &[0x5], op("DEC.W", 2, 1, |b, o| ops::dec(b, o.bl(), 1, Size::Word)));
    t.register(&[0x1B], &[0xD], op("DEC.W", 2, 1, |b, o| ops::dec(b, o.bl(), 2, Size::Word)));
    t.register(&[0x1B], &[0x7], op("DEC.L", 2, 1, |b, o| ops::dec(b, o.bl(), 1, Size::Long)));
    t.register(&[0x1B], &[0xF], op("DEC.L", 2, 1, |b, o| ops::dec(b, o.bl(), 2, Size::Long)));

    // --- 1F: DAS and long compare ---

    t.register(&[0x1F], &[0x0], op("DAS", 2, 1, |b, o| {
        let value = b.cpu.regs.get8(o.bl());
        let result = ops::das_value(&mut b.cpu.flags, value);
        b.cpu.regs.set8(o.bl(), result as u32);
    }));
    t.register(&[0x1F], &[0x8, 0x9, 0xA, 0xB, 0xC, 0xD, 0xE, 0xF], op("CMP.L", 2, 1, |b, o| {
        let src = b.cpu.regs.get32(o.bh());
        ops::cmp(b, o.bl(), src, Size::Long);
    }));

    // --- 58: Bcc d:16 ---

    for cc in NIBBLES {
        t.register(&[0x58], &[cc], op(CONDITION_NAMES[cc as usize], 4, 4, |b, o| {
            ops::branch(b, o.bh(), ops::sign_extend16(o.cd()))
        }));
    }

    // --- 79/7A: immediate word and long ---

    t.register(&[0x79], &[0x0], op("MOV.W", 4, 2, |b, o| ops::mov_reg(b, o.bl(), o.cd(), Size::Word)));
    t.register(&[0x79], &[0x1], op("ADD.W", 4, 2, |b, o| ops::add(b, o.bl(), o.cd(), Size::Word)));
    t.register(&[0x79], &[0x2], op("CMP.W", 4, 2, |b, o| ops::cmp(b, o.bl(), o.cd(), Size::Word)));
    t.register(&[0x79], &[0x3], op("SUB.W", 4, 2, |b, o| ops::sub(b, o.bl(), o.cd(), Size::Word)));
    t.register(&[0x79], &[0x4], op("OR.W", 4, 2, |b, o| ops::logic(b, Logic::Or, o.bl(), o.cd(), Size::Word)));
    t.register(&[0x79], &[0x5], op("XOR.W", 4, 2, |b, o| ops::logic(b, Logic::Xor, o.bl(), o.cd(), Size::Word)));
    t.register(&[0x79], &[0x6], op("AND.W", 4, 2, |b, o| ops::logic(b, Logic::And, o.bl(), o.cd(), Size::Word)));

    t.register(&[0x7A], &[0x0], op("MOV.L", 6, 3, |b, o| ops::mov_reg(b, o.bl(), immediate32(o), Size::Long)));
    t.register(&[0x7A], &[0x1], op("ADD.L", 6, 3, |b, o| ops::add(b, o.bl(), immediate32(o), Size::Long)));
    t.register(&[0x7A], &[0x2], op("CMP.L", 6, 3, |b, o| ops::cmp(b, o.bl(), immediate32(o), Size::Long)));
    t.register(&[0x7A], &[0x3], op("SUB.L", 6, 3, |b, o| ops::sub(b, o.bl(), immediate32(o), Size::Long)));
    t.register(&[0x7A], &[0x4], op("OR.L", 6, 3, |b, o| {
        ops::logic(b, Logic::Or, o.bl(), immediate32(o), Size::Long)
    }));
    t.register(&[0x7A], &[0x5], op("XOR.L", 6, 3, |b, o| {
        ops::logic(b, Logic::Xor, o.bl(), immediate32(o), Size::Long)
    }));
    t.register(&[0x7A], &[0x6], op("AND.L", 6, 3, |b, o| {
        ops::logic(b, Logic::And, o.bl(), immediate32(o), Size::Long)
    }));

    t
}

#[inline(always)]
fn immediate32(o: &Opcodes) -> u32 {
    (o.cd() << 16) | o.ef()
}

/// `01 00 6x ..`: the long forms of the memory moves. The register operands
/// move to byte d and everything shifts two bytes to the right, so the
/// length depends on the addressing mode and PC is advanced here.
fn mov_long(b: &mut Board, o: &Opcodes) {
    let store = o.dh() & 8 != 0;
    let reg = o.dl();
    let length = match o.c() {
        0x69 => {
            let addr = b.cpu.regs.get32(o.dh());
            transfer(b, addr, reg, store);
            4
        }
        0x6B => {
            let (addr, length) = match o.dh() & 7 {
                0 => (o.ef(), 6),
                2 => ((o.ef() << 16) | o.gh(), 8),
                mode => {
                    error!("unsupported MOV.L absolute mode {:X} at {:04X}", mode, b.cpu.regs.pc);
                    b.cpu.regs.pc = b.cpu.regs.pc.wrapping_add(4);
                    return;
                }
            };
            transfer(b, addr, reg, store);
            length
        }
        0x6D => {
            let er = o.dh();
            if store {
                let addr = b.cpu.regs.get32(er).wrapping_sub(4);
                b.cpu.regs.set32(er, addr);
                transfer(b, addr, reg, true);
            } else {
                let addr = b.cpu.regs.get32(er);
                b.cpu.regs.set32(er, addr.wrapping_add(4));
                transfer(b, addr, reg, false);
            }
            4
        }
        0x6F => {
            let addr = b.cpu.regs.get32(o.dh()).wrapping_add(ops::sign_extend16(o.ef()));
            transfer(b, addr, reg, store);
            6
        }
        other => {
            error!("unsupported MOV.L form 01 00 {:02X} at {:04X}", other, b.cpu.regs.pc);
            4
        }
    };
    b.cpu.regs.pc = b.cpu.regs.pc.wrapping_add(length);
}

#[inline(always)]
fn transfer(b: &mut Board, addr: u32, reg: u8, store: bool) {
    if store {
        ops::mov_store(b, addr, reg, Size::Long);
    } else {
        ops::mov_load(b, addr, reg, Size::Long);
    }
}
