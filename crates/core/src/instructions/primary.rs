//! First-level table, keyed by the two nibbles of the first byte.

use log::error;

use super::ops::{self, BitOp, Logic, CONDITION_NAMES};
use super::{op, Entry, InstructionTable, TableId, NIBBLES};
use crate::flags::Size;
use crate::opcodes::Opcodes;
use crate::Board;

pub(super) fn table() -> InstructionTable {
    let mut t = InstructionTable::new("aH_aL", |o| o.ah() as u32, |o| o.al());

    // --- Escapes ---

    t.register(&[0x0], &[0x1, 0xA, 0xB, 0xF], Entry::Table(TableId::Secondary));
    t.register(&[0x1], &[0x0, 0x1, 0x2, 0x3, 0x7, 0xA, 0xB, 0xF], Entry::Table(TableId::Secondary));
    t.register(&[0x5], &[0x8], Entry::Table(TableId::Secondary));
    t.register(&[0x7], &[0x9, 0xA], Entry::Table(TableId::Secondary));
    t.register(&[0x7], &[0xC, 0xD, 0xE, 0xF], Entry::Table(TableId::Tertiary));

    // --- 0x: control and register-register arithmetic ---

    t.register(&[0x0], &[0x0], op("NOP", 2, 1, |_, _| {}));
    t.register(&[0x0], &[0x2], op("STC", 2, 1, |b, o| {
        let ccr = b.cpu.flags.ccr();
        b.cpu.regs.set8(o.bl(), ccr as u32);
    }));
    t.register(&[0x0], &[0x3], op("LDC", 2, 1, |b, o| {
        let value = b.cpu.regs.get8(o.bl());
        b.cpu.flags.set_ccr(value);
    }));
    t.register(&[0x0], &[0x4], op("ORC", 2, 1, |b, o| {
        let ccr = b.cpu.flags.ccr() | o.b();
        b.cpu.flags.set_ccr(ccr);
    }));
    t.register(&[0x0], &[0x5], op("XORC", 2, 1, |b, o| {
        let ccr = b.cpu.flags.ccr() ^ o.b();
        b.cpu.flags.set_ccr(ccr);
    }));
    t.register(&[0x0], &[0x6], op("ANDC", 2, 1, |b, o| {
        let ccr = b.cpu.flags.ccr() & o.b();
        b.cpu.flags.set_ccr(ccr);
    }));
    t.register(&[0x0], &[0x7], op("LDC", 2, 1, |b, o| b.cpu.flags.set_ccr(o.b())));
    t.register(&[0x0], &[0x8], op("ADD.B", 2, 1, |b, o| {
        let src = b.cpu.regs.get8(o.bh()) as u32;
        ops::add(b, o.bl(), src, Size::Byte);
    }));
    t.register(&[0x0], &[0x9], op("ADD.W", 2, 1, |b, o| {
        let src = b.cpu.regs.get16(o.bh()) as u32;
        ops::add(b, o.bl(), src, Size::Word);
    }));
    t.register(&[0x0], &[0xC], op("MOV.B", 2, 1, |b, o| {
        let src = b.cpu.regs.get8(o.bh()) as u32;
        ops::mov_reg(b, o.bl(), src, Size::Byte);
    }));
    t.register(&[0x0], &[0xD], op("MOV.W", 2, 1, |b, o| {
        let src = b.cpu.regs.get16(o.bh()) as u32;
        ops::mov_reg(b, o.bl(), src, Size::Word);
    }));
    t.register(&[0x0], &[0xE], op("ADDX", 2, 1, |b, o| {
        let src = b.cpu.regs.get8(o.bh()) as u32;
        ops::addx(b, o.bl(), src, Size::Byte);
    }));

    // --- 1x ---

    t.register(&[0x1], &[0x4], op("OR.B", 2, 1, |b, o| logic_rr(b, o, Logic::Or, Size::Byte)));
    t.register(&[0x1], &[0x5], op("XOR.B", 2, 1, |b, o| logic_rr(b, o, Logic::Xor, Size::Byte)));
    t.register(&[0x1], &[0x6], op("AND.B", 2, 1, |b, o| logic_rr(b, o, Logic::And, Size::Byte)));
    t.register(&[0x1], &[0x8], op("SUB.B", 2, 1, |b, o| {
        let src = b.cpu.regs.get8(o.bh()) as u32;
        ops::sub(b, o.bl(), src, Size::Byte);
    }));
    t.register(&[0x1], &[0x9], op("SUB.W", 2, 1, |b, o| {
        let src = b.cpu.regs.get16(o.bh()) as u32;
        ops::sub(b, o.bl(), src, Size::Word);
    }));
    t.register(&[0x1], &[0xC], op("CMP.B", 2, 1, |b, o| {
        let src = b.cpu.regs.get8(o.bh()) as u32;
        ops::cmp(b, o.bl(), src, Size::Byte);
    }));
    t.register(&[0x1], &[0xD], op("CMP.W", 2, 1, |b, o| {
        let src = b.cpu.regs.get16(o.bh()) as u32;
        ops::cmp(b, o.bl(), src, Size::Word);
    }));
    t.register(&[0x1], &[0xE], op("SUBX", 2, 1, |b, o| {
        let src = b.cpu.regs.get8(o.bh()) as u32;
        ops::subx(b, o.bl(), src, Size::Byte);
    }));

    // --- 2x/3x: MOV.B with @aa:8 ---

    t.register(&[0x2], &NIBBLES, op("MOV.B", 2, 1, |b, o| {
        ops::mov_load(b, short_absolute(o.b()), o.al(), Size::Byte)
    }));
    t.register(&[0x3], &NIBBLES, op("MOV.B", 2, 1, |b, o| {
        ops::mov_store(b, short_absolute(o.b()), o.al(), Size::Byte)
    }));

    // --- 4x: Bcc d:8 ---

    for cc in 0..16u8 {
        t.register(&[0x4], &[cc], op(CONDITION_NAMES[cc as usize], 2, 2, |b, o| {
            ops::branch(b, o.al(), ops::sign_extend8(o.b()))
        }));
    }

    // --- 5x: multiply, divide and flow control ---

    t.register(&[0x5], &[0x0], op("MULXU.B", 2, 13, |b, o| ops::mulxu(b, o.bh(), o.bl(), Size::Byte)));
    t.register(&[0x5], &[0x1], op("DIVXU.B", 2, 13, |b, o| ops::divxu(b, o.bh(), o.bl(), Size::Byte)));
    t.register(&[0x5], &[0x2], op("MULXU.W", 2, 21, |b, o| ops::mulxu(b, o.bh(), o.bl(), Size::Word)));
    t.register(&[0x5], &[0x3], op("DIVXU.W", 2, 21, |b, o| ops::divxu(b, o.bh(), o.bl(), Size::Word)));
    t.register(&[0x5], &[0x4], op("RTS", 0, 5, |b, _| {
        b.cpu.regs.pc = b.pop();
    }));
    t.register(&[0x5], &[0x5], op("BSR", 2, 3, |b, o| {
        let ret = b.cpu.regs.pc.wrapping_add(2);
        b.push(ret);
        b.cpu.regs.pc = b.cpu.regs.pc.wrapping_add(ops::sign_extend8(o.b()));
    }));
    t.register(&[0x5], &[0x6], op("RTE", 0, 6, |b, _| {
        b.cpu.regs.pc = b.cpu.saved.pc;
        b.cpu.flags = b.cpu.saved.flags;
    }));
    t.register(&[0x5], &[0x9], op("JMP", 0, 2, |b, o| {
        b.cpu.regs.pc = b.cpu.regs.get32(o.bh());
    }));
    t.register(&[0x5], &[0xA], op("JMP", 0, 4, |b, o| {
        b.cpu.regs.pc = long_absolute(o);
    }));
    t.register(&[0x5], &[0xB], op("JMP", 0, 5, |b, o| {
        b.cpu.regs.pc = b.read_short(o.b() as u32) as u32;
    }));
    t.register(&[0x5], &[0xC], op("BSR", 4, 4, |b, o| {
        let ret = b.cpu.regs.pc.wrapping_add(4);
        b.push(ret);
        b.cpu.regs.pc = b.cpu.regs.pc.wrapping_add(ops::sign_extend16(o.cd()));
    }));
    t.register(&[0x5], &[0xD], op("JSR", 0, 3, |b, o| {
        let ret = b.cpu.regs.pc.wrapping_add(2);
        b.push(ret);
        b.cpu.regs.pc = b.cpu.regs.get32(o.bh());
    }));
    t.register(&[0x5], &[0xE], op("JSR", 0, 5, |b, o| {
        let ret = b.cpu.regs.pc.wrapping_add(4);
        b.push(ret);
        b.cpu.regs.pc = long_absolute(o);
    }));
    t.register(&[0x5], &[0xF], op("JSR", 0, 5, |b, o| {
        let ret = b.cpu.regs.pc.wrapping_add(2);
        b.push(ret);
        b.cpu.regs.pc = b.read_short(o.b() as u32) as u32;
    }));

    // --- 6x: register bit ops, word logic, memory moves ---

    t.register(&[0x6], &[0x0], op("BSET", 2, 1, |b, o| bit_by_register(b, o, BitOp::Set)));
    t.register(&[0x6], &[0x1], op("BNOT", 2, 1, |b, o| bit_by_register(b, o, BitOp::Not)));
    t.register(&[0x6], &[0x2], op("BCLR", 2, 1, |b, o| bit_by_register(b, o, BitOp::Clr)));
    t.register(&[0x6], &[0x3], op("BTST", 2, 1, |b, o| bit_by_register(b, o, BitOp::Tst)));
    t.register(&[0x6], &[0x4], op("OR.W", 2, 1, |b, o| logic_rr(b, o, Logic::Or, Size::Word)));
    t.register(&[0x6], &[0x5], op("XOR.W", 2, 1, |b, o| logic_rr(b, o, Logic::Xor, Size::Word)));
    t.register(&[0x6], &[0x6], op("AND.W", 2, 1, |b, o| logic_rr(b, o, Logic::And, Size::Word)));
    t.register(&[0x6], &[0x7], op("BST", 2, 1, |b, o| bit_immediate(b, o, BitOp::St)));
    t.register(&[0x6], &[0x8], op("MOV.B", 2, 2, |b, o| mov_indirect(b, o, Size::Byte)));
    t.register(&[0x6], &[0x9], op("MOV.W", 2, 2, |b, o| mov_indirect(b, o, Size::Word)));
    t.register(&[0x6], &[0xA], op("MOV.B", 0, 2, |b, o| mov_absolute(b, o, Size::Byte)));
    t.register(&[0x6], &[0xB], op("MOV.W", 0, 2, |b, o| mov_absolute(b, o, Size::Word)));
    t.register(&[0x6], &[0xC], op("MOV.B", 2, 4, |b, o| mov_increment(b, o, Size::Byte)));
    t.register(&[0x6], &[0xD], op("MOV.W", 2, 4, |b, o| mov_increment(b, o, Size::Word)));
    t.register(&[0x6], &[0xE], op("MOV.B", 4, 3, |b, o| mov_displacement(b, o, Size::Byte)));
    t.register(&[0x6], &[0xF], op("MOV.W", 4, 3, |b, o| mov_displacement(b, o, Size::Word)));

    // --- 7x: immediate bit ops and EEPMOV ---

    t.register(&[0x7], &[0x0], op("BSET", 2, 1, |b, o| bit_immediate(b, o, BitOp::Set)));
    t.register(&[0x7], &[0x1], op("BNOT", 2, 1, |b, o| bit_immediate(b, o, BitOp::Not)));
    t.register(&[0x7], &[0x2], op("BCLR", 2, 1, |b, o| bit_immediate(b, o, BitOp::Clr)));
    t.register(&[0x7], &[0x3], op("BTST", 2, 1, |b, o| bit_immediate(b, o, BitOp::Tst)));
    t.register(&[0x7], &[0x4], op("BOR", 2, 1, |b, o| bit_immediate(b, o, BitOp::Or)));
    t.register(&[0x7], &[0x5], op("BXOR", 2, 1, |b, o| bit_immediate(b, o, BitOp::Xor)));
    t.register(&[0x7], &[0x6], op("BAND", 2, 1, |b, o| bit_immediate(b, o, BitOp::And)));
    t.register(&[0x7], &[0x7], op("BLD", 2, 1, |b, o| bit_immediate(b, o, BitOp::Ld)));
    t.register(&[0x7], &[0xB], op("EEPMOV", 4, 8, eepmov));

    // --- 8x-Fx: 8-bit immediate to register ---

    t.register(&[0x8], &NIBBLES, op("ADD.B", 2, 1, |b, o| ops::add(b, o.al(), o.b() as u32, Size::Byte)));
    t.register(&[0x9], &NIBBLES, op("ADDX", 2, 1, |b, o| ops::addx(b, o.al(), o.b() as u32, Size::Byte)));
    t.register(&[0xA], &NIBBLES, op("CMP.B", 2, 1, |b, o| ops::cmp(b, o.al(), o.b() as u32, Size::Byte)));
    t.register(&[0xB], &NIBBLES, op("SUBX", 2, 1, |b, o| ops::subx(b, o.al(), o.b() as u32, Size::Byte)));
    t.register(&[0xC], &NIBBLES, op("OR.B", 2, 1, |b, o| ops::logic(b, Logic::Or, o.al(), o.b() as u32, Size::Byte)));
    t.register(&[0xD], &NIBBLES, op("XOR.B", 2, 1, |b, o| ops::logic(b, Logic::Xor, o.al(), o.b() as u32, Size::Byte)));
    t.register(&[0xE], &NIBBLES, op("AND.B", 2, 1, |b, o| ops::logic(b, Logic::And, o.al(), o.b() as u32, Size::Byte)));
    t.register(&[0xF], &NIBBLES, op("MOV.B", 2, 1, |b, o| ops::mov_reg(b, o.al(), o.b() as u32, Size::Byte)));

    t
}

/// `@aa:8` addresses the top page of the address space.
#[inline(always)]
pub(super) fn short_absolute(aa: u8) -> u32 {
    0xFF00 | aa as u32
}

/// 24-bit target of `JMP/JSR @aa:24`, held in bytes b..d.
#[inline(always)]
fn long_absolute(o: &Opcodes) -> u32 {
    ((o.b() as u32) << 16) | o.cd()
}

fn logic_rr(b: &mut Board, o: &Opcodes, logic: Logic, size: Size) {
    let src = ops::reg(b, o.bh(), size);
    ops::logic(b, logic, o.bl(), src, size);
}

/// `Bxxx Rn,Rd`: the bit number comes from the low three bits of Rn.
fn bit_by_register(b: &mut Board, o: &Opcodes, bit_op: BitOp) {
    let bit = b.cpu.regs.get8(o.bh()) & 7;
    ops::bit_reg(b, bit_op, o.bl(), bit, false);
}

/// `Bxxx #imm,Rd`: bit 3 of the immediate nibble selects the inverted form.
fn bit_immediate(b: &mut Board, o: &Opcodes, bit_op: BitOp) {
    let invert = o.bh() & 8 != 0;
    ops::bit_reg(b, bit_op, o.bl(), o.bh() & 7, invert);
}

/// `MOV @ERs,Rd` and `MOV Rs,@ERd`.
fn mov_indirect(b: &mut Board, o: &Opcodes, size: Size) {
    let addr = b.cpu.regs.get32(o.bh());
    if o.bh() & 8 != 0 {
        ops::mov_store(b, addr, o.bl(), size);
    } else {
        ops::mov_load(b, addr, o.bl(), size);
    }
}

/// `MOV @ERs+,Rd` and `MOV Rs,@-ERd`. PUSH and POP are the ER7 forms.
fn mov_increment(b: &mut Board, o: &Opcodes, size: Size) {
    let er = o.bh();
    let step = ops::step(size);
    if er & 8 != 0 {
        let addr = b.cpu.regs.get32(er).wrapping_sub(step);
        b.cpu.regs.set32(er, addr);
        ops::mov_store(b, addr, o.bl(), size);
    } else {
        let addr = b.cpu.regs.get32(er);
        b.cpu.regs.set32(er, addr.wrapping_add(step));
        ops::mov_load(b, addr, o.bl(), size);
    }
}

/// `MOV @(d:16,ERs),Rd` and `MOV Rs,@(d:16,ERd)`.
fn mov_displacement(b: &mut Board, o: &Opcodes, size: Size) {
    let addr = b.cpu.regs.get32(o.bh()).wrapping_add(ops::sign_extend16(o.cd()));
    if o.bh() & 8 != 0 {
        ops::mov_store(b, addr, o.bl(), size);
    } else {
        ops::mov_load(b, addr, o.bl(), size);
    }
}

/// `MOV @aa:16` and `MOV @aa:24`. The two encodings differ in length, so
/// PC is advanced here.
fn mov_absolute(b: &mut Board, o: &Opcodes, size: Size) {
    let (addr, length) = match o.bh() & 7 {
        0 => (o.cd(), 4),
        2 => ((o.cd() << 16) | o.ef(), 6),
        mode => {
            error!(
                "unsupported absolute MOV mode {:X} at {:04X} ({:02X} {:02X})",
                mode,
                b.cpu.regs.pc,
                o.a(),
                o.b()
            );
            b.cpu.regs.pc = b.cpu.regs.pc.wrapping_add(2);
            return;
        }
    };
    if o.bh() & 8 != 0 {
        ops::mov_store(b, addr, o.bl(), size);
    } else {
        ops::mov_load(b, addr, o.bl(), size);
    }
    b.cpu.regs.pc = b.cpu.regs.pc.wrapping_add(length);
}

/// Block copy from @ER5 to @ER6. `.B` counts in R4L, `.W` in R4.
fn eepmov(b: &mut Board, o: &Opcodes) {
    let size = match o.b() {
        0x5C => Size::Byte,
        0xD4 => Size::Word,
        other => {
            error!("unsupported EEPMOV form 7B {:02X} at {:04X}", other, b.cpu.regs.pc);
            return;
        }
    };
    const R4L: u8 = 0b1100;
    const R4: u8 = 4;
    let counter = if size == Size::Byte { R4L } else { R4 };
    let mut count = ops::reg(b, counter, size);
    let mut src = b.cpu.regs.get32(5);
    let mut dst = b.cpu.regs.get32(6);
    while count > 0 {
        let value = b.read_byte(src);
        b.write_byte(dst, value);
        src = src.wrapping_add(1);
        dst = dst.wrapping_add(1);
        count -= 1;
    }
    b.cpu.regs.set32(5, src);
    b.cpu.regs.set32(6, dst);
    ops::set_reg(b, counter, size, 0);
}
