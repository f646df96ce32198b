//! Operation helpers shared by the decode tables.
//!
//! Table entries are plain function pointers, so operand widths and register
//! selectors are passed in explicitly and the same helper serves the byte,
//! word and long encodings of an instruction.

use crate::flags::{
    flags_add, flags_addx, flags_dec, flags_inc, flags_mov, flags_sub, flags_subx, Flags, Size,
};
use crate::Board;

// --- Register and bus access by width ---

#[inline(always)]
pub fn reg(b: &Board, sel: u8, size: Size) -> u32 {
    match size {
        Size::Byte => b.cpu.regs.get8(sel) as u32,
        Size::Word => b.cpu.regs.get16(sel) as u32,
        Size::Long => b.cpu.regs.get32(sel),
    }
}

#[inline(always)]
pub fn set_reg(b: &mut Board, sel: u8, size: Size, value: u32) {
    match size {
        Size::Byte => b.cpu.regs.set8(sel, value),
        Size::Word => b.cpu.regs.set16(sel, value),
        Size::Long => b.cpu.regs.set32(sel, value),
    }
}

#[inline(always)]
pub fn load(b: &mut Board, addr: u32, size: Size) -> u32 {
    match size {
        Size::Byte => b.read_byte(addr) as u32,
        Size::Word => b.read_short(addr) as u32,
        Size::Long => b.read_int(addr),
    }
}

#[inline(always)]
pub fn store(b: &mut Board, addr: u32, size: Size, value: u32) {
    match size {
        Size::Byte => b.write_byte(addr, value as u8),
        Size::Word => b.write_short(addr, value as u16),
        Size::Long => b.write_int(addr, value),
    }
}

/// Bytes moved by a transfer of `size`; also the post-increment step.
#[inline(always)]
pub fn step(size: Size) -> u32 {
    size.bits() / 8
}

#[inline(always)]
pub fn sign_extend8(value: u8) -> u32 {
    value as i8 as i32 as u32
}

#[inline(always)]
pub fn sign_extend16(value: u32) -> u32 {
    value as u16 as i16 as i32 as u32
}

/// MOV from memory into a register.
pub fn mov_load(b: &mut Board, addr: u32, rd: u8, size: Size) {
    let value = load(b, addr, size);
    mov_reg(b, rd, value, size);
}

/// MOV from a register into memory. Flags reflect the stored value.
pub fn mov_store(b: &mut Board, addr: u32, rs: u8, size: Size) {
    let value = reg(b, rs, size);
    store(b, addr, size, value);
    flags_mov(&mut b.cpu.flags, value, size);
}

// --- ALU ---

/// `rd = rd + src`.
pub fn add(b: &mut Board, rd: u8, src: u32, size: Size) {
    let dst = reg(b, rd, size);
    set_reg(b, rd, size, dst.wrapping_add(src));
    flags_add(&mut b.cpu.flags, dst, src, size);
}

/// `rd = rd + src + C`.
pub fn addx(b: &mut Board, rd: u8, src: u32, size: Size) {
    let dst = reg(b, rd, size);
    let carry = b.cpu.flags.c as u32;
    set_reg(b, rd, size, dst.wrapping_add(src).wrapping_add(carry));
    flags_addx(&mut b.cpu.flags, dst, src, size);
}

/// `rd = rd - src`.
pub fn sub(b: &mut Board, rd: u8, src: u32, size: Size) {
    let dst = reg(b, rd, size);
    set_reg(b, rd, size, dst.wrapping_sub(src));
    flags_sub(&mut b.cpu.flags, dst, src, size);
}

/// `rd = rd - src - C`.
pub fn subx(b: &mut Board, rd: u8, src: u32, size: Size) {
    let dst = reg(b, rd, size);
    let carry = b.cpu.flags.c as u32;
    set_reg(b, rd, size, dst.wrapping_sub(src).wrapping_sub(carry));
    flags_subx(&mut b.cpu.flags, dst, src, size);
}

pub fn cmp(b: &mut Board, rd: u8, src: u32, size: Size) {
    let dst = reg(b, rd, size);
    flags_sub(&mut b.cpu.flags, dst, src, size);
}

#[derive(Debug, Clone, Copy)]
pub enum Logic {
    And,
    Or,
    Xor,
}

pub fn logic(b: &mut Board, op: Logic, rd: u8, src: u32, size: Size) {
    let dst = reg(b, rd, size);
    let value = match op {
        Logic::And => dst & src,
        Logic::Or => dst | src,
        Logic::Xor => dst ^ src,
    };
    set_reg(b, rd, size, value);
    flags_mov(&mut b.cpu.flags, value, size);
}

/// MOV into a register: write and set N/Z, clear V.
pub fn mov_reg(b: &mut Board, rd: u8, value: u32, size: Size) {
    set_reg(b, rd, size, value);
    flags_mov(&mut b.cpu.flags, value, size);
}

/// INC/DEC by 1 or 2. Only N, Z and V change.
pub fn inc(b: &mut Board, rd: u8, amount: u32, size: Size) {
    let value = reg(b, rd, size);
    let result = value.wrapping_add(amount) & size.mask();
    set_reg(b, rd, size, result);
    if amount == 1 {
        flags_inc(&mut b.cpu.flags, value, size);
    } else {
        flags_adjust(&mut b.cpu.flags, value, result, true, size);
    }
}

pub fn dec(b: &mut Board, rd: u8, amount: u32, size: Size) {
    let value = reg(b, rd, size);
    let result = value.wrapping_sub(amount) & size.mask();
    set_reg(b, rd, size, result);
    if amount == 1 {
        flags_dec(&mut b.cpu.flags, value, size);
    } else {
        flags_adjust(&mut b.cpu.flags, value, result, false, size);
    }
}

/// N/Z from `result`; V set when the sign flipped in the direction of the step.
fn flags_adjust(flags: &mut Flags, value: u32, result: u32, increment: bool, size: Size) {
    let was_negative = value & size.sign() != 0;
    let is_negative = result & size.sign() != 0;
    flags.n = is_negative;
    flags.z = result & size.mask() == 0;
    flags.v = if increment {
        !was_negative && is_negative
    } else {
        was_negative && !is_negative
    };
}

/// ADDS/SUBS: 32-bit adjust without touching flags.
pub fn adds(b: &mut Board, rd: u8, amount: u32) {
    let value = b.cpu.regs.get32(rd);
    b.cpu.regs.set32(rd, value.wrapping_add(amount));
}

pub fn subs(b: &mut Board, rd: u8, amount: u32) {
    let value = b.cpu.regs.get32(rd);
    b.cpu.regs.set32(rd, value.wrapping_sub(amount));
}

pub fn neg(b: &mut Board, rd: u8, size: Size) {
    let value = reg(b, rd, size);
    set_reg(b, rd, size, 0u32.wrapping_sub(value));
    flags_sub(&mut b.cpu.flags, 0, value, size);
}

pub fn not(b: &mut Board, rd: u8, size: Size) {
    let value = !reg(b, rd, size) & size.mask();
    mov_reg(b, rd, value, size);
}

// --- Shifts and rotates ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Shll,
    Shal,
    Shlr,
    Shar,
    Rotxl,
    Rotl,
    Rotxr,
    Rotr,
}

/// Shift `value` by one bit, updating N/Z/V/C. Returns the masked result.
pub fn shift_value(flags: &mut Flags, kind: Shift, value: u32, size: Size) -> u32 {
    let mask = size.mask();
    let sign = size.sign();
    let value = value & mask;
    let msb = value & sign != 0;
    let lsb = value & 1 != 0;
    let top = |bit: bool| if bit { sign } else { 0 };

    let (result, carry) = match kind {
        Shift::Shll | Shift::Shal => (value << 1, msb),
        Shift::Shlr => (value >> 1, lsb),
        Shift::Shar => ((value >> 1) | (value & sign), lsb),
        Shift::Rotxl => ((value << 1) | flags.c as u32, msb),
        Shift::Rotl => ((value << 1) | msb as u32, msb),
        Shift::Rotxr => ((value >> 1) | top(flags.c), lsb),
        Shift::Rotr => ((value >> 1) | top(lsb), lsb),
    };
    let result = result & mask;

    flags_mov(flags, result, size);
    flags.c = carry;
    if kind == Shift::Shal {
        flags.v = msb != (result & sign != 0);
    }
    result
}

pub fn shift(b: &mut Board, kind: Shift, rd: u8, size: Size) {
    let value = reg(b, rd, size);
    let result = shift_value(&mut b.cpu.flags, kind, value, size);
    set_reg(b, rd, size, result);
}

// --- Extension ---

pub fn extu(b: &mut Board, rd: u8, size: Size) {
    let value = match size {
        Size::Long => b.cpu.regs.get32(rd) & 0xFFFF,
        _ => b.cpu.regs.get16(rd) as u32 & 0xFF,
    };
    mov_reg(b, rd, value, size);
}

pub fn exts(b: &mut Board, rd: u8, size: Size) {
    let value = match size {
        Size::Long => sign_extend16(b.cpu.regs.get32(rd)),
        _ => sign_extend8(b.cpu.regs.get16(rd) as u8) & 0xFFFF,
    };
    mov_reg(b, rd, value, size);
}

// --- Multiply and divide ---

/// MULXU: `Rd(2n) = Rd(n) * Rs(n)`, flags untouched.
pub fn mulxu(b: &mut Board, rs: u8, rd: u8, size: Size) {
    match size {
        Size::Byte => {
            let product = (b.cpu.regs.get16(rd) as u32 & 0xFF) * b.cpu.regs.get8(rs) as u32;
            b.cpu.regs.set16(rd, product);
        }
        _ => {
            let product = (b.cpu.regs.get32(rd) & 0xFFFF) * b.cpu.regs.get16(rs) as u32;
            b.cpu.regs.set32(rd, product);
        }
    }
}

/// MULXS: signed multiply, N/Z from the double-width product.
pub fn mulxs(b: &mut Board, rs: u8, rd: u8, size: Size) {
    match size {
        Size::Byte => {
            let lhs = b.cpu.regs.get16(rd) as u8 as i8 as i32;
            let rhs = b.cpu.regs.get8(rs) as i8 as i32;
            let product = lhs * rhs;
            b.cpu.regs.set16(rd, product as u32);
            flags_mov(&mut b.cpu.flags, product as u32, Size::Word);
        }
        _ => {
            let lhs = b.cpu.regs.get32(rd) as u16 as i16 as i32;
            let rhs = b.cpu.regs.get16(rs) as i16 as i32;
            let product = lhs.wrapping_mul(rhs);
            b.cpu.regs.set32(rd, product as u32);
            flags_mov(&mut b.cpu.flags, product as u32, Size::Long);
        }
    }
}

/// DIVXU: `Rd(2n) / Rs(n)`, remainder in the upper half and quotient in the
/// lower half. N is the divisor's sign bit and Z is set for a zero divisor,
/// in which case the destination is left unchanged.
pub fn divxu(b: &mut Board, rs: u8, rd: u8, size: Size) {
    match size {
        Size::Byte => {
            let divisor = b.cpu.regs.get8(rs) as u32;
            let dividend = b.cpu.regs.get16(rd) as u32;
            b.cpu.flags.n = divisor & 0x80 != 0;
            b.cpu.flags.z = divisor == 0;
            if divisor != 0 {
                let quotient = dividend / divisor;
                let remainder = dividend % divisor;
                b.cpu.regs.set16(rd, (remainder << 8) | (quotient & 0xFF));
            }
        }
        _ => {
            let divisor = b.cpu.regs.get16(rs) as u32;
            let dividend = b.cpu.regs.get32(rd);
            b.cpu.flags.n = divisor & 0x8000 != 0;
            b.cpu.flags.z = divisor == 0;
            if divisor != 0 {
                let quotient = dividend / divisor;
                let remainder = dividend % divisor;
                b.cpu.regs.set32(rd, (remainder << 16) | (quotient & 0xFFFF));
            }
        }
    }
}

/// DIVXS: signed divide. The remainder takes the dividend's sign and N is
/// the sign of the quotient.
pub fn divxs(b: &mut Board, rs: u8, rd: u8, size: Size) {
    match size {
        Size::Byte => {
            let divisor = b.cpu.regs.get8(rs) as i8 as i32;
            let dividend = b.cpu.regs.get16(rd) as i16 as i32;
            b.cpu.flags.z = divisor == 0;
            if divisor != 0 {
                let quotient = dividend.wrapping_div(divisor);
                let remainder = dividend.wrapping_rem(divisor);
                b.cpu.flags.n = quotient < 0;
                let packed = ((remainder as u32 & 0xFF) << 8) | (quotient as u32 & 0xFF);
                b.cpu.regs.set16(rd, packed);
            } else {
                b.cpu.flags.n = false;
            }
        }
        _ => {
            let divisor = b.cpu.regs.get16(rs) as i16 as i32;
            let dividend = b.cpu.regs.get32(rd) as i32;
            b.cpu.flags.z = divisor == 0;
            if divisor != 0 {
                let quotient = dividend.wrapping_div(divisor);
                let remainder = dividend.wrapping_rem(divisor);
                b.cpu.flags.n = quotient < 0;
                let packed = ((remainder as u32 & 0xFFFF) << 16) | (quotient as u32 & 0xFFFF);
                b.cpu.regs.set32(rd, packed);
            } else {
                b.cpu.flags.n = false;
            }
        }
    }
}

// --- BCD adjust ---

/// DAA adjustment rows: (C in, upper nibble range, H in, lower nibble range, adjust, C out).
const DAA_TABLE: [(bool, u8, u8, bool, u8, u8, u8, bool); 9] = [
    (false, 0x0, 0x9, false, 0x0, 0x9, 0x00, false),
    (false, 0x0, 0x8, false, 0xA, 0xF, 0x06, false),
    (false, 0x0, 0x9, true, 0x0, 0x3, 0x06, false),
    (false, 0xA, 0xF, false, 0x0, 0x9, 0x60, true),
    (false, 0x9, 0xF, false, 0xA, 0xF, 0x66, true),
    (false, 0xA, 0xF, true, 0x0, 0x3, 0x66, true),
    (true, 0x1, 0x2, false, 0x0, 0x9, 0x60, true),
    (true, 0x1, 0x2, false, 0xA, 0xF, 0x66, true),
    (true, 0x1, 0x3, true, 0x0, 0x3, 0x66, true),
];

/// DAS adjustment rows, same layout as [`DAA_TABLE`].
const DAS_TABLE: [(bool, u8, u8, bool, u8, u8, u8, bool); 4] = [
    (false, 0x0, 0x9, false, 0x0, 0x9, 0x00, false),
    (false, 0x0, 0x8, true, 0x6, 0xF, 0xFA, false),
    (true, 0x7, 0xF, false, 0x0, 0x9, 0xA0, true),
    (true, 0x6, 0xF, true, 0x6, 0xF, 0x9A, true),
];

fn bcd_adjust(
    table: &[(bool, u8, u8, bool, u8, u8, u8, bool)],
    value: u8,
    c: bool,
    h: bool,
) -> Option<(u8, bool)> {
    let upper = value >> 4;
    let lower = value & 0xF;
    table
        .iter()
        .find(|&&(c_in, up_lo, up_hi, h_in, low_lo, low_hi, _, _)| {
            c_in == c && h_in == h && (up_lo..=up_hi).contains(&upper) && (low_lo..=low_hi).contains(&lower)
        })
        .map(|&(_, _, _, _, _, _, adjust, c_out)| (value.wrapping_add(adjust), c_out))
}

/// Decimal adjust after addition. Unlisted inputs leave the value and C alone.
pub fn daa_value(flags: &mut Flags, value: u8) -> u8 {
    let result = match bcd_adjust(&DAA_TABLE, value, flags.c, flags.h) {
        Some((result, carry)) => {
            flags.c = carry;
            result
        }
        None => value,
    };
    flags.n = result & 0x80 != 0;
    flags.z = result == 0;
    result
}

/// Decimal adjust after subtraction.
pub fn das_value(flags: &mut Flags, value: u8) -> u8 {
    let result = match bcd_adjust(&DAS_TABLE, value, flags.c, flags.h) {
        Some((result, carry)) => {
            flags.c = carry;
            result
        }
        None => value,
    };
    flags.n = result & 0x80 != 0;
    flags.z = result == 0;
    result
}

// --- Branch conditions ---

/// Evaluate a 4-bit Bcc condition code.
///
/// | cc | Mnemonic | Test              |
/// |----|----------|-------------------|
/// | 0  | BRA      | always            |
/// | 1  | BRN      | never             |
/// | 2  | BHI      | C ∨ Z = 0         |
/// | 3  | BLS      | C ∨ Z = 1         |
/// | 4  | BCC      | C = 0             |
/// | 5  | BCS      | C = 1             |
/// | 6  | BNE      | Z = 0             |
/// | 7  | BEQ      | Z = 1             |
/// | 8  | BVC      | V = 0             |
/// | 9  | BVS      | V = 1             |
/// | A  | BPL      | N = 0             |
/// | B  | BMI      | N = 1             |
/// | C  | BGE      | N ⊕ V = 0         |
/// | D  | BLT      | N ⊕ V = 1         |
/// | E  | BGT      | Z ∨ (N ⊕ V) = 0   |
/// | F  | BLE      | Z ∨ (N ⊕ V) = 1   |
pub fn condition(cc: u8, f: &Flags) -> bool {
    match cc & 0xF {
        0x0 => true,
        0x1 => false,
        0x2 => !(f.c || f.z),
        0x3 => f.c || f.z,
        0x4 => !f.c,
        0x5 => f.c,
        0x6 => !f.z,
        0x7 => f.z,
        0x8 => !f.v,
        0x9 => f.v,
        0xA => !f.n,
        0xB => f.n,
        0xC => f.n == f.v,
        0xD => f.n != f.v,
        0xE => !(f.z || f.n != f.v),
        _ => f.z || f.n != f.v,
    }
}

pub const CONDITION_NAMES: [&str; 16] = [
    "BRA", "BRN", "BHI", "BLS", "BCC", "BCS", "BNE", "BEQ",
    "BVC", "BVS", "BPL", "BMI", "BGE", "BLT", "BGT", "BLE",
];

/// Take a relative branch when `cc` holds. The displacement is relative to
/// the end of the instruction, which the dispatcher adds afterwards.
pub fn branch(b: &mut Board, cc: u8, disp: u32) {
    if condition(cc, &b.cpu.flags) {
        b.cpu.regs.pc = b.cpu.regs.pc.wrapping_add(disp);
    }
}

// --- Bit manipulation ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    Set,
    Not,
    Clr,
    Tst,
    /// Store C (or !C when inverted) into the bit.
    St,
    /// C |= bit
    Or,
    /// C ^= bit
    Xor,
    /// C &= bit
    And,
    /// C = bit
    Ld,
}

/// Apply `op` to bit `bit` of `value`. Returns the new byte for operations
/// that write back, `None` for those that only touch flags.
pub fn bit_value(flags: &mut Flags, op: BitOp, value: u8, bit: u8, invert: bool) -> Option<u8> {
    let mask = 1u8 << (bit & 7);
    let set = (value & mask != 0) != invert;
    match op {
        BitOp::Set => Some(value | mask),
        BitOp::Not => Some(value ^ mask),
        BitOp::Clr => Some(value & !mask),
        BitOp::Tst => {
            flags.z = value & mask == 0;
            None
        }
        BitOp::St => {
            if flags.c != invert { Some(value | mask) } else { Some(value & !mask) }
        }
        BitOp::Or => {
            flags.c |= set;
            None
        }
        BitOp::Xor => {
            flags.c ^= set;
            None
        }
        BitOp::And => {
            flags.c &= set;
            None
        }
        BitOp::Ld => {
            flags.c = set;
            None
        }
    }
}

pub fn bit_reg(b: &mut Board, op: BitOp, rd: u8, bit: u8, invert: bool) {
    let value = b.cpu.regs.get8(rd);
    if let Some(result) = bit_value(&mut b.cpu.flags, op, value, bit, invert) {
        b.cpu.regs.set8(rd, result as u32);
    }
}

pub fn bit_mem(b: &mut Board, op: BitOp, addr: u32, bit: u8, invert: bool) {
    let value = b.read_byte(addr);
    if let Some(result) = bit_value(&mut b.cpu.flags, op, value, bit, invert) {
        b.write_byte(addr, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daa_rows() {
        let cases = [
            // (value, C, H) -> (result, C)
            (0x45u8, false, false, 0x45u8, false),
            (0x4C, false, false, 0x52, false),
            (0x42, false, true, 0x48, false),
            (0xA5, false, false, 0x05, true),
            (0x9B, false, false, 0x01, true),
            (0xB2, false, true, 0x18, true),
            (0x15, true, false, 0x75, true),
            (0x2A, true, false, 0x90, true),
            (0x31, true, true, 0x97, true),
        ];
        for (value, c, h, expected, carry) in cases {
            let mut flags = Flags::new();
            flags.c = c;
            flags.h = h;
            assert_eq!(daa_value(&mut flags, value), expected, "DAA {:#04x}", value);
            assert_eq!(flags.c, carry, "DAA carry {:#04x}", value);
        }
    }

    #[test]
    fn test_daa_unlisted_keeps_carry() {
        let mut flags = Flags::new();
        flags.c = true;
        flags.h = false;
        assert_eq!(daa_value(&mut flags, 0x55), 0x55);
        assert!(flags.c);
    }

    #[test]
    fn test_das_rows() {
        let cases = [
            (0x45u8, false, false, 0x45u8, false),
            (0x4F, false, true, 0x49, false),
            (0x85, true, false, 0x25, true),
            (0x6F, true, true, 0x09, true),
        ];
        for (value, c, h, expected, carry) in cases {
            let mut flags = Flags::new();
            flags.c = c;
            flags.h = h;
            assert_eq!(das_value(&mut flags, value), expected, "DAS {:#04x}", value);
            assert_eq!(flags.c, carry);
        }
    }

    #[test]
    fn test_conditions() {
        let mut f = Flags::new();
        assert!(condition(0x0, &f));
        assert!(!condition(0x1, &f));
        assert!(condition(0x2, &f));
        f.z = true;
        assert!(condition(0x7, &f) && !condition(0x6, &f));
        assert!(condition(0xF, &f) && !condition(0xE, &f));
        f.z = false;
        f.n = true;
        assert!(condition(0xD, &f) && !condition(0xC, &f));
        f.v = true;
        assert!(condition(0xC, &f) && condition(0xE, &f));
    }

    #[test]
    fn test_shift_carry_from_vacated_bit() {
        let mut f = Flags::new();
        assert_eq!(shift_value(&mut f, Shift::Shll, 0x81, Size::Byte), 0x02);
        assert!(f.c);
        assert_eq!(shift_value(&mut f, Shift::Shlr, 0x02, Size::Byte), 0x01);
        assert!(!f.c);
        assert_eq!(shift_value(&mut f, Shift::Shar, 0x8001, Size::Word), 0xC000);
        assert!(f.c && f.n);
        assert_eq!(shift_value(&mut f, Shift::Rotl, 0x8000_0000, Size::Long), 1);
        assert!(f.c);
        assert_eq!(shift_value(&mut f, Shift::Rotr, 0x01, Size::Byte), 0x80);
        assert!(f.c && f.n);
    }

    #[test]
    fn test_rotate_through_carry() {
        let mut f = Flags::new();
        f.c = true;
        assert_eq!(shift_value(&mut f, Shift::Rotxl, 0x40, Size::Byte), 0x81);
        assert!(!f.c);
        assert_eq!(shift_value(&mut f, Shift::Rotxr, 0x01, Size::Byte), 0x00);
        assert!(f.c && f.z);
    }

    #[test]
    fn test_shal_overflow() {
        let mut f = Flags::new();
        shift_value(&mut f, Shift::Shal, 0x40, Size::Byte);
        assert!(f.v);
        shift_value(&mut f, Shift::Shll, 0x40, Size::Byte);
        assert!(!f.v);
    }

    #[test]
    fn test_bit_ops() {
        let mut f = Flags::new();
        assert_eq!(bit_value(&mut f, BitOp::Set, 0x00, 3, false), Some(0x08));
        assert_eq!(bit_value(&mut f, BitOp::Clr, 0xFF, 7, false), Some(0x7F));
        assert_eq!(bit_value(&mut f, BitOp::Not, 0x01, 0, false), Some(0x00));
        assert_eq!(bit_value(&mut f, BitOp::Tst, 0x10, 4, false), None);
        assert!(!f.z);
        bit_value(&mut f, BitOp::Ld, 0x10, 4, true);
        assert!(!f.c);
        bit_value(&mut f, BitOp::Or, 0x10, 4, false);
        assert!(f.c);
        assert_eq!(bit_value(&mut f, BitOp::St, 0x00, 1, false), Some(0x02));
        assert_eq!(bit_value(&mut f, BitOp::St, 0x02, 1, true), Some(0x00));
        bit_value(&mut f, BitOp::And, 0x00, 0, false);
        assert!(!f.c);
        bit_value(&mut f, BitOp::Xor, 0x01, 0, false);
        assert!(f.c);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend8(0x80), 0xFFFF_FF80);
        assert_eq!(sign_extend16(0x1_7FFF), 0x7FFF);
        assert_eq!(sign_extend16(0x8000), 0xFFFF_8000);
    }
}
