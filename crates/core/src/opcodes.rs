//! Instruction fetch window.
//!
//! H8/300H instructions are 2 to 10 bytes long and their operand fields sit
//! on nibble boundaries. Each step fetches the eight bytes at PC into an
//! [`Opcodes`] buffer; bytes are named `a` through `h`, nibbles carry an `h`
//! (high) or `l` (low) suffix, and 16-bit pairs are named by both bytes:
//!
//! ```text
//!   byte:  a      b      c      d      e      f      g      h
//!   nib:  ah al  bh bl  ch cl  dh dl  eh el  fh fl  gh gl  hh hl
//!   pair:  ----ab----    ----cd----    ----ef----    ----gh----
//! ```

use crate::memory::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcodes {
    bytes: [u8; 8],
}

impl Opcodes {
    /// Fetch the window starting at `pc`, wrapping at the end of memory.
    pub fn fetch(mem: &Memory, pc: u32) -> Self {
        let mut bytes = [0u8; 8];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = mem.read_byte(pc.wrapping_add(i as u32));
        }
        Opcodes { bytes }
    }

    /// Build a window from a byte slice, zero-filling past its end.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut bytes = [0u8; 8];
        let len = data.len().min(8);
        bytes[..len].copy_from_slice(&data[..len]);
        Opcodes { bytes }
    }

    #[inline(always)]
    pub fn byte(&self, i: usize) -> u8 {
        self.bytes[i]
    }

    #[inline(always)]
    pub fn bytes(&self) -> &[u8; 8] {
        &self.bytes
    }

    // --- Bytes ---

    #[inline(always)] pub fn a(&self) -> u8 { self.bytes[0] }
    #[inline(always)] pub fn b(&self) -> u8 { self.bytes[1] }
    #[inline(always)] pub fn c(&self) -> u8 { self.bytes[2] }
    #[inline(always)] pub fn d(&self) -> u8 { self.bytes[3] }
    #[inline(always)] pub fn e(&self) -> u8 { self.bytes[4] }
    #[inline(always)] pub fn f(&self) -> u8 { self.bytes[5] }

    // --- Nibbles ---

    #[inline(always)] pub fn ah(&self) -> u8 { self.bytes[0] >> 4 }
    #[inline(always)] pub fn al(&self) -> u8 { self.bytes[0] & 0xF }
    #[inline(always)] pub fn bh(&self) -> u8 { self.bytes[1] >> 4 }
    #[inline(always)] pub fn bl(&self) -> u8 { self.bytes[1] & 0xF }
    #[inline(always)] pub fn ch(&self) -> u8 { self.bytes[2] >> 4 }
    #[inline(always)] pub fn cl(&self) -> u8 { self.bytes[2] & 0xF }
    #[inline(always)] pub fn dh(&self) -> u8 { self.bytes[3] >> 4 }
    #[inline(always)] pub fn dl(&self) -> u8 { self.bytes[3] & 0xF }
    #[inline(always)] pub fn eh(&self) -> u8 { self.bytes[4] >> 4 }
    #[inline(always)] pub fn el(&self) -> u8 { self.bytes[4] & 0xF }
    #[inline(always)] pub fn fh(&self) -> u8 { self.bytes[5] >> 4 }
    #[inline(always)] pub fn fl(&self) -> u8 { self.bytes[5] & 0xF }

    // --- Big-endian pairs ---

    #[inline(always)]
    fn pair(&self, i: usize) -> u32 {
        ((self.bytes[i] as u32) << 8) | self.bytes[i + 1] as u32
    }

    #[inline(always)] pub fn ab(&self) -> u32 { self.pair(0) }
    #[inline(always)] pub fn cd(&self) -> u32 { self.pair(2) }
    #[inline(always)] pub fn ef(&self) -> u32 { self.pair(4) }
    #[inline(always)] pub fn gh(&self) -> u32 { self.pair(6) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields() {
        let op = Opcodes::from_slice(&[0x7A, 0x01, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(op.a(), 0x7A);
        assert_eq!((op.ah(), op.al()), (0x7, 0xA));
        assert_eq!((op.bh(), op.bl()), (0x0, 0x1));
        assert_eq!((op.dh(), op.dl()), (0x3, 0x4));
        assert_eq!(op.cd(), 0x1234);
        assert_eq!(op.ef(), 0x5678);
        assert_eq!(op.gh(), 0x9ABC);
    }

    #[test]
    fn test_fetch_wraps() {
        let mut mem = Memory::new();
        mem.write_byte(0xFFFF, 0x54);
        mem.write_byte(0x0000, 0x70);
        let op = Opcodes::fetch(&mem, 0xFFFF);
        assert_eq!(op.a(), 0x54);
        assert_eq!(op.b(), 0x70);
    }

    #[test]
    fn test_short_slice_is_zero_filled() {
        let op = Opcodes::from_slice(&[0xF8, 0x42]);
        assert_eq!(op.ab(), 0xF842);
        assert_eq!(op.gh(), 0);
    }
}
