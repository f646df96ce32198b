//! H8/300H general register file.
//!
//! Eight 32-bit registers ER0–ER7 share a single 32-byte backing store. Every
//! narrower view is computed from a 4-bit selector at access time:
//!
//! | Width  | Selector bit 3 = 0   | Selector bit 3 = 1   |
//! |--------|----------------------|----------------------|
//! | 8-bit  | RnH (byte `4n + 1`)  | RnL (byte `4n`)      |
//! | 16-bit | Rn  (bytes `4n..+2`) | En  (bytes `4n+2..`) |
//! | 32-bit | ERn (bytes `4n..+4`) | ERn (bit 3 ignored)  |
//!
//! Slot `n` is `selector & 7` and each 32-bit slot is stored little-endian,
//! so Rn is the low half of ERn and RnL its lowest byte. Writing R3L
//! therefore changes bits 0..7 of ER3.
//!
//! ER7 doubles as the stack pointer. The stack itself lives in [`Memory`].

use serde::{Deserialize, Serialize};

use crate::memory::Memory;

/// Index of the stack pointer register (ER7).
pub const SP: u8 = 7;

#[derive(Clone, Serialize, Deserialize)]
pub struct Registers {
    bytes: [u8; 32],
    /// Program counter. Grows freely; masked to 16 bits on every fetch.
    pub pc: u32,
}

#[inline(always)]
fn slot(selector: u8) -> usize {
    (selector & 0b111) as usize * 4
}

impl Registers {
    pub fn new() -> Self {
        Registers { bytes: [0; 32], pc: 0 }
    }

    #[inline(always)]
    fn byte_offset(selector: u8) -> usize {
        if selector & 0b1000 != 0 { slot(selector) } else { slot(selector) + 1 }
    }

    #[inline(always)]
    fn half_offset(selector: u8) -> usize {
        if selector & 0b1000 != 0 { slot(selector) + 2 } else { slot(selector) }
    }

    #[inline(always)]
    pub fn get8(&self, selector: u8) -> u8 {
        self.bytes[Self::byte_offset(selector)]
    }

    #[inline(always)]
    pub fn set8(&mut self, selector: u8, value: u32) {
        self.bytes[Self::byte_offset(selector)] = value as u8;
    }

    #[inline(always)]
    pub fn get16(&self, selector: u8) -> u16 {
        let i = Self::half_offset(selector);
        u16::from_le_bytes([self.bytes[i], self.bytes[i + 1]])
    }

    #[inline(always)]
    pub fn set16(&mut self, selector: u8, value: u32) {
        let i = Self::half_offset(selector);
        self.bytes[i..i + 2].copy_from_slice(&(value as u16).to_le_bytes());
    }

    #[inline(always)]
    pub fn get32(&self, selector: u8) -> u32 {
        let i = slot(selector);
        u32::from_le_bytes([self.bytes[i], self.bytes[i + 1], self.bytes[i + 2], self.bytes[i + 3]])
    }

    #[inline(always)]
    pub fn set32(&mut self, selector: u8, value: u32) {
        let i = slot(selector);
        self.bytes[i..i + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[inline(always)]
    pub fn sp(&self) -> u32 {
        self.get32(SP)
    }

    #[inline(always)]
    pub fn set_sp(&mut self, value: u32) {
        self.set32(SP, value);
    }

    /// Push a big-endian short, pre-decrementing SP by 2 within 16 bits.
    pub fn push(&mut self, mem: &mut Memory, value: u32) {
        let sp = self.sp().wrapping_sub(2) & 0xFFFF;
        self.set_sp(sp);
        mem.write_short(sp, value as u16);
    }

    /// Pop a big-endian short, post-incrementing SP by 2 within 16 bits.
    pub fn pop(&mut self, mem: &Memory) -> u32 {
        let sp = self.sp();
        let value = mem.read_short(sp) as u32;
        self.set_sp(sp.wrapping_add(2) & 0xFFFF);
        value
    }

    // --- Display names ---

    pub fn name8(selector: u8) -> String {
        let half = if selector & 0b1000 != 0 { 'L' } else { 'H' };
        format!("R{}{}", selector & 0b111, half)
    }

    pub fn name16(selector: u8) -> String {
        let prefix = if selector & 0b1000 != 0 { 'E' } else { 'R' };
        format!("{}{}", prefix, selector & 0b111)
    }

    pub fn name32(selector: u8) -> String {
        format!("ER{}", selector & 0b111)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
