//! Instruction listing for the step debugger.
//!
//! The decode tables carry a mnemonic per entry, so listing an address is a
//! table lookup without execution. Operands are shown as raw bytes.

use crate::flags::Flags;
use crate::instructions;
use crate::memory::Memory;
use crate::opcodes::Opcodes;

/// Bytes shown for entries that manage PC themselves.
const MIN_BYTES: u32 = 2;

/// Listing line for the instruction at `pc` and the number of bytes it covers.
fn line(mem: &Memory, pc: u32) -> (String, u32) {
    let pc = pc & 0xFFFF;
    let op = Opcodes::fetch(mem, pc);
    let (name, bytes) = match instructions::resolve(&op) {
        Ok(instruction) => (instruction.name, instruction.bytes.max(MIN_BYTES)),
        Err(_) => (".word", MIN_BYTES),
    };
    let raw: Vec<String> = op.bytes()[..bytes as usize].iter().map(|b| format!("{:02X}", b)).collect();
    (format!("{:04X}: {} [{}]", pc, name, raw.join(" ")), bytes)
}

/// Format the instruction at `pc` as `"PPPP: NAME [bytes]"`.
pub fn disassemble(mem: &Memory, pc: u32) -> String {
    line(mem, pc).0
}

/// List `count` consecutive instructions starting at `start`.
pub fn disassemble_range(mem: &Memory, start: u32, count: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(count);
    let mut pc = start & 0xFFFF;
    for _ in 0..count {
        let (text, bytes) = line(mem, pc);
        lines.push(text);
        pc = (pc + bytes) & 0xFFFF;
    }
    lines
}

/// CCR as "IUHUNZVC", upper case for set bits.
pub fn format_ccr(flags: &Flags) -> String {
    let ccr = flags.ccr();
    "IUHUNZVC"
        .chars()
        .enumerate()
        .map(|(i, f)| if ccr & (0x80 >> i) != 0 { f } else { f.to_ascii_lowercase() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_with(pc: u32, bytes: &[u8]) -> Memory {
        let mut mem = Memory::new();
        for (i, b) in bytes.iter().enumerate() {
            mem.write_byte(pc + i as u32, *b);
        }
        mem
    }

    #[test]
    fn test_disasm_basic() {
        let mem = mem_with(0x0100, &[0xF8, 0x42]);
        assert_eq!(disassemble(&mem, 0x0100), "0100: MOV.B [F8 42]");
    }

    #[test]
    fn test_disasm_unknown_word() {
        let mem = mem_with(0x0200, &[0x57, 0x80]);
        assert_eq!(disassemble(&mem, 0x0200), "0200: .word [57 80]");
    }

    #[test]
    fn test_disasm_range_advances_by_length() {
        // NOP; MOV.B #0x11, R0L; BRA -2
        let mem = mem_with(0x0100, &[0x00, 0x00, 0xF8, 0x11, 0x40, 0xFE]);
        let lines = disassemble_range(&mem, 0x0100, 3);
        assert_eq!(lines[0], "0100: NOP [00 00]");
        assert_eq!(lines[1], "0102: MOV.B [F8 11]");
        assert_eq!(lines[2], "0104: BRA [40 FE]");
    }

    #[test]
    fn test_format_ccr() {
        let mut flags = Flags::new();
        flags.set_ccr(0x00);
        assert_eq!(format_ccr(&flags), "iuhunzvc");
        flags.set_ccr(0x85);
        assert_eq!(format_ccr(&flags), "IuhunZvC");
        flags.set_ccr(0xFF);
        assert_eq!(format_ccr(&flags), "IUHUNZVC");
    }
}
