//! Table-driven instruction decoder.
//!
//! The H8/300H encodes its opcode across varying nibbles, so decoding walks a
//! small chain of tables. Each table derives two keys from the fetched
//! [`Opcodes`] and maps them to either an executable [`Instruction`] or the
//! next table to consult:
//!
//! | Table       | First key            | Second key | Reached from               |
//! |-------------|----------------------|------------|----------------------------|
//! | `aH_aL`     | `ah`                 | `al`       | every fetch                |
//! | `a_bH`      | `a`                  | `bh`       | `01 0A 0B 0F 1x 58 79 7A`  |
//! | `abcH_cL`   | `a << 12 | b << 4 | ch` | `cl`   | `01C0 01D0 01F0 7C-7F`     |
//!
//! Exact `(first, second)` entries are tried before patterns. Patterns carry a
//! predicate on the first key and cover the bit-manipulation group, whose
//! first byte is 7C–7F with a register or address in the second byte.
//!
//! Execution functions leave PC at the start of the instruction; the caller
//! adds `bytes` afterwards. Instructions that set PC themselves (jumps,
//! returns, variable-length moves) declare `bytes: 0`.

mod ops;
mod primary;
mod secondary;
mod tertiary;

pub use ops::{bit_value, condition, daa_value, das_value, shift_value, BitOp, Shift, CONDITION_NAMES};

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::opcodes::Opcodes;
use crate::Board;

/// Semantic action of an instruction.
pub type Execute = fn(&mut Board, &Opcodes);

#[derive(Clone, Copy)]
pub struct Instruction {
    pub name: &'static str,
    /// PC advance after execution, or 0 when the instruction sets PC itself.
    pub bytes: u32,
    pub cycles: u32,
    pub execute: Execute,
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instruction")
            .field("name", &self.name)
            .field("bytes", &self.bytes)
            .field("cycles", &self.cycles)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableId {
    Primary,
    Secondary,
    Tertiary,
}

#[derive(Debug, Clone, Copy)]
pub enum Entry {
    Instruction(Instruction),
    Table(TableId),
}

/// Shorthand for a leaf entry.
pub(crate) fn op(name: &'static str, bytes: u32, cycles: u32, execute: Execute) -> Entry {
    Entry::Instruction(Instruction { name, bytes, cycles, execute })
}

/// All 16 nibble values, for entries that ignore a key.
pub(crate) const NIBBLES: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

struct Pattern {
    first: fn(u32) -> bool,
    seconds: Vec<u8>,
    entry: Entry,
}

pub struct InstructionTable {
    pub name: &'static str,
    first: fn(&Opcodes) -> u32,
    second: fn(&Opcodes) -> u8,
    entries: HashMap<u32, HashMap<u8, Entry>>,
    patterns: Vec<Pattern>,
}

impl InstructionTable {
    pub fn new(name: &'static str, first: fn(&Opcodes) -> u32, second: fn(&Opcodes) -> u8) -> Self {
        InstructionTable {
            name,
            first,
            second,
            entries: HashMap::new(),
            patterns: Vec::new(),
        }
    }

    /// Register `entry` under every combination of `firsts` and `seconds`.
    pub fn register(&mut self, firsts: &[u32], seconds: &[u8], entry: Entry) {
        for &first in firsts {
            let row = self.entries.entry(first).or_default();
            for &second in seconds {
                let previous = row.insert(second, entry);
                debug_assert!(
                    previous.is_none(),
                    "duplicate {} entry 0x{:X} 0x{:X}",
                    self.name,
                    first,
                    second
                );
            }
        }
    }

    /// Register `entry` for any first key accepted by `first`.
    pub fn register_pattern(&mut self, first: fn(u32) -> bool, seconds: &[u8], entry: Entry) {
        self.patterns.push(Pattern { first, seconds: seconds.to_vec(), entry });
    }

    pub fn keys(&self, op: &Opcodes) -> (u32, u8) {
        ((self.first)(op), (self.second)(op))
    }

    pub fn lookup(&self, first: u32, second: u8) -> Option<Entry> {
        if let Some(entry) = self.entries.get(&first).and_then(|row| row.get(&second)) {
            return Some(*entry);
        }
        self.patterns
            .iter()
            .find(|p| (p.first)(first) && p.seconds.contains(&second))
            .map(|p| p.entry)
    }

    /// Number of exact entries, patterns excluded.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.patterns.is_empty()
    }
}

/// Keys of the table where a lookup fell through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Miss {
    pub table: &'static str,
    pub first: u32,
    pub second: u8,
}

pub struct Decoder {
    primary: InstructionTable,
    secondary: InstructionTable,
    tertiary: InstructionTable,
}

impl Decoder {
    fn build() -> Self {
        Decoder {
            primary: primary::table(),
            secondary: secondary::table(),
            tertiary: tertiary::table(),
        }
    }

    pub fn table(&self, id: TableId) -> &InstructionTable {
        match id {
            TableId::Primary => &self.primary,
            TableId::Secondary => &self.secondary,
            TableId::Tertiary => &self.tertiary,
        }
    }

    /// Walk the table chain for `op`.
    pub fn resolve(&self, op: &Opcodes) -> Result<Instruction, Miss> {
        let mut table = &self.primary;
        loop {
            let (first, second) = table.keys(op);
            match table.lookup(first, second) {
                Some(Entry::Instruction(instruction)) => return Ok(instruction),
                Some(Entry::Table(id)) => table = self.table(id),
                None => return Err(Miss { table: table.name, first, second }),
            }
        }
    }
}

/// Process-wide decoder, built on first use.
pub fn decoder() -> &'static Decoder {
    static DECODER: OnceLock<Decoder> = OnceLock::new();
    DECODER.get_or_init(Decoder::build)
}

#[inline]
pub fn resolve(op: &Opcodes) -> Result<Instruction, Miss> {
    decoder().resolve(op)
}
