//! Error types for the emulation core.
//!
//! Only conditions that must stop emulation are errors. Protocol surprises on
//! the serial bus (unknown EEPROM commands and the like) are logged instead.

use thiserror::Error;

/// Fatal emulation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No table entry or pattern matched the fetched instruction bytes.
    #[error(
        "instruction at 0x{pc:04X} with 0x{first:X} 0x{second:X} does not exist in table {table} \
         (after {instruction_count} instructions)"
    )]
    Decode {
        table: &'static str,
        pc: u32,
        first: u32,
        second: u8,
        instruction_count: u64,
    },

    /// A timer was started with a prescaler encoding that has no divisor.
    #[error("unsupported clock select 0b{value:03b} for timer {timer}")]
    UnsupportedClockSelect { timer: &'static str, value: u8 },

    /// In-session snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_names_keys() {
        let err = Error::Decode {
            table: "aH_aL",
            pc: 0x1234,
            first: 0x5,
            second: 0x7,
            instruction_count: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x1234"));
        assert!(msg.contains("0x5 0x7"));
        assert!(msg.contains("aH_aL"));
        assert!(msg.contains("42 instructions"));
    }

    #[test]
    fn test_clock_select_message() {
        let err = Error::UnsupportedClockSelect { timer: "B1", value: 0b010 };
        assert_eq!(err.to_string(), "unsupported clock select 0b010 for timer B1");
    }
}
