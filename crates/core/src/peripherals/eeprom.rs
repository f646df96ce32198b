//! 64 KB serial EEPROM on the SSU, selected by port 1 bit 2 (active low).
//!
//! Supported commands:
//! - 0x06: Write Enable → sets the write-unlock status bit
//! - 0x04: Write Disable → clears it
//! - 0x05: Read Status Register
//! - 0x01: Write Status Register (next byte)
//! - 0x03: Read Data (addr16, then continuous read)
//! - 0x02: Page Write (addr16 + data, offset wraps within a 128-byte page)
//!
//! Holds the walker's persistent save data, so it is the only state the
//! host writes back to disk.

use log::warn;
use serde::{Deserialize, Serialize};

use super::ssu::{SerialBus, SSU_RECEIVE_FULL, SSU_TRANSMIT_EMPTY, SSU_TRANSMIT_END};

pub const EEPROM_SIZE: usize = 0x10000;
pub const PAGE_SIZE: u32 = 128;

pub const WRITE_STATUS: u8 = 0b0000_0001;
pub const WRITE_MEMORY: u8 = 0b0000_0010;
pub const READ_MEMORY: u8 = 0b0000_0011;
pub const WRITE_DISABLE: u8 = 0b0000_0100;
pub const READ_STATUS: u8 = 0b0000_0101;
pub const WRITE_ENABLE: u8 = 0b0000_0110;

/// Status register: writes allowed.
pub const STATUS_WRITE_UNLOCK: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EepromState {
    Waiting,
    Status,
    WriteStatus,
    AddressHigh,
    AddressLow,
    Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eeprom {
    pub data: Vec<u8>,
    pub state: EepromState,
    pub status: u8,
    high_address: u8,
    low_address: u8,
    offset: u32,
    /// Set on every data write; cleared by the host after saving.
    pub dirty: bool,
}

impl Eeprom {
    /// Erased chip: every byte 0xFF.
    pub fn new() -> Self {
        Eeprom {
            data: vec![0xFF; EEPROM_SIZE],
            state: EepromState::Waiting,
            status: 0,
            high_address: 0,
            low_address: 0,
            offset: 0,
            dirty: false,
        }
    }

    /// Load a saved image. Short images are zero-padded, long ones truncated.
    pub fn from_image(image: &[u8]) -> Self {
        let mut eeprom = Eeprom::new();
        eeprom.load(image);
        eeprom
    }

    pub fn load(&mut self, image: &[u8]) {
        let len = image.len().min(EEPROM_SIZE);
        self.data.fill(0);
        self.data[..len].copy_from_slice(&image[..len]);
        self.dirty = false;
    }

    /// Chip select released: abort the current command.
    pub fn deselect(&mut self) {
        self.state = EepromState::Waiting;
        self.offset = 0;
    }

    #[inline(always)]
    fn address(&self) -> usize {
        let base = ((self.high_address as u32) << 8) | self.low_address as u32;
        (base.wrapping_add(self.offset) & 0xFFFF) as usize
    }

    /// Full-duplex byte: used for reads.
    pub fn transmit_and_receive(&mut self, bus: &mut SerialBus) {
        if !bus.byte_complete() {
            return;
        }
        let byte = bus.transmitted();
        match self.state {
            EepromState::Waiting => match byte {
                READ_MEMORY => self.state = EepromState::AddressHigh,
                READ_STATUS => self.state = EepromState::Status,
                _ => warn!("EEPROM: unexpected command 0x{:02X} while reading", byte),
            },
            EepromState::Status => {
                bus.set_received(self.status);
                bus.set_status(SSU_TRANSMIT_END);
            }
            EepromState::AddressHigh => {
                self.high_address = byte;
                self.state = EepromState::AddressLow;
            }
            EepromState::AddressLow => {
                self.low_address = byte;
                self.state = EepromState::Bytes;
            }
            EepromState::Bytes => {
                bus.set_received(self.data[self.address()]);
                self.offset += 1;
                bus.set_status(SSU_TRANSMIT_END);
            }
            EepromState::WriteStatus => {
                warn!("EEPROM: status write interrupted by a read");
                self.state = EepromState::Waiting;
            }
        }
        bus.set_status(SSU_RECEIVE_FULL | SSU_TRANSMIT_EMPTY);
    }

    /// Transmit-only byte: commands and writes.
    pub fn transmit(&mut self, bus: &mut SerialBus) {
        if !bus.byte_complete() {
            return;
        }
        let byte = bus.transmitted();
        match self.state {
            EepromState::Waiting => match byte {
                WRITE_ENABLE => {
                    self.status |= STATUS_WRITE_UNLOCK;
                    bus.set_status(SSU_TRANSMIT_END);
                }
                WRITE_DISABLE => {
                    self.status &= !STATUS_WRITE_UNLOCK;
                    bus.set_status(SSU_TRANSMIT_END);
                }
                WRITE_MEMORY => self.state = EepromState::AddressHigh,
                WRITE_STATUS => self.state = EepromState::WriteStatus,
                _ => warn!("EEPROM: unexpected command 0x{:02X} while writing", byte),
            },
            EepromState::WriteStatus => {
                // Only the block-protect and higher bits are writable.
                self.status = (self.status & 0x03) | (byte & !0x03);
                self.state = EepromState::Waiting;
                bus.set_status(SSU_TRANSMIT_END);
            }
            EepromState::AddressHigh => {
                self.high_address = byte;
                self.state = EepromState::AddressLow;
            }
            EepromState::AddressLow => {
                self.low_address = byte;
                self.state = EepromState::Bytes;
            }
            EepromState::Bytes => {
                let addr = self.address();
                self.data[addr] = byte;
                self.offset = (self.offset + 1) % PAGE_SIZE;
                self.dirty = true;
                bus.set_status(SSU_TRANSMIT_END);
            }
            EepromState::Status => {
                bus.set_status(SSU_TRANSMIT_END);
            }
        }
        bus.set_status(SSU_TRANSMIT_EMPTY);
    }
}

impl Default for Eeprom {
    fn default() -> Self {
        Self::new()
    }
}
