//! Synchronous serial unit.
//!
//! The SSU is shared by three devices, each selected by a port pin:
//!
//! | Device        | Select pin     | Active |
//! |---------------|----------------|--------|
//! | EEPROM        | port 1, bit 2  | low    |
//! | LCD (command) | port 1, bit 0  | low    |
//! | LCD (data)    | port 1, bit 1  | high   |
//! | Accelerometer | port 9, bit 0  | low    |
//!
//! The EEPROM and LCD count SSU clocks in [`SerialBus::progress`] and
//! complete a byte on every seventh one. The accelerometer treats every
//! clock as a byte boundary.

use log::warn;
use serde::{Deserialize, Serialize};

use super::{Accelerometer, Eeprom};
use crate::lcd::Lcd;
use crate::memory::{Hook, Memory};

pub const SSU_MODE_ADDR: u32 = 0xF0E2;
pub const SSU_ENABLE_ADDR: u32 = 0xF0E3;
pub const SSU_STATUS_ADDR: u32 = 0xF0E4;
pub const SSU_RECEIVE_ADDR: u32 = 0xF0E9;
pub const SSU_TRANSMIT_ADDR: u32 = 0xF0EB;

pub const PORT_1_ADDR: u32 = 0xFFD4;
pub const PORT_3_ADDR: u32 = 0xFFD6;
pub const PORT_8_ADDR: u32 = 0xFFDB;
pub const PORT_9_ADDR: u32 = 0xFFDC;
pub const PORT_B_ADDR: u32 = 0xFFDE;

pub const SSU_TRANSMIT_ENABLE: u8 = 1 << 7;
pub const SSU_RECEIVE_ENABLE: u8 = 1 << 6;

pub const SSU_TRANSMIT_END: u8 = 1 << 3;
pub const SSU_TRANSMIT_EMPTY: u8 = 1 << 2;
pub const SSU_RECEIVE_FULL: u8 = 1 << 1;

pub const PORT_1_EEPROM: u8 = 1 << 2;
pub const PORT_1_LCD_DATA: u8 = 1 << 1;
pub const PORT_1_LCD: u8 = 1 << 0;
pub const PORT_9_ACCELEROMETER: u8 = 1 << 0;

/// CPU cycles per SSU clock, indexed by the low three mode bits.
pub const CLOCK_RATES: [u64; 8] = [256, 128, 64, 32, 16, 8, 4, 2];

/// SSU clocks per framed byte.
pub const BYTE_CLOCKS: u8 = 7;

/// View of the SSU registers handed to a device for one SSU clock.
pub struct SerialBus<'a> {
    pub mem: &'a mut Memory,
    pub progress: &'a mut u8,
}

impl SerialBus<'_> {
    /// Count one clock edge. True once a whole byte has moved.
    #[inline]
    pub fn byte_complete(&mut self) -> bool {
        *self.progress += 1;
        if *self.progress == BYTE_CLOCKS {
            *self.progress = 0;
            true
        } else {
            false
        }
    }

    #[inline(always)]
    pub fn transmitted(&self) -> u8 {
        self.mem.read_byte(SSU_TRANSMIT_ADDR)
    }

    #[inline(always)]
    pub fn set_received(&mut self, value: u8) {
        self.mem.write_byte(SSU_RECEIVE_ADDR, value);
    }

    #[inline]
    pub fn set_status(&mut self, bits: u8) {
        let status = self.mem.read_byte(SSU_STATUS_ADDR) | bits;
        self.mem.write_byte(SSU_STATUS_ADDR, status);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ssu {
    /// CPU cycles per SSU clock.
    pub clock_rate: u64,
    pub progress: u8,
}

impl Ssu {
    pub fn new() -> Self {
        Ssu { clock_rate: 4, progress: 0 }
    }

    pub fn install(&mut self, mem: &mut Memory) {
        mem.on_read(SSU_RECEIVE_ADDR, Hook::SsuReceiveRead);
        mem.on_write(SSU_TRANSMIT_ADDR, Hook::SsuTransmitWrite);
        mem.on_write(SSU_MODE_ADDR, Hook::SsuModeWrite);
        mem.on_write(PORT_1_ADDR, Hook::Port1Write);
        mem.on_write(PORT_9_ADDR, Hook::Port9Write);
    }

    /// Mode register write hook.
    pub fn set_mode(&mut self, value: u8) {
        self.clock_rate = CLOCK_RATES[(value & 0b111) as usize];
    }

    /// Receive register read hook.
    pub fn receive_read(mem: &mut Memory) {
        let status = mem.read_byte(SSU_STATUS_ADDR) & !SSU_RECEIVE_FULL;
        mem.write_byte(SSU_STATUS_ADDR, status);
    }

    /// Transmit register write hook.
    pub fn transmit_write(mem: &mut Memory) {
        let status = mem.read_byte(SSU_STATUS_ADDR) & !(SSU_TRANSMIT_EMPTY | SSU_TRANSMIT_END);
        mem.write_byte(SSU_STATUS_ADDR, status);
    }

    /// One SSU clock: route the pending transfer to the selected device.
    pub fn tick(
        &mut self,
        mem: &mut Memory,
        eeprom: &mut Eeprom,
        accelerometer: &mut Accelerometer,
        lcd: &mut Lcd,
    ) {
        let enable = mem.read_byte(SSU_ENABLE_ADDR);
        let status = mem.read_byte(SSU_STATUS_ADDR);
        let port1 = mem.read_byte(PORT_1_ADDR);
        let port9 = mem.read_byte(PORT_9_ADDR);
        let transmit = enable & SSU_TRANSMIT_ENABLE != 0;
        let receive = enable & SSU_RECEIVE_ENABLE != 0;
        let pending = status & SSU_TRANSMIT_EMPTY == 0;

        if !transmit {
            mem.write_byte(SSU_STATUS_ADDR, status | SSU_TRANSMIT_EMPTY);
        }

        let mut bus = SerialBus { mem, progress: &mut self.progress };
        if transmit && receive && pending {
            if port9 & PORT_9_ACCELEROMETER == 0 {
                accelerometer.transmit_and_receive(&mut bus);
            }
            if port1 & PORT_1_EEPROM == 0 {
                eeprom.transmit_and_receive(&mut bus);
            }
        } else if transmit && pending {
            if port9 & PORT_9_ACCELEROMETER == 0 {
                accelerometer.transmit(&mut bus);
            }
            if port1 & PORT_1_EEPROM == 0 {
                eeprom.transmit(&mut bus);
            }
            if port1 & PORT_1_LCD_DATA != 0 {
                lcd.transmit_data(&mut bus);
            } else if port1 & PORT_1_LCD == 0 {
                lcd.transmit_command(&mut bus);
            }
        } else if receive && !transmit {
            warn!("SSU receive-only mode is not supported");
        }
    }
}

impl Default for Ssu {
    fn default() -> Self {
        Self::new()
    }
}
