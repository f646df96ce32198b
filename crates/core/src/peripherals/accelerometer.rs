//! Three-axis accelerometer on the SSU, selected by port 9 bit 0 (active low).
//!
//! A transfer starts with a register address byte followed by sequential
//! data bytes. Unlike the EEPROM there is no byte framing: every SSU clock
//! with the chip selected moves one byte. In full-duplex mode only the low
//! nibble of the address byte is kept, since its high bits carry the
//! read and auto-increment flags.

use serde::{Deserialize, Serialize};

use super::ssu::{SerialBus, SSU_RECEIVE_FULL, SSU_TRANSMIT_EMPTY, SSU_TRANSMIT_END};

pub const ACCELEROMETER_SIZE: usize = 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccelerometerState {
    Address,
    Data,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accelerometer {
    pub data: Vec<u8>,
    pub state: AccelerometerState,
    pub address: u8,
    offset: usize,
}

impl Accelerometer {
    pub fn new() -> Self {
        Accelerometer {
            data: vec![0; ACCELEROMETER_SIZE],
            state: AccelerometerState::Address,
            address: 0,
            offset: 0,
        }
    }

    /// Chip select released.
    pub fn deselect(&mut self) {
        self.state = AccelerometerState::Address;
        self.offset = 0;
    }

    /// Register value as seen by the firmware; out-of-range reads return 0.
    #[inline(always)]
    fn register(&self, index: usize) -> u8 {
        self.data.get(index).copied().unwrap_or(0)
    }

    pub fn transmit_and_receive(&mut self, bus: &mut SerialBus) {
        match self.state {
            AccelerometerState::Address => {
                self.address = bus.transmitted() & 0x0F;
                self.offset = 0;
                self.state = AccelerometerState::Data;
                bus.set_status(SSU_RECEIVE_FULL);
            }
            AccelerometerState::Data => {
                let value = self.register(self.address as usize + self.offset);
                bus.set_received(value);
                self.offset += 1;
                bus.set_status(SSU_RECEIVE_FULL | SSU_TRANSMIT_EMPTY | SSU_TRANSMIT_END);
            }
        }
    }

    pub fn transmit(&mut self, bus: &mut SerialBus) {
        match self.state {
            AccelerometerState::Address => {
                self.address = bus.transmitted();
                self.state = AccelerometerState::Data;
            }
            AccelerometerState::Data => {
                let value = bus.transmitted();
                if let Some(slot) = self.data.get_mut(self.address as usize) {
                    *slot = value;
                }
                bus.set_status(SSU_TRANSMIT_EMPTY | SSU_TRANSMIT_END);
            }
        }
    }
}

impl Default for Accelerometer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use crate::peripherals::ssu::{SSU_RECEIVE_ADDR, SSU_STATUS_ADDR, SSU_TRANSMIT_ADDR};

    fn clock(accel: &mut Accelerometer, mem: &mut Memory, byte: u8, read: bool) -> u8 {
        mem.write_byte(SSU_TRANSMIT_ADDR, byte);
        let mut progress = 0;
        let mut bus = SerialBus { mem: &mut *mem, progress: &mut progress };
        if read {
            accel.transmit_and_receive(&mut bus);
        } else {
            accel.transmit(&mut bus);
        }
        mem.read_byte(SSU_RECEIVE_ADDR)
    }

    #[test]
    fn test_sequential_read_masks_address() {
        let mut accel = Accelerometer::new();
        accel.data[2..5].copy_from_slice(&[0x11, 0x22, 0x33]);
        let mut mem = Memory::new();

        clock(&mut accel, &mut mem, 0x82, true);
        assert_eq!(accel.address, 0x02);
        assert_eq!(accel.state, AccelerometerState::Data);
        assert_ne!(mem.read_byte(SSU_STATUS_ADDR) & SSU_RECEIVE_FULL, 0);

        let read: Vec<u8> = (0..3).map(|_| clock(&mut accel, &mut mem, 0, true)).collect();
        assert_eq!(read, vec![0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_write_keeps_full_address() {
        let mut accel = Accelerometer::new();
        let mut mem = Memory::new();
        clock(&mut accel, &mut mem, 0x21, false);
        clock(&mut accel, &mut mem, 0x5A, false);
        assert_eq!(accel.data[0x21], 0x5A);
        assert_ne!(mem.read_byte(SSU_STATUS_ADDR) & SSU_TRANSMIT_END, 0);
    }

    #[test]
    fn test_overrun_is_harmless() {
        let mut accel = Accelerometer::new();
        let mut mem = Memory::new();
        clock(&mut accel, &mut mem, 0xFF, false);
        clock(&mut accel, &mut mem, 0x01, false);
        accel.deselect();
        clock(&mut accel, &mut mem, 0x0F, true);
        for _ in 0..ACCELEROMETER_SIZE + 4 {
            clock(&mut accel, &mut mem, 0, true);
        }
        assert_eq!(mem.read_byte(SSU_RECEIVE_ADDR), 0);
    }

    #[test]
    fn test_deselect_returns_to_address() {
        let mut accel = Accelerometer::new();
        let mut mem = Memory::new();
        clock(&mut accel, &mut mem, 0x03, false);
        accel.deselect();
        assert_eq!(accel.state, AccelerometerState::Address);
    }
}
