//! SCI3 asynchronous serial unit, wired to the infrared transceiver.
//!
//! Transmitted bytes are queued for the host transport both one by one and
//! grouped into packets. A packet ends once the line has been idle for the
//! configured number of CPU cycles. Bytes from the transport are fed into
//! the receive register one per SCI3 clock while receive is enabled and the
//! register is free.

use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::memory::{Hook, Memory};

pub const SCI3_CONTROL_ADDR: u32 = 0xFF9A;
pub const SCI3_TRANSMIT_ADDR: u32 = 0xFF9B;
pub const SCI3_STATUS_ADDR: u32 = 0xFF9C;
pub const SCI3_RECEIVE_ADDR: u32 = 0xFF9D;
pub const SCI3_IR_CONTROL_ADDR: u32 = 0xFFA7;

pub const SCI3_TRANSMIT_INTERRUPT_ENABLE: u8 = 1 << 7;
pub const SCI3_RECEIVE_INTERRUPT_ENABLE: u8 = 1 << 6;
pub const SCI3_TRANSMIT_ENABLE: u8 = 1 << 5;
pub const SCI3_RECEIVE_ENABLE: u8 = 1 << 4;

pub const SCI3_TRANSMIT_EMPTY: u8 = 1 << 7;
pub const SCI3_RECEIVE_FULL: u8 = 1 << 6;
pub const SCI3_OVERRUN_ERROR: u8 = 1 << 5;
pub const SCI3_FRAMING_ERROR: u8 = 1 << 4;
pub const SCI3_PARITY_ERROR: u8 = 1 << 3;
pub const SCI3_TRANSMIT_END: u8 = 1 << 2;

/// Default packet gap: 5 ms at 3.6864 MHz.
pub const DEFAULT_PACKET_IDLE_CYCLES: u64 = 18432;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sci3 {
    /// Bytes waiting to be shifted into the receive register.
    pub receive_queue: VecDeque<u8>,
    transmitted: Vec<u8>,
    packets: Vec<Vec<u8>>,
    current_packet: Vec<u8>,
    last_transmit_cycle: u64,
    pub packet_idle_cycles: u64,
}

impl Sci3 {
    pub fn new() -> Self {
        Sci3 {
            receive_queue: VecDeque::new(),
            transmitted: Vec::new(),
            packets: Vec::new(),
            current_packet: Vec::new(),
            last_transmit_cycle: 0,
            packet_idle_cycles: DEFAULT_PACKET_IDLE_CYCLES,
        }
    }

    pub fn install(&mut self, mem: &mut Memory) {
        mem.on_read(SCI3_RECEIVE_ADDR, Hook::Sci3ReceiveRead);
        mem.on_write(SCI3_TRANSMIT_ADDR, Hook::Sci3TransmitWrite);
    }

    pub fn reset(&mut self) {
        let idle = self.packet_idle_cycles;
        *self = Sci3::new();
        self.packet_idle_cycles = idle;
    }

    /// Receive register read hook.
    pub fn receive_read(mem: &mut Memory) {
        let status = mem.read_byte(SCI3_STATUS_ADDR) & !SCI3_RECEIVE_FULL;
        mem.write_byte(SCI3_STATUS_ADDR, status);
    }

    /// Transmit register write hook.
    pub fn transmit_write(mem: &mut Memory) {
        let status = mem.read_byte(SCI3_STATUS_ADDR) & !(SCI3_TRANSMIT_EMPTY | SCI3_TRANSMIT_END);
        mem.write_byte(SCI3_STATUS_ADDR, status);
    }

    /// Queue bytes from the transport.
    pub fn receive(&mut self, bytes: &[u8]) {
        self.receive_queue.extend(bytes.iter().copied());
    }

    /// Drain bytes transmitted since the last call.
    pub fn take_transmitted(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.transmitted)
    }

    /// Drain completed packets.
    pub fn take_packets(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.packets)
    }

    /// One SCI3 clock at CPU cycle `cycle`.
    pub fn tick(&mut self, mem: &mut Memory, cycle: u64) {
        let control = mem.read_byte(SCI3_CONTROL_ADDR);
        let mut status = mem.read_byte(SCI3_STATUS_ADDR);

        if control & SCI3_TRANSMIT_ENABLE == 0 {
            status |= SCI3_TRANSMIT_EMPTY;
        } else if status & SCI3_TRANSMIT_EMPTY == 0 {
            let byte = mem.read_byte(SCI3_TRANSMIT_ADDR);
            status |= SCI3_TRANSMIT_EMPTY | SCI3_TRANSMIT_END;
            self.transmitted.push(byte);
            self.current_packet.push(byte);
            self.last_transmit_cycle = cycle;
            debug!("IR transmit: {:02X}", byte);
        }

        if control & SCI3_RECEIVE_ENABLE != 0 && status & SCI3_RECEIVE_FULL == 0 {
            if let Some(byte) = self.receive_queue.pop_front() {
                mem.write_byte(SCI3_RECEIVE_ADDR, byte);
                status |= SCI3_RECEIVE_FULL;
                debug!("IR receive: {:02X}", byte);
            }
        }

        mem.write_byte(SCI3_STATUS_ADDR, status);

        if !self.current_packet.is_empty()
            && cycle.saturating_sub(self.last_transmit_cycle) >= self.packet_idle_cycles
        {
            self.packets.push(std::mem::take(&mut self.current_packet));
        }
    }
}

impl Default for Sci3 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(control: u8) -> Memory {
        let mut mem = Memory::new();
        mem.write_byte(SCI3_CONTROL_ADDR, control);
        mem
    }

    fn firmware_send(mem: &mut Memory, byte: u8) {
        mem.write_byte(SCI3_TRANSMIT_ADDR, byte);
        Sci3::transmit_write(mem);
    }

    #[test]
    fn test_disabled_transmitter_reports_empty() {
        let mut mem = Memory::new();
        let mut sci3 = Sci3::new();
        sci3.tick(&mut mem, 0);
        assert_eq!(mem.read_byte(SCI3_STATUS_ADDR), SCI3_TRANSMIT_EMPTY);
    }

    #[test]
    fn test_transmit_forwards_byte_once() {
        let mut mem = enabled(SCI3_TRANSMIT_ENABLE);
        let mut sci3 = Sci3::new();
        firmware_send(&mut mem, 0xAA);
        sci3.tick(&mut mem, 56);
        sci3.tick(&mut mem, 112);
        assert_eq!(sci3.take_transmitted(), vec![0xAA]);
        assert!(sci3.take_transmitted().is_empty());
        let status = mem.read_byte(SCI3_STATUS_ADDR);
        assert_eq!(status & (SCI3_TRANSMIT_EMPTY | SCI3_TRANSMIT_END), SCI3_TRANSMIT_EMPTY | SCI3_TRANSMIT_END);
    }

    #[test]
    fn test_receive_one_byte_per_clock() {
        let mut mem = enabled(SCI3_RECEIVE_ENABLE);
        let mut sci3 = Sci3::new();
        sci3.receive(&[0x01, 0x02]);
        sci3.tick(&mut mem, 0);
        assert_eq!(mem.read_byte(SCI3_RECEIVE_ADDR), 0x01);
        // Still full: the second byte waits.
        sci3.tick(&mut mem, 56);
        assert_eq!(mem.read_byte(SCI3_RECEIVE_ADDR), 0x01);
        Sci3::receive_read(&mut mem);
        sci3.tick(&mut mem, 112);
        assert_eq!(mem.read_byte(SCI3_RECEIVE_ADDR), 0x02);
        assert!(sci3.receive_queue.is_empty());
    }

    #[test]
    fn test_receive_disabled_keeps_queue() {
        let mut mem = Memory::new();
        let mut sci3 = Sci3::new();
        sci3.receive(&[0x55]);
        sci3.tick(&mut mem, 0);
        assert_eq!(sci3.receive_queue.len(), 1);
    }

    #[test]
    fn test_packet_closes_after_idle_gap() {
        let mut mem = enabled(SCI3_TRANSMIT_ENABLE);
        let mut sci3 = Sci3::new();
        sci3.packet_idle_cycles = 1000;
        for (i, byte) in [0x10u8, 0x20, 0x30].iter().enumerate() {
            firmware_send(&mut mem, *byte);
            sci3.tick(&mut mem, i as u64 * 56);
        }
        sci3.tick(&mut mem, 500);
        assert!(sci3.take_packets().is_empty());
        sci3.tick(&mut mem, 112 + 1000);
        assert_eq!(sci3.take_packets(), vec![vec![0x10, 0x20, 0x30]]);
    }
}
