//! 96×64 four-level greyscale LCD controller.
//!
//! The controller sits on the SSU. Command bytes arrive with port 1 bit 0 low
//! and bit 1 low; data bytes arrive with bit 1 high. Display RAM is organised
//! in pages of 8 pixel rows. Every column of a page takes two bytes: the
//! high and low bit planes of the 2-bit grey level, one bit per row.
//!
//! The firmware double-buffers into pages 0..8 and 8..16. Rendering shows
//! the two halves on alternate frames.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::peripherals::ssu::{SerialBus, SSU_TRANSMIT_EMPTY, SSU_TRANSMIT_END};
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Display RAM size in bytes.
pub const LCD_RAM_SIZE: usize = 128 * 176 / 4;
/// Bytes per column (two bit planes).
pub const COLUMN_SIZE: usize = 2;
/// Bytes per page.
pub const PAGE_BYTES: usize = SCREEN_WIDTH * COLUMN_SIZE;
/// Pages between the start of the two display buffers.
pub const BUFFER_PAGES: usize = 8;

const FB_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 3; // RGB24

pub const DEFAULT_CONTRAST: u8 = 20;

/// Grey levels indexed by the 2-bit pixel value, lightest first.
pub const DEFAULT_PALETTE: [u32; 4] = [0xCCCCCC, 0x999999, 0x666666, 0x333333];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LcdState {
    Waiting,
    Contrast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lcd {
    pub ram: Vec<u8>,
    pub state: LcdState,
    /// Column pointer (0..=127).
    pub column: u8,
    /// Which bit plane of the column the next data byte fills.
    pub offset: u8,
    pub page: u8,
    /// Display buffer the next render shows (0 or 1).
    pub buffer_index: u8,
    pub contrast: u8,
    pub power_save: bool,
    /// Last rendered frame, `SCREEN_HEIGHT * SCREEN_WIDTH * 3` bytes.
    #[serde(skip, default = "empty_frame")]
    pub framebuffer: Vec<u8>,
}

fn empty_frame() -> Vec<u8> {
    vec![0; FB_SIZE]
}

impl Lcd {
    pub fn new() -> Self {
        Lcd {
            ram: vec![0; LCD_RAM_SIZE],
            state: LcdState::Waiting,
            column: 0,
            offset: 0,
            page: 0,
            buffer_index: 0,
            contrast: DEFAULT_CONTRAST,
            power_save: false,
            framebuffer: empty_frame(),
        }
    }

    /// Controller reset command: pointers and modes only, RAM is kept.
    pub fn reset(&mut self) {
        self.state = LcdState::Waiting;
        self.column = 0;
        self.offset = 0;
        self.page = 0;
        self.contrast = DEFAULT_CONTRAST;
        self.power_save = false;
    }

    // --- SSU paths ---

    /// Data byte path, framed like the EEPROM.
    pub fn transmit_data(&mut self, bus: &mut SerialBus) {
        if !bus.byte_complete() {
            return;
        }
        self.receive_data(bus.transmitted());
        bus.set_status(SSU_TRANSMIT_EMPTY | SSU_TRANSMIT_END);
    }

    /// Command byte path. Commands are taken whole on the first clock.
    pub fn transmit_command(&mut self, bus: &mut SerialBus) {
        self.receive_command(bus.transmitted());
        bus.set_status(SSU_TRANSMIT_EMPTY | SSU_TRANSMIT_END);
    }

    // --- Protocol ---

    pub fn receive_data(&mut self, byte: u8) {
        let addr = self.page as usize * PAGE_BYTES
            + self.column as usize * COLUMN_SIZE
            + self.offset as usize;
        if let Some(slot) = self.ram.get_mut(addr) {
            *slot = byte;
        }
        if self.offset == 1 {
            self.column = self.column.wrapping_add(1);
        }
        self.offset ^= 1;
    }

    pub fn receive_command(&mut self, byte: u8) {
        match self.state {
            LcdState::Contrast => {
                self.contrast = byte;
                self.state = LcdState::Waiting;
                return;
            }
            LcdState::Waiting => {}
        }

        match byte {
            0x00..=0x0F => {
                self.column = (self.column & 0xF0) | (byte & 0x0F);
                self.offset = 0;
            }
            0x10..=0x17 => {
                self.column = (self.column & 0x0F) | ((byte & 0b111) << 4);
                self.offset = 0;
            }
            0x81 => self.state = LcdState::Contrast,
            0xA9 => self.power_save = true,
            0xE1 => self.power_save = false,
            0xB0..=0xBF => self.page = byte & 0x0F,
            0xE2 => self.reset(),
            _ => debug!("LCD: ignored command 0x{:02X}", byte),
        }
    }

    // --- Rendering ---

    /// 2-bit grey level of a pixel in the buffer the next render shows.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        if self.power_save {
            return 0;
        }
        let page = y / 8 + self.buffer_index as usize * BUFFER_PAGES;
        let base = COLUMN_SIZE * x + page * PAGE_BYTES;
        let stripe = y % 8;
        let first = (self.ram.get(base).copied().unwrap_or(0) >> stripe) & 1;
        let second = (self.ram.get(base + 1).copied().unwrap_or(0) >> stripe) & 1;
        (first << 1) | second
    }

    /// Decode the current buffer into [`Lcd::framebuffer`] and switch to the
    /// other buffer for the next frame.
    pub fn render(&mut self, palette: &[u32; 4]) {
        self.draw(palette);
        self.buffer_index ^= 1;
    }

    /// Rebuild [`Lcd::framebuffer`] from the last rendered buffer.
    pub fn redraw(&mut self, palette: &[u32; 4]) {
        self.buffer_index ^= 1;
        self.draw(palette);
        self.buffer_index ^= 1;
    }

    fn draw(&mut self, palette: &[u32; 4]) {
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                let color = palette[self.pixel(x, y) as usize];
                let offset = (y * SCREEN_WIDTH + x) * 3;
                self.framebuffer[offset] = (color >> 16) as u8;
                self.framebuffer[offset + 1] = (color >> 8) as u8;
                self.framebuffer[offset + 2] = color as u8;
            }
        }
    }

    /// Convert the framebuffer to 0xRRGGBB words for minifb.
    pub fn as_pixel_buffer(&self) -> Vec<u32> {
        self.framebuffer
            .chunks_exact(3)
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect()
    }
}

impl Default for Lcd {
    fn default() -> Self {
        Self::new()
    }
}
