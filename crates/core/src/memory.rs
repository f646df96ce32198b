//! Flat 64 KiB address space of the H8/300H.
//!
//! ROM, RAM and the on-chip I/O registers share one array:
//!
//! | Address Range | Content                                   |
//! |---------------|-------------------------------------------|
//! | 0x0000–0x004F | Vector table (big-endian 16-bit pointers) |
//! | 0x0050–0xBFFF | Program ROM                               |
//! | 0xF020–0xF0FF | Peripheral registers (RTC, timers, SSU)   |
//! | 0xF780–0xFF7F | RAM (stack grows down from the top)       |
//! | 0xFF80–0xFFFF | I/O ports, interrupt and clock registers  |
//!
//! Every address argument is masked to 16 bits and multi-byte accesses are
//! big-endian, wrapping at the end of the space. Peripheral registers are
//! never mirrored into separate fields: hardware models read and write them
//! here, so firmware writes through ordinary MOV instructions are visible to
//! the emulated hardware.
//!
//! Side effects are attached with [`Memory::on_write`] / [`Memory::on_read`].
//! The table only records *which* [`Hook`] belongs to an address; the
//! [`Board`](crate::Board) bus methods fire it synchronously before the
//! access is applied.

/// Size of the addressable space.
pub const MEMORY_SIZE: usize = 0x10000;

/// Side effects that can be attached to a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// SSU receive data register read: clears RECEIVE_FULL.
    SsuReceiveRead,
    /// SSU transmit data register write: clears TRANSMIT_EMPTY and TRANSMIT_END.
    SsuTransmitWrite,
    /// SSU mode register write: selects the serial clock rate.
    SsuModeWrite,
    /// Port 1 write: EEPROM chip select edge.
    Port1Write,
    /// Port 9 write: accelerometer chip select edge.
    Port9Write,
    /// SCI3 receive data register read: clears RECEIVE_FULL.
    Sci3ReceiveRead,
    /// SCI3 transmit data register write: clears TRANSMIT_EMPTY and TRANSMIT_END.
    Sci3TransmitWrite,
    /// Timer B1 counter write: latches the reload value.
    TimerB1LoadWrite,
}

pub struct Memory {
    pub data: Vec<u8>,
    write_hooks: Vec<Option<Hook>>,
    read_hooks: Vec<Option<Hook>>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            data: vec![0u8; MEMORY_SIZE],
            write_hooks: vec![None; MEMORY_SIZE],
            read_hooks: vec![None; MEMORY_SIZE],
        }
    }

    /// Build a memory image from a ROM dump, zero-padding short images.
    pub fn from_image(image: &[u8]) -> Self {
        let mut mem = Memory::new();
        mem.load(image);
        mem
    }

    /// Copy `image` to address 0. Bytes past 64 KiB are ignored.
    pub fn load(&mut self, image: &[u8]) {
        let len = image.len().min(MEMORY_SIZE);
        self.data[..len].copy_from_slice(&image[..len]);
    }

    // --- Hooks ---

    /// Attach `hook` to writes of `addr`, replacing any previous one.
    pub fn on_write(&mut self, addr: u32, hook: Hook) {
        self.write_hooks[mask(addr)] = Some(hook);
    }

    /// Attach `hook` to reads of `addr`, replacing any previous one.
    pub fn on_read(&mut self, addr: u32, hook: Hook) {
        self.read_hooks[mask(addr)] = Some(hook);
    }

    #[inline(always)]
    pub fn write_hook(&self, addr: u32) -> Option<Hook> {
        self.write_hooks[mask(addr)]
    }

    #[inline(always)]
    pub fn read_hook(&self, addr: u32) -> Option<Hook> {
        self.read_hooks[mask(addr)]
    }

    // --- Raw access (no hooks) ---

    #[inline(always)]
    pub fn read_byte(&self, addr: u32) -> u8 {
        self.data[mask(addr)]
    }

    #[inline(always)]
    pub fn write_byte(&mut self, addr: u32, value: u8) {
        self.data[mask(addr)] = value;
    }

    #[inline(always)]
    pub fn read_short(&self, addr: u32) -> u16 {
        ((self.read_byte(addr) as u16) << 8) | self.read_byte(addr.wrapping_add(1)) as u16
    }

    #[inline(always)]
    pub fn write_short(&mut self, addr: u32, value: u16) {
        self.write_byte(addr, (value >> 8) as u8);
        self.write_byte(addr.wrapping_add(1), value as u8);
    }

    #[inline(always)]
    pub fn read_int(&self, addr: u32) -> u32 {
        ((self.read_short(addr) as u32) << 16) | self.read_short(addr.wrapping_add(2)) as u32
    }

    #[inline(always)]
    pub fn write_int(&mut self, addr: u32, value: u32) {
        self.write_short(addr, (value >> 16) as u16);
        self.write_short(addr.wrapping_add(2), value as u16);
    }

    /// Read `len` bytes starting at `addr` as lossy ASCII.
    pub fn read_string(&self, addr: u32, len: usize) -> String {
        (0..len)
            .map(|i| self.read_byte(addr.wrapping_add(i as u32)) as char)
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn mask(addr: u32) -> usize {
    (addr & 0xFFFF) as usize
}
