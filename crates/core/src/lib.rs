//! # walker-core
//!
//! Cycle-stepped emulation core for the Pokéwalker pedometer.
//!
//! Emulates the H8/38606 microcontroller (H8/300H CPU core, 3.6864 MHz clock,
//! 48 KiB ROM and 2 KiB RAM in one 64 KiB address space) and the devices on
//! its serial bus: a 64 KiB SPI EEPROM, a BMA150 accelerometer and a 96×64
//! four-level grey LCD controller. An SCI3 serial unit drives the infrared
//! port.
//!
//! ## Architecture
//!
//! - [`Board`]: Top-level emulator owning memory, CPU and every peripheral
//! - [`Cpu`]: Register file, CCR, PC, sleep state and saved interrupt context
//! - [`Memory`]: Flat 64 KiB address space with per-address side-effect hooks
//! - [`instructions`]: Table-driven decoder and instruction semantics
//! - [`interrupts`]: Enable/request registers, vector table, priority order
//! - [`peripherals`]: Timer B1, Timer W, RTC, SSU, SCI3, EEPROM, accelerometer
//! - [`lcd`]: LCD controller protocol and frame rendering
//! - [`patches`]: Address hooks that skip hardware the emulator does not model
//! - [`disasm`]: Instruction listing for debug views
//! - [`snapshot`]: Board state snapshots for rewind functionality
//!
//! ## Timing
//!
//! The host calls [`Board::step`], which runs one CPU step and then
//! [`Board::tick`] once per consumed cycle. A tick advances, in order:
//!
//! 1. **SSU** every `ssu.clock_rate` cycles
//! 2. **Timers** at 32768 Hz
//! 3. **SCI3** at 65536 Hz
//! 4. **Audio** sample of Timer W at 256 Hz
//! 5. **LCD** frame and **RTC** at 4 Hz
//!
//! Flags raised by a tick are seen by the next CPU step, not the current one.

pub mod config;
pub mod cpu;
pub mod disasm;
pub mod error;
pub mod flags;
pub mod instructions;
pub mod interrupts;
pub mod lcd;
pub mod memory;
pub mod opcodes;
pub mod patches;
pub mod peripherals;
pub mod registers;
pub mod snapshot;

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info, warn};

pub use config::Config;
pub use cpu::{AddressAction, AddressHook, Cpu};
pub use error::{Error, Result};
pub use lcd::Lcd;
pub use memory::{Hook, Memory};

use interrupts::{IRR1_ADDR, IRR1_IRQ0};
use peripherals::ssu::{PORT_1_EEPROM, PORT_9_ACCELEROMETER, PORT_B_ADDR};
use peripherals::{Accelerometer, Eeprom, Rtc, Sci3, Ssu, TimerW, Timers};
use snapshot::Snapshot;

/// CPU clock: cycles per second.
pub const CPU_TICKS: u64 = 3_686_400;
/// LCD refreshes (and RTC quarter seconds) per second.
pub const VISUAL_TICKS: u64 = 4;
/// Audio samples per second.
pub const AUDIO_TICKS: u64 = 256;
/// Timer clock per second.
pub const CLOCK_TICKS: u64 = 32_768;
/// SCI3 clocks per second.
pub const SCI3_TICKS: u64 = 65_536;

/// LCD width in pixels
pub const SCREEN_WIDTH: usize = 96;
/// LCD height in pixels
pub const SCREEN_HEIGHT: usize = 64;

const TIMER_PERIOD: u64 = CPU_TICKS / CLOCK_TICKS;
const SCI3_PERIOD: u64 = CPU_TICKS / SCI3_TICKS;
const AUDIO_PERIOD: u64 = CPU_TICKS / AUDIO_TICKS;
/// CPU cycles per LCD frame.
pub const FRAME_CYCLES: u64 = CPU_TICKS / VISUAL_TICKS;

/// Walker buttons, valued as their port B code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    None,
    Center,
    Left,
    Right,
}

impl Key {
    pub const fn code(self) -> u8 {
        match self {
            Key::None => 0,
            Key::Center => 1 << 0,
            Key::Left => 1 << 2,
            Key::Right => 1 << 4,
        }
    }
}

/// Beeper state sampled from Timer W.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioTone {
    /// Hz, 0 when silent.
    pub frequency: f32,
    /// 1.0 or 0.25.
    pub volume: f32,
}

/// The whole device: CPU, memory and peripherals.
pub struct Board {
    pub cpu: Cpu,
    pub mem: Memory,
    pub ssu: Ssu,
    pub eeprom: Eeprom,
    pub accelerometer: Accelerometer,
    pub lcd: Lcd,
    pub timers: Timers,
    pub rtc: Rtc,
    pub sci3: Sci3,
    pub config: Config,
    /// CPU cycles since reset.
    pub cycle: u64,
    /// LCD frames rendered since reset.
    pub frame_count: u64,
    address_hooks: HashMap<u32, AddressHook>,
    frame_ready: bool,
    audio: AudioTone,
}

impl Board {
    /// Build a board with the default configuration. Short images are
    /// zero-padded; a missing EEPROM image reads as erased (0xFF).
    pub fn new(rom: &[u8], eeprom: Option<&[u8]>) -> Self {
        Self::with_config(rom, eeprom, Config::default())
    }

    pub fn with_config(rom: &[u8], eeprom: Option<&[u8]>, config: Config) -> Self {
        let mut board = Board {
            cpu: Cpu::new(),
            mem: Memory::from_image(rom),
            ssu: Ssu::new(),
            eeprom: eeprom.map(Eeprom::from_image).unwrap_or_default(),
            accelerometer: Accelerometer::new(),
            lcd: Lcd::new(),
            timers: Timers::new(),
            rtc: Rtc::new(),
            sci3: Sci3::new(),
            config,
            cycle: 0,
            frame_count: 0,
            address_hooks: HashMap::new(),
            frame_ready: false,
            audio: AudioTone::default(),
        };

        board.ssu.install(&mut board.mem);
        board.timers.install(&mut board.mem);
        board.sci3.install(&mut board.mem);
        board.sci3.packet_idle_cycles = board.config.ir_packet_idle_cycles;

        if board.config.rom_patches {
            if !board.is_walker_rom() {
                warn!("ROM patches enabled but no walker marker at 0x{:04X}", patches::ROM_MARKER_ADDR);
            }
            patches::install(&mut board);
        }

        board.reset();
        board
    }

    /// CPU and peripheral protocol reset. Memory and EEPROM contents are kept.
    pub fn reset(&mut self) {
        self.reset_cpu();
        self.ssu.progress = 0;
        self.eeprom.deselect();
        self.accelerometer.deselect();
        self.lcd.reset();
        self.rtc.reset();
        self.sci3.reset();
        self.cycle = 0;
        self.frame_count = 0;
        self.frame_ready = false;
        self.audio = AudioTone::default();
        info!("Reset: PC=0x{:04X}", self.cpu.regs.pc);
    }

    // --- Hooked bus ---

    /// CPU read: fetch, then run the address's read hook.
    pub fn read_byte(&mut self, addr: u32) -> u8 {
        let addr = addr & 0xFFFF;
        let value = self.mem.read_byte(addr);
        if let Some(hook) = self.mem.read_hook(addr) {
            self.run_hook(hook, value);
        }
        value
    }

    /// CPU write: store, then run the address's write hook.
    pub fn write_byte(&mut self, addr: u32, value: u8) {
        let addr = addr & 0xFFFF;
        self.mem.write_byte(addr, value);
        if let Some(hook) = self.mem.write_hook(addr) {
            self.run_hook(hook, value);
        }
    }

    pub fn read_short(&mut self, addr: u32) -> u16 {
        let high = self.read_byte(addr) as u16;
        let low = self.read_byte(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    pub fn write_short(&mut self, addr: u32, value: u16) {
        self.write_byte(addr, (value >> 8) as u8);
        self.write_byte(addr.wrapping_add(1), value as u8);
    }

    pub fn read_int(&mut self, addr: u32) -> u32 {
        let high = self.read_short(addr) as u32;
        let low = self.read_short(addr.wrapping_add(2)) as u32;
        (high << 16) | low
    }

    pub fn write_int(&mut self, addr: u32, value: u32) {
        self.write_short(addr, (value >> 16) as u16);
        self.write_short(addr.wrapping_add(2), value as u16);
    }

    fn run_hook(&mut self, hook: Hook, value: u8) {
        match hook {
            Hook::SsuReceiveRead => Ssu::receive_read(&mut self.mem),
            Hook::SsuTransmitWrite => Ssu::transmit_write(&mut self.mem),
            Hook::SsuModeWrite => self.ssu.set_mode(value),
            Hook::Port1Write => {
                if value & PORT_1_EEPROM != 0 {
                    self.eeprom.deselect();
                }
            }
            Hook::Port9Write => {
                if value & PORT_9_ACCELEROMETER != 0 {
                    self.accelerometer.deselect();
                }
            }
            Hook::Sci3ReceiveRead => Sci3::receive_read(&mut self.mem),
            Hook::Sci3TransmitWrite => Sci3::transmit_write(&mut self.mem),
            Hook::TimerB1LoadWrite => self.timers.b1.load_value = value,
        }
    }

    // --- Scheduling ---

    /// Advance the peripherals for CPU cycle number `cycle`.
    pub fn tick(&mut self, cycle: u64) -> Result<()> {
        if cycle % self.ssu.clock_rate == 0 {
            self.ssu.tick(&mut self.mem, &mut self.eeprom, &mut self.accelerometer, &mut self.lcd);
        }

        if cycle % TIMER_PERIOD == 0 {
            if let Some(source) = self.timers.tick(&mut self.mem, self.cpu.flags.i)? {
                self.interrupt_source(source);
            }
        }

        if cycle % SCI3_PERIOD == 0 {
            self.sci3.tick(&mut self.mem, cycle);
        }

        if cycle % AUDIO_PERIOD == 0 {
            self.audio = AudioTone {
                frequency: self.timers.w.frequency(&self.mem),
                volume: TimerW::volume(&self.mem),
            };
        }

        if cycle % FRAME_CYCLES == 0 {
            self.lcd.render(&self.config.palette);
            self.frame_ready = true;
            self.frame_count += 1;
            self.rtc.tick(&mut self.mem);
        }

        Ok(())
    }

    /// One CPU step followed by a tick per consumed cycle. Returns the cycles.
    pub fn step(&mut self) -> Result<u32> {
        let cycles = self.step_cpu()?;
        for _ in 0..cycles {
            self.cycle += 1;
            self.tick(self.cycle)?;
        }
        Ok(cycles)
    }

    /// Step until the next LCD frame has been rendered.
    pub fn run_frame(&mut self) -> Result<()> {
        let end = (self.cycle / FRAME_CYCLES + 1) * FRAME_CYCLES;
        while self.cycle < end {
            self.step()?;
        }
        Ok(())
    }

    // --- Host interface ---

    /// True once per rendered frame.
    pub fn frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    /// Last rendered frame, RGB24, `SCREEN_HEIGHT * SCREEN_WIDTH * 3` bytes.
    pub fn framebuffer(&self) -> &[u8] {
        &self.lcd.framebuffer
    }

    /// Last sampled beeper state.
    pub fn audio(&self) -> AudioTone {
        self.audio
    }

    /// Latch `key` on port B. The center key also requests IRQ0 and wakes the
    /// CPU while interrupts are unmasked.
    pub fn push_key(&mut self, key: Key) {
        if !self.cpu.flags.i && key == Key::Center {
            let irr1 = self.mem.read_byte(IRR1_ADDR) | IRR1_IRQ0;
            self.mem.write_byte(IRR1_ADDR, irr1);
            self.cpu.sleep = false;
        }
        self.mem.write_byte(PORT_B_ADDR, key.code());
    }

    /// Whether the loaded image carries the walker ROM marker.
    pub fn is_walker_rom(&self) -> bool {
        self.mem.read_string(patches::ROM_MARKER_ADDR, patches::ROM_MARKER.len()) == patches::ROM_MARKER
    }

    /// Replace EEPROM contents; short images are zero-padded.
    pub fn load_eeprom(&mut self, data: &[u8]) {
        self.eeprom.load(data);
        self.eeprom.dirty = false;
    }

    pub fn save_eeprom(&self) -> Vec<u8> {
        self.eeprom.data.clone()
    }

    /// Write the EEPROM image to `path` and clear the dirty flag.
    pub fn save_eeprom_to(&mut self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.eeprom.data)?;
        self.eeprom.dirty = false;
        debug!("EEPROM saved to {}", path.display());
        Ok(())
    }

    // --- Debugging ---

    /// Listing of the instruction at `pc` without executing it.
    pub fn disassemble_at(&self, pc: u32) -> String {
        disasm::disassemble(&self.mem, pc)
    }

    /// ER0–ER7, PC and CCR, one register pair per line.
    pub fn dump_registers(&self) -> String {
        let regs = &self.cpu.regs;
        let mut s = String::new();
        for i in (0..8u8).step_by(2) {
            s.push_str(&format!(
                "ER{}={:08X} ER{}={:08X}\n",
                i,
                regs.get32(i),
                i + 1,
                regs.get32(i + 1)
            ));
        }
        s.push_str(&format!(
            "PC={:04X} CCR={} (0x{:02X}){}",
            regs.pc & 0xFFFF,
            disasm::format_ccr(&self.cpu.flags),
            self.cpu.flags.ccr(),
            if self.cpu.sleep { " SLEEP" } else { "" }
        ));
        s
    }

    pub fn save_snapshot(&self) -> Result<Snapshot> {
        Snapshot::capture(self)
    }

    pub fn restore_snapshot(&mut self, snap: &Snapshot) -> Result<()> {
        snap.restore(self)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(&[], None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::{vector, IENR2_ADDR, IENR2_TIMER_B1, IRR2_ADDR, IRR2_TIMER_B1};
    use crate::peripherals::ssu::{PORT_1_ADDR, SSU_MODE_ADDR, SSU_RECEIVE_ADDR, SSU_STATUS_ADDR, SSU_RECEIVE_FULL};
    use crate::peripherals::timer_b1::{TIMER_B_COUNTER_ADDR, TIMER_B_COUNTING, TIMER_B_MODE_ADDR};
    use crate::peripherals::{CLOCK_STOP_1_ADDR, TIMER_B1_STANDBY};
    use test_log::test;

    /// ROM with the reset vector at 0x0100 and `program` placed there.
    fn rom_with(program: &[u8]) -> Vec<u8> {
        let mut rom = vec![0u8; 0x10000];
        rom[0] = 0x01;
        rom[1] = 0x00;
        rom[0x100..0x100 + program.len()].copy_from_slice(program);
        rom
    }

    fn plain(program: &[u8]) -> Board {
        let config = Config { rom_patches: false, ..Config::default() };
        Board::with_config(&rom_with(program), None, config)
    }

    #[test]
    fn test_boot_mov_then_self_branch() {
        // MOV.B #0x42, R0L; BRA -2
        let mut board = plain(&[0xF8, 0x42, 0x40, 0xFE]);
        assert_eq!(board.cpu.regs.pc, 0x0100);

        board.step().unwrap();
        assert_eq!(board.cpu.regs.get8(0b1000), 0x42);
        assert!(!board.cpu.flags.n);
        assert!(!board.cpu.flags.z);
        assert!(!board.cpu.flags.v);
        assert_eq!(board.cpu.regs.pc, 0x0102);

        let cycles = board.step().unwrap();
        assert_eq!(board.cpu.regs.pc, 0x0102);
        assert_eq!(cycles, 2);
        assert_eq!(board.cycle, 3);
    }

    #[test]
    fn test_eeprom_defaults_to_erased() {
        let board = Board::new(&[], None);
        assert!(board.eeprom.data.iter().all(|&b| b == 0xFF));
        let board = Board::new(&[], Some(&[1, 2]));
        assert_eq!(&board.eeprom.data[..3], &[1, 2, 0]);
    }

    #[test]
    fn test_bus_hooks_fire_on_cpu_access() {
        let mut board = plain(&[]);
        board.mem.write_byte(SSU_STATUS_ADDR, SSU_RECEIVE_FULL);
        board.read_byte(SSU_RECEIVE_ADDR);
        assert_eq!(board.mem.read_byte(SSU_STATUS_ADDR) & SSU_RECEIVE_FULL, 0);

        board.write_byte(SSU_MODE_ADDR, 0b001);
        assert_eq!(board.ssu.clock_rate, peripherals::ssu::CLOCK_RATES[1]);

        board.write_byte(TIMER_B_COUNTER_ADDR, 0xFE);
        assert_eq!(board.timers.b1.load_value, 0xFE);
    }

    #[test]
    fn test_chip_select_release_resets_eeprom() {
        let mut board = plain(&[]);
        board.eeprom.state = peripherals::eeprom::EepromState::AddressLow;
        board.write_byte(PORT_1_ADDR, 0);
        assert_eq!(board.eeprom.state, peripherals::eeprom::EepromState::AddressLow);
        board.write_byte(PORT_1_ADDR, PORT_1_EEPROM);
        assert_eq!(board.eeprom.state, peripherals::eeprom::EepromState::Waiting);
    }

    #[test]
    fn test_multibyte_access_is_big_endian() {
        let mut board = plain(&[]);
        board.write_int(0xF000, 0x1234_5678);
        assert_eq!(board.read_short(0xF000), 0x1234);
        assert_eq!(board.read_byte(0xF003), 0x78);
        board.write_short(0xFFFF, 0xABCD);
        assert_eq!(board.mem.read_byte(0x0000), 0xCD);
    }

    #[test]
    fn test_push_key_center_wakes_when_unmasked() {
        let mut board = plain(&[]);
        board.cpu.sleep = true;
        board.push_key(Key::Center);
        assert_eq!(board.mem.read_byte(IRR1_ADDR) & IRR1_IRQ0, 0, "masked");
        assert!(board.cpu.sleep);
        assert_eq!(board.mem.read_byte(PORT_B_ADDR), 1);

        board.cpu.flags.i = false;
        board.push_key(Key::Left);
        assert_eq!(board.mem.read_byte(IRR1_ADDR) & IRR1_IRQ0, 0);
        assert_eq!(board.mem.read_byte(PORT_B_ADDR), 4);

        board.push_key(Key::Center);
        assert_ne!(board.mem.read_byte(IRR1_ADDR) & IRR1_IRQ0, 0);
        assert!(!board.cpu.sleep);
    }

    #[test]
    fn test_run_frame_renders_and_ticks_rtc() {
        let mut board = plain(&[0x40, 0xFE]);
        board.run_frame().unwrap();
        assert_eq!(board.cycle, FRAME_CYCLES);
        assert!(board.frame_ready());
        assert!(!board.frame_ready());
        assert_eq!(board.frame_count, 1);
        assert_eq!(board.rtc.quarter_count, 1);
        assert_eq!(board.framebuffer().len(), SCREEN_WIDTH * SCREEN_HEIGHT * 3);
        // Blank RAM renders palette entry 0 everywhere.
        assert_eq!(&board.framebuffer()[..3], &[0xCC, 0xCC, 0xCC]);
    }

    #[test]
    fn test_timer_b1_interrupt_reaches_handler() {
        // Program: ANDC #0x7F, CCR (unmask); BRA -2. Handler at 0x0180: BRA -2.
        let mut rom = rom_with(&[0x06, 0x7F, 0x40, 0xFE]);
        rom[vector::TIMER_B as usize] = 0x01;
        rom[vector::TIMER_B as usize + 1] = 0x80;
        rom[0x180] = 0x40;
        rom[0x181] = 0xFE;
        let config = Config { rom_patches: false, ..Config::default() };
        let mut board = Board::with_config(&rom, None, config);

        board.mem.write_byte(CLOCK_STOP_1_ADDR, TIMER_B1_STANDBY);
        board.mem.write_byte(TIMER_B_MODE_ADDR, TIMER_B_COUNTING | 0b111);
        board.write_byte(TIMER_B_COUNTER_ADDR, 0xFF);
        board.mem.write_byte(IENR2_ADDR, IENR2_TIMER_B1);

        // One timer overflow: 256 timer clocks of 112 CPU cycles.
        while board.mem.read_byte(IRR2_ADDR) & IRR2_TIMER_B1 == 0 {
            board.step().unwrap();
            assert!(board.cycle < 256 * 113, "timer never overflowed");
        }
        board.step().unwrap();
        assert_eq!(board.cpu.regs.pc, 0x0180);
        assert!(board.cpu.flags.i);
    }

    #[test]
    fn test_audio_sampled_from_timer_w() {
        let mut board = plain(&[0x40, 0xFE]);
        while board.cycle < AUDIO_PERIOD {
            board.step().unwrap();
        }
        assert_eq!(board.audio().frequency, 0.0);
        assert_eq!(board.audio().volume, 1.0);
    }

    #[test]
    fn test_walker_marker() {
        let mut rom = vec![0u8; 0xC000];
        rom[0xBF98..0xBFA0].copy_from_slice(b"nintendo");
        assert!(Board::new(&rom, None).is_walker_rom());
        assert!(!Board::new(&[], None).is_walker_rom());
    }

    #[test]
    fn test_save_eeprom_to_file() {
        let mut board = Board::new(&[], Some(&[9, 8, 7]));
        board.eeprom.dirty = true;
        let path = std::env::temp_dir().join(format!("walker-eeprom-{}.bin", std::process::id()));
        board.save_eeprom_to(&path).unwrap();
        assert!(!board.eeprom.dirty);
        let saved = std::fs::read(&path).unwrap();
        assert_eq!(saved.len(), peripherals::eeprom::EEPROM_SIZE);
        assert_eq!(&saved[..3], &[9, 8, 7]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_dump_registers() {
        let mut board = plain(&[]);
        board.cpu.regs.set32(0, 0x1234_5678);
        let dump = board.dump_registers();
        assert!(dump.contains("ER0=12345678"));
        assert!(dump.contains("PC=0100"));
        assert!(dump.contains("CCR=Iuhunzvc"));
    }

    #[test]
    fn test_disassemble_at() {
        let board = plain(&[0xF8, 0x42]);
        assert_eq!(board.disassemble_at(0x0100), "0100: MOV.B [F8 42]");
    }
}
