//! H8/300H CPU core.
//!
//! Holds the architectural state (register file, CCR, PC, sleep) and runs the
//! fetch → decode → execute → interrupt-check cycle. Execution lives on
//! [`Board`] so instructions reach memory through the hooked bus.
//!
//! One [`Board::step_cpu`] call, in order:
//!
//! 1. An address hook registered for the current PC may skip the
//!    instruction outright (ROM patches).
//! 2. When sleeping, nothing executes and 2 idle cycles pass. Otherwise the
//!    instruction is decoded and executed and PC advances by its length.
//! 3. With interrupts unmasked, the RTC is started on first sight and the
//!    highest-priority pending interrupt is delivered.

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::flags::Flags;
use crate::instructions;
use crate::interrupts::{self, SavedContext, Source};
use crate::opcodes::Opcodes;
use crate::registers::Registers;
use crate::Board;

/// Cycles consumed by one idle step while sleeping.
pub const SLEEP_CYCLES: u32 = 2;

/// CPU state for the H8/300H.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// ER0–ER7 and PC.
    pub regs: Registers,
    pub flags: Flags,
    /// Set by SLEEP, cleared by interrupt entry or the wake key.
    pub sleep: bool,
    /// Instructions executed since reset.
    pub instruction_count: u64,
    /// Context captured at interrupt entry for RTE.
    pub saved: SavedContext,
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            regs: Registers::new(),
            flags: Flags::new(),
            sleep: false,
            instruction_count: 0,
            saved: SavedContext::default(),
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of an address hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressAction {
    /// Decode and execute the instruction at PC as usual.
    Continue,
    /// The hook already moved PC; the step costs `cycles`.
    Skip { cycles: u32 },
}

/// Called before executing the instruction at a registered PC.
pub type AddressHook = fn(&mut Board) -> AddressAction;

impl Board {
    /// Run the instruction (or idle period) at PC and deliver a pending
    /// interrupt. Returns the cycles consumed.
    pub fn step_cpu(&mut self) -> Result<u32> {
        let pc = self.cpu.regs.pc & 0xFFFF;
        if let Some(&hook) = self.address_hooks.get(&pc) {
            if let AddressAction::Skip { cycles } = hook(self) {
                return Ok(cycles);
            }
        }

        let cycles = if self.cpu.sleep {
            SLEEP_CYCLES
        } else {
            self.execute()?
        };

        if !self.cpu.flags.i {
            if !self.rtc.initialized {
                self.rtc.initialize(&mut self.mem);
            }
            if let Some(source) = interrupts::pending(&self.mem) {
                self.interrupt_source(source);
            }
        }

        Ok(cycles)
    }

    /// Decode and execute one instruction at PC.
    fn execute(&mut self) -> Result<u32> {
        let pc = self.cpu.regs.pc & 0xFFFF;
        let op = Opcodes::fetch(&self.mem, pc);
        let instruction = instructions::resolve(&op).map_err(|miss| {
            let err = Error::Decode {
                table: miss.table,
                pc,
                first: miss.first,
                second: miss.second,
                instruction_count: self.cpu.instruction_count,
            };
            error!("{}", err);
            err
        })?;

        self.cpu.regs.pc = pc;
        (instruction.execute)(self, &op);
        self.cpu.regs.pc = self.cpu.regs.pc.wrapping_add(instruction.bytes);
        self.cpu.instruction_count += 1;

        if self.cpu.sleep {
            debug!("SLEEP at 0x{:04X}", pc);
        }
        Ok(instruction.cycles)
    }

    /// Enter the handler at `addr`: save PC and CCR, mask interrupts, wake.
    pub fn interrupt(&mut self, addr: u32) {
        self.cpu.saved = SavedContext {
            pc: self.cpu.regs.pc,
            flags: self.cpu.flags,
        };
        self.cpu.regs.pc = addr;
        self.cpu.flags.i = true;
        self.cpu.sleep = false;
    }

    /// Enter the handler for `source` through the vector table.
    pub fn interrupt_source(&mut self, source: Source) {
        let addr = interrupts::vector_address(&self.mem, source.vector());
        debug!("Interrupt {:?} → 0x{:04X}", source, addr);
        self.interrupt(addr);
    }

    /// Load PC from the reset vector with interrupts masked.
    pub fn reset_cpu(&mut self) {
        self.cpu = Cpu::new();
        self.cpu.regs.pc = self.mem.read_short(interrupts::vector::RESET) as u32;
        self.cpu.flags.i = true;
    }

    /// Push a 16-bit value through the stack pointer.
    #[inline]
    pub fn push(&mut self, value: u32) {
        self.cpu.regs.push(&mut self.mem, value);
    }

    #[inline]
    pub fn pop(&mut self) -> u32 {
        self.cpu.regs.pop(&self.mem)
    }

    /// Run `hook` whenever PC reaches `pc`, replacing any previous hook.
    pub fn on_address(&mut self, pc: u32, hook: AddressHook) {
        self.address_hooks.insert(pc & 0xFFFF, hook);
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("pc", &format_args!("0x{:04X}", self.regs.pc))
            .field("ccr", &format_args!("{}", self.flags))
            .field("sleep", &self.sleep)
            .field("instruction_count", &self.instruction_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::{vector, IENR1_ADDR, IENR1_IRQ0, IRR1_ADDR, IRR1_IRQ0, RTC_FLAG_ADDR};

    /// Board with `program` at 0x0100 and the reset vector pointing to it.
    fn board_with(program: &[u8]) -> Board {
        let mut rom = vec![0u8; 0x200];
        rom[0] = 0x01;
        rom[1] = 0x00;
        rom[0x100..0x100 + program.len()].copy_from_slice(program);
        let mut board = Board::with_config(&rom, None, crate::Config { rom_patches: false, ..Default::default() });
        board.cpu.regs.set_sp(0xFF80);
        board
    }

    #[test]
    fn test_reset_loads_vector() {
        let board = board_with(&[]);
        assert_eq!(board.cpu.regs.pc, 0x0100);
        assert!(board.cpu.flags.i);
        assert!(!board.cpu.sleep);
    }

    #[test]
    fn test_step_executes_and_advances() {
        // MOV.B #0x80, R1H
        let mut board = board_with(&[0xF1, 0x80]);
        let cycles = board.step_cpu().unwrap();
        assert_eq!(cycles, 1);
        assert_eq!(board.cpu.regs.get8(1), 0x80);
        assert!(board.cpu.flags.n);
        assert_eq!(board.cpu.regs.pc, 0x0102);
        assert_eq!(board.cpu.instruction_count, 1);
    }

    #[test]
    fn test_sleeping_step_costs_two_cycles() {
        let mut board = board_with(&[0x01, 0x80]);
        board.step_cpu().unwrap();
        assert!(board.cpu.sleep);
        let pc = board.cpu.regs.pc;
        assert_eq!(board.step_cpu().unwrap(), SLEEP_CYCLES);
        assert_eq!(board.cpu.regs.pc, pc);
        assert_eq!(board.cpu.instruction_count, 1);
    }

    #[test]
    fn test_decode_miss_reports_keys() {
        // 0x5780 is not an instruction.
        let mut board = board_with(&[0x57, 0x80]);
        match board.step_cpu() {
            Err(Error::Decode { table, pc, first, second, instruction_count }) => {
                assert_eq!(table, "aH_aL");
                assert_eq!(pc, 0x0100);
                assert_eq!(first, 0x5);
                assert_eq!(second, 0x7);
                assert_eq!(instruction_count, 0);
            }
            other => panic!("Expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_interrupt_saves_context_and_rte_restores() {
        // RTE at the handler.
        let mut board = board_with(&[0x00, 0x00]);
        board.mem.write_short(0x0180, 0x5670);
        board.cpu.flags.set_ccr(0x05);
        board.cpu.sleep = true;
        board.interrupt(0x0180);
        assert_eq!(board.cpu.regs.pc, 0x0180);
        assert!(board.cpu.flags.i);
        assert!(!board.cpu.sleep);
        assert_eq!(board.cpu.saved.pc, 0x0100);

        board.step_cpu().unwrap();
        assert_eq!(board.cpu.regs.pc, 0x0100);
        assert_eq!(board.cpu.flags.ccr(), 0x05);
    }

    #[test]
    fn test_pending_interrupt_delivered_after_execute() {
        // NOP, with IRQ0 requested and enabled.
        let mut board = board_with(&[0x00, 0x00]);
        board.mem.write_short(vector::IRQ0, 0x0150);
        board.mem.write_byte(IENR1_ADDR, IENR1_IRQ0);
        board.mem.write_byte(IRR1_ADDR, IRR1_IRQ0);

        board.step_cpu().unwrap();
        assert_eq!(board.cpu.regs.pc, 0x0102, "masked: no delivery");

        board.cpu.flags.i = false;
        board.step_cpu().unwrap();
        assert_eq!(board.cpu.regs.pc, 0x0150);
        assert_eq!(board.cpu.saved.pc, 0x0104);
        assert!(board.rtc.initialized);
    }

    #[test]
    fn test_first_unmasked_step_initializes_rtc() {
        let mut board = board_with(&[0x00, 0x00, 0x00, 0x00]);
        board.step_cpu().unwrap();
        assert!(!board.rtc.initialized);
        board.cpu.flags.i = false;
        board.step_cpu().unwrap();
        assert!(board.rtc.initialized);
        assert_ne!(board.mem.read_byte(RTC_FLAG_ADDR), 0);
    }

    #[test]
    fn test_push_pop_round_trip() {
        let mut board = board_with(&[]);
        let sp = board.cpu.regs.sp();
        board.push(0xBEEF);
        assert_eq!(board.cpu.regs.sp(), sp - 2);
        assert_eq!(board.pop(), 0xBEEF);
        assert_eq!(board.cpu.regs.sp(), sp);
    }

    #[test]
    fn test_address_hook_skips_instruction() {
        fn skip(b: &mut Board) -> AddressAction {
            b.cpu.regs.pc += 2;
            AddressAction::Skip { cycles: 1 }
        }
        // MOV.B #0x11, R0L; MOV.B #0x22, R0H
        let mut board = board_with(&[0xF8, 0x11, 0xF0, 0x22]);
        board.on_address(0x0100, skip);
        assert_eq!(board.step_cpu().unwrap(), 1);
        assert_eq!(board.cpu.regs.pc, 0x0102);
        assert_eq!(board.cpu.regs.get8(8), 0);
        board.step_cpu().unwrap();
        assert_eq!(board.cpu.regs.get8(0), 0x22);
    }

    #[test]
    fn test_address_hook_continue_still_executes() {
        fn mark(b: &mut Board) -> AddressAction {
            b.cpu.regs.set8(1, 0x5A);
            AddressAction::Continue
        }
        let mut board = board_with(&[0xF8, 0x11]);
        board.on_address(0x0100, mark);
        board.step_cpu().unwrap();
        assert_eq!(board.cpu.regs.get8(1), 0x5A);
        assert_eq!(board.cpu.regs.get8(8), 0x11);
    }
}
