//! Address hooks that steer the stock walker ROM past hardware it cannot see.
//!
//! | PC     | Effect                                                   |
//! |--------|----------------------------------------------------------|
//! | 0x0336 | factory self tests skipped                               |
//! | 0x0350 | battery check skipped, reports a healthy battery         |
//! | 0x7700 | accelerometer wake-up wait skipped                       |
//! | 0x08EE | infrared retry loop skipped                              |
//! | 0x9C3E | key acknowledged: port B returns to "no key"             |
//! | 0x9A4E | empty watts counter refilled                             |

use log::debug;

use crate::cpu::AddressAction;
use crate::peripherals::ssu::PORT_B_ADDR;
use crate::Board;

pub const FACTORY_TESTS: u32 = 0x0336;
pub const BATTERY_CHECK: u32 = 0x0350;
pub const ACCELEROMETER_SLEEP: u32 = 0x7700;
pub const IR_RETRY: u32 = 0x08EE;
pub const INPUT_ACKNOWLEDGED: u32 = 0x9C3E;
pub const WATTS_CHECK: u32 = 0x9A4E;

/// RAM address of the walker's 16-bit watts counter.
pub const WATTS_ADDR: u32 = 0xF78E;

/// Address and text of the ROM marker identifying a walker image.
pub const ROM_MARKER_ADDR: u32 = 0xBF98;
pub const ROM_MARKER: &str = "nintendo";

/// Register the walker hooks on `board`.
pub fn install(board: &mut Board) {
    board.on_address(FACTORY_TESTS, factory_tests);
    board.on_address(BATTERY_CHECK, battery_check);
    board.on_address(ACCELEROMETER_SLEEP, accelerometer_sleep);
    board.on_address(IR_RETRY, ir_retry);
    board.on_address(INPUT_ACKNOWLEDGED, input_acknowledged);
    board.on_address(WATTS_CHECK, watts_check);
}

fn skip(board: &mut Board, bytes: u32) -> AddressAction {
    board.cpu.regs.pc = board.cpu.regs.pc.wrapping_add(bytes);
    AddressAction::Skip { cycles: 1 }
}

fn factory_tests(board: &mut Board) -> AddressAction {
    debug!("Skipping factory tests");
    skip(board, 4)
}

fn battery_check(board: &mut Board) -> AddressAction {
    debug!("Skipping battery check");
    board.cpu.regs.set8(0b1000, 0);
    skip(board, 4)
}

fn accelerometer_sleep(board: &mut Board) -> AddressAction {
    skip(board, 2)
}

fn ir_retry(board: &mut Board) -> AddressAction {
    skip(board, 2)
}

fn input_acknowledged(board: &mut Board) -> AddressAction {
    if board.mem.read_byte(PORT_B_ADDR) != 0 {
        board.mem.write_byte(PORT_B_ADDR, 0);
    }
    AddressAction::Continue
}

fn watts_check(board: &mut Board) -> AddressAction {
    if board.mem.read_short(WATTS_ADDR) == 0 {
        debug!("Topping up watts to {}", board.config.watts_top_up);
        board.mem.write_short(WATTS_ADDR, board.config.watts_top_up);
    }
    AddressAction::Continue
}
