//! Board state snapshots for in-session rewind.
//!
//! A [`Snapshot`] is the whole board (CPU, 64 KiB address space, EEPROM,
//! serial device protocol states, timers, RTC counters, SCI3 queues, LCD RAM)
//! serialized with bincode and deflated. Snapshots live in memory only; the
//! EEPROM image is the sole state that outlives a session.
//!
//! The frontend keeps them in a [`RewindBuffer`], taking one every
//! `interval` frames:
//!
//! ```text
//! // GUI: hold Backspace to rewind
//! // Step mode: `rewind` command
//! ```

use serde::{Deserialize, Serialize};

use crate::cpu::Cpu;
use crate::error::{Error, Result};
use crate::lcd::Lcd;
use crate::peripherals::{Accelerometer, Eeprom, Rtc, Sci3, Ssu, Timers};
use crate::Board;

/// Deflate level used for snapshot payloads.
const COMPRESSION_LEVEL: u8 = 6;

#[derive(Serialize)]
struct StateRef<'a> {
    cpu: &'a Cpu,
    memory: &'a [u8],
    eeprom: &'a Eeprom,
    accelerometer: &'a Accelerometer,
    lcd: &'a Lcd,
    ssu: &'a Ssu,
    sci3: &'a Sci3,
    timers: &'a Timers,
    rtc: &'a Rtc,
    cycle: u64,
    frame_count: u64,
}

#[derive(Deserialize)]
struct State {
    cpu: Cpu,
    memory: Vec<u8>,
    eeprom: Eeprom,
    accelerometer: Accelerometer,
    lcd: Lcd,
    ssu: Ssu,
    sci3: Sci3,
    timers: Timers,
    rtc: Rtc,
    cycle: u64,
    frame_count: u64,
}

/// A frozen, compressed copy of the board.
#[derive(Clone)]
pub struct Snapshot {
    /// Board cycle counter when taken.
    pub cycle: u64,
    /// Frame number when taken.
    pub frame: u64,
    payload: Vec<u8>,
}

impl Snapshot {
    pub fn capture(board: &Board) -> Result<Self> {
        let state = StateRef {
            cpu: &board.cpu,
            memory: &board.mem.data,
            eeprom: &board.eeprom,
            accelerometer: &board.accelerometer,
            lcd: &board.lcd,
            ssu: &board.ssu,
            sci3: &board.sci3,
            timers: &board.timers,
            rtc: &board.rtc,
            cycle: board.cycle,
            frame_count: board.frame_count,
        };
        let raw = bincode::serialize(&state).map_err(|e| Error::Snapshot(format!("serialize: {}", e)))?;
        Ok(Snapshot {
            cycle: board.cycle,
            frame: board.frame_count,
            payload: miniz_oxide::deflate::compress_to_vec(&raw, COMPRESSION_LEVEL),
        })
    }

    /// Put `board` back into the captured state. Hooks, configuration and
    /// the RTC time source are left as they are.
    pub fn restore(&self, board: &mut Board) -> Result<()> {
        let raw = miniz_oxide::inflate::decompress_to_vec(&self.payload)
            .map_err(|e| Error::Snapshot(format!("inflate: {:?}", e)))?;
        let state: State =
            bincode::deserialize(&raw).map_err(|e| Error::Snapshot(format!("deserialize: {}", e)))?;
        if state.memory.len() != board.mem.data.len() {
            return Err(Error::Snapshot(format!(
                "memory image is {} bytes, expected {}",
                state.memory.len(),
                board.mem.data.len()
            )));
        }

        board.cpu = state.cpu;
        board.mem.data.copy_from_slice(&state.memory);
        board.eeprom = state.eeprom;
        board.accelerometer = state.accelerometer;
        board.lcd = state.lcd;
        board.ssu = state.ssu;
        board.sci3 = state.sci3;
        board.timers = state.timers;
        board.rtc.restore(state.rtc);
        board.cycle = state.cycle;
        board.frame_count = state.frame_count;
        board.lcd.redraw(&board.config.palette);
        Ok(())
    }

    /// Compressed size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Ring buffer of snapshots for rewind.
pub struct RewindBuffer {
    buf: Vec<Option<Snapshot>>,
    /// Next slot to overwrite
    write_pos: usize,
    count: usize,
    /// Frames between snapshots
    pub interval: u32,
    frame_counter: u32,
}

impl RewindBuffer {
    /// With interval=4 and capacity=240, holds four minutes of rewind at the
    /// walker's 4 Hz refresh.
    pub fn new(capacity: usize, interval: u32) -> Self {
        RewindBuffer {
            buf: vec![None; capacity.max(1)],
            write_pos: 0,
            count: 0,
            interval,
            frame_counter: 0,
        }
    }

    /// Count a finished frame. Returns true when a snapshot is due.
    pub fn tick_frame(&mut self) -> bool {
        self.frame_counter += 1;
        if self.frame_counter >= self.interval {
            self.frame_counter = 0;
            true
        } else {
            false
        }
    }

    pub fn push(&mut self, snap: Snapshot) {
        self.buf[self.write_pos] = Some(snap);
        self.write_pos = (self.write_pos + 1) % self.buf.len();
        if self.count < self.buf.len() {
            self.count += 1;
        }
    }

    /// Most recent snapshot, removed from the buffer.
    pub fn pop(&mut self) -> Option<Snapshot> {
        if self.count == 0 {
            return None;
        }
        self.write_pos = if self.write_pos == 0 { self.buf.len() - 1 } else { self.write_pos - 1 };
        self.count -= 1;
        self.buf[self.write_pos].take()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn clear(&mut self) {
        for slot in self.buf.iter_mut() {
            *slot = None;
        }
        self.count = 0;
        self.write_pos = 0;
        self.frame_counter = 0;
    }

    /// Bytes held by stored payloads.
    pub fn memory_usage(&self) -> usize {
        self.buf.iter().flatten().map(Snapshot::size).sum()
    }
}
