//! Pokéwalker emulator frontend.
//!
//! Provides three execution modes:
//!
//! - **GUI mode** (default): scaled LCD window, square-wave beeper, keyboard
//!   and gamepad input, hold-to-rewind.
//! - **Headless mode** (`--headless`): run a number of frames and print the
//!   LCD as shaded text.
//! - **Step mode** (`--step`): interactive instruction-level debugger.
//!
//! The infrared port can be bridged to another emulator over TCP with
//! `--ir-connect host:port` or `--ir-listen port`.

mod ir;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use env_logger::Env;
use gilrs::{Axis, Button as GilrsButton, Event as GilrsEvent, EventType, Gilrs};
use log::{error, info, warn};
use minifb::{Key as WinKey, Scale, ScaleMode, Window, WindowOptions};
use walker_core::snapshot::RewindBuffer;
use walker_core::{Board, Config, Key, CPU_TICKS, FRAME_CYCLES, SCREEN_HEIGHT, SCREEN_WIDTH};

use crate::ir::IrBridge;

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Audio output sample rate in Hz
const AUDIO_SAMPLE_RATE: u32 = 44100;
/// Square wave amplitude at full beeper volume
const AUDIO_AMPLITUDE: f32 = 0.15;
const STICK_DEADZONE: f32 = 0.3;
/// Emulated cycles allowed per window update, so a stall does not turn into
/// a burst of catch-up.
const MAX_CYCLES_PER_UPDATE: u64 = FRAME_CYCLES;
/// One snapshot per LCD frame, one minute of history.
const REWIND_CAPACITY: usize = 240;
const REWIND_INTERVAL: u32 = 1;
/// Step budget for `r` in step mode when no breakpoint is hit.
const RUN_LIMIT: usize = 10_000_000;

#[derive(Parser)]
#[command(name = "walker-emu", version, about = "Pokéwalker emulator")]
struct Args {
    /// ROM image (48 KiB)
    rom: PathBuf,

    /// EEPROM image; loaded if present and written back on exit
    #[arg(long)]
    eeprom: Option<PathBuf>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Frames to run in headless mode (4 frames per emulated second)
    #[arg(long, default_value_t = 40)]
    frames: u64,

    /// Interactive step debugger
    #[arg(long)]
    step: bool,

    /// Breakpoint at a hex address (repeatable)
    #[arg(long = "break", value_parser = parse_hex_address)]
    breakpoints: Vec<u32>,

    /// Window scale factor
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(1..=12))]
    scale: u8,

    /// Disable audio output
    #[arg(long)]
    mute: bool,

    /// Do not install the ROM address hooks
    #[arg(long)]
    no_patches: bool,

    /// TOML file overlaid onto the default board configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bridge infrared to a peer at host:port
    #[arg(long, conflicts_with = "ir_listen")]
    ir_connect: Option<String>,

    /// Accept an infrared peer on this TCP port
    #[arg(long)]
    ir_listen: Option<u16>,
}

fn parse_hex_address(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16)
        .map(|addr| addr & 0xFFFF)
        .map_err(|e| format!("invalid hex address '{}': {}", s, e))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> AppResult<()> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if args.no_patches {
        config.rom_patches = false;
    }

    let rom = std::fs::read(&args.rom).map_err(|e| format!("{}: {}", args.rom.display(), e))?;
    let eeprom = match &args.eeprom {
        Some(path) if path.exists() => Some(std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?),
        Some(path) => {
            info!("{} does not exist yet, starting from an erased EEPROM", path.display());
            None
        }
        None => None,
    };
    let mut board = Board::with_config(&rom, eeprom.as_deref(), config);
    info!("Loaded {} ({} bytes)", args.rom.display(), rom.len());

    let mut bridge = match (&args.ir_connect, args.ir_listen) {
        (Some(addr), _) => Some(IrBridge::connect(addr)),
        (None, Some(port)) => Some(IrBridge::listen(port)?),
        (None, None) => None,
    };

    let result = if args.step {
        run_step_mode(&mut board, &args.breakpoints)
    } else if args.headless {
        run_headless(&mut board, args.frames, &args.breakpoints, bridge.as_mut())
    } else {
        run_gui(&mut board, args.scale as usize, args.mute, bridge.as_mut())
    };

    if let Some(path) = &args.eeprom {
        if board.eeprom.dirty || !path.exists() {
            if let Err(e) = board.save_eeprom_to(path) {
                error!("Failed to save EEPROM to {}: {}", path.display(), e);
            } else {
                info!("EEPROM saved to {}", path.display());
            }
        }
    }

    result
}

fn load_config(path: &Path) -> AppResult<Config> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let config: Config = toml::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(config)
}

// --- Audio ---

/// Mono square wave following the beeper frequency and volume.
struct SquareWave {
    frequency: Arc<AtomicU32>,
    volume: Arc<AtomicU32>,
    sample_rate: u32,
    phase: f32,
}

impl Iterator for SquareWave {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let freq = f32::from_bits(self.frequency.load(Ordering::Relaxed));
        if freq <= 0.0 {
            self.phase = 0.0;
            return Some(0.0);
        }
        let amplitude = AUDIO_AMPLITUDE * f32::from_bits(self.volume.load(Ordering::Relaxed));
        let sample = if self.phase < 0.5 { amplitude } else { -amplitude };
        self.phase = (self.phase + freq / self.sample_rate as f32) % 1.0;
        Some(sample)
    }
}

impl rodio::Source for SquareWave {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }
    fn channels(&self) -> u16 {
        1
    }
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

struct Beeper {
    frequency: Arc<AtomicU32>,
    volume: Arc<AtomicU32>,
    _output: Option<(rodio::OutputStream, rodio::Sink)>,
}

impl Beeper {
    fn new(enabled: bool) -> Self {
        let frequency = Arc::new(AtomicU32::new(0.0f32.to_bits()));
        let volume = Arc::new(AtomicU32::new(1.0f32.to_bits()));
        let output = if enabled { Self::open(frequency.clone(), volume.clone()) } else { None };
        Beeper { frequency, volume, _output: output }
    }

    fn open(frequency: Arc<AtomicU32>, volume: Arc<AtomicU32>) -> Option<(rodio::OutputStream, rodio::Sink)> {
        let (stream, handle) = match rodio::OutputStream::try_default() {
            Ok(output) => output,
            Err(e) => {
                warn!("Audio device unavailable: {}", e);
                return None;
            }
        };
        match rodio::Sink::try_new(&handle) {
            Ok(sink) => {
                sink.append(SquareWave { frequency, volume, sample_rate: AUDIO_SAMPLE_RATE, phase: 0.0 });
                Some((stream, sink))
            }
            Err(e) => {
                warn!("Audio sink unavailable: {}", e);
                None
            }
        }
    }

    fn update(&self, board: &Board) {
        let tone = board.audio();
        self.frequency.store(tone.frequency.to_bits(), Ordering::Relaxed);
        self.volume.store(tone.volume.to_bits(), Ordering::Relaxed);
    }
}

// --- Gamepad ---

#[derive(Default)]
struct GamepadState {
    left: bool,
    center: bool,
    right: bool,
}

fn poll_gamepad(gilrs: &mut Gilrs, state: &mut GamepadState) {
    while let Some(GilrsEvent { event, .. }) = gilrs.next_event() {
        match event {
            EventType::ButtonPressed(b, _) => apply_button(state, b, true),
            EventType::ButtonReleased(b, _) => apply_button(state, b, false),
            EventType::AxisChanged(Axis::DPadX | Axis::LeftStickX, v, _) => {
                state.left = v < -STICK_DEADZONE;
                state.right = v > STICK_DEADZONE;
            }
            EventType::Disconnected => *state = GamepadState::default(),
            _ => {}
        }
    }
}

fn apply_button(state: &mut GamepadState, button: GilrsButton, pressed: bool) {
    match button {
        GilrsButton::DPadLeft => state.left = pressed,
        GilrsButton::DPadRight => state.right = pressed,
        GilrsButton::South | GilrsButton::DPadDown => state.center = pressed,
        _ => {}
    }
}

/// Walker key currently held, left taking precedence.
fn held_key(window: &Window, gamepad: &GamepadState) -> Key {
    let down = |keys: &[WinKey]| keys.iter().any(|k| window.is_key_down(*k));
    if down(&[WinKey::Left, WinKey::A]) || gamepad.left {
        Key::Left
    } else if down(&[WinKey::Down, WinKey::S]) || gamepad.center {
        Key::Center
    } else if down(&[WinKey::Right, WinKey::D]) || gamepad.right {
        Key::Right
    } else {
        Key::None
    }
}

// --- GUI Mode ---

fn run_gui(board: &mut Board, scale: usize, mute: bool, mut bridge: Option<&mut IrBridge>) -> AppResult<()> {
    let width = SCREEN_WIDTH * scale;
    let height = SCREEN_HEIGHT * scale;
    let mut window = Window::new(
        "Pokéwalker",
        width,
        height,
        WindowOptions { scale: Scale::X1, scale_mode: ScaleMode::AspectRatioStretch, resize: true, ..Default::default() },
    )?;
    window.set_target_fps(60);

    let beeper = Beeper::new(!mute);
    let mut gilrs = match Gilrs::new() {
        Ok(g) => Some(g),
        Err(e) => {
            warn!("Gamepad support unavailable: {}", e);
            None
        }
    };
    let mut gamepad = GamepadState::default();
    let mut rewind = RewindBuffer::new(REWIND_CAPACITY, REWIND_INTERVAL);
    let mut scaled = vec![0u32; width * height];
    let mut last_key = Key::None;
    let mut prev_tab = false;
    let mut last_update = Instant::now();

    while window.is_open() && !window.is_key_down(WinKey::Escape) {
        if let Some(g) = gilrs.as_mut() {
            poll_gamepad(g, &mut gamepad);
        }

        let key = held_key(&window, &gamepad);
        if key != last_key && key != Key::None {
            board.push_key(key);
        }
        last_key = key;

        let tab = window.is_key_down(WinKey::Tab);
        if tab && !prev_tab {
            eprintln!("--- frame {} ---\n{}\nNext: {}", board.frame_count, board.dump_registers(), board.disassemble_at(board.cpu.regs.pc));
        }
        prev_tab = tab;

        let elapsed = last_update.elapsed();
        last_update = Instant::now();

        if window.is_key_down(WinKey::Backspace) {
            if let Some(snap) = rewind.pop() {
                board.restore_snapshot(&snap)?;
                draw(board, &mut scaled, scale);
            }
        } else {
            let budget = ((elapsed.as_secs_f64() * CPU_TICKS as f64) as u64).min(MAX_CYCLES_PER_UPDATE);
            let target = board.cycle + budget;
            while board.cycle < target {
                board.step()?;
                if board.frame_ready() {
                    draw(board, &mut scaled, scale);
                    if rewind.tick_frame() {
                        match board.save_snapshot() {
                            Ok(snap) => rewind.push(snap),
                            Err(e) => warn!("Rewind snapshot failed: {}", e),
                        }
                    }
                }
            }
        }

        if let Some(bridge) = bridge.as_deref_mut() {
            bridge.poll(board);
        } else {
            board.sci3.take_transmitted();
            board.sci3.take_packets();
        }
        beeper.update(board);

        window.update_with_buffer(&scaled, width, height)?;
    }

    info!("Stopped after {} frames, {} cycles", board.frame_count, board.cycle);
    Ok(())
}

fn draw(board: &Board, scaled: &mut [u32], scale: usize) {
    let pixels = board.lcd.as_pixel_buffer();
    let width = SCREEN_WIDTH * scale;
    for y in 0..SCREEN_HEIGHT {
        for x in 0..SCREEN_WIDTH {
            let c = pixels[y * SCREEN_WIDTH + x];
            for sy in 0..scale {
                let base = (y * scale + sy) * width + x * scale;
                scaled[base..base + scale].fill(c);
            }
        }
    }
}

// --- Headless Mode ---

fn run_headless(board: &mut Board, frames: u64, breakpoints: &[u32], mut bridge: Option<&mut IrBridge>) -> AppResult<()> {
    let end = frames * FRAME_CYCLES;
    'frames: while board.cycle < end {
        let frame_end = ((board.cycle / FRAME_CYCLES + 1) * FRAME_CYCLES).min(end);
        while board.cycle < frame_end {
            board.step()?;
            if breakpoints.contains(&(board.cpu.regs.pc & 0xFFFF)) {
                println!("*** Breakpoint: {} (frame {}) ***", board.disassemble_at(board.cpu.regs.pc), board.frame_count);
                println!("{}", board.dump_registers());
                break 'frames;
            }
        }
        if let Some(bridge) = bridge.as_deref_mut() {
            bridge.poll(board);
        }
    }
    println!("=== Frame {} ({} cycles) ===", board.frame_count, board.cycle);
    print_display(board);
    Ok(())
}

/// Lightest to darkest, indexed by the 2-bit pixel value.
const SHADES: [char; 4] = [' ', '░', '▒', '█'];

fn print_display(board: &Board) {
    let border: String = std::iter::repeat('-').take(SCREEN_WIDTH).collect();
    println!("+{}+", border);
    let palette = &board.config.palette;
    let pixels = board.lcd.as_pixel_buffer();
    for line in pixels.chunks_exact(SCREEN_WIDTH) {
        let row: String = line
            .iter()
            .map(|color| SHADES[palette.iter().position(|c| c == color).unwrap_or(0)])
            .collect();
        println!("|{}|", row);
    }
    println!("+{}+", border);
}

// --- Step Mode ---

fn run_step_mode(board: &mut Board, breakpoints: &[u32]) -> AppResult<()> {
    println!("Step mode: Enter=step, N<enter>=step N, r=run to break, d=dump, q=quit");
    println!("{}", board.dump_registers());
    println!("Next: {}", board.disassemble_at(board.cpu.regs.pc));

    let stdin = std::io::stdin();
    let mut steps = 0usize;
    loop {
        print!("step> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "q" | "quit" => break,
            "d" | "dump" => {
                println!("{}", board.dump_registers());
                continue;
            }
            "r" | "run" => {
                for _ in 0..RUN_LIMIT {
                    board.step()?;
                    steps += 1;
                    if breakpoints.contains(&(board.cpu.regs.pc & 0xFFFF)) {
                        println!("*** Breakpoint ***");
                        break;
                    }
                }
            }
            cmd => {
                let n: usize = cmd.parse().unwrap_or(1);
                for i in 0..n {
                    let listing = board.disassemble_at(board.cpu.regs.pc);
                    board.step()?;
                    steps += 1;
                    if n <= 20 {
                        println!("  {}", listing);
                    } else if i == n - 1 {
                        println!("  ... {} steps, last: {}", n, listing);
                    }
                }
            }
        }
        println!("{}", board.dump_registers());
        println!("Next: {}", board.disassemble_at(board.cpu.regs.pc));
    }
    println!("Total: {} steps, {} cycles", steps, board.cycle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_address() {
        assert_eq!(parse_hex_address("0x9C3E"), Ok(0x9C3E));
        assert_eq!(parse_hex_address("336"), Ok(0x0336));
        assert_eq!(parse_hex_address("1FFFF"), Ok(0xFFFF));
        assert!(parse_hex_address("zz").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "walker-emu", "rom.bin", "--eeprom", "save.bin", "--break", "0x0336", "--break", "9A4E", "--no-patches",
        ])
        .unwrap();
        assert_eq!(args.rom, PathBuf::from("rom.bin"));
        assert_eq!(args.breakpoints, vec![0x0336, 0x9A4E]);
        assert!(args.no_patches);
        assert_eq!(args.scale, 6);
        assert_eq!(args.frames, 40);
    }

    #[test]
    fn test_ir_modes_conflict() {
        let result =
            Args::try_parse_from(["walker-emu", "rom.bin", "--ir-connect", "127.0.0.1:9000", "--ir-listen", "9000"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_overlay() {
        let config: Config = toml::from_str("rom_patches = false\nwatts_top_up = 50\n").unwrap();
        assert!(!config.rom_patches);
        assert_eq!(config.watts_top_up, 50);
        assert_eq!(config.palette, Config::default().palette);
    }

    #[test]
    fn test_square_wave_silent_and_toggling() {
        let frequency = Arc::new(AtomicU32::new(0.0f32.to_bits()));
        let volume = Arc::new(AtomicU32::new(1.0f32.to_bits()));
        let mut wave = SquareWave { frequency: frequency.clone(), volume, sample_rate: 8, phase: 0.0 };
        assert_eq!(wave.next(), Some(0.0));

        frequency.store(2.0f32.to_bits(), Ordering::Relaxed);
        let samples: Vec<f32> = wave.by_ref().take(4).collect();
        assert_eq!(samples, vec![AUDIO_AMPLITUDE, AUDIO_AMPLITUDE, -AUDIO_AMPLITUDE, -AUDIO_AMPLITUDE]);
    }
}
