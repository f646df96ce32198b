//! Board configuration.
//!
//! Every field has a default, so a TOML overlay only needs the keys it
//! changes:
//!
//! ```toml
//! rom_patches = true
//! watts_top_up = 1000
//! ir_packet_idle_cycles = 18432
//! palette = [0xCCCCCC, 0x999999, 0x666666, 0x333333]
//! ```

use serde::{Deserialize, Serialize};

use crate::lcd::DEFAULT_PALETTE;
use crate::peripherals::sci3::DEFAULT_PACKET_IDLE_CYCLES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Install the walker ROM address hooks.
    pub rom_patches: bool,
    /// Written to the watts counter when the firmware finds it empty.
    pub watts_top_up: u16,
    /// CPU cycles of infrared silence that end a packet.
    pub ir_packet_idle_cycles: u64,
    /// 0xRRGGBB per LCD grey level, lightest first.
    pub palette: [u32; 4],
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rom_patches: true,
            watts_top_up: 1000,
            ir_packet_idle_cycles: DEFAULT_PACKET_IDLE_CYCLES,
            palette: DEFAULT_PALETTE,
        }
    }
}
