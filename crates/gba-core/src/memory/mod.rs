//! Address bus, fixed region map and I/O register file.

/// Unified bus over all regions.
pub mod bus;
/// I/O register file, keys and interrupt sources.
pub mod io;
/// Fixed memory-region map and address decoder.
pub mod map;

pub use bus::{Bus, MemoryBus, MemorySnapshot};
pub use io::{Interrupt, IoRegisters, Key, KEYINPUT_IDLE};
pub use map::{
    decode_memory_region, MemoryRegion, RegionDescriptor, BIOS_END, BIOS_START, EWRAM_END,
    EWRAM_START, FIXED_MEMORY_REGIONS, IO_END, IO_START, IWRAM_END, IWRAM_START, OAM_END,
    OAM_START, OPEN_BUS_VALUE, PALETTE_END, PALETTE_START, ROM_END, ROM_MAX_SIZE, ROM_START,
    SRAM_END, SRAM_START, VRAM_END, VRAM_START,
};
