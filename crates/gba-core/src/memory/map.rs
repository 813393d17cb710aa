//! Fixed memory-region map and address decoding helpers.

/// Inclusive start address of the boot ROM.
pub const BIOS_START: u32 = 0x0000_0000;
/// Inclusive end address of the boot ROM.
pub const BIOS_END: u32 = 0x0000_3FFF;
/// Inclusive start address of on-board work RAM.
pub const EWRAM_START: u32 = 0x0200_0000;
/// Inclusive end address of the on-board work RAM mirror window.
pub const EWRAM_END: u32 = 0x02FF_FFFF;
/// Inclusive start address of on-chip work RAM.
pub const IWRAM_START: u32 = 0x0300_0000;
/// Inclusive end address of the on-chip work RAM mirror window.
pub const IWRAM_END: u32 = 0x03FF_FFFF;
/// Inclusive start address of the I/O register file.
pub const IO_START: u32 = 0x0400_0000;
/// Inclusive end address of the I/O register file.
pub const IO_END: u32 = 0x0400_03FF;
/// Inclusive start address of palette RAM.
pub const PALETTE_START: u32 = 0x0500_0000;
/// Inclusive end address of the palette RAM mirror window.
pub const PALETTE_END: u32 = 0x05FF_FFFF;
/// Inclusive start address of video RAM.
pub const VRAM_START: u32 = 0x0600_0000;
/// Inclusive end address of the video RAM mirror window.
pub const VRAM_END: u32 = 0x06FF_FFFF;
/// Inclusive start address of object attribute memory.
pub const OAM_START: u32 = 0x0700_0000;
/// Inclusive end address of the OAM mirror window.
pub const OAM_END: u32 = 0x07FF_FFFF;
/// Inclusive start address of the Game Pak ROM (wait state 0).
pub const ROM_START: u32 = 0x0800_0000;
/// Inclusive end address of the last Game Pak ROM wait-state mirror.
pub const ROM_END: u32 = 0x0DFF_FFFF;
/// Inclusive start address of Game Pak SRAM.
pub const SRAM_START: u32 = 0x0E00_0000;
/// Inclusive end address of the Game Pak SRAM mirror window.
pub const SRAM_END: u32 = 0x0FFF_FFFF;

/// Boot ROM size in bytes.
pub const BIOS_SIZE: usize = 0x4000;
/// On-board work RAM size in bytes.
pub const EWRAM_SIZE: usize = 0x4_0000;
/// On-chip work RAM size in bytes.
pub const IWRAM_SIZE: usize = 0x8000;
/// I/O register file size in bytes.
pub const IO_SIZE: usize = 0x400;
/// Palette RAM size in bytes.
pub const PALETTE_SIZE: usize = 0x400;
/// Video RAM size in bytes.
pub const VRAM_SIZE: usize = 0x1_8000;
/// Object attribute memory size in bytes.
pub const OAM_SIZE: usize = 0x400;
/// Largest Game Pak ROM image accepted by the bus.
pub const ROM_MAX_SIZE: usize = 0x0200_0000;
/// Game Pak SRAM size in bytes.
pub const SRAM_SIZE: usize = 0x1_0000;

/// Value returned for reads that hit no backing storage.
pub const OPEN_BUS_VALUE: u32 = 0;

/// Canonical region descriptor for one contiguous slice of the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegionDescriptor {
    /// Region classification.
    pub region: MemoryRegion,
    /// Inclusive start address.
    pub start: u32,
    /// Inclusive end address.
    pub end: u32,
}

/// Region classification for bus addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryRegion {
    /// Boot ROM holding the exception vectors.
    Bios,
    /// 256 KiB on-board work RAM.
    Ewram,
    /// 32 KiB on-chip work RAM.
    Iwram,
    /// Memory-mapped I/O registers.
    Io,
    /// Background and object palettes.
    Palette,
    /// Tile, map and bitmap storage.
    Vram,
    /// Object attribute memory.
    Oam,
    /// Cartridge ROM and its wait-state mirrors.
    GamePak,
    /// Cartridge battery-backed SRAM.
    Sram,
    /// No backing storage; reads return [`OPEN_BUS_VALUE`].
    OpenBus,
}

impl MemoryRegion {
    /// Returns the byte offset of `addr` within this region's backing store,
    /// folding mirrors. Open bus has no backing store.
    #[must_use]
    pub const fn offset(self, addr: u32) -> Option<usize> {
        let offset = match self {
            Self::Bios => addr & 0x3FFF,
            Self::Ewram => addr & 0x3_FFFF,
            Self::Iwram => addr & 0x7FFF,
            Self::Io | Self::Palette | Self::Oam => addr & 0x3FF,
            Self::Vram => {
                let folded = addr & 0x1_FFFF;
                if folded >= 0x1_8000 {
                    folded - 0x8000
                } else {
                    folded
                }
            }
            Self::GamePak => addr & 0x01FF_FFFF,
            Self::Sram => addr & 0xFFFF,
            Self::OpenBus => return None,
        };
        Some(offset as usize)
    }

    /// Returns `true` when writes to this region reach backing storage.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        !matches!(self, Self::Bios | Self::GamePak | Self::OpenBus)
    }
}

/// Region layout in ascending address order, covering all 32-bit addresses.
pub const FIXED_MEMORY_REGIONS: [RegionDescriptor; 12] = [
    descriptor(MemoryRegion::Bios, BIOS_START, BIOS_END),
    descriptor(MemoryRegion::OpenBus, BIOS_END + 1, EWRAM_START - 1),
    descriptor(MemoryRegion::Ewram, EWRAM_START, EWRAM_END),
    descriptor(MemoryRegion::Iwram, IWRAM_START, IWRAM_END),
    descriptor(MemoryRegion::Io, IO_START, IO_END),
    descriptor(MemoryRegion::OpenBus, IO_END + 1, PALETTE_START - 1),
    descriptor(MemoryRegion::Palette, PALETTE_START, PALETTE_END),
    descriptor(MemoryRegion::Vram, VRAM_START, VRAM_END),
    descriptor(MemoryRegion::Oam, OAM_START, OAM_END),
    descriptor(MemoryRegion::GamePak, ROM_START, ROM_END),
    descriptor(MemoryRegion::Sram, SRAM_START, SRAM_END),
    descriptor(MemoryRegion::OpenBus, SRAM_END + 1, u32::MAX),
];

const fn descriptor(region: MemoryRegion, start: u32, end: u32) -> RegionDescriptor {
    RegionDescriptor { region, start, end }
}

const _: () = assert_fixed_region_layout();

const fn assert_fixed_region_layout() {
    assert!(
        FIXED_MEMORY_REGIONS[0].start == 0,
        "region map must start at address zero"
    );

    let mut index = 1;
    while index < FIXED_MEMORY_REGIONS.len() {
        let prev = FIXED_MEMORY_REGIONS[index - 1];
        let curr = FIXED_MEMORY_REGIONS[index];
        assert!(prev.start <= prev.end, "region bounds must be ordered");
        assert!(
            prev.end + 1 == curr.start,
            "regions must be contiguous and non-overlapping"
        );
        index += 1;
    }

    assert!(
        FIXED_MEMORY_REGIONS[FIXED_MEMORY_REGIONS.len() - 1].end == u32::MAX,
        "region map must reach the top of the address space"
    );
}

/// Decodes an address into its region. Every address above [`SRAM_END`]
/// is open bus.
#[must_use]
pub const fn decode_memory_region(addr: u32) -> MemoryRegion {
    match addr {
        BIOS_START..=BIOS_END => MemoryRegion::Bios,
        EWRAM_START..=EWRAM_END => MemoryRegion::Ewram,
        IWRAM_START..=IWRAM_END => MemoryRegion::Iwram,
        IO_START..=IO_END => MemoryRegion::Io,
        PALETTE_START..=PALETTE_END => MemoryRegion::Palette,
        VRAM_START..=VRAM_END => MemoryRegion::Vram,
        OAM_START..=OAM_END => MemoryRegion::Oam,
        ROM_START..=ROM_END => MemoryRegion::GamePak,
        SRAM_START..=SRAM_END => MemoryRegion::Sram,
        _ => MemoryRegion::OpenBus,
    }
}
