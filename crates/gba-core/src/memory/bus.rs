//! Unified address bus over the fixed region map.

use super::io::IoRegisters;
use super::map::{
    decode_memory_region, MemoryRegion, BIOS_SIZE, EWRAM_SIZE, IWRAM_SIZE, OAM_SIZE,
    OPEN_BUS_VALUE, PALETTE_SIZE, ROM_MAX_SIZE, SRAM_SIZE, VRAM_SIZE,
};
use crate::boot::BOOT_ROM;

/// Byte-addressed memory seen by the CPU.
///
/// Halfword and word accessors take already-aligned addresses; rotation of
/// misaligned loads is the CPU's concern.
pub trait MemoryBus {
    /// Reads one byte.
    fn read8(&self, addr: u32) -> u8;
    /// Reads the little-endian halfword at `addr & !1`.
    fn read16(&self, addr: u32) -> u16;
    /// Reads the little-endian word at `addr & !3`.
    fn read32(&self, addr: u32) -> u32;
    /// Writes one byte.
    fn write8(&mut self, addr: u32, value: u8);
    /// Writes the halfword at `addr & !1`.
    fn write16(&mut self, addr: u32, value: u16);
    /// Writes the word at `addr & !3`.
    fn write32(&mut self, addr: u32, value: u32);
}

/// Owned copy of the inspectable memory regions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemorySnapshot {
    /// Video RAM contents.
    pub vram: Vec<u8>,
    /// Palette RAM contents.
    pub palette: Vec<u8>,
    /// Object attribute memory contents.
    pub oam: Vec<u8>,
    /// I/O register file contents.
    pub io: Vec<u8>,
}

/// Backing storage for every region plus the I/O register file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bus {
    bios: Box<[u8]>,
    ewram: Box<[u8]>,
    iwram: Box<[u8]>,
    /// Memory-mapped I/O registers.
    pub io: IoRegisters,
    palette: Box<[u8]>,
    vram: Box<[u8]>,
    oam: Box<[u8]>,
    rom: Vec<u8>,
    sram: Box<[u8]>,
}

impl Default for Bus {
    fn default() -> Self {
        let mut bios = vec![0; BIOS_SIZE].into_boxed_slice();
        for (chunk, word) in bios.chunks_exact_mut(4).zip(BOOT_ROM) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }

        Self {
            bios,
            ewram: vec![0; EWRAM_SIZE].into_boxed_slice(),
            iwram: vec![0; IWRAM_SIZE].into_boxed_slice(),
            io: IoRegisters::default(),
            palette: vec![0; PALETTE_SIZE].into_boxed_slice(),
            vram: vec![0; VRAM_SIZE].into_boxed_slice(),
            oam: vec![0; OAM_SIZE].into_boxed_slice(),
            rom: Vec::new(),
            sram: vec![0; SRAM_SIZE].into_boxed_slice(),
        }
    }
}

impl Bus {
    /// Replaces the Game Pak ROM with `bytes`, truncated to the 32 MiB window.
    pub fn load_rom(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(ROM_MAX_SIZE);
        self.rom = bytes[..len].to_vec();
    }

    /// Length of the loaded Game Pak ROM image.
    #[must_use]
    pub fn rom_len(&self) -> usize {
        self.rom.len()
    }

    /// Reads the word containing `addr`, rotated so the addressed byte is
    /// in the low lane.
    #[must_use]
    pub fn read_address(&self, addr: u32) -> u32 {
        self.read32(addr).rotate_right(8 * (addr & 3))
    }

    /// Reads the halfword containing `addr`, rotated by a byte when `addr`
    /// is odd.
    #[must_use]
    pub fn read_halfword(&self, addr: u32) -> u32 {
        u32::from(self.read16(addr)).rotate_right(8 * (addr & 1))
    }

    /// Palette RAM contents.
    #[must_use]
    pub fn palette(&self) -> &[u8] {
        &self.palette[..]
    }

    /// Video RAM contents.
    #[must_use]
    pub fn vram(&self) -> &[u8] {
        &self.vram[..]
    }

    /// Object attribute memory contents.
    #[must_use]
    pub fn oam(&self) -> &[u8] {
        &self.oam[..]
    }

    /// Copies the inspectable regions.
    #[must_use]
    pub fn inspect(&self) -> MemorySnapshot {
        MemorySnapshot {
            vram: self.vram.to_vec(),
            palette: self.palette.to_vec(),
            oam: self.oam.to_vec(),
            io: self.io.as_bytes().to_vec(),
        }
    }

    fn storage(&self, region: MemoryRegion) -> &[u8] {
        match region {
            MemoryRegion::Bios => &self.bios[..],
            MemoryRegion::Ewram => &self.ewram[..],
            MemoryRegion::Iwram => &self.iwram[..],
            MemoryRegion::Io => &self.io.as_bytes()[..],
            MemoryRegion::Palette => &self.palette[..],
            MemoryRegion::Vram => &self.vram[..],
            MemoryRegion::Oam => &self.oam[..],
            MemoryRegion::GamePak => &self.rom[..],
            MemoryRegion::Sram => &self.sram[..],
            MemoryRegion::OpenBus => &[],
        }
    }

    fn storage_mut(&mut self, region: MemoryRegion) -> Option<&mut [u8]> {
        match region {
            MemoryRegion::Ewram => Some(&mut self.ewram[..]),
            MemoryRegion::Iwram => Some(&mut self.iwram[..]),
            MemoryRegion::Palette => Some(&mut self.palette[..]),
            MemoryRegion::Vram => Some(&mut self.vram[..]),
            MemoryRegion::Oam => Some(&mut self.oam[..]),
            MemoryRegion::Sram => Some(&mut self.sram[..]),
            MemoryRegion::Bios
            | MemoryRegion::Io
            | MemoryRegion::GamePak
            | MemoryRegion::OpenBus => None,
        }
    }

    fn store8(&mut self, addr: u32, value: u8) {
        let region = decode_memory_region(addr);
        if !region.is_writable() {
            log::trace!("dropped write to {region:?} at {addr:#010X}");
            return;
        }
        if let (Some(offset), Some(storage)) = (region.offset(addr), self.storage_mut(region)) {
            if let Some(slot) = storage.get_mut(offset) {
                *slot = value;
            }
        }
    }
}

impl MemoryBus for Bus {
    fn read8(&self, addr: u32) -> u8 {
        let region = decode_memory_region(addr);
        if region == MemoryRegion::Io {
            return self.io.cpu_read_byte((addr & 0x3FF) as usize);
        }
        region
            .offset(addr)
            .and_then(|offset| self.storage(region).get(offset).copied())
            .unwrap_or(OPEN_BUS_VALUE as u8)
    }

    fn read16(&self, addr: u32) -> u16 {
        let base = addr & !1;
        u16::from_le_bytes([self.read8(base), self.read8(base | 1)])
    }

    fn read32(&self, addr: u32) -> u32 {
        let base = addr & !3;
        u32::from_le_bytes([
            self.read8(base),
            self.read8(base | 1),
            self.read8(base | 2),
            self.read8(base | 3),
        ])
    }

    fn write8(&mut self, addr: u32, value: u8) {
        match decode_memory_region(addr) {
            MemoryRegion::Io => self.io.write_byte((addr & 0x3FF) as usize, value),
            MemoryRegion::Palette | MemoryRegion::Vram => {
                self.write16(addr, u16::from_le_bytes([value, value]));
            }
            MemoryRegion::Oam => {}
            _ => self.store8(addr, value),
        }
    }

    fn write16(&mut self, addr: u32, value: u16) {
        let base = addr & !1;
        if decode_memory_region(base) == MemoryRegion::Io {
            self.io.write_halfword((base & 0x3FF) as usize, value);
            return;
        }
        let [lo, hi] = value.to_le_bytes();
        self.store8(base, lo);
        self.store8(base | 1, hi);
    }

    fn write32(&mut self, addr: u32, value: u32) {
        let base = addr & !3;
        self.write16(base, value as u16);
        self.write16(base | 2, (value >> 16) as u16);
    }
}
