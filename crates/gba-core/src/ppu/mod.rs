//! Picture-processing unit: background model, scanline clock, frame
//! composition and debug views.

mod clock;
mod debug;
mod render;

pub use clock::{
    PpuClock, CYCLES_PER_DOT, CYCLES_PER_LINE, DOTS_PER_LINE, HBLANK_START_DOT, LINES_PER_FRAME,
    VBLANK_END_LINE, VBLANK_START_LINE,
};
pub use debug::{debug_bg_tilemap, palette_dump, tile_dump, tilemap, LayerImage};
pub use render::{bgr555_to_rgba, render_frame};

use crate::memory::io::{REG_BG0CNT, REG_DISPCNT};
use crate::memory::{Bus, IoRegisters};

/// Visible screen width in pixels.
pub const SCREEN_WIDTH: usize = 240;
/// Visible screen height in pixels.
pub const SCREEN_HEIGHT: usize = 160;
/// Size of an RGBA8 frame in bytes.
pub const FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 4;
/// Number of background layers.
pub const BACKGROUND_COUNT: usize = 4;

/// DISPCNT forced-blank bit.
pub const DISPCNT_FORCED_BLANK: u16 = 1 << 7;
/// DISPCNT display-frame select bit for modes 4 and 5.
pub const DISPCNT_FRAME_SELECT: u16 = 1 << 4;

const CHARACTER_BLOCK_BYTES: usize = 0x4000;
const SCREEN_BLOCK_BYTES: usize = 0x800;

/// BGxCNT screen-size field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ScreenSize {
    /// Text 256×256, affine 128×128.
    #[default]
    Size0,
    /// Text 512×256, affine 256×256.
    Size1,
    /// Text 256×512, affine 512×512.
    Size2,
    /// Text 512×512, affine 1024×1024.
    Size3,
}

impl ScreenSize {
    /// Decodes BGxCNT bits 14–15.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => Self::Size0,
            1 => Self::Size1,
            2 => Self::Size2,
            _ => Self::Size3,
        }
    }

    /// Text-background dimensions in pixels.
    #[must_use]
    pub const fn text_dimensions(self) -> (u32, u32) {
        match self {
            Self::Size0 => (256, 256),
            Self::Size1 => (512, 256),
            Self::Size2 => (256, 512),
            Self::Size3 => (512, 512),
        }
    }

    /// Affine-background edge length in pixels.
    #[must_use]
    pub const fn affine_dimension(self) -> u32 {
        128 << self as u32
    }
}

/// Tile colour depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ColorMode {
    /// 4 bits per pixel, sixteen palettes of sixteen colours.
    #[default]
    Colors16,
    /// 8 bits per pixel, one palette of 256 colours.
    Colors256,
}

/// Decoded background control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BackgroundInfo {
    /// Drawing priority; lower values are drawn on top.
    pub priority: u8,
    /// Tile data base in 16 KiB units.
    pub character_base_block: u8,
    /// Tile map base in 2 KiB units.
    pub screen_base_block: u8,
    /// Map dimensions.
    pub screen_size: ScreenSize,
    /// Tile colour depth.
    pub color_mode: ColorMode,
    /// Mosaic enabled.
    pub mosaic: bool,
    /// Affine wraparound.
    pub wraparound: bool,
    /// DISPCNT display bit for this layer.
    pub enabled: bool,
}

impl BackgroundInfo {
    /// Decodes a BGxCNT value plus the layer's DISPCNT enable bit.
    #[must_use]
    pub const fn from_registers(control: u16, enabled: bool) -> Self {
        Self {
            priority: (control & 0b11) as u8,
            character_base_block: ((control >> 2) & 0b11) as u8,
            screen_base_block: ((control >> 8) & 0x1F) as u8,
            screen_size: ScreenSize::from_bits(control >> 14),
            color_mode: if control & (1 << 7) == 0 {
                ColorMode::Colors16
            } else {
                ColorMode::Colors256
            },
            mosaic: control & (1 << 6) != 0,
            wraparound: control & (1 << 13) != 0,
            enabled,
        }
    }

    /// Byte offset of the tile data in VRAM.
    #[must_use]
    pub const fn character_base(&self) -> usize {
        self.character_base_block as usize * CHARACTER_BLOCK_BYTES
    }

    /// Byte offset of the tile map in VRAM.
    #[must_use]
    pub const fn screen_base(&self) -> usize {
        self.screen_base_block as usize * SCREEN_BLOCK_BYTES
    }
}

/// Borrowed view of everything the renderer reads.
#[derive(Debug, Clone, Copy)]
pub struct VideoMemory<'a> {
    /// I/O register file.
    pub io: &'a IoRegisters,
    /// Video RAM.
    pub vram: &'a [u8],
    /// Palette RAM.
    pub palette: &'a [u8],
}

impl<'a> VideoMemory<'a> {
    /// Borrows the video state of `bus`.
    #[must_use]
    pub fn from_bus(bus: &'a Bus) -> Self {
        Self {
            io: &bus.io,
            vram: bus.vram(),
            palette: bus.palette(),
        }
    }

    /// Current DISPCNT.
    #[must_use]
    pub const fn dispcnt(&self) -> u16 {
        self.io.read_halfword(REG_DISPCNT)
    }

    /// Background mode (DISPCNT bits 0–2).
    #[must_use]
    pub const fn bg_mode(&self) -> u8 {
        (self.dispcnt() & 0b111) as u8
    }

    /// Background record for `index`, or `None` when `index >= 4`.
    #[must_use]
    pub const fn background(&self, index: usize) -> Option<BackgroundInfo> {
        if index >= BACKGROUND_COUNT {
            return None;
        }
        let control = self.io.read_halfword(REG_BG0CNT + index * 2);
        let enabled = self.dispcnt() & (1 << (8 + index)) != 0;
        Some(BackgroundInfo::from_registers(control, enabled))
    }

    /// All four background records.
    #[must_use]
    pub fn backgrounds(&self) -> [BackgroundInfo; BACKGROUND_COUNT] {
        std::array::from_fn(|index| self.background(index).unwrap_or_default())
    }

    /// Reads a VRAM byte; offsets past the end read as zero.
    #[must_use]
    pub fn vram8(&self, offset: usize) -> u8 {
        self.vram.get(offset).copied().unwrap_or(0)
    }

    /// Reads a little-endian VRAM halfword.
    #[must_use]
    pub fn vram16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.vram8(offset), self.vram8(offset + 1)])
    }

    /// Reads palette entry `index` (0–511) as BGR555.
    #[must_use]
    pub fn palette_color(&self, index: usize) -> u16 {
        let offset = (index % 512) * 2;
        u16::from_le_bytes([
            self.palette.get(offset).copied().unwrap_or(0),
            self.palette.get(offset + 1).copied().unwrap_or(0),
        ])
    }
}

/// How a background layer is drawn in a given mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LayerKind {
    Text,
    Affine,
    Bitmap,
}

/// Layer kind of background `index` in `mode`, or `None` when the mode does
/// not draw it.
pub(crate) const fn layer_kind(mode: u8, index: usize) -> Option<LayerKind> {
    match (mode, index) {
        (0, 0..=3) | (1, 0 | 1) => Some(LayerKind::Text),
        (1, 2) | (2, 2 | 3) => Some(LayerKind::Affine),
        (3..=5, 2) => Some(LayerKind::Bitmap),
        _ => None,
    }
}
