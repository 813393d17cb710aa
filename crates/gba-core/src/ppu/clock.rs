use crate::memory::io::{REG_DISPSTAT, REG_VCOUNT};
use crate::memory::{Interrupt, IoRegisters};

/// CPU cycles per pixel dot.
pub const CYCLES_PER_DOT: u32 = 4;
/// Dots per scanline, visible and blanking.
pub const DOTS_PER_LINE: u32 = 308;
/// Dot at which horizontal blanking begins.
pub const HBLANK_START_DOT: u32 = 240;
/// Scanlines per frame, visible and blanking.
pub const LINES_PER_FRAME: u16 = 228;
/// First vertical-blank line.
pub const VBLANK_START_LINE: u16 = 160;
/// Line on which the vertical-blank flag drops.
pub const VBLANK_END_LINE: u16 = 227;
/// CPU cycles per scanline.
pub const CYCLES_PER_LINE: u32 = DOTS_PER_LINE * CYCLES_PER_DOT;

const HBLANK_START_CYCLE: u32 = HBLANK_START_DOT * CYCLES_PER_DOT;

const DISPSTAT_VBLANK: u16 = 1 << 0;
const DISPSTAT_HBLANK: u16 = 1 << 1;
const DISPSTAT_VCOUNT_MATCH: u16 = 1 << 2;
const DISPSTAT_VBLANK_IRQ: u16 = 1 << 3;
const DISPSTAT_HBLANK_IRQ: u16 = 1 << 4;
const DISPSTAT_VCOUNT_IRQ: u16 = 1 << 5;

/// Scanline position of the video unit.
///
/// The clock only tracks timing; pixels are composed on demand by
/// [`render_frame`](super::render_frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PpuClock {
    cycle_in_line: u32,
    line: u16,
    frame: u64,
}

impl PpuClock {
    /// Clock at the top-left dot of frame zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cycle_in_line: 0,
            line: 0,
            frame: 0,
        }
    }

    /// Current scanline (VCOUNT).
    #[must_use]
    pub const fn line(&self) -> u16 {
        self.line
    }

    /// Current dot within the scanline.
    #[must_use]
    pub const fn dot(&self) -> u32 {
        self.cycle_in_line / CYCLES_PER_DOT
    }

    /// Number of vertical blanks entered so far.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Advances by `cycles`, updating DISPSTAT/VCOUNT and raising the
    /// enabled video interrupts. Returns `true` when a vertical blank began.
    pub fn advance(&mut self, io: &mut IoRegisters, cycles: u32) -> bool {
        let mut remaining = cycles;
        let mut entered_vblank = false;
        while remaining > 0 {
            let boundary = if self.cycle_in_line < HBLANK_START_CYCLE {
                HBLANK_START_CYCLE
            } else {
                CYCLES_PER_LINE
            };
            let step = remaining.min(boundary - self.cycle_in_line);
            self.cycle_in_line += step;
            remaining -= step;

            if self.cycle_in_line == HBLANK_START_CYCLE {
                Self::enter_hblank(io);
            } else if self.cycle_in_line == CYCLES_PER_LINE {
                self.cycle_in_line = 0;
                entered_vblank |= self.next_line(io);
            }
        }
        entered_vblank
    }

    fn enter_hblank(io: &mut IoRegisters) {
        let status = io.read_halfword(REG_DISPSTAT) | DISPSTAT_HBLANK;
        io.store_halfword(REG_DISPSTAT, status);
        if status & DISPSTAT_HBLANK_IRQ != 0 {
            io.request_interrupt(Interrupt::HBlank);
        }
    }

    fn next_line(&mut self, io: &mut IoRegisters) -> bool {
        self.line += 1;
        if self.line == LINES_PER_FRAME {
            self.line = 0;
        }
        io.store_halfword(REG_VCOUNT, self.line);

        let mut status = io.read_halfword(REG_DISPSTAT) & !DISPSTAT_HBLANK;
        let mut entered_vblank = false;
        if self.line == VBLANK_START_LINE {
            status |= DISPSTAT_VBLANK;
            self.frame += 1;
            entered_vblank = true;
            if status & DISPSTAT_VBLANK_IRQ != 0 {
                io.request_interrupt(Interrupt::VBlank);
            }
        } else if self.line == VBLANK_END_LINE {
            status &= !DISPSTAT_VBLANK;
        }

        if self.line == status >> 8 {
            status |= DISPSTAT_VCOUNT_MATCH;
            if status & DISPSTAT_VCOUNT_IRQ != 0 {
                io.request_interrupt(Interrupt::VCount);
            }
        } else {
            status &= !DISPSTAT_VCOUNT_MATCH;
        }
        io.store_halfword(REG_DISPSTAT, status);
        entered_vblank
    }
}
