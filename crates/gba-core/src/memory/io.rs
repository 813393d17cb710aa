//! Memory-mapped I/O register file.
//!
//! Registers are stored as raw little-endian bytes; the handful with side
//! effects (read-only status bits, write-1-to-clear `IF`, `HALTCNT`) are
//! special-cased per byte so every access width behaves the same way.

use super::map::IO_SIZE;

/// LCD control.
pub const REG_DISPCNT: usize = 0x000;
/// LCD status.
pub const REG_DISPSTAT: usize = 0x004;
/// Current scanline.
pub const REG_VCOUNT: usize = 0x006;
/// Background 0 control; BG1..BG3 follow at 2-byte strides.
pub const REG_BG0CNT: usize = 0x008;
/// Background 0 horizontal scroll; each background has a HOFS/VOFS pair.
pub const REG_BG0HOFS: usize = 0x010;
/// Background 2 affine parameter A; B, C, D, X and Y follow.
pub const REG_BG2PA: usize = 0x020;
/// Background 3 affine parameter A; B, C, D, X and Y follow.
pub const REG_BG3PA: usize = 0x030;
/// Mosaic sizes.
pub const REG_MOSAIC: usize = 0x04C;
/// Key status, active low.
pub const REG_KEYINPUT: usize = 0x130;
/// Key interrupt control.
pub const REG_KEYCNT: usize = 0x132;
/// Interrupt enable.
pub const REG_IE: usize = 0x200;
/// Interrupt request flags.
pub const REG_IF: usize = 0x202;
/// Interrupt master enable.
pub const REG_IME: usize = 0x208;
/// Low-power mode control.
pub const REG_HALTCNT: usize = 0x301;

/// KEYINPUT value with no key held.
pub const KEYINPUT_IDLE: u16 = 0x03FF;

const DISPSTAT_READ_ONLY_MASK: u8 = 0b0000_0111;
const INTERRUPT_MASK: u16 = 0x3FFF;

/// Hardware button, numbered by its KEYINPUT bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Key {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Right = 4,
    Left = 5,
    Up = 6,
    Down = 7,
    R = 8,
    L = 9,
}

impl Key {
    /// All keys in KEYINPUT bit order.
    pub const ALL: [Self; 10] = [
        Self::A,
        Self::B,
        Self::Select,
        Self::Start,
        Self::Right,
        Self::Left,
        Self::Up,
        Self::Down,
        Self::R,
        Self::L,
    ];

    /// Returns the KEYINPUT bit mask for this key.
    #[must_use]
    pub const fn mask(self) -> u16 {
        1 << self as u16
    }

    /// Maps a KEYINPUT bit index back to a key.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if (index as usize) < Self::ALL.len() {
            Some(Self::ALL[index as usize])
        } else {
            None
        }
    }
}

/// Interrupt source, numbered by its IE/IF bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Interrupt {
    VBlank = 0,
    HBlank = 1,
    VCount = 2,
    Timer0 = 3,
    Timer1 = 4,
    Timer2 = 5,
    Timer3 = 6,
    Serial = 7,
    Dma0 = 8,
    Dma1 = 9,
    Dma2 = 10,
    Dma3 = 11,
    Keypad = 12,
    GamePak = 13,
}

impl Interrupt {
    /// Returns the IE/IF bit mask for this source.
    #[must_use]
    pub const fn mask(self) -> u16 {
        1 << self as u16
    }
}

/// Raw I/O register storage plus the latched halt request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoRegisters {
    bytes: [u8; IO_SIZE],
    halt_requested: bool,
}

impl Default for IoRegisters {
    fn default() -> Self {
        let mut io = Self {
            bytes: [0; IO_SIZE],
            halt_requested: false,
        };
        io.store_halfword(REG_KEYINPUT, KEYINPUT_IDLE);
        io
    }
}

const fn is_write_only(offset: usize) -> bool {
    (offset >= REG_BG0HOFS && offset < REG_BG3PA + 0x10)
        || offset == REG_MOSAIC
        || offset == REG_MOSAIC + 1
        || offset == REG_HALTCNT
}

impl IoRegisters {
    /// Returns the raw register bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; IO_SIZE] {
        &self.bytes
    }

    /// Reads one register byte. Offsets wrap at the register file size.
    #[must_use]
    pub const fn read_byte(&self, offset: usize) -> u8 {
        self.bytes[offset % IO_SIZE]
    }

    /// Reads one register byte as the CPU sees it. Write-only registers
    /// (scroll, affine parameters, MOSAIC, HALTCNT) read as zero; their
    /// stored values stay visible to the renderer through
    /// [`Self::read_halfword`].
    #[must_use]
    pub const fn cpu_read_byte(&self, offset: usize) -> u8 {
        let offset = offset % IO_SIZE;
        if is_write_only(offset) {
            0
        } else {
            self.bytes[offset]
        }
    }

    /// Reads the little-endian halfword at `offset & !1`.
    #[must_use]
    pub const fn read_halfword(&self, offset: usize) -> u16 {
        let base = offset & !1;
        u16::from_le_bytes([self.read_byte(base), self.read_byte(base + 1)])
    }

    /// Writes one byte as the CPU sees it, honouring read-only and
    /// write-1-to-clear registers.
    pub fn write_byte(&mut self, offset: usize, value: u8) {
        let offset = offset % IO_SIZE;
        match offset {
            REG_DISPSTAT => {
                let kept = self.bytes[offset] & DISPSTAT_READ_ONLY_MASK;
                self.bytes[offset] = kept | (value & !DISPSTAT_READ_ONLY_MASK);
            }
            o if o == REG_VCOUNT || o == REG_VCOUNT + 1 => {}
            o if o == REG_KEYINPUT || o == REG_KEYINPUT + 1 => {}
            o if o == REG_IF || o == REG_IF + 1 => self.bytes[offset] &= !value,
            REG_HALTCNT => {
                self.bytes[offset] = value;
                self.halt_requested = true;
            }
            _ => self.bytes[offset] = value,
        }
    }

    /// Writes a halfword through [`Self::write_byte`].
    pub fn write_halfword(&mut self, offset: usize, value: u16) {
        let base = offset & !1;
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(base, lo);
        self.write_byte(base + 1, hi);
    }

    /// Returns and clears a pending HALTCNT request.
    pub fn take_halt_request(&mut self) -> bool {
        std::mem::take(&mut self.halt_requested)
    }

    /// Stores a halfword without CPU write semantics. Used by hardware-side
    /// updates such as VCOUNT.
    pub(crate) fn store_halfword(&mut self, offset: usize, value: u16) {
        let base = offset & !1;
        let [lo, hi] = value.to_le_bytes();
        self.bytes[base] = lo;
        self.bytes[base + 1] = hi;
    }

    /// Current interrupt enable mask.
    #[must_use]
    pub const fn interrupt_enable(&self) -> u16 {
        self.read_halfword(REG_IE)
    }

    /// Current interrupt request flags.
    #[must_use]
    pub const fn interrupt_flags(&self) -> u16 {
        self.read_halfword(REG_IF)
    }

    /// `true` when IME bit 0 is set.
    #[must_use]
    pub const fn master_enable(&self) -> bool {
        self.read_halfword(REG_IME) & 1 != 0
    }

    /// Enabled and requested interrupt sources, ignoring IME.
    #[must_use]
    pub const fn pending_interrupts(&self) -> u16 {
        self.interrupt_enable() & self.interrupt_flags() & INTERRUPT_MASK
    }

    /// Sets the IF bit for `source`.
    pub fn request_interrupt(&mut self, source: Interrupt) {
        let flags = self.interrupt_flags() | source.mask();
        self.store_halfword(REG_IF, flags);
    }

    /// Current KEYINPUT value.
    #[must_use]
    pub const fn key_input(&self) -> u16 {
        self.read_halfword(REG_KEYINPUT)
    }

    /// Presses or releases `key` and evaluates the KEYCNT interrupt
    /// condition.
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        let keys = if pressed {
            self.key_input() & !key.mask()
        } else {
            self.key_input() | key.mask()
        };
        self.store_halfword(REG_KEYINPUT, keys);
        self.check_keypad_interrupt();
    }

    fn check_keypad_interrupt(&mut self) {
        let control = self.read_halfword(REG_KEYCNT);
        if control & (1 << 14) == 0 {
            return;
        }

        let selected = control & KEYINPUT_IDLE;
        let held = !self.key_input() & KEYINPUT_IDLE;
        let raised = if control & (1 << 15) == 0 {
            held & selected != 0
        } else {
            selected != 0 && held & selected == selected
        };

        if raised {
            self.request_interrupt(Interrupt::Keypad);
        }
    }
}
