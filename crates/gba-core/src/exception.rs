use crate::state::Mode;

/// Processor exceptions in priority order, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Exception {
    /// Power-on or external reset.
    Reset,
    /// Data access abort.
    DataAbort,
    /// Fast interrupt request.
    Fiq,
    /// Interrupt request.
    Irq,
    /// Instruction prefetch abort.
    PrefetchAbort,
    /// Undefined or coprocessor instruction.
    UndefinedInstruction,
    /// `SWI` instruction.
    SoftwareInterrupt,
}

impl Exception {
    /// Boot ROM address the exception jumps to.
    #[must_use]
    pub const fn vector(self) -> u32 {
        match self {
            Self::Reset => 0x00,
            Self::UndefinedInstruction => 0x04,
            Self::SoftwareInterrupt => 0x08,
            Self::PrefetchAbort => 0x0C,
            Self::DataAbort => 0x10,
            Self::Irq => 0x18,
            Self::Fiq => 0x1C,
        }
    }

    /// Mode entered when the exception is taken.
    #[must_use]
    pub const fn target_mode(self) -> Mode {
        match self {
            Self::Reset | Self::SoftwareInterrupt => Mode::Supervisor,
            Self::UndefinedInstruction => Mode::Undefined,
            Self::PrefetchAbort | Self::DataAbort => Mode::Abort,
            Self::Irq => Mode::Irq,
            Self::Fiq => Mode::Fiq,
        }
    }

    /// `true` when entry also masks FIQ.
    #[must_use]
    pub const fn masks_fiq(self) -> bool {
        matches!(self, Self::Reset | Self::Fiq)
    }

    /// Offset added to the address of the next sequential instruction to
    /// form the banked link register. Handlers return with `MOVS pc, lr`
    /// (offset 0) or `SUBS pc, lr, #4` (offset 4).
    #[must_use]
    pub const fn link_offset(self) -> u32 {
        match self {
            Self::Reset | Self::UndefinedInstruction | Self::SoftwareInterrupt => 0,
            Self::Irq | Self::Fiq | Self::PrefetchAbort | Self::DataAbort => 4,
        }
    }
}
