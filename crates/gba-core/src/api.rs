//! Host-facing configuration, snapshot records and step outcomes.

use crate::debugger::DEFAULT_PC_HISTORY_LEN;
use crate::exception::Exception;
use crate::ppu::{BackgroundInfo, BACKGROUND_COUNT};
use crate::state::{Mode, GENERAL_REGISTER_COUNT};

/// Default number of ticks an inspection session runs per iteration.
pub const DEFAULT_TICKS_PER_ITERATION: u32 = 4096;

/// Construction-time configuration for a core instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoreConfig {
    /// Runs breakpoint checks and PC-history recording after each tick.
    pub debugger_enabled: bool,
    /// Capacity of the PC history.
    pub pc_history_len: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            debugger_enabled: true,
            pc_history_len: DEFAULT_PC_HISTORY_LEN,
        }
    }
}

/// Configuration of an inspection session's run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Ticks executed by one `run_iteration` when not paused.
    pub ticks_per_iteration: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ticks_per_iteration: DEFAULT_TICKS_PER_ITERATION,
        }
    }
}

/// Owned copy of the CPU's visible state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuSnapshot {
    /// Registers visible in the current mode; `registers[15]` is the address
    /// of the next instruction to fetch.
    pub registers: [u32; GENERAL_REGISTER_COUNT],
    /// Address of the next instruction to fetch.
    pub pc: u32,
    /// Current program status register.
    pub cpsr: u32,
    /// Saved program status register of the current mode, absent in User
    /// and System.
    pub spsr: Option<u32>,
    /// Current processor mode.
    pub mode: Mode,
    /// Thumb state.
    pub thumb: bool,
    /// Waiting in HALTCNT low-power mode.
    pub halted: bool,
    /// Interrupt enable register.
    pub interrupt_enable: u16,
    /// Interrupt request flags.
    pub interrupt_flags: u16,
    /// Instructions retired since power-on.
    pub retired: u64,
}

/// Owned copy of the video state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PpuSnapshot {
    /// Background mode (DISPCNT bits 0–2).
    pub bg_mode: u8,
    /// Per-background configuration.
    pub backgrounds: [BackgroundInfo; BACKGROUND_COUNT],
    /// Current scanline.
    pub vcount: u16,
    /// Frames (vertical blanks) since power-on.
    pub frame: u64,
    /// 240×160 RGBA8 frame composed at the time of the snapshot.
    pub screen: Vec<u8>,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StepOutcome {
    /// Instruction executed.
    Retired {
        /// Address of the instruction.
        pc: u32,
        /// Cycles charged.
        cycles: u32,
    },
    /// Instruction's condition failed; only PC advanced.
    Skipped {
        /// Address of the instruction.
        pc: u32,
        /// Cycles charged.
        cycles: u32,
    },
    /// Instruction trapped into an exception vector.
    Exception {
        /// Address of the trapping instruction.
        pc: u32,
        /// Exception taken.
        exception: Exception,
        /// Cycles charged.
        cycles: u32,
    },
    /// An interrupt was taken before fetching.
    Interrupt {
        /// Address execution resumes at after the handler returns.
        return_pc: u32,
        /// Cycles charged.
        cycles: u32,
    },
    /// CPU is halted waiting for an interrupt.
    Halted {
        /// Cycles the video clock advanced.
        cycles: u32,
    },
    /// Debugger holds execution; nothing happened.
    Stopped,
}

impl StepOutcome {
    /// Cycles the tick consumed.
    #[must_use]
    pub const fn cycles(&self) -> u32 {
        match *self {
            Self::Retired { cycles, .. }
            | Self::Skipped { cycles, .. }
            | Self::Exception { cycles, .. }
            | Self::Interrupt { cycles, .. }
            | Self::Halted { cycles } => cycles,
            Self::Stopped => 0,
        }
    }

    /// Address of the instruction committed by this tick, if any.
    #[must_use]
    pub const fn committed_pc(&self) -> Option<u32> {
        match *self {
            Self::Retired { pc, .. } | Self::Skipped { pc, .. } | Self::Exception { pc, .. } => {
                Some(pc)
            }
            Self::Interrupt { .. } | Self::Halted { .. } | Self::Stopped => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, SessionConfig, StepOutcome, DEFAULT_TICKS_PER_ITERATION};
    use crate::exception::Exception;

    #[test]
    fn config_defaults() {
        let config = CoreConfig::default();
        assert!(config.debugger_enabled);
        assert_eq!(config.pc_history_len, 64);
        assert_eq!(
            SessionConfig::default().ticks_per_iteration,
            DEFAULT_TICKS_PER_ITERATION
        );
    }

    #[test]
    fn step_outcome_accessors() {
        let retired = StepOutcome::Retired { pc: 8, cycles: 3 };
        assert_eq!(retired.cycles(), 3);
        assert_eq!(retired.committed_pc(), Some(8));

        let trapped = StepOutcome::Exception {
            pc: 0x10,
            exception: Exception::SoftwareInterrupt,
            cycles: 3,
        };
        assert_eq!(trapped.committed_pc(), Some(0x10));
        assert_eq!(StepOutcome::Halted { cycles: 1 }.committed_pc(), None);
        assert_eq!(StepOutcome::Stopped.cycles(), 0);
    }
}
