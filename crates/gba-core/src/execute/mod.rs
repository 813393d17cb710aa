//! Instruction execution for the ARM and Thumb instruction sets.
//!
//! There is no pipeline model. `r15` always holds the address of the next
//! instruction to fetch; once an instruction is fetched it is advanced by the
//! instruction width, and operand reads of `r15` add one more width so code
//! observes the architectural `pc + 8` (ARM) or `pc + 4` (Thumb).

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::fn_params_excessive_bools
)]

mod arm;
mod flags;
mod helpers;
mod thumb;

pub use flags::FlagsUpdate;
pub use helpers::{add_with_carry, shift_by_immediate, shift_by_register};

use crate::decoder::{decode_arm, decode_thumb};
use crate::encoding::InstructionClass;
use crate::exception::Exception;
use crate::memory::MemoryBus;
use crate::state::{RegisterFile, LR, PC, PSR_F, PSR_I};
use crate::timing::instruction_cycles;

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExecuteOutcome {
    /// Instruction retired.
    Retired {
        /// Address the instruction was fetched from.
        pc: u32,
        /// Instruction class.
        class: InstructionClass,
        /// Cycles consumed.
        cycles: u32,
    },
    /// Condition failed; the instruction was fetched and skipped.
    Skipped {
        /// Address the instruction was fetched from.
        pc: u32,
        /// Cycles consumed.
        cycles: u32,
    },
    /// Instruction raised an exception (`SWI`, undefined, coprocessor).
    Exception {
        /// Address the instruction was fetched from.
        pc: u32,
        /// Exception entered.
        exception: Exception,
        /// Cycles consumed.
        cycles: u32,
    },
}

impl ExecuteOutcome {
    /// Cycles consumed by the instruction.
    #[must_use]
    pub const fn cycles(self) -> u32 {
        match self {
            Self::Retired { cycles, .. }
            | Self::Skipped { cycles, .. }
            | Self::Exception { cycles, .. } => cycles,
        }
    }

    /// Fetch address of the instruction.
    #[must_use]
    pub const fn pc(self) -> u32 {
        match self {
            Self::Retired { pc, .. } | Self::Skipped { pc, .. } | Self::Exception { pc, .. } => pc,
        }
    }
}

/// Fetches, decodes and executes one instruction in the current state.
pub fn step_one(regs: &mut RegisterFile, bus: &mut dyn MemoryBus) -> ExecuteOutcome {
    let thumb = regs.thumb();
    let pc = regs.pc();
    let mut executor = Executor {
        regs: &mut *regs,
        bus,
        thumb,
    };

    let (class, executed) = if thumb {
        let fetch_pc = pc & !1;
        let half = executor.bus.read16(fetch_pc);
        executor.regs.set_pc(fetch_pc.wrapping_add(2));
        let instruction = decode_thumb(half);
        log::trace!("{fetch_pc:08X}: {half:04X} {instruction:?}");
        (instruction.class(), Some(executor.execute_thumb(instruction)))
    } else {
        let fetch_pc = pc & !3;
        let word = executor.bus.read32(fetch_pc);
        executor.regs.set_pc(fetch_pc.wrapping_add(4));
        let decoded = decode_arm(word);
        log::trace!("{fetch_pc:08X}: {word:08X} {decoded:?}");
        let executed = decoded
            .cond
            .passes(executor.regs.cpsr())
            .then(|| executor.execute_arm(decoded.instruction));
        (decoded.instruction.class(), executed)
    };

    let cycles = instruction_cycles(class);
    match executed {
        None => ExecuteOutcome::Skipped { pc, cycles },
        Some(Err(exception)) => {
            enter_exception(regs, exception);
            ExecuteOutcome::Exception {
                pc,
                exception,
                cycles,
            }
        }
        Some(Ok(())) => ExecuteOutcome::Retired { pc, class, cycles },
    }
}

/// Enters `exception`: banks CPSR into the target mode's SPSR, forms the
/// link register from the address of the next sequential instruction,
/// switches to ARM with IRQs masked and jumps to the vector.
pub fn enter_exception(regs: &mut RegisterFile, exception: Exception) {
    let next = regs.pc();
    let cpsr = regs.cpsr();
    regs.switch_mode(exception.target_mode());
    regs.set_spsr(cpsr);
    regs.set_gpr(LR, next.wrapping_add(exception.link_offset()));
    regs.set_thumb(false);
    regs.set_flag(PSR_I, true);
    if exception.masks_fiq() {
        regs.set_flag(PSR_F, true);
    }
    regs.set_pc(exception.vector());
    log::debug!(
        "exception {exception:?} from {next:08X}, entering {:?}",
        exception.target_mode()
    );
}

/// Instruction-scoped view of the CPU and bus.
struct Executor<'a> {
    regs: &'a mut RegisterFile,
    bus: &'a mut dyn MemoryBus,
    /// Instruction set the current instruction was fetched in.
    thumb: bool,
}

type Executed = Result<(), Exception>;

impl Executor<'_> {
    const fn width(&self) -> u32 {
        if self.thumb {
            2
        } else {
            4
        }
    }

    /// Operand read; `r15` yields the fetch address plus two widths.
    fn reg(&self, index: u8) -> u32 {
        let index = usize::from(index & 0xF);
        if index == PC {
            self.regs.pc().wrapping_add(self.width())
        } else {
            self.regs.gpr(index)
        }
    }

    /// Operand read for register-specified shifts and `STR` of `r15`,
    /// where the PC is one more word ahead.
    fn reg_late(&self, index: u8) -> u32 {
        if usize::from(index & 0xF) == PC {
            self.reg(index).wrapping_add(4)
        } else {
            self.reg(index)
        }
    }

    fn set_reg(&mut self, index: u8, value: u32) {
        let index = usize::from(index & 0xF);
        if index == PC {
            self.branch_to(value);
        } else {
            self.regs.set_gpr(index, value);
        }
    }

    /// Writes the PC aligned for the instruction set selected by the CPSR.
    fn branch_to(&mut self, target: u32) {
        let aligned = if self.regs.thumb() {
            target & !1
        } else {
            target & !3
        };
        self.regs.set_pc(aligned);
    }

    fn carry(&self) -> bool {
        self.regs.flag(crate::state::PSR_C)
    }
}

#[cfg(test)]
mod tests {
    use super::{enter_exception, step_one, ExecuteOutcome};
    use crate::encoding::InstructionClass;
    use crate::exception::Exception;
    use crate::memory::{Bus, MemoryBus};
    use crate::state::{Mode, RegisterFile, LR, PSR_I};

    fn arm_at(words: &[u32]) -> (RegisterFile, Bus) {
        let mut bus = Bus::default();
        let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        bus.load_rom(&bytes);
        let mut regs = RegisterFile::default();
        regs.set_pc(0x0800_0000);
        (regs, bus)
    }

    #[test]
    fn retired_instruction_advances_pc_by_width() {
        let (mut regs, mut bus) = arm_at(&[0xE3A0_0005]);
        let outcome = step_one(&mut regs, &mut bus);
        assert!(matches!(
            outcome,
            ExecuteOutcome::Retired {
                pc: 0x0800_0000,
                class: InstructionClass::DataProcessing,
                ..
            }
        ));
        assert_eq!(regs.gpr(0), 5);
        assert_eq!(regs.pc(), 0x0800_0004);
    }

    #[test]
    fn swi_enters_supervisor_with_link_to_next() {
        let (mut regs, mut bus) = arm_at(&[0xEF00_0000]);
        regs.set_cpsr(0x1F);
        let outcome = step_one(&mut regs, &mut bus);
        assert!(matches!(
            outcome,
            ExecuteOutcome::Exception {
                exception: Exception::SoftwareInterrupt,
                ..
            }
        ));
        assert_eq!(regs.mode(), Mode::Supervisor);
        assert_eq!(regs.pc(), 0x08);
        assert_eq!(regs.gpr(LR), 0x0800_0004);
        assert_eq!(regs.spsr(), Some(0x1F));
    }

    #[test]
    fn irq_entry_links_four_past_next_instruction() {
        let mut regs = RegisterFile::default();
        regs.set_cpsr(0x1F);
        regs.set_pc(0x0800_0100);
        enter_exception(&mut regs, Exception::Irq);
        assert_eq!(regs.mode(), Mode::Irq);
        assert_eq!(regs.gpr(LR), 0x0800_0104);
        assert!(regs.flag(PSR_I));
        assert!(!regs.thumb());
        assert_eq!(regs.pc(), 0x18);
    }

    #[test]
    fn bus_reads_from_rom_window() {
        let (_, bus) = arm_at(&[0xDEAD_BEEF]);
        assert_eq!(bus.read32(0x0800_0000), 0xDEAD_BEEF);
    }
}
