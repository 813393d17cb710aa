//! CPSR condition-flag updates for the different instruction classes.

use crate::state::{RegisterFile, PSR_C, PSR_N, PSR_V, PSR_Z};

/// Describes how NZCV should be updated after an instruction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsUpdate {
    /// No change.
    #[default]
    None,
    /// N and Z from the result; C and V unchanged (multiplies).
    Result {
        /// Result value.
        result: u32,
    },
    /// N and Z from the result, C from the shifter; V unchanged.
    Logical {
        /// Result value.
        result: u32,
        /// Shifter carry-out.
        carry: bool,
    },
    /// N, Z, C and V from an adder.
    Arithmetic {
        /// Result value.
        result: u32,
        /// Adder carry-out (inverted borrow for subtraction).
        carry: bool,
        /// Signed overflow.
        overflow: bool,
    },
    /// N and Z from a 64-bit result; C and V unchanged.
    Long {
        /// 64-bit result value.
        result: u64,
    },
}

impl FlagsUpdate {
    /// Applies this update to the CPSR.
    pub fn apply(self, regs: &mut RegisterFile) {
        match self {
            Self::None => {}
            Self::Result { result } => set_nz(regs, result),
            Self::Logical { result, carry } => {
                set_nz(regs, result);
                regs.set_flag(PSR_C, carry);
            }
            Self::Arithmetic {
                result,
                carry,
                overflow,
            } => {
                set_nz(regs, result);
                regs.set_flag(PSR_C, carry);
                regs.set_flag(PSR_V, overflow);
            }
            Self::Long { result } => {
                regs.set_flag(PSR_N, result >> 63 != 0);
                regs.set_flag(PSR_Z, result == 0);
            }
        }
    }
}

fn set_nz(regs: &mut RegisterFile, result: u32) {
    regs.set_flag(PSR_N, result >> 31 != 0);
    regs.set_flag(PSR_Z, result == 0);
}
