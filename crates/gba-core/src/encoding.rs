//! Field-level encoding tables shared by the ARM and Thumb decoders.

use crate::state::{PSR_C, PSR_N, PSR_V, PSR_Z};

/// ARM condition field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Condition {
    Eq = 0x0,
    Ne = 0x1,
    Cs = 0x2,
    Cc = 0x3,
    Mi = 0x4,
    Pl = 0x5,
    Vs = 0x6,
    Vc = 0x7,
    Hi = 0x8,
    Ls = 0x9,
    Ge = 0xA,
    Lt = 0xB,
    Gt = 0xC,
    Le = 0xD,
    Al = 0xE,
    /// Reserved "never" condition; never executes on ARMv4.
    Nv = 0xF,
}

impl Condition {
    /// Decodes a 4-bit condition field. Every value is valid.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => Self::Eq,
            0x1 => Self::Ne,
            0x2 => Self::Cs,
            0x3 => Self::Cc,
            0x4 => Self::Mi,
            0x5 => Self::Pl,
            0x6 => Self::Vs,
            0x7 => Self::Vc,
            0x8 => Self::Hi,
            0x9 => Self::Ls,
            0xA => Self::Ge,
            0xB => Self::Lt,
            0xC => Self::Gt,
            0xD => Self::Le,
            0xE => Self::Al,
            _ => Self::Nv,
        }
    }

    /// Evaluates the condition against CPSR flags.
    #[must_use]
    pub const fn passes(self, cpsr: u32) -> bool {
        let n = cpsr & PSR_N != 0;
        let z = cpsr & PSR_Z != 0;
        let c = cpsr & PSR_C != 0;
        let v = cpsr & PSR_V != 0;
        match self {
            Self::Eq => z,
            Self::Ne => !z,
            Self::Cs => c,
            Self::Cc => !c,
            Self::Mi => n,
            Self::Pl => !n,
            Self::Vs => v,
            Self::Vc => !v,
            Self::Hi => c && !z,
            Self::Ls => !c || z,
            Self::Ge => n == v,
            Self::Lt => n != v,
            Self::Gt => !z && n == v,
            Self::Le => z || n != v,
            Self::Al => true,
            Self::Nv => false,
        }
    }

    /// Assembler suffix; empty for `AL`.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Cs => "CS",
            Self::Cc => "CC",
            Self::Mi => "MI",
            Self::Pl => "PL",
            Self::Vs => "VS",
            Self::Vc => "VC",
            Self::Hi => "HI",
            Self::Ls => "LS",
            Self::Ge => "GE",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Al => "",
            Self::Nv => "NV",
        }
    }
}

/// Data-processing opcode field (bits 24..21 in ARM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AluOpcode {
    And = 0x0,
    Eor = 0x1,
    Sub = 0x2,
    Rsb = 0x3,
    Add = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Rsc = 0x7,
    Tst = 0x8,
    Teq = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mov = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl AluOpcode {
    /// Decodes a 4-bit opcode field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            _ => Self::Mvn,
        }
    }

    /// `true` for TST/TEQ/CMP/CMN, which only update flags.
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }

    /// `true` for opcodes whose carry comes from the barrel shifter.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(
            self,
            Self::And
                | Self::Eor
                | Self::Tst
                | Self::Teq
                | Self::Orr
                | Self::Mov
                | Self::Bic
                | Self::Mvn
        )
    }

    /// `true` for MOV/MVN, which ignore the first operand.
    #[must_use]
    pub const fn is_move(self) -> bool {
        matches!(self, Self::Mov | Self::Mvn)
    }

    /// Upper-case mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Eor => "EOR",
            Self::Sub => "SUB",
            Self::Rsb => "RSB",
            Self::Add => "ADD",
            Self::Adc => "ADC",
            Self::Sbc => "SBC",
            Self::Rsc => "RSC",
            Self::Tst => "TST",
            Self::Teq => "TEQ",
            Self::Cmp => "CMP",
            Self::Cmn => "CMN",
            Self::Orr => "ORR",
            Self::Mov => "MOV",
            Self::Bic => "BIC",
            Self::Mvn => "MVN",
        }
    }
}

/// Barrel-shifter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ShiftKind {
    /// Logical shift left.
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
    /// Rotate right; an immediate amount of zero means RRX.
    Ror,
}

impl ShiftKind {
    /// Decodes a 2-bit shift-type field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Self::Lsl,
            1 => Self::Lsr,
            2 => Self::Asr,
            _ => Self::Ror,
        }
    }

    /// Upper-case mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Ror => "ROR",
        }
    }
}

/// Thumb format-4 ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ThumbAluOp {
    And = 0x0,
    Eor = 0x1,
    Lsl = 0x2,
    Lsr = 0x3,
    Asr = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Ror = 0x7,
    Tst = 0x8,
    Neg = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mul = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl ThumbAluOp {
    /// Decodes a 4-bit Thumb ALU opcode.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0xF {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Lsl,
            0x3 => Self::Lsr,
            0x4 => Self::Asr,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Ror,
            0x8 => Self::Tst,
            0x9 => Self::Neg,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mul,
            0xE => Self::Bic,
            _ => Self::Mvn,
        }
    }

    /// Upper-case mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Eor => "EOR",
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Adc => "ADC",
            Self::Sbc => "SBC",
            Self::Ror => "ROR",
            Self::Tst => "TST",
            Self::Neg => "NEG",
            Self::Cmp => "CMP",
            Self::Cmn => "CMN",
            Self::Orr => "ORR",
            Self::Mul => "MUL",
            Self::Bic => "BIC",
            Self::Mvn => "MVN",
        }
    }
}

/// Coarse instruction class, used for cycle costing and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InstructionClass {
    /// Register/immediate ALU operation.
    DataProcessing,
    /// Status register transfer.
    PsrTransfer,
    /// 32-bit multiply.
    Multiply,
    /// 64-bit multiply.
    MultiplyLong,
    /// Atomic swap.
    Swap,
    /// Branch and exchange.
    BranchExchange,
    /// Single load.
    Load,
    /// Single store.
    Store,
    /// Multiple-register load.
    LoadMultiple,
    /// Multiple-register store.
    StoreMultiple,
    /// Branch or branch with link.
    Branch,
    /// Software interrupt.
    SoftwareInterrupt,
    /// Coprocessor operation (traps on this core).
    Coprocessor,
    /// Unallocated encoding.
    Undefined,
}

#[cfg(test)]
mod tests {
    use super::{AluOpcode, Condition};
    use crate::state::{PSR_C, PSR_N, PSR_V, PSR_Z};

    #[test]
    fn every_condition_field_decodes() {
        for bits in 0..16 {
            assert_eq!(Condition::from_bits(bits) as u32, bits);
        }
    }

    #[test]
    fn signed_conditions_compare_n_and_v() {
        assert!(Condition::Ge.passes(PSR_N | PSR_V));
        assert!(Condition::Lt.passes(PSR_N));
        assert!(!Condition::Gt.passes(PSR_Z));
        assert!(Condition::Hi.passes(PSR_C));
        assert!(!Condition::Nv.passes(0));
    }

    #[test]
    fn alu_opcode_groups() {
        assert!(AluOpcode::Cmp.is_test());
        assert!(!AluOpcode::Cmp.is_logical());
        assert!(AluOpcode::Mvn.is_move());
        assert_eq!(AluOpcode::from_bits(0xC).mnemonic(), "ORR");
    }
}
