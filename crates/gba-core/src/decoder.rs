//! ARM and Thumb instruction decoders.
//!
//! Both decoders are total: every bit pattern yields a decoded value, with
//! unallocated encodings mapped to an explicit `Undefined` variant.

use crate::encoding::{AluOpcode, Condition, InstructionClass, ShiftKind, ThumbAluOp};

/// Shift amount source for a register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftAmount {
    /// Five-bit immediate amount.
    Immediate(u8),
    /// Bottom byte of a register.
    Register(u8),
}

/// Second operand of a data-processing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand2 {
    /// Rotated 8-bit immediate. `value` is already rotated; `rotate` is the
    /// rotation in bits, which selects the shifter carry-out.
    Immediate {
        /// Rotated immediate value.
        value: u32,
        /// Rotation amount in bits (0..=30).
        rotate: u8,
    },
    /// Register passed through the barrel shifter.
    Register {
        /// Source register.
        rm: u8,
        /// Shift operation.
        shift: ShiftKind,
        /// Shift amount source.
        amount: ShiftAmount,
    },
}

/// Source operand of an `MSR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsrOperand {
    /// Rotated 8-bit immediate.
    Immediate(u32),
    /// Source register.
    Register(u8),
}

/// Halfword and signed data transfer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalfwordKind {
    /// Unsigned halfword (`LDRH`/`STRH`).
    Unsigned,
    /// Sign-extended byte (`LDRSB`).
    SignedByte,
    /// Sign-extended halfword (`LDRSH`).
    SignedHalfword,
}

/// Offset of a halfword transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalfwordOffset {
    /// Eight-bit immediate.
    Immediate(u8),
    /// Offset register.
    Register(u8),
}

/// Offset of a word or byte transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferOffset {
    /// Twelve-bit immediate.
    Immediate(u16),
    /// Register shifted by an immediate amount.
    Register {
        /// Offset register.
        rm: u8,
        /// Shift operation.
        shift: ShiftKind,
        /// Five-bit shift amount.
        amount: u8,
    },
}

/// Addressing flags shared by single and block transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Indexing {
    /// Apply the offset before the transfer.
    pub pre_index: bool,
    /// Add (rather than subtract) the offset.
    pub up: bool,
    /// Write the final address back to the base register.
    pub write_back: bool,
}

impl Indexing {
    const fn from_word(word: u32) -> Self {
        Self {
            pre_index: word & (1 << 24) != 0,
            up: word & (1 << 23) != 0,
            write_back: word & (1 << 21) != 0,
        }
    }
}

/// Decoded ARM instruction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ArmInstruction {
    DataProcessing {
        opcode: AluOpcode,
        set_flags: bool,
        rn: u8,
        rd: u8,
        operand: Operand2,
    },
    Mrs {
        spsr: bool,
        rd: u8,
    },
    Msr {
        spsr: bool,
        /// Field mask bits 19..16 (`f`, `s`, `x`, `c`).
        fields: u8,
        operand: MsrOperand,
    },
    Multiply {
        accumulate: bool,
        set_flags: bool,
        rd: u8,
        rn: u8,
        rs: u8,
        rm: u8,
    },
    MultiplyLong {
        signed: bool,
        accumulate: bool,
        set_flags: bool,
        rd_hi: u8,
        rd_lo: u8,
        rs: u8,
        rm: u8,
    },
    Swap {
        byte: bool,
        rn: u8,
        rd: u8,
        rm: u8,
    },
    BranchExchange {
        rm: u8,
    },
    HalfwordTransfer {
        load: bool,
        kind: HalfwordKind,
        indexing: Indexing,
        rn: u8,
        rd: u8,
        offset: HalfwordOffset,
    },
    SingleTransfer {
        load: bool,
        byte: bool,
        indexing: Indexing,
        rn: u8,
        rd: u8,
        offset: TransferOffset,
    },
    BlockTransfer {
        load: bool,
        /// S bit: user-bank transfer, or SPSR restore when loading PC.
        user_bank: bool,
        indexing: Indexing,
        rn: u8,
        registers: u16,
    },
    Branch {
        link: bool,
        /// Byte offset relative to the instruction address plus 8.
        offset: i32,
    },
    SoftwareInterrupt {
        comment: u32,
    },
    Coprocessor {
        /// Raw instruction word.
        word: u32,
    },
    Undefined,
}

impl ArmInstruction {
    /// Coarse class of this instruction.
    #[must_use]
    pub const fn class(&self) -> InstructionClass {
        match self {
            Self::DataProcessing { .. } => InstructionClass::DataProcessing,
            Self::Mrs { .. } | Self::Msr { .. } => InstructionClass::PsrTransfer,
            Self::Multiply { .. } => InstructionClass::Multiply,
            Self::MultiplyLong { .. } => InstructionClass::MultiplyLong,
            Self::Swap { .. } => InstructionClass::Swap,
            Self::BranchExchange { .. } => InstructionClass::BranchExchange,
            Self::HalfwordTransfer { load: true, .. } | Self::SingleTransfer { load: true, .. } => {
                InstructionClass::Load
            }
            Self::HalfwordTransfer { .. } | Self::SingleTransfer { .. } => InstructionClass::Store,
            Self::BlockTransfer { load: true, .. } => InstructionClass::LoadMultiple,
            Self::BlockTransfer { .. } => InstructionClass::StoreMultiple,
            Self::Branch { .. } => InstructionClass::Branch,
            Self::SoftwareInterrupt { .. } => InstructionClass::SoftwareInterrupt,
            Self::Coprocessor { .. } => InstructionClass::Coprocessor,
            Self::Undefined => InstructionClass::Undefined,
        }
    }
}

/// A decoded ARM word: condition plus body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArmDecoded {
    /// Condition field.
    pub cond: Condition,
    /// Instruction body.
    pub instruction: ArmInstruction,
}

const fn reg(word: u32, shift: u32) -> u8 {
    ((word >> shift) & 0xF) as u8
}

const fn bit(word: u32, index: u32) -> bool {
    word & (1 << index) != 0
}

/// Decodes a 32-bit ARM instruction.
#[must_use]
pub const fn decode_arm(word: u32) -> ArmDecoded {
    ArmDecoded {
        cond: Condition::from_bits(word >> 28),
        instruction: decode_arm_body(word),
    }
}

const fn decode_arm_body(word: u32) -> ArmInstruction {
    if word & 0x0FFF_FFF0 == 0x012F_FF10 {
        return ArmInstruction::BranchExchange { rm: reg(word, 0) };
    }

    match (word >> 25) & 0b111 {
        0b000 => decode_arm_group_zero(word),
        0b001 => decode_arm_immediate_alu(word),
        0b010 => ArmInstruction::SingleTransfer {
            load: bit(word, 20),
            byte: bit(word, 22),
            indexing: Indexing::from_word(word),
            rn: reg(word, 16),
            rd: reg(word, 12),
            offset: TransferOffset::Immediate((word & 0xFFF) as u16),
        },
        0b011 => {
            if bit(word, 4) {
                ArmInstruction::Undefined
            } else {
                ArmInstruction::SingleTransfer {
                    load: bit(word, 20),
                    byte: bit(word, 22),
                    indexing: Indexing::from_word(word),
                    rn: reg(word, 16),
                    rd: reg(word, 12),
                    offset: TransferOffset::Register {
                        rm: reg(word, 0),
                        shift: ShiftKind::from_bits(word >> 5),
                        amount: ((word >> 7) & 0x1F) as u8,
                    },
                }
            }
        }
        0b100 => ArmInstruction::BlockTransfer {
            load: bit(word, 20),
            user_bank: bit(word, 22),
            indexing: Indexing::from_word(word),
            rn: reg(word, 16),
            registers: (word & 0xFFFF) as u16,
        },
        0b101 => ArmInstruction::Branch {
            link: bit(word, 24),
            offset: ((word << 8) as i32) >> 6,
        },
        0b110 => ArmInstruction::Coprocessor { word },
        _ => {
            if bit(word, 24) {
                ArmInstruction::SoftwareInterrupt {
                    comment: word & 0x00FF_FFFF,
                }
            } else {
                ArmInstruction::Coprocessor { word }
            }
        }
    }
}

const fn decode_arm_group_zero(word: u32) -> ArmInstruction {
    if word & 0x0FC0_00F0 == 0x0000_0090 {
        return ArmInstruction::Multiply {
            accumulate: bit(word, 21),
            set_flags: bit(word, 20),
            rd: reg(word, 16),
            rn: reg(word, 12),
            rs: reg(word, 8),
            rm: reg(word, 0),
        };
    }
    if word & 0x0F80_00F0 == 0x0080_0090 {
        return ArmInstruction::MultiplyLong {
            signed: bit(word, 22),
            accumulate: bit(word, 21),
            set_flags: bit(word, 20),
            rd_hi: reg(word, 16),
            rd_lo: reg(word, 12),
            rs: reg(word, 8),
            rm: reg(word, 0),
        };
    }
    if word & 0x0FB0_0FF0 == 0x0100_0090 {
        return ArmInstruction::Swap {
            byte: bit(word, 22),
            rn: reg(word, 16),
            rd: reg(word, 12),
            rm: reg(word, 0),
        };
    }
    if word & 0x90 == 0x90 {
        let kind = match (word >> 5) & 0b11 {
            0b01 => HalfwordKind::Unsigned,
            0b10 => HalfwordKind::SignedByte,
            0b11 => HalfwordKind::SignedHalfword,
            _ => return ArmInstruction::Undefined,
        };
        let load = bit(word, 20);
        if !load && !matches!(kind, HalfwordKind::Unsigned) {
            return ArmInstruction::Undefined;
        }
        let offset = if bit(word, 22) {
            HalfwordOffset::Immediate((((word >> 4) & 0xF0) | (word & 0xF)) as u8)
        } else {
            HalfwordOffset::Register(reg(word, 0))
        };
        return ArmInstruction::HalfwordTransfer {
            load,
            kind,
            indexing: Indexing::from_word(word),
            rn: reg(word, 16),
            rd: reg(word, 12),
            offset,
        };
    }

    let opcode = AluOpcode::from_bits(word >> 21);
    let set_flags = bit(word, 20);
    if opcode.is_test() && !set_flags {
        return decode_psr_transfer(word, MsrOperand::Register(reg(word, 0)));
    }

    let amount = if bit(word, 4) {
        ShiftAmount::Register(reg(word, 8))
    } else {
        ShiftAmount::Immediate(((word >> 7) & 0x1F) as u8)
    };
    ArmInstruction::DataProcessing {
        opcode,
        set_flags,
        rn: reg(word, 16),
        rd: reg(word, 12),
        operand: Operand2::Register {
            rm: reg(word, 0),
            shift: ShiftKind::from_bits(word >> 5),
            amount,
        },
    }
}

const fn decode_arm_immediate_alu(word: u32) -> ArmInstruction {
    let rotate = ((word >> 8) & 0xF) * 2;
    let value = (word & 0xFF).rotate_right(rotate);
    let opcode = AluOpcode::from_bits(word >> 21);
    let set_flags = bit(word, 20);

    if opcode.is_test() && !set_flags {
        if bit(word, 21) {
            return decode_psr_transfer(word, MsrOperand::Immediate(value));
        }
        return ArmInstruction::Undefined;
    }

    ArmInstruction::DataProcessing {
        opcode,
        set_flags,
        rn: reg(word, 16),
        rd: reg(word, 12),
        operand: Operand2::Immediate {
            value,
            rotate: rotate as u8,
        },
    }
}

const fn decode_psr_transfer(word: u32, operand: MsrOperand) -> ArmInstruction {
    let spsr = bit(word, 22);
    if bit(word, 21) {
        ArmInstruction::Msr {
            spsr,
            fields: ((word >> 16) & 0xF) as u8,
            operand,
        }
    } else {
        ArmInstruction::Mrs {
            spsr,
            rd: reg(word, 12),
        }
    }
}

/// Operand of a Thumb format-2 add/subtract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbOperand {
    /// Low register.
    Register(u8),
    /// Three-bit immediate.
    Immediate(u8),
}

/// Thumb format-3 operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ImmediateOp {
    Mov,
    Cmp,
    Add,
    Sub,
}

/// Thumb format-5 high-register operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum HiRegisterOp {
    Add,
    Cmp,
    Mov,
}

/// Thumb format-8 transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignedTransfer {
    /// Store halfword.
    StoreHalfword,
    /// Load unsigned halfword.
    LoadHalfword,
    /// Load sign-extended byte.
    LoadSignedByte,
    /// Load sign-extended halfword.
    LoadSignedHalfword,
}

/// Decoded Thumb instruction. Offsets are already scaled to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ThumbInstruction {
    MoveShifted {
        shift: ShiftKind,
        amount: u8,
        rs: u8,
        rd: u8,
    },
    AddSubtract {
        subtract: bool,
        operand: ThumbOperand,
        rs: u8,
        rd: u8,
    },
    Immediate {
        op: ImmediateOp,
        rd: u8,
        value: u8,
    },
    Alu {
        op: ThumbAluOp,
        rs: u8,
        rd: u8,
    },
    HiRegister {
        op: HiRegisterOp,
        rs: u8,
        rd: u8,
    },
    BranchExchange {
        rs: u8,
    },
    PcRelativeLoad {
        rd: u8,
        offset: u16,
    },
    LoadStoreRegister {
        load: bool,
        byte: bool,
        ro: u8,
        rb: u8,
        rd: u8,
    },
    LoadStoreSigned {
        op: SignedTransfer,
        ro: u8,
        rb: u8,
        rd: u8,
    },
    LoadStoreImmediate {
        load: bool,
        byte: bool,
        offset: u8,
        rb: u8,
        rd: u8,
    },
    LoadStoreHalfword {
        load: bool,
        offset: u8,
        rb: u8,
        rd: u8,
    },
    SpRelative {
        load: bool,
        rd: u8,
        offset: u16,
    },
    LoadAddress {
        from_sp: bool,
        rd: u8,
        offset: u16,
    },
    AdjustStack {
        offset: i16,
    },
    PushPop {
        pop: bool,
        /// Push LR / pop PC in addition to `registers`.
        link: bool,
        registers: u8,
    },
    MultipleTransfer {
        load: bool,
        rb: u8,
        registers: u8,
    },
    ConditionalBranch {
        cond: Condition,
        offset: i16,
    },
    SoftwareInterrupt {
        comment: u8,
    },
    Branch {
        offset: i16,
    },
    /// First half of `BL`: sign-extended upper offset, already shifted.
    LongBranchHigh {
        offset: i32,
    },
    /// Second half of `BL`: lower offset, already shifted.
    LongBranchLow {
        offset: u16,
    },
    Undefined,
}

impl ThumbInstruction {
    /// Coarse class of this instruction.
    #[must_use]
    pub const fn class(&self) -> InstructionClass {
        match self {
            Self::MoveShifted { .. }
            | Self::AddSubtract { .. }
            | Self::Immediate { .. }
            | Self::HiRegister { .. }
            | Self::LoadAddress { .. }
            | Self::AdjustStack { .. } => InstructionClass::DataProcessing,
            Self::Alu {
                op: ThumbAluOp::Mul,
                ..
            } => InstructionClass::Multiply,
            Self::Alu { .. } => InstructionClass::DataProcessing,
            Self::BranchExchange { .. } => InstructionClass::BranchExchange,
            Self::PcRelativeLoad { .. }
            | Self::LoadStoreRegister { load: true, .. }
            | Self::LoadStoreImmediate { load: true, .. }
            | Self::LoadStoreHalfword { load: true, .. }
            | Self::SpRelative { load: true, .. } => InstructionClass::Load,
            Self::LoadStoreSigned { op, .. } => {
                if matches!(op, SignedTransfer::StoreHalfword) {
                    InstructionClass::Store
                } else {
                    InstructionClass::Load
                }
            }
            Self::LoadStoreRegister { .. }
            | Self::LoadStoreImmediate { .. }
            | Self::LoadStoreHalfword { .. }
            | Self::SpRelative { .. } => InstructionClass::Store,
            Self::PushPop { pop: true, .. } | Self::MultipleTransfer { load: true, .. } => {
                InstructionClass::LoadMultiple
            }
            Self::PushPop { .. } | Self::MultipleTransfer { .. } => {
                InstructionClass::StoreMultiple
            }
            Self::ConditionalBranch { .. }
            | Self::Branch { .. }
            | Self::LongBranchHigh { .. }
            | Self::LongBranchLow { .. } => InstructionClass::Branch,
            Self::SoftwareInterrupt { .. } => InstructionClass::SoftwareInterrupt,
            Self::Undefined => InstructionClass::Undefined,
        }
    }
}

const fn low_reg(half: u16, shift: u16) -> u8 {
    ((half >> shift) & 0b111) as u8
}

const fn hbit(half: u16, index: u16) -> bool {
    half & (1 << index) != 0
}

/// Decodes a 16-bit Thumb instruction.
#[must_use]
pub const fn decode_thumb(half: u16) -> ThumbInstruction {
    match half >> 13 {
        0b000 => {
            if (half >> 11) & 0b11 == 0b11 {
                let operand = if hbit(half, 10) {
                    ThumbOperand::Immediate(low_reg(half, 6))
                } else {
                    ThumbOperand::Register(low_reg(half, 6))
                };
                ThumbInstruction::AddSubtract {
                    subtract: hbit(half, 9),
                    operand,
                    rs: low_reg(half, 3),
                    rd: low_reg(half, 0),
                }
            } else {
                ThumbInstruction::MoveShifted {
                    shift: ShiftKind::from_bits((half >> 11) as u32),
                    amount: ((half >> 6) & 0x1F) as u8,
                    rs: low_reg(half, 3),
                    rd: low_reg(half, 0),
                }
            }
        }
        0b001 => ThumbInstruction::Immediate {
            op: match (half >> 11) & 0b11 {
                0 => ImmediateOp::Mov,
                1 => ImmediateOp::Cmp,
                2 => ImmediateOp::Add,
                _ => ImmediateOp::Sub,
            },
            rd: low_reg(half, 8),
            value: (half & 0xFF) as u8,
        },
        0b010 => decode_thumb_group_two(half),
        0b011 => {
            let byte = hbit(half, 12);
            let raw = ((half >> 6) & 0x1F) as u8;
            ThumbInstruction::LoadStoreImmediate {
                load: hbit(half, 11),
                byte,
                offset: if byte { raw } else { raw << 2 },
                rb: low_reg(half, 3),
                rd: low_reg(half, 0),
            }
        }
        0b100 => {
            if hbit(half, 12) {
                ThumbInstruction::SpRelative {
                    load: hbit(half, 11),
                    rd: low_reg(half, 8),
                    offset: (half & 0xFF) << 2,
                }
            } else {
                ThumbInstruction::LoadStoreHalfword {
                    load: hbit(half, 11),
                    offset: (((half >> 6) & 0x1F) << 1) as u8,
                    rb: low_reg(half, 3),
                    rd: low_reg(half, 0),
                }
            }
        }
        0b101 => decode_thumb_group_five(half),
        0b110 => {
            if hbit(half, 12) {
                let cond = (half >> 8) & 0xF;
                match cond {
                    0xE => ThumbInstruction::Undefined,
                    0xF => ThumbInstruction::SoftwareInterrupt {
                        comment: (half & 0xFF) as u8,
                    },
                    _ => ThumbInstruction::ConditionalBranch {
                        cond: Condition::from_bits(cond as u32),
                        offset: ((half & 0xFF) as u8 as i8 as i16) << 1,
                    },
                }
            } else {
                ThumbInstruction::MultipleTransfer {
                    load: hbit(half, 11),
                    rb: low_reg(half, 8),
                    registers: (half & 0xFF) as u8,
                }
            }
        }
        _ => match (half >> 11) & 0b11 {
            0b00 => ThumbInstruction::Branch {
                offset: (((half & 0x7FF) << 5) as i16) >> 4,
            },
            0b01 => ThumbInstruction::Undefined,
            0b10 => ThumbInstruction::LongBranchHigh {
                offset: ((((half & 0x7FF) as u32) << 21) as i32) >> 9,
            },
            _ => ThumbInstruction::LongBranchLow {
                offset: (half & 0x7FF) << 1,
            },
        },
    }
}

const fn decode_thumb_group_two(half: u16) -> ThumbInstruction {
    if half >> 10 == 0b01_0000 {
        return ThumbInstruction::Alu {
            op: ThumbAluOp::from_bits(half >> 6),
            rs: low_reg(half, 3),
            rd: low_reg(half, 0),
        };
    }
    if half >> 10 == 0b01_0001 {
        let rd = low_reg(half, 0) | if hbit(half, 7) { 8 } else { 0 };
        let rs = low_reg(half, 3) | if hbit(half, 6) { 8 } else { 0 };
        return match (half >> 8) & 0b11 {
            0 => ThumbInstruction::HiRegister {
                op: HiRegisterOp::Add,
                rs,
                rd,
            },
            1 => ThumbInstruction::HiRegister {
                op: HiRegisterOp::Cmp,
                rs,
                rd,
            },
            2 => ThumbInstruction::HiRegister {
                op: HiRegisterOp::Mov,
                rs,
                rd,
            },
            _ => ThumbInstruction::BranchExchange { rs },
        };
    }
    if half >> 11 == 0b0_1001 {
        return ThumbInstruction::PcRelativeLoad {
            rd: low_reg(half, 8),
            offset: (half & 0xFF) << 2,
        };
    }

    let ro = low_reg(half, 6);
    let rb = low_reg(half, 3);
    let rd = low_reg(half, 0);
    if hbit(half, 9) {
        let op = match (hbit(half, 11), hbit(half, 10)) {
            (false, false) => SignedTransfer::StoreHalfword,
            (true, false) => SignedTransfer::LoadHalfword,
            (false, true) => SignedTransfer::LoadSignedByte,
            (true, true) => SignedTransfer::LoadSignedHalfword,
        };
        ThumbInstruction::LoadStoreSigned { op, ro, rb, rd }
    } else {
        ThumbInstruction::LoadStoreRegister {
            load: hbit(half, 11),
            byte: hbit(half, 10),
            ro,
            rb,
            rd,
        }
    }
}

const fn decode_thumb_group_five(half: u16) -> ThumbInstruction {
    if !hbit(half, 12) {
        return ThumbInstruction::LoadAddress {
            from_sp: hbit(half, 11),
            rd: low_reg(half, 8),
            offset: (half & 0xFF) << 2,
        };
    }
    if half >> 8 == 0xB0 {
        let magnitude = ((half & 0x7F) << 2) as i16;
        return ThumbInstruction::AdjustStack {
            offset: if hbit(half, 7) { -magnitude } else { magnitude },
        };
    }
    if (half >> 9) & 0b11 == 0b10 {
        return ThumbInstruction::PushPop {
            pop: hbit(half, 11),
            link: hbit(half, 8),
            registers: (half & 0xFF) as u8,
        };
    }
    ThumbInstruction::Undefined
}

#[cfg(test)]
mod tests {
    use super::{
        decode_arm, decode_thumb, ArmInstruction, HalfwordKind, HalfwordOffset, Operand2,
        ThumbInstruction,
    };
    use crate::encoding::{AluOpcode, Condition};

    #[test]
    fn decodes_rotated_immediate_mov() {
        let decoded = decode_arm(0xE3A0_0301);
        assert_eq!(decoded.cond, Condition::Al);
        assert_eq!(
            decoded.instruction,
            ArmInstruction::DataProcessing {
                opcode: AluOpcode::Mov,
                set_flags: false,
                rn: 0,
                rd: 0,
                operand: Operand2::Immediate {
                    value: 0x0400_0000,
                    rotate: 6,
                },
            }
        );
    }

    #[test]
    fn decodes_backward_branch_offset() {
        assert_eq!(
            decode_arm(0x1AFF_FFFC).instruction,
            ArmInstruction::Branch {
                link: false,
                offset: -16
            }
        );
    }

    #[test]
    fn decodes_post_indexed_strh() {
        match decode_arm(0xE0C2_30B2).instruction {
            ArmInstruction::HalfwordTransfer {
                load,
                kind,
                indexing,
                rn,
                rd,
                offset,
            } => {
                assert!(!load);
                assert_eq!(kind, HalfwordKind::Unsigned);
                assert!(!indexing.pre_index && indexing.up);
                assert_eq!((rn, rd), (2, 3));
                assert_eq!(offset, HalfwordOffset::Immediate(2));
            }
            other => panic!("unexpected decode {other:?}"),
        }
    }

    #[test]
    fn psr_transfers_use_test_opcode_space() {
        assert!(matches!(
            decode_arm(0xE10F_0000).instruction,
            ArmInstruction::Mrs { spsr: false, rd: 0 }
        ));
        assert!(matches!(
            decode_arm(0xE321_F0D2).instruction,
            ArmInstruction::Msr {
                spsr: false,
                fields: 1,
                ..
            }
        ));
    }

    #[test]
    fn thumb_long_branch_halves() {
        assert_eq!(
            decode_thumb(0xF7FF),
            ThumbInstruction::LongBranchHigh { offset: -4096 }
        );
        assert_eq!(
            decode_thumb(0xF806),
            ThumbInstruction::LongBranchLow { offset: 12 }
        );
    }

    #[test]
    fn thumb_conditional_branch_sign_extends() {
        assert_eq!(
            decode_thumb(0xD1FC),
            ThumbInstruction::ConditionalBranch {
                cond: Condition::Ne,
                offset: -8
            }
        );
        assert_eq!(decode_thumb(0xDE00), ThumbInstruction::Undefined);
    }

    #[test]
    fn thumb_unconditional_branch_sign_extends() {
        assert_eq!(decode_thumb(0xE7FE), ThumbInstruction::Branch { offset: -4 });
        assert_eq!(decode_thumb(0xE001), ThumbInstruction::Branch { offset: 2 });
    }
}
