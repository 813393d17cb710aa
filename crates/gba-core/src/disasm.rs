//! ARM and Thumb disassembly.
//!
//! Both disassemblers are total. Unallocated ARM words render as `UND` and
//! unallocated Thumb halfwords as `.hword`. Branch targets render relative to
//! the instruction (`$+0x10`) unless the instruction address is known.

use crate::decoder::{
    decode_arm, decode_thumb, ArmInstruction, HalfwordKind, HalfwordOffset, HiRegisterOp,
    ImmediateOp, Indexing, MsrOperand, Operand2, ShiftAmount, SignedTransfer, ThumbInstruction,
    ThumbOperand, TransferOffset,
};
use crate::encoding::ShiftKind;
use crate::memory::MemoryBus;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the instruction.
    pub address: u32,
    /// Instruction width in bytes (4 for ARM, 2 for Thumb).
    pub len_bytes: u8,
    /// Raw instruction bits.
    pub raw: u32,
    /// Mnemonic including condition and flag suffixes (e.g. `ADDS`, `BNE`).
    pub mnemonic: String,
    /// Formatted operands.
    pub operands: String,
    /// `true` for unallocated or coprocessor encodings.
    pub is_undefined: bool,
}

impl DisassemblyRow {
    /// Mnemonic and operands joined by a space.
    #[must_use]
    pub fn text(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands)
        }
    }
}

/// Disassembles one ARM word.
#[must_use]
pub fn disassemble_arm(word: u32) -> String {
    arm_row(word, None).text()
}

/// Disassembles one Thumb halfword.
#[must_use]
pub fn disassemble_thumb(half: u16) -> String {
    thumb_row(half, None).text()
}

/// Disassembles `before` instructions before `center`, the instruction at
/// `center` and `after` instructions following it, reading from `bus`.
///
/// Instructions are fixed width, so rows are contiguous and the window is
/// always `before + 1 + after` rows long. `center` is aligned down to the
/// instruction width first.
#[must_use]
pub fn disassemble_window(
    bus: &dyn MemoryBus,
    center: u32,
    before: usize,
    after: usize,
    thumb: bool,
) -> Vec<DisassemblyRow> {
    let width: u32 = if thumb { 2 } else { 4 };
    let center = center & !(width - 1);
    let back = u32::try_from(before).unwrap_or(u32::MAX).wrapping_mul(width);
    let mut address = center.wrapping_sub(back);

    let mut rows = Vec::with_capacity(before + 1 + after);
    for _ in 0..=before + after {
        let row = if thumb {
            thumb_row(bus.read16(address), Some(address))
        } else {
            arm_row(bus.read32(address), Some(address))
        };
        rows.push(row);
        address = address.wrapping_add(width);
    }
    rows
}

fn arm_row(word: u32, address: Option<u32>) -> DisassemblyRow {
    let decoded = decode_arm(word);
    let cond = decoded.cond.suffix();
    let (mnemonic, operands, is_undefined) = match decoded.instruction {
        ArmInstruction::DataProcessing {
            opcode,
            set_flags,
            rn,
            rd,
            operand,
        } => {
            let s = if set_flags && !opcode.is_test() {
                "S"
            } else {
                ""
            };
            let op2 = format_operand2(operand);
            let operands = if opcode.is_test() {
                format!("{}, {op2}", reg(rn))
            } else if opcode.is_move() {
                format!("{}, {op2}", reg(rd))
            } else {
                format!("{}, {}, {op2}", reg(rd), reg(rn))
            };
            (format!("{}{cond}{s}", opcode.mnemonic()), operands, false)
        }
        ArmInstruction::Mrs { spsr, rd } => (
            format!("MRS{cond}"),
            format!("{}, {}", reg(rd), psr_name(spsr)),
            false,
        ),
        ArmInstruction::Msr {
            spsr,
            fields,
            operand,
        } => {
            let mut target = format!("{}_", psr_name(spsr));
            for (bit, letter) in [(3, 'f'), (2, 's'), (1, 'x'), (0, 'c')] {
                if fields & (1 << bit) != 0 {
                    target.push(letter);
                }
            }
            let source = match operand {
                MsrOperand::Immediate(value) => format!("#0x{value:X}"),
                MsrOperand::Register(rm) => reg(rm).to_owned(),
            };
            (format!("MSR{cond}"), format!("{target}, {source}"), false)
        }
        ArmInstruction::Multiply {
            accumulate,
            set_flags,
            rd,
            rn,
            rs,
            rm,
        } => {
            let s = flag_suffix(set_flags);
            if accumulate {
                (
                    format!("MLA{cond}{s}"),
                    format!("{}, {}, {}, {}", reg(rd), reg(rm), reg(rs), reg(rn)),
                    false,
                )
            } else {
                (
                    format!("MUL{cond}{s}"),
                    format!("{}, {}, {}", reg(rd), reg(rm), reg(rs)),
                    false,
                )
            }
        }
        ArmInstruction::MultiplyLong {
            signed,
            accumulate,
            set_flags,
            rd_hi,
            rd_lo,
            rs,
            rm,
        } => {
            let base = match (signed, accumulate) {
                (false, false) => "UMULL",
                (false, true) => "UMLAL",
                (true, false) => "SMULL",
                (true, true) => "SMLAL",
            };
            (
                format!("{base}{cond}{}", flag_suffix(set_flags)),
                format!("{}, {}, {}, {}", reg(rd_lo), reg(rd_hi), reg(rm), reg(rs)),
                false,
            )
        }
        ArmInstruction::Swap { byte, rn, rd, rm } => (
            format!("SWP{cond}{}", if byte { "B" } else { "" }),
            format!("{}, {}, [{}]", reg(rd), reg(rm), reg(rn)),
            false,
        ),
        ArmInstruction::BranchExchange { rm } => {
            (format!("BX{cond}"), reg(rm).to_owned(), false)
        }
        ArmInstruction::HalfwordTransfer {
            load,
            kind,
            indexing,
            rn,
            rd,
            offset,
        } => {
            let suffix = match kind {
                HalfwordKind::Unsigned => "H",
                HalfwordKind::SignedByte => "SB",
                HalfwordKind::SignedHalfword => "SH",
            };
            let offset = match offset {
                HalfwordOffset::Immediate(value) => immediate_offset(u32::from(value), indexing),
                HalfwordOffset::Register(rm) => register_offset(rm, indexing),
            };
            (
                format!("{}{cond}{suffix}", transfer_name(load)),
                format!("{}, {}", reg(rd), address_operand(rn, &offset, indexing)),
                false,
            )
        }
        ArmInstruction::SingleTransfer {
            load,
            byte,
            indexing,
            rn,
            rd,
            offset,
        } => {
            let offset = match offset {
                TransferOffset::Immediate(value) => immediate_offset(u32::from(value), indexing),
                TransferOffset::Register { rm, shift, amount } => {
                    let mut text = register_offset(rm, indexing);
                    text.push_str(&format_immediate_shift(shift, amount));
                    text
                }
            };
            (
                format!("{}{cond}{}", transfer_name(load), if byte { "B" } else { "" }),
                format!("{}, {}", reg(rd), address_operand(rn, &offset, indexing)),
                false,
            )
        }
        ArmInstruction::BlockTransfer {
            load,
            user_bank,
            indexing,
            rn,
            registers,
        } => {
            let mode = match (indexing.pre_index, indexing.up) {
                (false, true) => "IA",
                (true, true) => "IB",
                (false, false) => "DA",
                (true, false) => "DB",
            };
            let mut operands = format!(
                "{}{}, {}",
                reg(rn),
                if indexing.write_back { "!" } else { "" },
                register_list(u32::from(registers), 16)
            );
            if user_bank {
                operands.push('^');
            }
            (
                format!("{}{cond}{mode}", if load { "LDM" } else { "STM" }),
                operands,
                false,
            )
        }
        ArmInstruction::Branch { link, offset } => (
            format!("B{}{cond}", if link { "L" } else { "" }),
            branch_target(address, offset.wrapping_add(8)),
            false,
        ),
        ArmInstruction::SoftwareInterrupt { comment } => {
            (format!("SWI{cond}"), format!("#0x{comment:X}"), false)
        }
        ArmInstruction::Coprocessor { .. } | ArmInstruction::Undefined => {
            (format!("UND{cond}"), format!("#0x{word:08X}"), true)
        }
    };

    DisassemblyRow {
        address: address.unwrap_or(0),
        len_bytes: 4,
        raw: word,
        mnemonic,
        operands,
        is_undefined,
    }
}

fn thumb_row(half: u16, address: Option<u32>) -> DisassemblyRow {
    let (mnemonic, operands, is_undefined) = match decode_thumb(half) {
        ThumbInstruction::MoveShifted {
            shift,
            amount,
            rs,
            rd,
        } => {
            let amount = if amount == 0 && shift != ShiftKind::Lsl {
                32
            } else {
                amount
            };
            (
                shift.mnemonic().to_owned(),
                format!("{}, {}, #{amount}", reg(rd), reg(rs)),
                false,
            )
        }
        ThumbInstruction::AddSubtract {
            subtract,
            operand,
            rs,
            rd,
        } => {
            let value = match operand {
                ThumbOperand::Register(rn) => reg(rn).to_owned(),
                ThumbOperand::Immediate(value) => format!("#{value}"),
            };
            (
                if subtract { "SUB" } else { "ADD" }.to_owned(),
                format!("{}, {}, {value}", reg(rd), reg(rs)),
                false,
            )
        }
        ThumbInstruction::Immediate { op, rd, value } => {
            let mnemonic = match op {
                ImmediateOp::Mov => "MOV",
                ImmediateOp::Cmp => "CMP",
                ImmediateOp::Add => "ADD",
                ImmediateOp::Sub => "SUB",
            };
            (
                mnemonic.to_owned(),
                format!("{}, #0x{value:X}", reg(rd)),
                false,
            )
        }
        ThumbInstruction::Alu { op, rs, rd } => (
            op.mnemonic().to_owned(),
            format!("{}, {}", reg(rd), reg(rs)),
            false,
        ),
        ThumbInstruction::HiRegister { op, rs, rd } => {
            let mnemonic = match op {
                HiRegisterOp::Add => "ADD",
                HiRegisterOp::Cmp => "CMP",
                HiRegisterOp::Mov => "MOV",
            };
            (
                mnemonic.to_owned(),
                format!("{}, {}", reg(rd), reg(rs)),
                false,
            )
        }
        ThumbInstruction::BranchExchange { rs } => ("BX".to_owned(), reg(rs).to_owned(), false),
        ThumbInstruction::PcRelativeLoad { rd, offset } => (
            "LDR".to_owned(),
            format!("{}, [pc, #0x{offset:X}]", reg(rd)),
            false,
        ),
        ThumbInstruction::LoadStoreRegister {
            load,
            byte,
            ro,
            rb,
            rd,
        } => (
            format!("{}{}", transfer_name(load), if byte { "B" } else { "" }),
            format!("{}, [{}, {}]", reg(rd), reg(rb), reg(ro)),
            false,
        ),
        ThumbInstruction::LoadStoreSigned { op, ro, rb, rd } => {
            let mnemonic = match op {
                SignedTransfer::StoreHalfword => "STRH",
                SignedTransfer::LoadHalfword => "LDRH",
                SignedTransfer::LoadSignedByte => "LDRSB",
                SignedTransfer::LoadSignedHalfword => "LDRSH",
            };
            (
                mnemonic.to_owned(),
                format!("{}, [{}, {}]", reg(rd), reg(rb), reg(ro)),
                false,
            )
        }
        ThumbInstruction::LoadStoreImmediate {
            load,
            byte,
            offset,
            rb,
            rd,
        } => (
            format!("{}{}", transfer_name(load), if byte { "B" } else { "" }),
            format!("{}, [{}, #0x{offset:X}]", reg(rd), reg(rb)),
            false,
        ),
        ThumbInstruction::LoadStoreHalfword {
            load,
            offset,
            rb,
            rd,
        } => (
            format!("{}H", transfer_name(load)),
            format!("{}, [{}, #0x{offset:X}]", reg(rd), reg(rb)),
            false,
        ),
        ThumbInstruction::SpRelative { load, rd, offset } => (
            transfer_name(load).to_owned(),
            format!("{}, [sp, #0x{offset:X}]", reg(rd)),
            false,
        ),
        ThumbInstruction::LoadAddress {
            from_sp,
            rd,
            offset,
        } => (
            "ADD".to_owned(),
            format!(
                "{}, {}, #0x{offset:X}",
                reg(rd),
                if from_sp { "sp" } else { "pc" }
            ),
            false,
        ),
        ThumbInstruction::AdjustStack { offset } => {
            let sign = if offset < 0 { "-" } else { "" };
            (
                "ADD".to_owned(),
                format!("sp, #{sign}0x{:X}", offset.unsigned_abs()),
                false,
            )
        }
        ThumbInstruction::PushPop {
            pop,
            link,
            registers,
        } => {
            let mut list = u32::from(registers);
            if link {
                list |= if pop { 1 << 15 } else { 1 << 14 };
            }
            (
                if pop { "POP" } else { "PUSH" }.to_owned(),
                register_list(list, 16),
                false,
            )
        }
        ThumbInstruction::MultipleTransfer {
            load,
            rb,
            registers,
        } => (
            if load { "LDMIA" } else { "STMIA" }.to_owned(),
            format!("{}!, {}", reg(rb), register_list(u32::from(registers), 8)),
            false,
        ),
        ThumbInstruction::ConditionalBranch { cond, offset } => (
            format!("B{}", cond.suffix()),
            branch_target(address, i32::from(offset) + 4),
            false,
        ),
        ThumbInstruction::SoftwareInterrupt { comment } => {
            ("SWI".to_owned(), format!("#0x{comment:X}"), false)
        }
        ThumbInstruction::Branch { offset } => (
            "B".to_owned(),
            branch_target(address, i32::from(offset) + 4),
            false,
        ),
        ThumbInstruction::LongBranchHigh { offset } => (
            "BL".to_owned(),
            format!("hi #{}0x{:X}", sign_of(offset), offset.unsigned_abs()),
            false,
        ),
        ThumbInstruction::LongBranchLow { offset } => {
            ("BL".to_owned(), format!("lo #0x{offset:X}"), false)
        }
        ThumbInstruction::Undefined => (".hword".to_owned(), format!("0x{half:04X}"), true),
    };

    DisassemblyRow {
        address: address.unwrap_or(0),
        len_bytes: 2,
        raw: u32::from(half),
        mnemonic,
        operands,
        is_undefined,
    }
}

const REGISTER_NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "lr",
    "pc",
];

fn reg(index: u8) -> &'static str {
    REGISTER_NAMES[usize::from(index & 0xF)]
}

const fn psr_name(spsr: bool) -> &'static str {
    if spsr {
        "SPSR"
    } else {
        "CPSR"
    }
}

const fn flag_suffix(set_flags: bool) -> &'static str {
    if set_flags {
        "S"
    } else {
        ""
    }
}

const fn transfer_name(load: bool) -> &'static str {
    if load {
        "LDR"
    } else {
        "STR"
    }
}

const fn sign_of(value: i32) -> &'static str {
    if value < 0 {
        "-"
    } else {
        ""
    }
}

fn format_operand2(operand: Operand2) -> String {
    match operand {
        Operand2::Immediate { value, .. } => format!("#0x{value:X}"),
        Operand2::Register {
            rm,
            shift,
            amount: ShiftAmount::Immediate(amount),
        } => format!("{}{}", reg(rm), format_immediate_shift(shift, amount)),
        Operand2::Register {
            rm,
            shift,
            amount: ShiftAmount::Register(rs),
        } => format!("{}, {} {}", reg(rm), shift.mnemonic(), reg(rs)),
    }
}

fn format_immediate_shift(shift: ShiftKind, amount: u8) -> String {
    match (shift, amount) {
        (ShiftKind::Lsl, 0) => String::new(),
        (ShiftKind::Ror, 0) => ", RRX".to_owned(),
        (ShiftKind::Lsr | ShiftKind::Asr, 0) => format!(", {} #32", shift.mnemonic()),
        _ => format!(", {} #{amount}", shift.mnemonic()),
    }
}

fn immediate_offset(value: u32, indexing: Indexing) -> String {
    if value == 0 && indexing.pre_index {
        String::new()
    } else {
        format!("#{}0x{value:X}", if indexing.up { "" } else { "-" })
    }
}

fn register_offset(rm: u8, indexing: Indexing) -> String {
    format!("{}{}", if indexing.up { "" } else { "-" }, reg(rm))
}

fn address_operand(rn: u8, offset: &str, indexing: Indexing) -> String {
    let base = reg(rn);
    if !indexing.pre_index {
        return format!("[{base}], {offset}");
    }
    let write_back = if indexing.write_back { "!" } else { "" };
    if offset.is_empty() {
        format!("[{base}]{write_back}")
    } else {
        format!("[{base}, {offset}]{write_back}")
    }
}

fn register_list(list: u32, count: u8) -> String {
    let mut text = String::from("{");
    let mut first = true;
    for index in 0..count {
        if list & (1 << index) != 0 {
            if !first {
                text.push_str(", ");
            }
            text.push_str(reg(index));
            first = false;
        }
    }
    text.push('}');
    text
}

/// `relative` is the byte distance from the instruction address.
fn branch_target(address: Option<u32>, relative: i32) -> String {
    match address {
        Some(address) => format!("0x{:08X}", address.wrapping_add_signed(relative)),
        None => format!(
            "${}0x{:X}",
            if relative < 0 { "-" } else { "+" },
            relative.unsigned_abs()
        ),
    }
}
