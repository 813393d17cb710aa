use super::helpers::{
    add_with_carry, load_halfword, load_signed_byte, load_signed_halfword, load_word,
    shift_by_immediate, shift_by_register,
};
use super::{Executed, Executor, FlagsUpdate};
use crate::decoder::{
    ArmInstruction, HalfwordKind, HalfwordOffset, Indexing, MsrOperand, Operand2, ShiftAmount,
    TransferOffset,
};
use crate::encoding::AluOpcode;
use crate::exception::Exception;
use crate::state::{Mode, LR, PC, PSR_T};

impl Executor<'_> {
    pub(super) fn execute_arm(&mut self, instruction: ArmInstruction) -> Executed {
        match instruction {
            ArmInstruction::DataProcessing {
                opcode,
                set_flags,
                rn,
                rd,
                operand,
            } => self.data_processing(opcode, set_flags, rn, rd, operand),
            ArmInstruction::Mrs { spsr, rd } => {
                let value = if spsr {
                    self.regs.spsr().unwrap_or_else(|| self.regs.cpsr())
                } else {
                    self.regs.cpsr()
                };
                self.set_reg(rd, value);
            }
            ArmInstruction::Msr {
                spsr,
                fields,
                operand,
            } => self.msr(spsr, fields, operand),
            ArmInstruction::Multiply {
                accumulate,
                set_flags,
                rd,
                rn,
                rs,
                rm,
            } => {
                let mut result = self.reg(rm).wrapping_mul(self.reg(rs));
                if accumulate {
                    result = result.wrapping_add(self.reg(rn));
                }
                self.set_reg(rd, result);
                if set_flags {
                    FlagsUpdate::Result { result }.apply(self.regs);
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
                let mut result = if signed {
                    (i64::from(self.reg(rm) as i32) * i64::from(self.reg(rs) as i32)) as u64
                } else {
                    u64::from(self.reg(rm)) * u64::from(self.reg(rs))
                };
                if accumulate {
                    let addend = (u64::from(self.reg(rd_hi)) << 32) | u64::from(self.reg(rd_lo));
                    result = result.wrapping_add(addend);
                }
                self.set_reg(rd_lo, result as u32);
                self.set_reg(rd_hi, (result >> 32) as u32);
                if set_flags {
                    FlagsUpdate::Long { result }.apply(self.regs);
                }
            }
            ArmInstruction::Swap { byte, rn, rd, rm } => {
                let addr = self.reg(rn);
                let source = self.reg(rm);
                let loaded = if byte {
                    let old = u32::from(self.bus.read8(addr));
                    self.bus.write8(addr, source as u8);
                    old
                } else {
                    let old = load_word(self.bus, addr);
                    self.bus.write32(addr, source);
                    old
                };
                self.set_reg(rd, loaded);
            }
            ArmInstruction::BranchExchange { rm } => {
                let target = self.reg(rm);
                self.regs.set_thumb(target & 1 != 0);
                self.branch_to(target);
            }
            ArmInstruction::HalfwordTransfer {
                load,
                kind,
                indexing,
                rn,
                rd,
                offset,
            } => {
                let offset = match offset {
                    HalfwordOffset::Immediate(value) => u32::from(value),
                    HalfwordOffset::Register(rm) => self.reg(rm),
                };
                self.halfword_transfer(load, kind, indexing, rn, rd, offset);
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
                    TransferOffset::Immediate(value) => u32::from(value),
                    TransferOffset::Register { rm, shift, amount } => {
                        shift_by_immediate(shift, self.reg(rm), amount, self.carry()).0
                    }
                };
                self.single_transfer(load, byte, indexing, rn, rd, offset);
            }
            ArmInstruction::BlockTransfer {
                load,
                user_bank,
                indexing,
                rn,
                registers,
            } => self.block_transfer(load, user_bank, indexing, rn, registers),
            ArmInstruction::Branch { link, offset } => {
                if link {
                    self.regs.set_gpr(LR, self.regs.pc());
                }
                let target = self.reg(PC as u8).wrapping_add(offset as u32);
                self.branch_to(target);
            }
            ArmInstruction::SoftwareInterrupt { .. } => {
                return Err(Exception::SoftwareInterrupt);
            }
            ArmInstruction::Coprocessor { .. } | ArmInstruction::Undefined => {
                return Err(Exception::UndefinedInstruction);
            }
        }
        Ok(())
    }

    fn data_processing(
        &mut self,
        opcode: AluOpcode,
        set_flags: bool,
        rn: u8,
        rd: u8,
        operand: Operand2,
    ) {
        let carry_in = self.carry();
        let (op2, shifter_carry, register_shift) = match operand {
            Operand2::Immediate { value, rotate } => {
                let carry = if rotate == 0 {
                    carry_in
                } else {
                    value >> 31 != 0
                };
                (value, carry, false)
            }
            Operand2::Register {
                rm,
                shift,
                amount: ShiftAmount::Immediate(amount),
            } => {
                let (value, carry) = shift_by_immediate(shift, self.reg(rm), amount, carry_in);
                (value, carry, false)
            }
            Operand2::Register {
                rm,
                shift,
                amount: ShiftAmount::Register(rs),
            } => {
                let amount = self.reg(rs) & 0xFF;
                let (value, carry) = shift_by_register(shift, self.reg_late(rm), amount, carry_in);
                (value, carry, true)
            }
        };
        let op1 = if register_shift {
            self.reg_late(rn)
        } else {
            self.reg(rn)
        };

        let logical = |result: u32| {
            (
                result,
                FlagsUpdate::Logical {
                    result,
                    carry: shifter_carry,
                },
            )
        };
        let arithmetic = |(result, carry, overflow): (u32, bool, bool)| {
            (
                result,
                FlagsUpdate::Arithmetic {
                    result,
                    carry,
                    overflow,
                },
            )
        };
        let (result, flags) = match opcode {
            AluOpcode::And | AluOpcode::Tst => logical(op1 & op2),
            AluOpcode::Eor | AluOpcode::Teq => logical(op1 ^ op2),
            AluOpcode::Orr => logical(op1 | op2),
            AluOpcode::Mov => logical(op2),
            AluOpcode::Bic => logical(op1 & !op2),
            AluOpcode::Mvn => logical(!op2),
            AluOpcode::Sub | AluOpcode::Cmp => arithmetic(add_with_carry(op1, !op2, true)),
            AluOpcode::Rsb => arithmetic(add_with_carry(op2, !op1, true)),
            AluOpcode::Add | AluOpcode::Cmn => arithmetic(add_with_carry(op1, op2, false)),
            AluOpcode::Adc => arithmetic(add_with_carry(op1, op2, carry_in)),
            AluOpcode::Sbc => arithmetic(add_with_carry(op1, !op2, carry_in)),
            AluOpcode::Rsc => arithmetic(add_with_carry(op2, !op1, carry_in)),
        };

        if opcode.is_test() {
            flags.apply(self.regs);
            return;
        }
        if usize::from(rd) == PC {
            // `S` with a PC destination returns from an exception.
            if set_flags {
                if let Some(spsr) = self.regs.spsr() {
                    self.regs.set_cpsr(spsr);
                }
            }
            self.branch_to(result);
            return;
        }
        self.regs.set_gpr(usize::from(rd), result);
        if set_flags {
            flags.apply(self.regs);
        }
    }

    fn msr(&mut self, spsr: bool, fields: u8, operand: MsrOperand) {
        let value = match operand {
            MsrOperand::Immediate(value) => value,
            MsrOperand::Register(rm) => self.reg(rm),
        };
        let mut mask = 0;
        for (bit, lane) in [0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000]
            .into_iter()
            .enumerate()
        {
            if fields & (1 << bit) != 0 {
                mask |= lane;
            }
        }

        if spsr {
            if let Some(old) = self.regs.spsr() {
                self.regs.set_spsr((old & !mask) | (value & mask));
            }
            return;
        }
        if self.regs.mode() == Mode::User {
            mask &= 0xFF00_0000;
        }
        mask &= !PSR_T;
        let cpsr = self.regs.cpsr();
        self.regs.set_cpsr((cpsr & !mask) | (value & mask));
    }

    fn single_transfer(
        &mut self,
        load: bool,
        byte: bool,
        indexing: Indexing,
        rn: u8,
        rd: u8,
        offset: u32,
    ) {
        let base = self.reg(rn);
        let offset_addr = offset_address(base, offset, indexing.up);
        let addr = if indexing.pre_index { offset_addr } else { base };
        let write_back = !indexing.pre_index || indexing.write_back;

        if load {
            let value = if byte {
                u32::from(self.bus.read8(addr))
            } else {
                load_word(self.bus, addr)
            };
            if write_back {
                self.write_back(rn, offset_addr);
            }
            self.set_reg(rd, value);
        } else {
            let value = self.reg_late(rd);
            if byte {
                self.bus.write8(addr, value as u8);
            } else {
                self.bus.write32(addr, value);
            }
            if write_back {
                self.write_back(rn, offset_addr);
            }
        }
    }

    fn halfword_transfer(
        &mut self,
        load: bool,
        kind: HalfwordKind,
        indexing: Indexing,
        rn: u8,
        rd: u8,
        offset: u32,
    ) {
        let base = self.reg(rn);
        let offset_addr = offset_address(base, offset, indexing.up);
        let addr = if indexing.pre_index { offset_addr } else { base };
        let write_back = !indexing.pre_index || indexing.write_back;

        if load {
            let value = match kind {
                HalfwordKind::Unsigned => load_halfword(self.bus, addr),
                HalfwordKind::SignedByte => load_signed_byte(self.bus, addr),
                HalfwordKind::SignedHalfword => load_signed_halfword(self.bus, addr),
            };
            if write_back {
                self.write_back(rn, offset_addr);
            }
            self.set_reg(rd, value);
        } else {
            let value = self.reg_late(rd);
            self.bus.write16(addr, value as u16);
            if write_back {
                self.write_back(rn, offset_addr);
            }
        }
    }

    fn block_transfer(
        &mut self,
        load: bool,
        user_bank: bool,
        indexing: Indexing,
        rn: u8,
        registers: u16,
    ) {
        // An empty list transfers only r15 but still moves the base by 16 words.
        let (list, span) = if registers == 0 {
            (1_u16 << PC, 0x40)
        } else {
            (registers, registers.count_ones() * 4)
        };
        let base = self.reg(rn);
        let start = match (indexing.pre_index, indexing.up) {
            (false, true) => base,
            (true, true) => base.wrapping_add(4),
            (false, false) => base.wrapping_sub(span).wrapping_add(4),
            (true, false) => base.wrapping_sub(span),
        };
        let final_base = if indexing.up {
            base.wrapping_add(span)
        } else {
            base.wrapping_sub(span)
        };
        let restores_cpsr = load && user_bank && list & (1 << PC) != 0;
        let user_registers = user_bank && !restores_cpsr;

        let mut addr = start;
        if load {
            if indexing.write_back {
                self.write_back(rn, final_base);
            }
            for index in (0..16).filter(|index| list & (1 << index) != 0) {
                let value = self.bus.read32(addr);
                if index == PC {
                    if restores_cpsr {
                        if let Some(spsr) = self.regs.spsr() {
                            self.regs.set_cpsr(spsr);
                        }
                    }
                    self.branch_to(value);
                } else if user_registers {
                    self.regs.set_user_register(index, value);
                } else {
                    self.regs.set_gpr(index, value);
                }
                addr = addr.wrapping_add(4);
            }
        } else {
            let first = list.trailing_zeros() as usize;
            for index in (0..16).filter(|index| list & (1 << index) != 0) {
                let value = if index == PC {
                    self.reg_late(PC as u8)
                } else if user_registers {
                    self.regs.user_register(index)
                } else if index == usize::from(rn) && index != first && indexing.write_back {
                    final_base
                } else {
                    self.regs.gpr(index)
                };
                self.bus.write32(addr, value);
                addr = addr.wrapping_add(4);
            }
            if indexing.write_back {
                self.write_back(rn, final_base);
            }
        }
    }

    /// Base-register write-back; a PC base never writes back.
    pub(super) fn write_back(&mut self, rn: u8, value: u32) {
        if usize::from(rn) != PC {
            self.regs.set_gpr(usize::from(rn), value);
        }
    }
}

const fn offset_address(base: u32, offset: u32, up: bool) -> u32 {
    if up {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    }
}
