use super::helpers::{
    add_with_carry, load_halfword, load_signed_byte, load_signed_halfword, load_word,
    shift_by_immediate, shift_by_register,
};
use super::{Executed, Executor, FlagsUpdate};
use crate::decoder::{HiRegisterOp, ImmediateOp, SignedTransfer, ThumbInstruction, ThumbOperand};
use crate::encoding::{ShiftKind, ThumbAluOp};
use crate::exception::Exception;
use crate::state::{LR, PC, SP};

impl Executor<'_> {
    pub(super) fn execute_thumb(&mut self, instruction: ThumbInstruction) -> Executed {
        match instruction {
            ThumbInstruction::MoveShifted {
                shift,
                amount,
                rs,
                rd,
            } => {
                let (result, carry) = shift_by_immediate(shift, self.reg(rs), amount, self.carry());
                self.set_reg(rd, result);
                FlagsUpdate::Logical { result, carry }.apply(self.regs);
            }
            ThumbInstruction::AddSubtract {
                subtract: is_subtract,
                operand,
                rs,
                rd,
            } => {
                let value = match operand {
                    ThumbOperand::Register(rn) => self.reg(rn),
                    ThumbOperand::Immediate(value) => u32::from(value),
                };
                let flags = if is_subtract {
                    subtract(self.reg(rs), value)
                } else {
                    add(self.reg(rs), value, false)
                };
                self.write_arithmetic(rd, flags);
            }
            ThumbInstruction::Immediate { op, rd, value } => {
                let value = u32::from(value);
                match op {
                    ImmediateOp::Mov => {
                        self.set_reg(rd, value);
                        FlagsUpdate::Result { result: value }.apply(self.regs);
                    }
                    ImmediateOp::Cmp => subtract(self.reg(rd), value).apply(self.regs),
                    ImmediateOp::Add => {
                        let flags = add(self.reg(rd), value, false);
                        self.write_arithmetic(rd, flags);
                    }
                    ImmediateOp::Sub => {
                        let flags = subtract(self.reg(rd), value);
                        self.write_arithmetic(rd, flags);
                    }
                }
            }
            ThumbInstruction::Alu { op, rs, rd } => self.thumb_alu(op, rs, rd),
            ThumbInstruction::HiRegister { op, rs, rd } => match op {
                HiRegisterOp::Add => {
                    let result = self.reg(rd).wrapping_add(self.reg(rs));
                    self.set_reg(rd, result);
                }
                HiRegisterOp::Cmp => subtract(self.reg(rd), self.reg(rs)).apply(self.regs),
                HiRegisterOp::Mov => self.set_reg(rd, self.reg(rs)),
            },
            ThumbInstruction::BranchExchange { rs } => {
                let target = self.reg(rs);
                self.regs.set_thumb(target & 1 != 0);
                self.branch_to(target);
            }
            ThumbInstruction::PcRelativeLoad { rd, offset } => {
                let addr = (self.reg(PC as u8) & !3).wrapping_add(u32::from(offset));
                let value = self.bus.read32(addr);
                self.set_reg(rd, value);
            }
            ThumbInstruction::LoadStoreRegister {
                load,
                byte,
                ro,
                rb,
                rd,
            } => {
                let addr = self.reg(rb).wrapping_add(self.reg(ro));
                self.load_store(load, byte, addr, rd);
            }
            ThumbInstruction::LoadStoreSigned { op, ro, rb, rd } => {
                let addr = self.reg(rb).wrapping_add(self.reg(ro));
                match op {
                    SignedTransfer::StoreHalfword => {
                        let value = self.reg(rd);
                        self.bus.write16(addr, value as u16);
                    }
                    SignedTransfer::LoadHalfword => {
                        let value = load_halfword(self.bus, addr);
                        self.set_reg(rd, value);
                    }
                    SignedTransfer::LoadSignedByte => {
                        let value = load_signed_byte(self.bus, addr);
                        self.set_reg(rd, value);
                    }
                    SignedTransfer::LoadSignedHalfword => {
                        let value = load_signed_halfword(self.bus, addr);
                        self.set_reg(rd, value);
                    }
                }
            }
            ThumbInstruction::LoadStoreImmediate {
                load,
                byte,
                offset,
                rb,
                rd,
            } => {
                let addr = self.reg(rb).wrapping_add(u32::from(offset));
                self.load_store(load, byte, addr, rd);
            }
            ThumbInstruction::LoadStoreHalfword {
                load,
                offset,
                rb,
                rd,
            } => {
                let addr = self.reg(rb).wrapping_add(u32::from(offset));
                if load {
                    let value = load_halfword(self.bus, addr);
                    self.set_reg(rd, value);
                } else {
                    let value = self.reg(rd);
                    self.bus.write16(addr, value as u16);
                }
            }
            ThumbInstruction::SpRelative { load, rd, offset } => {
                let addr = self.reg(SP as u8).wrapping_add(u32::from(offset));
                self.load_store(load, false, addr, rd);
            }
            ThumbInstruction::LoadAddress {
                from_sp,
                rd,
                offset,
            } => {
                let base = if from_sp {
                    self.reg(SP as u8)
                } else {
                    self.reg(PC as u8) & !3
                };
                self.set_reg(rd, base.wrapping_add(u32::from(offset)));
            }
            ThumbInstruction::AdjustStack { offset } => {
                let sp = self.regs.gpr(SP).wrapping_add(i32::from(offset) as u32);
                self.regs.set_gpr(SP, sp);
            }
            ThumbInstruction::PushPop {
                pop,
                link,
                registers,
            } => self.push_pop(pop, link, registers),
            ThumbInstruction::MultipleTransfer {
                load,
                rb,
                registers,
            } => self.multiple_transfer(load, rb, registers),
            ThumbInstruction::ConditionalBranch { cond, offset } => {
                if cond.passes(self.regs.cpsr()) {
                    let target = self.reg(PC as u8).wrapping_add(i32::from(offset) as u32);
                    self.branch_to(target);
                }
            }
            ThumbInstruction::SoftwareInterrupt { .. } => return Err(Exception::SoftwareInterrupt),
            ThumbInstruction::Branch { offset } => {
                let target = self.reg(PC as u8).wrapping_add(i32::from(offset) as u32);
                self.branch_to(target);
            }
            ThumbInstruction::LongBranchHigh { offset } => {
                let partial = self.reg(PC as u8).wrapping_add(offset as u32);
                self.regs.set_gpr(LR, partial);
            }
            ThumbInstruction::LongBranchLow { offset } => {
                let next = self.regs.pc();
                let target = self.regs.gpr(LR).wrapping_add(u32::from(offset));
                self.regs.set_gpr(LR, next | 1);
                self.branch_to(target);
            }
            ThumbInstruction::Undefined => return Err(Exception::UndefinedInstruction),
        }
        Ok(())
    }

    fn write_arithmetic(&mut self, rd: u8, flags: FlagsUpdate) {
        if let FlagsUpdate::Arithmetic { result, .. } = flags {
            self.set_reg(rd, result);
        }
        flags.apply(self.regs);
    }

    fn thumb_alu(&mut self, op: ThumbAluOp, rs: u8, rd: u8) {
        let a = self.reg(rd);
        let b = self.reg(rs);
        let carry_in = self.carry();
        let shift = |kind: ShiftKind| {
            let (result, carry) = shift_by_register(kind, a, b & 0xFF, carry_in);
            FlagsUpdate::Logical { result, carry }
        };
        let logical = |result: u32| FlagsUpdate::Logical {
            result,
            carry: carry_in,
        };

        let (flags, writes) = match op {
            ThumbAluOp::And => (logical(a & b), true),
            ThumbAluOp::Eor => (logical(a ^ b), true),
            ThumbAluOp::Orr => (logical(a | b), true),
            ThumbAluOp::Bic => (logical(a & !b), true),
            ThumbAluOp::Mvn => (logical(!b), true),
            ThumbAluOp::Tst => (logical(a & b), false),
            ThumbAluOp::Lsl => (shift(ShiftKind::Lsl), true),
            ThumbAluOp::Lsr => (shift(ShiftKind::Lsr), true),
            ThumbAluOp::Asr => (shift(ShiftKind::Asr), true),
            ThumbAluOp::Ror => (shift(ShiftKind::Ror), true),
            ThumbAluOp::Adc => (add(a, b, carry_in), true),
            ThumbAluOp::Sbc => (add(a, !b, carry_in), true),
            ThumbAluOp::Neg => (subtract(0, b), true),
            ThumbAluOp::Cmp => (subtract(a, b), false),
            ThumbAluOp::Cmn => (add(a, b, false), false),
            // ARMv4 leaves C in an unpredictable state after MUL; this core
            // keeps it.
            ThumbAluOp::Mul => (
                FlagsUpdate::Result {
                    result: a.wrapping_mul(b),
                },
                true,
            ),
        };

        if writes {
            let result = match flags {
                FlagsUpdate::Result { result }
                | FlagsUpdate::Logical { result, .. }
                | FlagsUpdate::Arithmetic { result, .. } => result,
                FlagsUpdate::None | FlagsUpdate::Long { .. } => a,
            };
            self.set_reg(rd, result);
        }
        flags.apply(self.regs);
    }

    fn load_store(&mut self, load: bool, byte: bool, addr: u32, rd: u8) {
        if load {
            let value = if byte {
                u32::from(self.bus.read8(addr))
            } else {
                load_word(self.bus, addr)
            };
            self.set_reg(rd, value);
            return;
        }
        let value = self.reg(rd);
        if byte {
            self.bus.write8(addr, value as u8);
        } else {
            self.bus.write32(addr, value);
        }
    }

    fn push_pop(&mut self, pop: bool, link: bool, registers: u8) {
        let count = registers.count_ones() + u32::from(link);
        let sp = self.regs.gpr(SP);
        if pop {
            let mut addr = sp;
            for index in (0..8).filter(|index| registers & (1 << index) != 0) {
                let value = self.bus.read32(addr);
                self.regs.set_gpr(index, value);
                addr = addr.wrapping_add(4);
            }
            if link {
                let value = self.bus.read32(addr);
                self.branch_to(value);
            }
            self.regs.set_gpr(SP, sp.wrapping_add(count * 4));
        } else {
            let start = sp.wrapping_sub(count * 4);
            let mut addr = start;
            for index in (0..8).filter(|index| registers & (1 << index) != 0) {
                self.bus.write32(addr, self.regs.gpr(index));
                addr = addr.wrapping_add(4);
            }
            if link {
                self.bus.write32(addr, self.regs.gpr(LR));
            }
            self.regs.set_gpr(SP, start);
        }
    }

    fn multiple_transfer(&mut self, load: bool, rb: u8, registers: u8) {
        let base = self.reg(rb);
        if registers == 0 {
            // Empty list: r15 is transferred and the base moves by 16 words.
            if load {
                let value = self.bus.read32(base);
                self.branch_to(value);
            } else {
                let value = self.reg(PC as u8).wrapping_add(2);
                self.bus.write32(base, value);
            }
            self.write_back(rb, base.wrapping_add(0x40));
            return;
        }

        let final_base = base.wrapping_add(registers.count_ones() * 4);
        let rb_index = usize::from(rb);
        let mut addr = base;
        if load {
            self.write_back(rb, final_base);
            for index in (0..8).filter(|index| registers & (1 << index) != 0) {
                let value = self.bus.read32(addr);
                self.regs.set_gpr(index, value);
                addr = addr.wrapping_add(4);
            }
        } else {
            let first = registers.trailing_zeros() as usize;
            for index in (0..8).filter(|index| registers & (1 << index) != 0) {
                let value = if index == rb_index && index != first {
                    final_base
                } else {
                    self.regs.gpr(index)
                };
                self.bus.write32(addr, value);
                addr = addr.wrapping_add(4);
            }
            self.write_back(rb, final_base);
        }
    }
}

const fn add(a: u32, b: u32, carry: bool) -> FlagsUpdate {
    let (result, carry, overflow) = add_with_carry(a, b, carry);
    FlagsUpdate::Arithmetic {
        result,
        carry,
        overflow,
    }
}

const fn subtract(a: u32, b: u32) -> FlagsUpdate {
    add(a, !b, true)
}
