//! Barrel shifter, adder and load-alignment helpers shared by both
//! instruction sets.

use crate::encoding::ShiftKind;
use crate::memory::MemoryBus;

/// Shifts `value` by a five-bit immediate amount, returning the result and
/// shifter carry-out. An amount of zero encodes `LSR #32`, `ASR #32` and
/// `RRX` for the non-`LSL` kinds.
#[must_use]
pub const fn shift_by_immediate(
    kind: ShiftKind,
    value: u32,
    amount: u8,
    carry_in: bool,
) -> (u32, bool) {
    let amount = (amount & 0x1F) as u32;
    match kind {
        ShiftKind::Lsl if amount == 0 => (value, carry_in),
        ShiftKind::Lsl => (value << amount, value & (1 << (32 - amount)) != 0),
        ShiftKind::Lsr if amount == 0 => (0, value >> 31 != 0),
        ShiftKind::Lsr => (value >> amount, value & (1 << (amount - 1)) != 0),
        ShiftKind::Asr if amount == 0 => (sign_fill(value), value >> 31 != 0),
        ShiftKind::Asr => (
            ((value as i32) >> amount) as u32,
            value & (1 << (amount - 1)) != 0,
        ),
        ShiftKind::Ror if amount == 0 => (((carry_in as u32) << 31) | (value >> 1), value & 1 != 0),
        ShiftKind::Ror => (value.rotate_right(amount), value & (1 << (amount - 1)) != 0),
    }
}

/// Shifts `value` by the bottom byte of a register. Amounts of 32 and above
/// saturate; zero passes the value and carry through untouched.
#[must_use]
pub const fn shift_by_register(
    kind: ShiftKind,
    value: u32,
    amount: u32,
    carry_in: bool,
) -> (u32, bool) {
    let amount = amount & 0xFF;
    if amount == 0 {
        return (value, carry_in);
    }
    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => (value << amount, value & (1 << (32 - amount)) != 0),
            32 => (0, value & 1 != 0),
            _ => (0, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => (value >> amount, value & (1 << (amount - 1)) != 0),
            32 => (0, value >> 31 != 0),
            _ => (0, false),
        },
        ShiftKind::Asr => {
            if amount < 32 {
                (
                    ((value as i32) >> amount) as u32,
                    value & (1 << (amount - 1)) != 0,
                )
            } else {
                (sign_fill(value), value >> 31 != 0)
            }
        }
        ShiftKind::Ror => {
            let rotate = amount & 0x1F;
            if rotate == 0 {
                (value, value >> 31 != 0)
            } else {
                (
                    value.rotate_right(rotate),
                    value & (1 << (rotate - 1)) != 0,
                )
            }
        }
    }
}

const fn sign_fill(value: u32) -> u32 {
    if value >> 31 == 0 {
        0
    } else {
        u32::MAX
    }
}

/// `a + b + carry`, returning the result, carry-out and signed overflow.
/// Subtraction is `add_with_carry(a, !b, true)`.
#[must_use]
pub const fn add_with_carry(a: u32, b: u32, carry_in: bool) -> (u32, bool, bool) {
    let wide = a as u64 + b as u64 + carry_in as u64;
    let result = wide as u32;
    let overflow = (!(a ^ b) & (a ^ result)) >> 31 != 0;
    (result, wide > u32::MAX as u64, overflow)
}

/// Word load with the ARMv4 misaligned rotation.
pub fn load_word(bus: &dyn MemoryBus, addr: u32) -> u32 {
    bus.read32(addr).rotate_right(8 * (addr & 3))
}

/// Unsigned halfword load; odd addresses rotate the value by one byte.
pub fn load_halfword(bus: &dyn MemoryBus, addr: u32) -> u32 {
    u32::from(bus.read16(addr)).rotate_right(8 * (addr & 1))
}

/// Sign-extended halfword load; an odd address loads a sign-extended byte.
pub fn load_signed_halfword(bus: &dyn MemoryBus, addr: u32) -> u32 {
    if addr & 1 == 0 {
        bus.read16(addr) as i16 as i32 as u32
    } else {
        load_signed_byte(bus, addr)
    }
}

/// Sign-extended byte load.
pub fn load_signed_byte(bus: &dyn MemoryBus, addr: u32) -> u32 {
    bus.read8(addr) as i8 as i32 as u32
}
