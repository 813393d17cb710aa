use crate::encoding::InstructionClass;

/// Cycles charged per instruction class. The values approximate ARM7TDMI
/// sequential/non-sequential costs on zero-wait-state memory and are what
/// drives the video clock.
pub const CYCLE_COST_TABLE: &[(InstructionClass, u16)] = &[
    (InstructionClass::DataProcessing, 1),
    (InstructionClass::PsrTransfer, 1),
    (InstructionClass::Multiply, 2),
    (InstructionClass::MultiplyLong, 3),
    (InstructionClass::Swap, 4),
    (InstructionClass::BranchExchange, 3),
    (InstructionClass::Load, 3),
    (InstructionClass::Store, 2),
    (InstructionClass::LoadMultiple, 3),
    (InstructionClass::StoreMultiple, 2),
    (InstructionClass::Branch, 3),
    (InstructionClass::SoftwareInterrupt, 3),
    (InstructionClass::Coprocessor, 3),
    (InstructionClass::Undefined, 3),
];

/// Cycles charged for entering an interrupt.
pub const IRQ_ENTRY_CYCLES: u32 = 3;

/// Cycles a halted CPU lets pass per tick.
pub const HALT_IDLE_CYCLES: u32 = 1;

/// Looks up the cycle cost for an instruction class.
#[must_use]
pub fn cycle_cost(class: InstructionClass) -> Option<u16> {
    CYCLE_COST_TABLE
        .iter()
        .find_map(|(entry_class, cycles)| (*entry_class == class).then_some(*cycles))
}

/// Cycle cost for `class`, falling back to a single cycle.
#[must_use]
pub fn instruction_cycles(class: InstructionClass) -> u32 {
    cycle_cost(class).map_or(1, u32::from)
}
