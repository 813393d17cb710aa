//! CPU register and execution-state model.

/// Banked register file, CPSR/SPSR and processor modes.
pub mod registers;
/// Halt/run state machine.
pub mod run_state;

pub use registers::{
    Mode, RegisterFile, GENERAL_REGISTER_COUNT, LR, PC, POWER_ON_CPSR, PSR_C, PSR_F, PSR_I,
    PSR_MODE_MASK, PSR_N, PSR_T, PSR_V, PSR_Z, SP,
};
pub use run_state::RunState;
