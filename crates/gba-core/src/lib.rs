//! Emulation core for a GBA-class handheld: ARM7TDMI interpreter, memory
//! bus, background renderer, breakpoint debugger and a live inspection
//! protocol.

/// Address bus, region map and I/O register file.
pub mod memory;
pub use memory::{
    decode_memory_region, Bus, Interrupt, IoRegisters, Key, MemoryBus, MemoryRegion,
    MemorySnapshot, RegionDescriptor, FIXED_MEMORY_REGIONS, KEYINPUT_IDLE, OPEN_BUS_VALUE,
    ROM_MAX_SIZE, ROM_START,
};

/// Banked register file and run state.
pub mod state;
pub use state::{Mode, RegisterFile, RunState, GENERAL_REGISTER_COUNT, POWER_ON_CPSR};

/// Condition codes, opcode enums and instruction classes.
pub mod encoding;
pub use encoding::{AluOpcode, Condition, InstructionClass, ShiftKind, ThumbAluOp};

/// ARM and Thumb instruction decoders.
pub mod decoder;
pub use decoder::{decode_arm, decode_thumb, ArmDecoded, ArmInstruction, ThumbInstruction};

/// Processor exceptions and their vectors.
pub mod exception;
pub use exception::Exception;

/// Built-in boot ROM.
pub mod boot;
pub use boot::{BOOT_INSTRUCTION_COUNT, CARTRIDGE_ENTRY};

/// Built-in test cartridge.
pub mod fixture;
pub use fixture::{test_rom_bytes, TEST_ROM_IDLE_PC, TEST_ROM_SETTLE_TICKS};

/// Per-class instruction cycle costs.
pub mod timing;
pub use timing::{cycle_cost, instruction_cycles, CYCLE_COST_TABLE};

/// Instruction execution.
pub mod execute;
pub use execute::{enter_exception, step_one, ExecuteOutcome, FlagsUpdate};

/// Instruction disassembly.
pub mod disasm;
pub use disasm::{disassemble_arm, disassemble_thumb, disassemble_window, DisassemblyRow};

/// Background model, scanline clock and renderer.
pub mod ppu;
pub use ppu::{
    render_frame, BackgroundInfo, ColorMode, LayerImage, PpuClock, ScreenSize, VideoMemory,
    FRAME_BYTES, SCREEN_HEIGHT, SCREEN_WIDTH,
};

/// Breakpoints and PC history.
pub mod debugger;
pub use debugger::{Debugger, DEFAULT_PC_HISTORY_LEN};

/// Configuration, snapshots and step outcomes.
pub mod api;
pub use api::{
    CoreConfig, CpuSnapshot, PpuSnapshot, SessionConfig, StepOutcome, DEFAULT_TICKS_PER_ITERATION,
};

/// The emulation core.
pub mod gba;
pub use gba::GbaCore;

/// Error types.
pub mod error;
pub use error::ProtocolError;

/// Live inspection protocol.
pub mod inspect;
pub use inspect::{
    inspection_channel, Command, CpuDebugInfo, EmulationSession, Inspector, ScreenBuffer,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
