//! Built-in boot ROM.
//!
//! The image holds the exception vector table, an IRQ trampoline that calls
//! the user handler stored at `0x0300_7FFC`, and a reset routine that sets up
//! the IRQ, Supervisor and System stacks before jumping to the cartridge.
//! Running it from power-on leaves the CPU in exactly the state
//! [`crate::GbaCore::skip_bios`] installs.

/// Cartridge entry point.
pub const CARTRIDGE_ENTRY: u32 = 0x0800_0000;
/// System/User stack pointer after boot.
pub const SP_SYSTEM: u32 = 0x0300_7F00;
/// IRQ stack pointer after boot.
pub const SP_IRQ: u32 = 0x0300_7FA0;
/// Supervisor stack pointer after boot.
pub const SP_SUPERVISOR: u32 = 0x0300_7FE0;
/// CPSR after boot: System mode, interrupts unmasked, ARM state.
pub const POST_BOOT_CPSR: u32 = 0x1F;
/// Number of instructions the reset routine retires before reaching
/// [`CARTRIDGE_ENTRY`].
pub const BOOT_INSTRUCTION_COUNT: u32 = 14;

/// Boot ROM words from address zero.
pub const BOOT_ROM: [u32; 27] = [
    // 0x00 reset: b 0x38
    0xEA00_000C,
    // 0x04 undefined: movs pc, lr
    0xE1B0_F00E,
    // 0x08 swi: movs pc, lr
    0xE1B0_F00E,
    // 0x0C prefetch abort: subs pc, lr, #4
    0xE25E_F004,
    // 0x10 data abort: subs pc, lr, #8
    0xE25E_F008,
    // 0x14 reserved: b .
    0xEAFF_FFFE,
    // 0x18 irq: b 0x20
    0xEA00_0000,
    // 0x1C fiq: subs pc, lr, #4
    0xE25E_F004,
    // 0x20 stmfd sp!, {r0-r3, r12, lr}
    0xE92D_500F,
    // 0x24 mov r0, #0x04000000
    0xE3A0_0301,
    // 0x28 add lr, pc, #0
    0xE28F_E000,
    // 0x2C ldr pc, [r0, #-4]
    0xE510_F004,
    // 0x30 ldmfd sp!, {r0-r3, r12, lr}
    0xE8BD_500F,
    // 0x34 subs pc, lr, #4
    0xE25E_F004,
    // 0x38 msr cpsr_c, #0xD2
    0xE321_F0D2,
    // 0x3C mov sp, #0x03000000
    0xE3A0_D403,
    // 0x40 add sp, sp, #0x7F00
    0xE28D_DC7F,
    // 0x44 add sp, sp, #0xA0
    0xE28D_D0A0,
    // 0x48 msr cpsr_c, #0xD3
    0xE321_F0D3,
    // 0x4C mov sp, #0x03000000
    0xE3A0_D403,
    // 0x50 add sp, sp, #0x7F00
    0xE28D_DC7F,
    // 0x54 add sp, sp, #0xE0
    0xE28D_D0E0,
    // 0x58 msr cpsr_c, #0x1F
    0xE321_F01F,
    // 0x5C mov sp, #0x03000000
    0xE3A0_D403,
    // 0x60 add sp, sp, #0x7F00
    0xE28D_DC7F,
    // 0x64 mov lr, #0x08000000
    0xE3A0_E408,
    // 0x68 bx lr
    0xE12F_FF1E,
];
