//! Deterministic cartridge image installed by
//! [`crate::GbaCore::load_test_rom`].
//!
//! Starting from the post-boot state the program enables bitmap mode 3 and
//! paints the first 16 pixels red, switches to Thumb to sum `1..=10`, stores
//! the sum to IWRAM, calls a Thumb subroutine that multiplies it by 7, returns
//! to ARM, round-trips a word through IWRAM, issues `SWI 0` and settles in an
//! idle loop at [`TEST_ROM_IDLE_PC`] after [`TEST_ROM_SETTLE_TICKS`]
//! instructions.

/// Address of the final `b .` loop.
pub const TEST_ROM_IDLE_PC: u32 = 0x0800_0070;
/// Instructions retired from the cartridge entry until the idle loop is
/// first reached, including the two spent in the boot ROM SWI handler.
pub const TEST_ROM_SETTLE_TICKS: u32 = 105;

/// Fixture image as little-endian words; Thumb halfwords are packed in pairs.
pub const TEST_ROM: [u32; 29] = [
    // 0x00 mov r0, #0x04000000
    0xE3A0_0301,
    // 0x04 mov r1, #0x400
    0xE3A0_1B01,
    // 0x08 add r1, r1, #3
    0xE281_1003,
    // 0x0C strh r1, [r0]
    0xE1C0_10B0,
    // 0x10 mov r2, #0x06000000
    0xE3A0_2406,
    // 0x14 mov r3, #0x1F
    0xE3A0_301F,
    // 0x18 mov r4, #16
    0xE3A0_4010,
    // 0x1C strh r3, [r2], #2
    0xE0C2_30B2,
    // 0x20 subs r4, r4, #1
    0xE254_4001,
    // 0x24 bne 0x1C
    0x1AFF_FFFC,
    // 0x28 add r5, pc, #1
    0xE28F_5001,
    // 0x2C bx r5
    0xE12F_FF15,
    // 0x30 movs r0, #0 / 0x32 movs r1, #10
    0x210A_2000,
    // 0x34 adds r0, r0, r1 / 0x36 subs r1, #1
    0x3901_1840,
    // 0x38 bne 0x34 / 0x3A movs r2, #3
    0x2203_D1FC,
    // 0x3C lsls r2, r2, #24 / 0x3E str r0, [r2]
    0x6010_0612,
    // 0x40 bl 0x50
    0xF806_F000,
    // 0x44 add r3, pc, #24 / 0x46 bx r3
    0x4718_A306,
    0,
    0,
    // 0x50 push {r4, lr} / 0x52 movs r4, #7
    0x2407_B510,
    // 0x54 muls r0, r4 / 0x56 pop {r4, pc}
    0xBD10_4360,
    0,
    0,
    // 0x60 mov r6, #0x03000000
    0xE3A0_6403,
    // 0x64 str r0, [r6, #4]
    0xE586_0004,
    // 0x68 ldr r7, [r6]
    0xE596_7000,
    // 0x6C swi #0
    0xEF00_0000,
    // 0x70 b .
    0xEAFF_FFFE,
];

/// Returns the fixture as a byte image.
#[must_use]
pub fn test_rom_bytes() -> Vec<u8> {
    TEST_ROM.iter().flat_map(|word| word.to_le_bytes()).collect()
}
