//! Interrupt delivery through the boot ROM, bus read rotation and
//! disassembler totality.

use gba_core::{
    decode_memory_region, disassemble_arm, disassemble_thumb, GbaCore, Key, MemoryRegion, Mode,
    StepOutcome, CARTRIDGE_ENTRY, FIXED_MEMORY_REGIONS, OPEN_BUS_VALUE,
};
use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

/// Installs a keypad IRQ handler at `0x40` through `0x0300_7FFC`, enables
/// the A-button interrupt and idles at `0x38`. The handler acknowledges IF
/// and counts its invocations in r9.
const KEYPAD_IRQ_PROGRAM: [u32; 21] = [
    0xE3A0_0301, // mov r0, #0x04000000
    0xE28F_1034, // add r1, pc, #0x34
    0xE3A0_2403, // mov r2, #0x03000000
    0xE282_2C7F, // add r2, r2, #0x7F00
    0xE582_10FC, // str r1, [r2, #0xFC]
    0xE3A0_3901, // mov r3, #0x4000
    0xE283_3001, // add r3, r3, #1
    0xE280_4C01, // add r4, r0, #0x100
    0xE1C4_33B2, // strh r3, [r4, #0x32]
    0xE280_4C02, // add r4, r0, #0x200
    0xE3A0_5A01, // mov r5, #0x1000
    0xE1C4_50B0, // strh r5, [r4]
    0xE3A0_5001, // mov r5, #1
    0xE1C4_50B8, // strh r5, [r4, #8]
    0xEAFF_FFFE, // b .
    0,
    0xE3A0_1A01, // mov r1, #0x1000
    0xE280_2C02, // add r2, r0, #0x200
    0xE1C2_10B2, // strh r1, [r2, #2]
    0xE289_9001, // add r9, r9, #1
    0xE12F_FF1E, // bx lr
];
const IDLE_PC: u32 = CARTRIDGE_ENTRY + 0x38;
const SETUP_TICKS: u32 = 14;
/// IRQ entry, five trampoline instructions, the five-instruction handler
/// and the two-instruction return.
const ROUND_TRIP_TICKS: u32 = 13;

fn keypad_core() -> GbaCore {
    let bytes: Vec<u8> = KEYPAD_IRQ_PROGRAM
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect();
    let mut core = GbaCore::new();
    core.load_rom(&bytes);
    core.skip_bios();
    core.tick_multiple(SETUP_TICKS);
    core
}

#[test]
fn setup_enables_the_keypad_interrupt() {
    let core = keypad_core();
    assert_eq!(core.inspect_cpu().pc, IDLE_PC);
    assert_eq!(core.ie_reg(), 1 << 12);
    assert_eq!(core.if_reg(), 0);
    assert_eq!(core.read_halfword(0x0400_0132), 0x4001);
    assert_eq!(core.read_address(0x0300_7FFC), CARTRIDGE_ENTRY + 0x40);
}

#[test]
fn key_press_enters_irq_mode_at_the_next_tick() {
    let mut core = keypad_core();
    core.set_key(Key::A, true);
    assert_eq!(core.if_reg(), 1 << 12);

    match core.step() {
        StepOutcome::Interrupt { return_pc, .. } => assert_eq!(return_pc, IDLE_PC),
        other => panic!("unexpected outcome {other:?}"),
    }
    let cpu = core.inspect_cpu();
    assert_eq!(cpu.mode, Mode::Irq);
    assert_eq!(cpu.pc, 0x18);
    assert_eq!(cpu.spsr, Some(0x1F));
    assert_ne!(cpu.cpsr & (1 << 7), 0, "IRQs masked in the handler");
}

#[test]
fn handler_acknowledges_and_returns_to_the_interrupted_loop() {
    let mut core = keypad_core();
    core.set_key(Key::A, true);
    core.tick_multiple(ROUND_TRIP_TICKS);

    let cpu = core.inspect_cpu();
    assert_eq!(cpu.pc, IDLE_PC);
    assert_eq!(cpu.mode, Mode::System);
    assert_eq!(cpu.cpsr, 0x1F);
    assert_eq!(cpu.registers[9], 1);
    assert_eq!(cpu.registers[0], 0x0400_0000);
    assert_eq!(core.if_reg(), 0);

    core.tick_multiple(20);
    assert_eq!(core.inspect_cpu().registers[9], 1, "no re-entry once acked");
}

#[test]
fn other_keys_do_not_interrupt() {
    let mut core = keypad_core();
    core.set_key(Key::B, true);
    assert_eq!(core.if_reg(), 0);
    core.tick();
    assert_eq!(core.inspect_cpu().mode, Mode::System);
}

#[rstest]
#[case(0, 0x4433_2211)]
#[case(1, 0x1144_3322)]
#[case(2, 0x2211_4433)]
#[case(3, 0x3322_1144)]
fn rom_word_reads_rotate(#[case] offset: u32, #[case] expected: u32) {
    let mut core = GbaCore::new();
    core.load_rom(&[0x11, 0x22, 0x33, 0x44]);
    assert_eq!(core.read_address(CARTRIDGE_ENTRY + offset), expected);
}

#[rstest]
#[case(0x0000_4000)]
#[case(0x0100_0000)]
#[case(0x0400_0400)]
#[case(0x1000_0000)]
#[case(0xFFFF_FFFC)]
fn unmapped_reads_are_open_bus(#[case] addr: u32) {
    let core = GbaCore::new();
    assert_eq!(decode_memory_region(addr), MemoryRegion::OpenBus);
    assert_eq!(core.read_address(addr), OPEN_BUS_VALUE);
}

#[test]
fn region_table_is_contiguous() {
    assert_eq!(FIXED_MEMORY_REGIONS[0].start, 0);
    for pair in FIXED_MEMORY_REGIONS.windows(2) {
        assert_eq!(pair[0].end.wrapping_add(1), pair[1].start);
    }
    assert_eq!(FIXED_MEMORY_REGIONS[FIXED_MEMORY_REGIONS.len() - 1].end, u32::MAX);
}

proptest! {
    #[test]
    fn arm_disassembly_is_total_and_stable(word in any::<u32>()) {
        let text = disassemble_arm(word);
        prop_assert!(!text.is_empty());
        prop_assert_eq!(text, disassemble_arm(word));
    }

    #[test]
    fn thumb_disassembly_is_total_and_stable(half in any::<u16>()) {
        let text = disassemble_thumb(half);
        prop_assert!(!text.is_empty());
        prop_assert_eq!(text, disassemble_thumb(half));
    }

    #[test]
    fn every_address_decodes_to_its_table_entry(addr in any::<u32>()) {
        let entry = FIXED_MEMORY_REGIONS
            .iter()
            .find(|entry| entry.start <= addr && addr <= entry.end);
        prop_assert!(entry.is_some());
        prop_assert_eq!(entry.map(|entry| entry.region), Some(decode_memory_region(addr)));
    }

    #[test]
    fn rom_reads_rotate_the_aligned_word(
        bytes in prop::collection::vec(any::<u8>(), 8..64),
        offset in 0_u32..4,
    ) {
        let mut core = GbaCore::new();
        core.load_rom(&bytes);
        let aligned = core.read_address(CARTRIDGE_ENTRY + 4);
        prop_assert_eq!(
            core.read_address(CARTRIDGE_ENTRY + 4 + offset),
            aligned.rotate_right(8 * offset)
        );
    }
}
