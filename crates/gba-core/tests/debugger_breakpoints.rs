//! Breakpoint, stop and history behaviour of the debugger layer.

use gba_core::{GbaCore, StepOutcome, CARTRIDGE_ENTRY};
use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

/// Four ARM no-ops, then `sub r0, pc, #7` and `bx r0`, which switches to
/// Thumb at `CARTRIDGE_ENTRY + 0x10`.
fn mode_switch_core() -> GbaCore {
    let words: [u32; 6] = [
        0xE1A0_0000,
        0xE1A0_0000,
        0xE1A0_0000,
        0xE1A0_0000,
        0xE24F_0007,
        0xE12F_FF10,
    ];
    let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
    let mut core = GbaCore::new();
    core.load_rom(&bytes);
    core.skip_bios();
    core
}

#[test]
fn thumb_breakpoint_ignores_arm_execution_at_the_same_address() {
    let target = CARTRIDGE_ENTRY + 0x10;
    let mut core = mode_switch_core();
    core.add_thumb_breakpoint(target);

    core.tick_multiple(4);
    assert_eq!(core.inspect_cpu().pc, target);
    assert!(!core.thumb_state());
    assert!(!core.is_stopped());

    core.tick_multiple(2);
    assert_eq!(core.inspect_cpu().pc, target);
    assert!(core.thumb_state());
    assert!(core.is_stopped());
}

#[test]
fn arm_breakpoint_stops_after_the_tick_that_reaches_it() {
    let mut core = mode_switch_core();
    core.add_arm_breakpoint(CARTRIDGE_ENTRY + 8);
    core.tick_multiple(100);
    assert!(core.is_stopped());
    assert_eq!(core.inspect_cpu().pc, CARTRIDGE_ENTRY + 8);
    assert_eq!(core.inspect_cpu().retired, 2);
}

#[test]
fn stopped_core_ignores_ticks_until_resumed() {
    let mut core = mode_switch_core();
    core.add_arm_breakpoint(CARTRIDGE_ENTRY + 4);
    core.tick();
    assert!(core.is_stopped());

    core.tick();
    assert_eq!(core.step(), StepOutcome::Stopped);
    assert_eq!(core.inspect_cpu().pc, CARTRIDGE_ENTRY + 4);

    core.set_stopped(false);
    core.tick();
    assert_eq!(core.inspect_cpu().pc, CARTRIDGE_ENTRY + 8);
}

#[test]
fn disabled_debugger_runs_through_breakpoints() {
    let mut core = mode_switch_core();
    core.add_arm_breakpoint(CARTRIDGE_ENTRY + 4);
    core.enable_debugger(false);
    core.tick_multiple(3);
    assert!(!core.is_stopped());
    assert_eq!(core.inspect_cpu().pc, CARTRIDGE_ENTRY + 12);
}

#[test]
fn pc_history_is_newest_last() {
    let mut core = mode_switch_core();
    core.tick_multiple(3);
    assert_eq!(
        core.pc_history(),
        vec![CARTRIDGE_ENTRY, CARTRIDGE_ENTRY + 4, CARTRIDGE_ENTRY + 8]
    );
    assert_eq!(core.last_pc(), CARTRIDGE_ENTRY + 8);
    assert_eq!(core.executing_pc(), CARTRIDGE_ENTRY + 12);
}

#[rstest]
#[case::arm(false)]
#[case::thumb(true)]
fn removing_an_absent_breakpoint_is_a_no_op(#[case] thumb: bool) {
    let mut core = GbaCore::new();
    if thumb {
        core.remove_thumb_breakpoint(0x1234);
        assert!(core.thumb_breakpoints().is_empty());
    } else {
        core.remove_arm_breakpoint(0x1234);
        assert!(core.arm_breakpoints().is_empty());
    }
}

#[test]
fn disassembly_window_tracks_the_active_width() {
    let mut core = mode_switch_core();
    let rows = core.disassemble_around_pc(1, 1);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].address, CARTRIDGE_ENTRY);
    assert_eq!(rows[1].len_bytes, 4);

    core.tick_multiple(6);
    let rows = core.disassemble_around_pc(0, 0);
    assert_eq!(rows[0].address, CARTRIDGE_ENTRY + 0x10);
    assert_eq!(rows[0].len_bytes, 2);
}

proptest! {
    #[test]
    fn arm_breakpoints_behave_as_a_set(addrs in prop::collection::vec(any::<u32>(), 0..32)) {
        let mut core = GbaCore::new();
        for &addr in &addrs {
            core.add_arm_breakpoint(addr);
            core.add_arm_breakpoint(addr);
        }
        let listed = core.arm_breakpoints();
        for &addr in &addrs {
            prop_assert_eq!(listed.iter().filter(|&&listed| listed == addr).count(), 1);
        }
        for &addr in &addrs {
            core.remove_arm_breakpoint(addr);
        }
        prop_assert!(core.arm_breakpoints().is_empty());
        prop_assert!(core.thumb_breakpoints().is_empty());
    }
}
