//! Observer-facing behaviour of the inspection protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use gba_core::{
    inspection_channel, test_rom_bytes, Command, CpuDebugInfo, EmulationSession, GbaCore,
    Inspector, Key, ProtocolError, SessionConfig, CARTRIDGE_ENTRY, FRAME_BYTES, KEYINPUT_IDLE,
    TEST_ROM_IDLE_PC, TEST_ROM_SETTLE_TICKS,
};
use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn fixture_session(ticks_per_iteration: u32) -> (Inspector, EmulationSession) {
    let mut core = GbaCore::new();
    core.load_test_rom();
    core.skip_bios();
    inspection_channel(core, SessionConfig { ticks_per_iteration })
}

#[test]
fn key_change_is_visible_to_a_later_debug_request() {
    let (inspector, mut session) = fixture_session(0);
    inspector.set_key(Key::A, true).unwrap();
    inspector.request_cpu_debug_info().unwrap();
    session.process_responses();

    let info = inspector.cpu_debug_info().unwrap();
    assert_eq!(info.key_input, KEYINPUT_IDLE & !1);
    assert_eq!(info.pc, CARTRIDGE_ENTRY);
    assert!(!info.thumb);
}

#[test]
fn debug_request_before_key_change_sees_idle_keys() {
    let (inspector, mut session) = fixture_session(0);
    inspector.request_cpu_debug_info().unwrap();
    inspector.set_key(Key::Start, true).unwrap();
    session.process_responses();

    assert_eq!(inspector.cpu_debug_info().unwrap().key_input, KEYINPUT_IDLE);
    assert_eq!(session.core().key_input() & (1 << 3), 0);
}

#[rstest]
#[case::draw(Command::RequestScreenDraw)]
#[case::info(Command::RequestCpuDebugInfo)]
#[case::pause(Command::SetPause(true))]
#[case::load(Command::LoadRom(vec![0; 4]))]
fn every_command_fails_once_the_session_is_gone(#[case] command: Command) {
    let (inspector, session) = fixture_session(0);
    drop(session);
    assert_eq!(inspector.send(command), Err(ProtocolError::Disconnected));
}

#[test]
fn screen_draw_fills_the_shared_buffer() {
    let (inspector, mut session) = fixture_session(1000);
    let screen = Arc::new(Mutex::new(vec![0_u8; FRAME_BYTES]));
    inspector.set_screen_array(Arc::clone(&screen)).unwrap();

    session.run_iteration();
    inspector.request_screen_draw().unwrap();
    session.process_responses();

    let frame = screen.lock().unwrap();
    assert_eq!(frame.len(), FRAME_BYTES);
    assert_eq!(&frame[..4], [255, 0, 0, 255]);
    assert_eq!(&frame[16 * 4..17 * 4], [0, 0, 0, 255]);
}

#[test]
fn draw_without_a_buffer_is_ignored() {
    let (inspector, mut session) = fixture_session(0);
    inspector.request_screen_draw().unwrap();
    assert_eq!(session.process_responses(), 1);
}

#[test]
fn load_rom_restarts_at_the_cartridge_entry() {
    let (inspector, mut session) = fixture_session(50);
    session.run_iteration();
    assert_ne!(session.core().inspect_cpu().pc, CARTRIDGE_ENTRY);

    inspector.load_rom(test_rom_bytes()).unwrap();
    session.process_responses();
    let cpu = session.core().inspect_cpu();
    assert_eq!(cpu.pc, CARTRIDGE_ENTRY);
    assert_eq!(cpu.retired, 0);
    assert_eq!(cpu.cpsr, 0x1F);
}

#[test]
fn loaded_rom_keeps_breakpoints() {
    let (inspector, mut session) = fixture_session(1000);
    session.core_mut().add_arm_breakpoint(TEST_ROM_IDLE_PC);
    inspector.load_rom(test_rom_bytes()).unwrap();

    let ticks = session.run_iteration();
    assert_eq!(ticks, TEST_ROM_SETTLE_TICKS);
    assert!(session.core().is_stopped());
}

#[test]
fn resuming_clears_a_debugger_stop() {
    let (inspector, mut session) = fixture_session(1000);
    session.core_mut().add_arm_breakpoint(TEST_ROM_IDLE_PC);
    session.run_iteration();
    assert!(session.core().is_stopped());
    assert_eq!(session.run_iteration(), 0);

    inspector.set_pause(true).unwrap();
    inspector.set_pause(false).unwrap();
    inspector.request_cpu_debug_info().unwrap();
    session.process_responses();
    let info = inspector.cpu_debug_info().unwrap();
    assert!(!info.stopped);
    assert!(!info.paused);
    assert_eq!(info.pc, TEST_ROM_IDLE_PC);
}

#[test]
fn session_hands_back_its_core() {
    let (_inspector, mut session) = fixture_session(1000);
    session.run_iteration();
    let core = session.into_core();
    assert_eq!(core.inspect_cpu().pc, TEST_ROM_IDLE_PC);
}

const fn assert_send<T: Send>() {}

#[test]
fn both_ends_can_cross_threads() {
    assert_send::<Inspector>();
    assert_send::<EmulationSession>();
    assert_send::<Command>();
}

/// Runs the session on its own thread until `stop` is raised, then hands
/// the session back.
fn spawn_session(
    mut session: EmulationSession,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<EmulationSession> {
    thread::spawn(move || {
        while !stop.load(Ordering::Acquire) {
            session.run_iteration();
            thread::yield_now();
        }
        session.process_responses();
        session
    })
}

fn wait_for_record(
    inspector: &Inspector,
    mut accept: impl FnMut(&CpuDebugInfo) -> bool,
) -> CpuDebugInfo {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(info) = inspector.cpu_debug_info() {
            if accept(&info) {
                return info;
            }
        }
        assert!(Instant::now() < deadline, "session never staged the record");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn threaded_session_stages_key_changes_in_send_order() {
    let (inspector, session) = fixture_session(64);
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_session(session, Arc::clone(&stop));

    // Press every key, then release them in the same order. Each step
    // flips exactly one bit, so a record can only match the state it was
    // requested after.
    let mut expected = KEYINPUT_IDLE;
    let steps = Key::ALL
        .iter()
        .map(|&key| (key, true))
        .chain(Key::ALL.iter().map(|&key| (key, false)));
    for (key, pressed) in steps {
        if pressed {
            expected &= !key.mask();
        } else {
            expected |= key.mask();
        }
        inspector.set_key(key, pressed).unwrap();
        inspector.request_cpu_debug_info().unwrap();
        let info = wait_for_record(&inspector, |info| info.key_input == expected);
        assert!(!info.paused);
    }

    stop.store(true, Ordering::Release);
    let session = handle.join().unwrap();
    assert_eq!(session.core().key_input(), KEYINPUT_IDLE);
    assert!(session.core().inspect_cpu().retired > 0);
}

#[test]
fn threaded_session_applies_a_burst_before_a_later_request() {
    let (inspector, session) = fixture_session(64);
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_session(session, Arc::clone(&stop));

    for round in 0..50 {
        inspector.set_key(Key::Select, round % 2 == 0).unwrap();
        inspector.set_key(Key::R, round % 3 == 0).unwrap();
    }
    inspector.set_pause(true).unwrap();
    inspector.request_cpu_debug_info().unwrap();

    // Round 49 leaves Select released and R released.
    let info = wait_for_record(&inspector, |_| true);
    assert_eq!(info.key_input, KEYINPUT_IDLE);
    assert!(info.paused);

    stop.store(true, Ordering::Release);
    let session = handle.join().unwrap();
    assert!(session.is_paused());
}

#[test]
fn dropped_session_on_another_thread_disconnects_the_inspector() {
    let (inspector, session) = fixture_session(16);
    thread::spawn(move || drop(session)).join().unwrap();
    assert_eq!(inspector.set_pause(true), Err(ProtocolError::Disconnected));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn queued_commands_apply_exactly_once(presses in prop::collection::vec(any::<bool>(), 0..20)) {
        let (inspector, mut session) = fixture_session(0);
        for &pressed in &presses {
            inspector.set_key(Key::B, pressed).unwrap();
        }
        prop_assert_eq!(session.process_responses(), presses.len());
        prop_assert_eq!(session.process_responses(), 0);

        let b_released = session.core().key_input() & (1 << 1) != 0;
        let expected_released = !presses.last().copied().unwrap_or(false);
        prop_assert_eq!(b_released, expected_released);
    }
}
