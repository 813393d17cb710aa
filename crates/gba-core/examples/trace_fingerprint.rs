//! Deterministic trace fingerprint of the built-in test cartridge, used for
//! cross-host comparison.

use gba_core::{GbaCore, StepOutcome, TEST_ROM_SETTLE_TICKS};
use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn hash_outcome(hash: &mut u64, outcome: StepOutcome) {
    match outcome {
        StepOutcome::Retired { pc, cycles } => {
            hash_bytes(hash, &[0x10]);
            hash_bytes(hash, &pc.to_le_bytes());
            hash_bytes(hash, &cycles.to_le_bytes());
        }
        StepOutcome::Skipped { pc, cycles } => {
            hash_bytes(hash, &[0x11]);
            hash_bytes(hash, &pc.to_le_bytes());
            hash_bytes(hash, &cycles.to_le_bytes());
        }
        StepOutcome::Exception {
            pc,
            exception,
            cycles,
        } => {
            hash_bytes(hash, &[0x12]);
            hash_bytes(hash, &pc.to_le_bytes());
            hash_bytes(hash, &exception.vector().to_le_bytes());
            hash_bytes(hash, &cycles.to_le_bytes());
        }
        StepOutcome::Interrupt { return_pc, cycles } => {
            hash_bytes(hash, &[0x13]);
            hash_bytes(hash, &return_pc.to_le_bytes());
            hash_bytes(hash, &cycles.to_le_bytes());
        }
        StepOutcome::Halted { cycles } => {
            hash_bytes(hash, &[0x14]);
            hash_bytes(hash, &cycles.to_le_bytes());
        }
        StepOutcome::Stopped => hash_bytes(hash, &[0x15]),
    }
}

fn fingerprint() -> String {
    let mut core = GbaCore::new();
    core.load_test_rom();
    core.skip_bios();

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for _ in 0..TEST_ROM_SETTLE_TICKS {
        hash_outcome(&mut hash, core.step());
    }

    let cpu = core.inspect_cpu();
    for register in cpu.registers {
        hash_bytes(&mut hash, &register.to_le_bytes());
    }
    hash_bytes(&mut hash, &cpu.cpsr.to_le_bytes());
    hash_bytes(&mut hash, &cpu.retired.to_le_bytes());

    let ppu = core.inspect_ppu();
    hash_bytes(&mut hash, &ppu.vcount.to_le_bytes());
    hash_bytes(&mut hash, &ppu.frame.to_le_bytes());
    hash_bytes(&mut hash, &core.render_frame());

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
