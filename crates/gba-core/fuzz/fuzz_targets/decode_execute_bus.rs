#![no_main]

use gba_core::{
    decode_arm, decode_memory_region, decode_thumb, disassemble_arm, disassemble_thumb, GbaCore,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let word = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let half = u16::from_le_bytes([data[0], data[1]]);
    let addr = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);

    let _ = decode_arm(word);
    let _ = decode_thumb(half);
    let _ = disassemble_arm(word);
    let _ = disassemble_thumb(half);
    let _ = decode_memory_region(addr);

    let mut core = GbaCore::new();
    core.load_rom(data);
    core.skip_bios();
    core.tick_multiple(256);
    let _ = core.read_address(addr);
    let _ = core.inspect_ppu();
    let _ = core.disassemble_around_pc(4, 4);
});
