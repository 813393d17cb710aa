use std::sync::{Arc, Mutex, PoisonError};

use gba_core::{
    inspection_channel, CoreConfig, EmulationSession, GbaCore, Inspector, Key, ScreenBuffer,
    SessionConfig, FRAME_BYTES,
};
use js_sys::Uint8ClampedArray;
use wasm_bindgen::prelude::*;

macro_rules! console_log {
    ($($t:tt)*) => (web_sys::console::log_1(&JsValue::from_str(&format!($($t)*))))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

fn key_from_index(index: u8) -> Result<Key, JsError> {
    Key::ALL
        .get(usize::from(index))
        .copied()
        .ok_or_else(|| JsError::new(&format!("no key with index {index}")))
}

/// Direct handle on a core, stepped from JS.
#[wasm_bindgen]
pub struct WasmGba {
    core: GbaCore,
}

impl Default for WasmGba {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmGba {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();
        Self {
            core: GbaCore::new(),
        }
    }

    /// Builds a core from a JS `{ debugger_enabled, pc_history_len }`
    /// object; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Fails if `config` does not describe a [`CoreConfig`].
    pub fn with_config(config: JsValue) -> Result<Self, JsValue> {
        console_error_panic_hook::set_once();
        let config: CoreConfig = serde_wasm_bindgen::from_value(config)?;
        Ok(Self {
            core: GbaCore::with_config(config),
        })
    }

    /// Copies a cartridge image into ROM.
    pub fn load_rom(&mut self, rom: &[u8]) {
        self.core.load_rom(rom);
        console_log!("Loaded {} bytes into ROM", rom.len());
    }

    pub fn load_test_rom(&mut self) {
        self.core.load_test_rom();
    }

    pub fn skip_bios(&mut self) {
        self.core.skip_bios();
    }

    /// Returns to the power-on state, keeping breakpoints.
    pub fn reset(&mut self) {
        self.core = std::mem::take(&mut self.core).reset();
    }

    pub fn tick(&mut self, count: u32) {
        self.core.tick_multiple(count);
    }

    /// Executes one tick and returns its outcome as a JS object.
    ///
    /// # Errors
    ///
    /// Fails if the outcome cannot be serialized.
    pub fn step(&mut self) -> Result<JsValue, JsValue> {
        let outcome = self.core.step();
        to_js(&outcome)
    }

    /// # Errors
    ///
    /// Fails if the snapshot cannot be serialized.
    pub fn cpu_state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.core.inspect_cpu())
    }

    /// Background configuration without the composed frame.
    ///
    /// # Errors
    ///
    /// Fails if the backgrounds cannot be serialized.
    pub fn backgrounds(&self) -> Result<JsValue, JsValue> {
        let backgrounds: Vec<_> = (0..4)
            .filter_map(|index| self.core.background_info(index))
            .collect();
        to_js(&backgrounds)
    }

    /// Current frame as RGBA8, ready for `ImageData`.
    #[must_use]
    pub fn render_frame(&self) -> Uint8ClampedArray {
        Uint8ClampedArray::from(self.core.render_frame().as_slice())
    }

    #[must_use]
    pub fn read_address(&self, addr: u32) -> u32 {
        self.core.read_address(addr)
    }

    pub fn add_arm_breakpoint(&mut self, addr: u32) {
        self.core.add_arm_breakpoint(addr);
    }

    pub fn remove_arm_breakpoint(&mut self, addr: u32) {
        self.core.remove_arm_breakpoint(addr);
    }

    #[must_use]
    pub fn arm_breakpoints(&self) -> Vec<u32> {
        self.core.arm_breakpoints()
    }

    pub fn add_thumb_breakpoint(&mut self, addr: u32) {
        self.core.add_thumb_breakpoint(addr);
    }

    pub fn remove_thumb_breakpoint(&mut self, addr: u32) {
        self.core.remove_thumb_breakpoint(addr);
    }

    #[must_use]
    pub fn thumb_breakpoints(&self) -> Vec<u32> {
        self.core.thumb_breakpoints()
    }

    pub fn enable_debugger(&mut self, enabled: bool) {
        self.core.enable_debugger(enabled);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.core.is_stopped()
    }

    pub fn resume(&mut self) {
        self.core.set_stopped(false);
    }

    #[must_use]
    pub fn pc_history(&self) -> Vec<u32> {
        self.core.pc_history()
    }

    /// Presses or releases the key with KEYINPUT bit `index`.
    ///
    /// # Errors
    ///
    /// Fails for an index past the last key.
    pub fn set_key(&mut self, index: u8, pressed: bool) -> Result<(), JsError> {
        self.core.set_key(key_from_index(index)?, pressed);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if the rows cannot be serialized.
    pub fn disassemble(&self, before: usize, after: usize) -> Result<JsValue, JsValue> {
        to_js(&self.core.disassemble_around_pc(before, after))
    }

    /// Full tilemap of background `bg`, or `undefined` for bitmap and
    /// absent layers.
    ///
    /// # Errors
    ///
    /// Fails if the image cannot be serialized.
    pub fn debug_bg_tilemap(&self, bg: usize) -> Result<JsValue, JsValue> {
        to_js(&self.core.debug_bg_tilemap(bg))
    }

    /// # Errors
    ///
    /// Fails if the image cannot be serialized.
    pub fn tilemap(&self, bg: usize) -> Result<JsValue, JsValue> {
        to_js(&self.core.tilemap(bg))
    }

    /// All 512 palette entries as consecutive RGBA8 quads.
    #[must_use]
    pub fn palette(&self) -> Uint8ClampedArray {
        let flat: Vec<u8> = self.core.palette_dump().concat();
        Uint8ClampedArray::from(flat.as_slice())
    }
}

/// Inspection protocol driven from a JS animation loop.
///
/// Commands queued through this handle take effect at the start of the
/// next [`WasmInspector::run_iteration`].
#[wasm_bindgen]
pub struct WasmInspector {
    inspector: Inspector,
    session: EmulationSession,
    screen: ScreenBuffer,
}

#[wasm_bindgen]
impl WasmInspector {
    /// Boots the built-in test cartridge.
    ///
    /// # Errors
    ///
    /// Fails if the shared framebuffer is rejected.
    #[wasm_bindgen(constructor)]
    pub fn new(ticks_per_iteration: u32) -> Result<Self, JsError> {
        console_error_panic_hook::set_once();
        let mut core = GbaCore::new();
        core.load_test_rom();
        core.skip_bios();

        let (inspector, session) = inspection_channel(core, SessionConfig { ticks_per_iteration });
        let screen = Arc::new(Mutex::new(vec![0; FRAME_BYTES]));
        inspector.set_screen_array(Arc::clone(&screen))?;
        Ok(Self {
            inspector,
            session,
            screen,
        })
    }

    pub fn run_iteration(&mut self) -> u32 {
        self.session.run_iteration()
    }

    /// # Errors
    ///
    /// Fails once the session is gone.
    pub fn load_rom(&self, rom: Vec<u8>) -> Result<(), JsError> {
        console_log!("Queued {} byte ROM", rom.len());
        Ok(self.inspector.load_rom(rom)?)
    }

    /// # Errors
    ///
    /// Fails for an unknown key index or once the session is gone.
    pub fn set_key(&self, index: u8, pressed: bool) -> Result<(), JsError> {
        Ok(self.inspector.set_key(key_from_index(index)?, pressed)?)
    }

    /// # Errors
    ///
    /// Fails once the session is gone.
    pub fn set_pause(&self, paused: bool) -> Result<(), JsError> {
        Ok(self.inspector.set_pause(paused)?)
    }

    /// # Errors
    ///
    /// Fails once the session is gone.
    pub fn request_screen_draw(&self) -> Result<(), JsError> {
        Ok(self.inspector.request_screen_draw()?)
    }

    /// # Errors
    ///
    /// Fails once the session is gone.
    pub fn request_cpu_debug_info(&self) -> Result<(), JsError> {
        Ok(self.inspector.request_cpu_debug_info()?)
    }

    /// Last staged CPU record, or `undefined` before the first request is
    /// served.
    ///
    /// # Errors
    ///
    /// Fails if the record cannot be serialized.
    pub fn cpu_debug_info(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inspector.cpu_debug_info())
    }

    /// Copy of the shared framebuffer as of the last served draw request.
    #[must_use]
    pub fn screen(&self) -> Uint8ClampedArray {
        let screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        Uint8ClampedArray::from(screen.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use gba_core::{CpuDebugInfo, GbaCore, Key, SessionConfig};

    use super::key_from_index;

    #[test]
    fn key_indices_follow_keyinput_bits() {
        assert_eq!(key_from_index(0).ok(), Some(Key::A));
        assert_eq!(key_from_index(9).ok(), Some(Key::L));
    }

    #[test]
    fn cpu_debug_info_serializes_for_js() {
        let (inspector, mut session) =
            gba_core::inspection_channel(GbaCore::new(), SessionConfig::default());
        inspector.request_cpu_debug_info().unwrap();
        session.process_responses();
        let info = inspector.cpu_debug_info().unwrap();

        let json = serde_json::to_string(&info).unwrap();
        let back: CpuDebugInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
