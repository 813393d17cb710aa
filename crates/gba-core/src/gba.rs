//! The emulation core: CPU, bus, video clock and debugger behind one owner.

use crate::api::{CoreConfig, CpuSnapshot, PpuSnapshot, StepOutcome};
use crate::boot::{CARTRIDGE_ENTRY, POST_BOOT_CPSR, SP_IRQ, SP_SUPERVISOR, SP_SYSTEM};
use crate::debugger::Debugger;
use crate::disasm::{self, DisassemblyRow};
use crate::exception::Exception;
use crate::execute::{enter_exception, step_one, ExecuteOutcome};
use crate::fixture::test_rom_bytes;
use crate::memory::{Bus, Key, MemorySnapshot};
use crate::ppu::{self, BackgroundInfo, ColorMode, LayerImage, PpuClock, VideoMemory};
use crate::state::{Mode, RegisterFile, RunState, LR, PSR_F, PSR_I, SP};
use crate::timing::{HALT_IDLE_CYCLES, IRQ_ENTRY_CYCLES};

/// A complete emulated console.
///
/// The core is the sole owner of CPU, memory, video and debugger state. It
/// is `Send`, so it can be moved into an emulation thread wholesale.
#[derive(Debug, Clone)]
pub struct GbaCore {
    regs: RegisterFile,
    bus: Bus,
    run_state: RunState,
    clock: PpuClock,
    debugger: Debugger,
    config: CoreConfig,
    retired: u64,
}

impl Default for GbaCore {
    fn default() -> Self {
        Self::new()
    }
}

impl GbaCore {
    /// Power-on core with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    /// Power-on core: PC `0`, Supervisor mode, IRQ and FIQ masked, ARM
    /// state, empty cartridge.
    #[must_use]
    pub fn with_config(config: CoreConfig) -> Self {
        Self {
            regs: RegisterFile::default(),
            bus: Bus::default(),
            run_state: RunState::Running,
            clock: PpuClock::new(),
            debugger: Debugger::new(config.debugger_enabled, config.pc_history_len),
            config,
            retired: 0,
        }
    }

    /// Configuration the core was built with.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Consumes the core and returns a power-on instance. Breakpoints and
    /// the instrumentation flag carry over; everything else is discarded.
    #[must_use]
    pub fn reset(self) -> Self {
        log::debug!("core reset");
        Self {
            debugger: self.debugger.carry_over(),
            ..Self::with_config(self.config)
        }
    }

    /// Copies `bytes` into Game Pak ROM without validation.
    pub fn load_rom(&mut self, bytes: &[u8]) {
        self.bus.load_rom(bytes);
        log::debug!("loaded {} byte cartridge image", self.bus.rom_len());
    }

    /// Installs the built-in test cartridge.
    pub fn load_test_rom(&mut self) {
        self.load_rom(&test_rom_bytes());
    }

    /// Puts the CPU in the state the boot ROM leaves it in.
    pub fn skip_bios(&mut self) {
        let regs = &mut self.regs;
        regs.set_cpsr(PSR_I | PSR_F | Mode::Irq.bits());
        regs.set_gpr(SP, SP_IRQ);
        regs.set_cpsr(PSR_I | PSR_F | Mode::Supervisor.bits());
        regs.set_gpr(SP, SP_SUPERVISOR);
        regs.set_cpsr(POST_BOOT_CPSR);
        regs.set_gpr(SP, SP_SYSTEM);
        regs.set_gpr(LR, CARTRIDGE_ENTRY);
        regs.set_pc(CARTRIDGE_ENTRY);
        self.run_state = RunState::Running;
        self.debugger.set_executing_pc(CARTRIDGE_ENTRY);
    }

    /// Executes one tick. Inert while the debugger is stopped.
    pub fn tick(&mut self) {
        self.step();
    }

    /// Executes `count` ticks, returning early once the debugger stops.
    pub fn tick_multiple(&mut self, count: u32) {
        for _ in 0..count {
            if self.debugger.is_stopped() {
                break;
            }
            self.step();
        }
    }

    /// Executes one tick and reports what it did.
    ///
    /// In order: wake a halted CPU if an enabled interrupt is requested,
    /// take a pending IRQ if IME is set and CPSR.I clear, otherwise execute
    /// one instruction. The video clock advances by the tick's cycles and
    /// the debugger checks the post-tick PC.
    pub fn step(&mut self) -> StepOutcome {
        if self.debugger.is_stopped() {
            return StepOutcome::Stopped;
        }

        let pending = self.bus.io.pending_interrupts();
        if self.run_state == RunState::Halted {
            self.run_state = self.run_state.wake_on(pending);
            if self.run_state == RunState::Halted {
                self.advance_video(HALT_IDLE_CYCLES);
                return StepOutcome::Halted {
                    cycles: HALT_IDLE_CYCLES,
                };
            }
            log::debug!("woke from halt, pending interrupts {pending:#06X}");
        }

        let outcome = if pending != 0 && self.bus.io.master_enable() && !self.regs.flag(PSR_I) {
            let return_pc = self.regs.pc();
            enter_exception(&mut self.regs, Exception::Irq);
            StepOutcome::Interrupt {
                return_pc,
                cycles: IRQ_ENTRY_CYCLES,
            }
        } else {
            self.retired += 1;
            match step_one(&mut self.regs, &mut self.bus) {
                ExecuteOutcome::Retired { pc, cycles, .. } => StepOutcome::Retired { pc, cycles },
                ExecuteOutcome::Skipped { pc, cycles } => StepOutcome::Skipped { pc, cycles },
                ExecuteOutcome::Exception {
                    pc,
                    exception,
                    cycles,
                } => StepOutcome::Exception {
                    pc,
                    exception,
                    cycles,
                },
            }
        };

        if self.bus.io.take_halt_request() {
            log::debug!("halted at {:#010X}", self.regs.pc());
            self.run_state = RunState::Halted;
        }
        self.advance_video(outcome.cycles());

        self.debugger
            .after_tick(outcome.committed_pc(), self.regs.pc(), self.regs.thumb());
        outcome
    }

    fn advance_video(&mut self, cycles: u32) {
        if self.clock.advance(&mut self.bus.io, cycles) {
            log::trace!("vblank, frame {}", self.clock.frame());
        }
    }

    /// Copy of the CPU state.
    #[must_use]
    pub fn inspect_cpu(&self) -> CpuSnapshot {
        CpuSnapshot {
            registers: *self.regs.visible(),
            pc: self.regs.pc(),
            cpsr: self.regs.cpsr(),
            spsr: self.regs.spsr(),
            mode: self.regs.mode(),
            thumb: self.regs.thumb(),
            halted: self.run_state == RunState::Halted,
            interrupt_enable: self.ie_reg(),
            interrupt_flags: self.if_reg(),
            retired: self.retired,
        }
    }

    /// Copy of the video state including a freshly composed frame.
    #[must_use]
    pub fn inspect_ppu(&self) -> PpuSnapshot {
        let video = self.video();
        PpuSnapshot {
            bg_mode: video.bg_mode(),
            backgrounds: video.backgrounds(),
            vcount: self.clock.line(),
            frame: self.clock.frame(),
            screen: ppu::render_frame(&video),
        }
    }

    /// Copy of VRAM, palette, OAM and the I/O registers.
    #[must_use]
    pub fn inspect_memory(&self) -> MemorySnapshot {
        self.bus.inspect()
    }

    /// Composes the current 240×160 RGBA8 frame.
    #[must_use]
    pub fn render_frame(&self) -> Vec<u8> {
        ppu::render_frame(&self.video())
    }

    fn video(&self) -> VideoMemory<'_> {
        VideoMemory::from_bus(&self.bus)
    }

    /// Rotated word read; unmapped addresses read `0`.
    #[must_use]
    pub fn read_address(&self, addr: u32) -> u32 {
        self.bus.read_address(addr)
    }

    /// Halfword read, rotated when `addr` is odd.
    #[must_use]
    pub fn read_halfword(&self, addr: u32) -> u32 {
        self.bus.read_halfword(addr)
    }

    /// Adds an ARM-state breakpoint.
    pub fn add_arm_breakpoint(&mut self, addr: u32) {
        self.debugger.add_arm_breakpoint(addr);
    }

    /// Removes an ARM-state breakpoint.
    pub fn remove_arm_breakpoint(&mut self, addr: u32) {
        self.debugger.remove_arm_breakpoint(addr);
    }

    /// ARM-state breakpoints, ascending.
    #[must_use]
    pub fn arm_breakpoints(&self) -> Vec<u32> {
        self.debugger.arm_breakpoints()
    }

    /// Adds a Thumb-state breakpoint.
    pub fn add_thumb_breakpoint(&mut self, addr: u32) {
        self.debugger.add_thumb_breakpoint(addr);
    }

    /// Removes a Thumb-state breakpoint.
    pub fn remove_thumb_breakpoint(&mut self, addr: u32) {
        self.debugger.remove_thumb_breakpoint(addr);
    }

    /// Thumb-state breakpoints, ascending.
    #[must_use]
    pub fn thumb_breakpoints(&self) -> Vec<u32> {
        self.debugger.thumb_breakpoints()
    }

    /// Turns breakpoint checks and history recording on or off.
    pub fn enable_debugger(&mut self, enabled: bool) {
        self.debugger.set_enabled(enabled);
    }

    /// `true` when breakpoint checks run.
    #[must_use]
    pub const fn debugger_enabled(&self) -> bool {
        self.debugger.is_enabled()
    }

    /// Stops or resumes execution.
    pub fn set_stopped(&mut self, stopped: bool) {
        self.debugger.set_stopped(stopped);
    }

    /// `true` while execution is stopped.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.debugger.is_stopped()
    }

    /// Recently committed instruction addresses, newest last.
    #[must_use]
    pub fn pc_history(&self) -> Vec<u32> {
        self.debugger.pc_history()
    }

    /// Address of the next instruction to retire.
    #[must_use]
    pub const fn executing_pc(&self) -> u32 {
        self.debugger.executing_pc()
    }

    /// Address of the last committed instruction.
    #[must_use]
    pub const fn last_pc(&self) -> u32 {
        self.debugger.last_pc()
    }

    /// Presses or releases a key.
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        self.bus.io.set_key(key, pressed);
    }

    /// Current KEYINPUT value (active low).
    #[must_use]
    pub const fn key_input(&self) -> u16 {
        self.bus.io.key_input()
    }

    /// `true` in Thumb state.
    #[must_use]
    pub const fn thumb_state(&self) -> bool {
        self.regs.thumb()
    }

    /// `true` while waiting in HALTCNT low-power mode.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.run_state == RunState::Halted
    }

    /// Interrupt enable register.
    #[must_use]
    pub const fn ie_reg(&self) -> u16 {
        self.bus.io.interrupt_enable()
    }

    /// Interrupt request flags.
    #[must_use]
    pub const fn if_reg(&self) -> u16 {
        self.bus.io.interrupt_flags()
    }

    /// SPSR of the current mode; `None` in User and System.
    #[must_use]
    pub const fn spsr(&self) -> Option<u32> {
        self.regs.spsr()
    }

    /// Register `index` as seen from `mode`; `None` when `index > 15`.
    #[must_use]
    pub fn banked_register(&self, mode: Mode, index: usize) -> Option<u32> {
        self.regs.banked(mode, index)
    }

    /// Configuration of background `index`; `None` when `index >= 4`.
    #[must_use]
    pub fn background_info(&self, index: usize) -> Option<BackgroundInfo> {
        self.video().background(index)
    }

    /// Grayscale sheet of the first sixteen tiles of background `bg`.
    #[must_use]
    pub fn tilemap(&self, bg: usize) -> Option<LayerImage> {
        ppu::tilemap(&self.video(), bg)
    }

    /// Whole map of background `bg` rendered with its palettes.
    #[must_use]
    pub fn debug_bg_tilemap(&self, bg: usize) -> Option<LayerImage> {
        ppu::debug_bg_tilemap(&self.video(), bg)
    }

    /// All 512 palette entries as RGBA8.
    #[must_use]
    pub fn palette_dump(&self) -> Vec<[u8; 4]> {
        ppu::palette_dump(&self.video())
    }

    /// Palette indices of one tile.
    #[must_use]
    pub fn tile_dump(
        &self,
        character_base_block: u8,
        tile: usize,
        color_mode: ColorMode,
    ) -> [u8; 64] {
        ppu::tile_dump(&self.video(), character_base_block, tile, color_mode)
    }

    /// Renders an ARM instruction word.
    #[must_use]
    pub fn disassemble_arm(word: u32) -> String {
        disasm::disassemble_arm(word)
    }

    /// Renders a Thumb instruction halfword.
    #[must_use]
    pub fn disassemble_thumb(half: u16) -> String {
        disasm::disassemble_thumb(half)
    }

    /// Disassembly rows around the next instruction in the active width.
    #[must_use]
    pub fn disassemble_around_pc(&self, before: usize, after: usize) -> Vec<DisassemblyRow> {
        disasm::disassemble_window(&self.bus, self.regs.pc(), before, after, self.regs.thumb())
    }
}

#[cfg(test)]
mod tests {
    use super::GbaCore;
    use crate::api::{CoreConfig, StepOutcome};
    use crate::boot::{BOOT_INSTRUCTION_COUNT, CARTRIDGE_ENTRY};
    use crate::memory::MemoryBus;
    use crate::state::{Mode, POWER_ON_CPSR};

    fn core_with_program(words: &[u32]) -> GbaCore {
        let bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        let mut core = GbaCore::new();
        core.load_rom(&bytes);
        core.skip_bios();
        core
    }

    #[test]
    fn power_on_state() {
        let core = GbaCore::new();
        let cpu = core.inspect_cpu();
        assert_eq!(cpu.pc, 0);
        assert_eq!(cpu.cpsr, POWER_ON_CPSR);
        assert_eq!(cpu.mode, Mode::Supervisor);
        assert!(!cpu.thumb);
    }

    #[test]
    fn boot_rom_reaches_the_skip_bios_state() {
        let mut booted = GbaCore::new();
        booted.tick_multiple(BOOT_INSTRUCTION_COUNT);
        let mut skipped = GbaCore::new();
        skipped.skip_bios();
        let (booted, skipped) = (booted.inspect_cpu(), skipped.inspect_cpu());
        assert_eq!(booted.pc, CARTRIDGE_ENTRY);
        assert_eq!(booted.registers, skipped.registers);
        assert_eq!(booted.cpsr, skipped.cpsr);
    }

    #[test]
    fn halt_waits_for_an_enabled_interrupt() {
        // mov r0, #0x04000000; strb r0, [r0, #0x301]; b .
        let mut core = core_with_program(&[0xE3A0_0301, 0xE5C0_0301, 0xEAFF_FFFE]);
        core.tick_multiple(2);
        assert!(core.is_halted());
        let pc = core.inspect_cpu().pc;
        assert_eq!(core.step(), StepOutcome::Halted { cycles: 1 });
        assert_eq!(core.inspect_cpu().pc, pc);

        // HBlank interrupt enabled in DISPSTAT and IE; IME left clear so the
        // CPU wakes without taking the interrupt.
        core.bus.write16(0x0400_0004, 1 << 4);
        core.bus.write16(0x0400_0200, 1 << 1);
        for _ in 0..1000 {
            core.tick();
        }
        assert!(!core.is_halted());
        assert_eq!(core.inspect_cpu().mode, Mode::System);
    }

    #[test]
    fn pending_irq_enters_the_boot_rom_handler() {
        // b . with VBlank requested and enabled
        let mut core = core_with_program(&[0xEAFF_FFFE]);
        core.bus.write16(0x0400_0200, 1);
        core.bus.write16(0x0400_0208, 1);
        core.bus.io.request_interrupt(crate::memory::Interrupt::VBlank);
        let outcome = core.step();
        assert_eq!(
            outcome,
            StepOutcome::Interrupt {
                return_pc: CARTRIDGE_ENTRY,
                cycles: 3
            }
        );
        let cpu = core.inspect_cpu();
        assert_eq!(cpu.mode, Mode::Irq);
        assert_eq!(cpu.pc, 0x18);
        assert_eq!(cpu.spsr, Some(0x1F));
        assert_eq!(core.banked_register(Mode::Irq, 14), Some(CARTRIDGE_ENTRY + 4));
    }

    #[test]
    fn stopped_core_is_inert() {
        let mut core = core_with_program(&[0xE1A0_0000, 0xE1A0_0000]);
        core.set_stopped(true);
        assert_eq!(core.step(), StepOutcome::Stopped);
        core.tick_multiple(10);
        assert_eq!(core.inspect_cpu().pc, CARTRIDGE_ENTRY);
        assert_eq!(core.inspect_cpu().retired, 0);
    }

    #[test]
    fn reset_keeps_breakpoints_but_not_state() {
        let mut core = core_with_program(&[0xE1A0_0000, 0xE1A0_0000]);
        core.add_arm_breakpoint(CARTRIDGE_ENTRY + 4);
        core.enable_debugger(false);
        core.tick();
        let core = core.reset();
        assert_eq!(core.arm_breakpoints(), vec![CARTRIDGE_ENTRY + 4]);
        assert!(!core.debugger_enabled());
        assert_eq!(core.inspect_cpu().pc, 0);
        assert_eq!(core.read_address(CARTRIDGE_ENTRY), 0);
        assert!(core.pc_history().is_empty());
    }

    #[test]
    fn huge_history_config_constructs_and_runs() {
        let mut core = GbaCore::with_config(CoreConfig {
            debugger_enabled: true,
            pc_history_len: usize::MAX,
        });
        core.load_test_rom();
        core.skip_bios();
        core.tick_multiple(3);
        assert_eq!(core.pc_history().len(), 3);
        let core = core.reset();
        assert_eq!(core.config().pc_history_len, usize::MAX);
    }

    #[test]
    fn background_info_is_absent_past_three() {
        let core = GbaCore::new();
        assert!(core.background_info(3).is_some());
        assert!(core.background_info(4).is_none());
    }
}
