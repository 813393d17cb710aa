//! Live inspection protocol between an emulation loop and an observer.
//!
//! The observer holds an [`Inspector`] and only ever enqueues [`Command`]s
//! and reads staged records. The [`EmulationSession`] owns the core and
//! applies queued commands between instructions, in the order they were
//! sent, each exactly once.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{CpuSnapshot, SessionConfig};
use crate::error::ProtocolError;
use crate::gba::GbaCore;
use crate::memory::Key;
use crate::ppu::FRAME_BYTES;

/// Framebuffer shared between the session and the inspector, written
/// wholesale on each draw request.
pub type ScreenBuffer = Arc<Mutex<Vec<u8>>>;

/// Requests an inspector can queue.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Command {
    /// Render the current frame into the shared framebuffer.
    RequestScreenDraw,
    /// Stage a [`CpuDebugInfo`] record.
    RequestCpuDebugInfo,
    /// Press or release a key.
    SetKey {
        /// Key to change.
        key: Key,
        /// `true` to press.
        pressed: bool,
    },
    /// Pause or resume the run loop. Resuming also clears a debugger stop.
    SetPause(bool),
    /// Reset, load the image and skip the boot ROM.
    LoadRom(Vec<u8>),
}

/// CPU record staged in response to [`Command::RequestCpuDebugInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuDebugInfo {
    /// Address of the next instruction to fetch.
    pub pc: u32,
    /// Address of the next instruction to retire.
    pub executing_pc: u32,
    /// Address of the last committed instruction.
    pub last_pc: u32,
    /// Thumb state.
    pub thumb: bool,
    /// Debugger stop state.
    pub stopped: bool,
    /// Run loop pause state.
    pub paused: bool,
    /// KEYINPUT (active low).
    pub key_input: u16,
    /// Full register snapshot.
    pub cpu: CpuSnapshot,
}

#[derive(Debug, Default)]
struct Staging {
    cpu_debug_info: Option<CpuDebugInfo>,
    screen: Option<ScreenBuffer>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observer side of the protocol.
#[derive(Debug)]
pub struct Inspector {
    commands: Sender<Command>,
    staging: Arc<Mutex<Staging>>,
}

impl Inspector {
    /// Queues `command`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Disconnected`] when the session is gone.
    pub fn send(&self, command: Command) -> Result<(), ProtocolError> {
        self.commands
            .send(command)
            .map_err(|_| ProtocolError::Disconnected)
    }

    /// Supplies the buffer draw requests render into.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Disconnected`] when the session is gone and
    /// [`ProtocolError::FramebufferSize`] unless the buffer holds exactly
    /// one RGBA8 frame.
    pub fn set_screen_array(&self, screen: ScreenBuffer) -> Result<(), ProtocolError> {
        // The session holds the only other handle on the staging area.
        if Arc::strong_count(&self.staging) == 1 {
            return Err(ProtocolError::Disconnected);
        }
        let actual = lock(&screen).len();
        if actual != FRAME_BYTES {
            return Err(ProtocolError::FramebufferSize {
                expected: FRAME_BYTES,
                actual,
            });
        }
        lock(&self.staging).screen = Some(screen);
        Ok(())
    }

    /// Queues [`Command::RequestScreenDraw`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Disconnected`] when the session is gone.
    pub fn request_screen_draw(&self) -> Result<(), ProtocolError> {
        self.send(Command::RequestScreenDraw)
    }

    /// Queues [`Command::RequestCpuDebugInfo`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Disconnected`] when the session is gone.
    pub fn request_cpu_debug_info(&self) -> Result<(), ProtocolError> {
        self.send(Command::RequestCpuDebugInfo)
    }

    /// Queues [`Command::SetKey`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Disconnected`] when the session is gone.
    pub fn set_key(&self, key: Key, pressed: bool) -> Result<(), ProtocolError> {
        self.send(Command::SetKey { key, pressed })
    }

    /// Queues [`Command::SetPause`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Disconnected`] when the session is gone.
    pub fn set_pause(&self, paused: bool) -> Result<(), ProtocolError> {
        self.send(Command::SetPause(paused))
    }

    /// Queues [`Command::LoadRom`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Disconnected`] when the session is gone.
    pub fn load_rom(&self, bytes: Vec<u8>) -> Result<(), ProtocolError> {
        self.send(Command::LoadRom(bytes))
    }

    /// Last staged CPU record, if any request has been served.
    #[must_use]
    pub fn cpu_debug_info(&self) -> Option<CpuDebugInfo> {
        lock(&self.staging).cpu_debug_info.clone()
    }
}

/// Emulation side of the protocol; owns the core.
#[derive(Debug)]
pub struct EmulationSession {
    core: GbaCore,
    commands: Receiver<Command>,
    staging: Arc<Mutex<Staging>>,
    config: SessionConfig,
    paused: bool,
}

/// Wires a core to a new inspector.
#[must_use]
pub fn inspection_channel(core: GbaCore, config: SessionConfig) -> (Inspector, EmulationSession) {
    let (commands, receiver) = mpsc::channel();
    let staging = Arc::new(Mutex::new(Staging::default()));
    let inspector = Inspector {
        commands,
        staging: Arc::clone(&staging),
    };
    let session = EmulationSession {
        core,
        commands: receiver,
        staging,
        config,
        paused: false,
    };
    (inspector, session)
}

impl EmulationSession {
    /// Applies every queued command in FIFO order. Returns how many were
    /// applied.
    pub fn process_responses(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.commands.try_recv() {
                Ok(command) => {
                    self.apply(command);
                    applied += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return applied,
            }
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::RequestScreenDraw => self.draw_screen(),
            Command::RequestCpuDebugInfo => {
                let info = self.cpu_debug_info();
                lock(&self.staging).cpu_debug_info = Some(info);
            }
            Command::SetKey { key, pressed } => {
                log::debug!("key {key:?} {}", if pressed { "down" } else { "up" });
                self.core.set_key(key, pressed);
            }
            Command::SetPause(paused) => {
                log::debug!("{}", if paused { "paused" } else { "resumed" });
                self.paused = paused;
                if !paused {
                    self.core.set_stopped(false);
                }
            }
            Command::LoadRom(bytes) => {
                let mut core = std::mem::take(&mut self.core).reset();
                core.load_rom(&bytes);
                core.skip_bios();
                self.core = core;
            }
        }
    }

    fn draw_screen(&self) {
        let Some(screen) = lock(&self.staging).screen.clone() else {
            log::debug!("draw requested before a framebuffer was supplied");
            return;
        };
        let frame = self.core.render_frame();
        let mut target = lock(&screen);
        target.clear();
        target.extend_from_slice(&frame);
    }

    fn cpu_debug_info(&self) -> CpuDebugInfo {
        let cpu = self.core.inspect_cpu();
        CpuDebugInfo {
            pc: cpu.pc,
            executing_pc: self.core.executing_pc(),
            last_pc: self.core.last_pc(),
            thumb: cpu.thumb,
            stopped: self.core.is_stopped(),
            paused: self.paused,
            key_input: self.core.key_input(),
            cpu,
        }
    }

    /// Processes queued commands, then runs up to `ticks_per_iteration`
    /// ticks unless paused or stopped. Returns the ticks executed.
    pub fn run_iteration(&mut self) -> u32 {
        self.process_responses();
        if self.paused {
            return 0;
        }
        let mut ticks = 0;
        while ticks < self.config.ticks_per_iteration && !self.core.is_stopped() {
            self.core.step();
            ticks += 1;
        }
        ticks
    }

    /// `true` while the run loop is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// The owned core.
    #[must_use]
    pub const fn core(&self) -> &GbaCore {
        &self.core
    }

    /// Mutable access to the owned core between iterations.
    pub fn core_mut(&mut self) -> &mut GbaCore {
        &mut self.core
    }

    /// Ends the session and returns the core.
    #[must_use]
    pub fn into_core(self) -> GbaCore {
        self.core
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{inspection_channel, Command};
    use crate::api::SessionConfig;
    use crate::error::ProtocolError;
    use crate::gba::GbaCore;
    use crate::memory::Key;
    use crate::ppu::FRAME_BYTES;

    #[test]
    fn commands_apply_in_order() {
        let (inspector, mut session) = inspection_channel(GbaCore::new(), SessionConfig::default());
        inspector.set_key(Key::A, true).unwrap();
        inspector.request_cpu_debug_info().unwrap();
        inspector.set_key(Key::A, false).unwrap();
        assert!(inspector.cpu_debug_info().is_none());
        assert_eq!(session.process_responses(), 3);
        let info = inspector.cpu_debug_info().unwrap();
        assert_eq!(info.key_input & 1, 0);
        assert_eq!(session.process_responses(), 0);
    }

    #[test]
    fn sending_after_session_drop_fails() {
        let (inspector, session) = inspection_channel(GbaCore::new(), SessionConfig::default());
        drop(session);
        assert_eq!(
            inspector.send(Command::RequestScreenDraw),
            Err(ProtocolError::Disconnected)
        );
    }

    #[test]
    fn framebuffer_cannot_be_supplied_after_session_drop() {
        let (inspector, session) = inspection_channel(GbaCore::new(), SessionConfig::default());
        let screen = Arc::new(Mutex::new(vec![0; FRAME_BYTES]));
        assert_eq!(inspector.set_screen_array(Arc::clone(&screen)), Ok(()));
        drop(session);
        assert_eq!(
            inspector.set_screen_array(screen),
            Err(ProtocolError::Disconnected)
        );
    }

    #[test]
    fn wrong_framebuffer_size_is_rejected() {
        let (inspector, _session) = inspection_channel(GbaCore::new(), SessionConfig::default());
        let result = inspector.set_screen_array(Arc::new(Mutex::new(vec![0; 16])));
        assert_eq!(
            result,
            Err(ProtocolError::FramebufferSize {
                expected: FRAME_BYTES,
                actual: 16
            })
        );
    }

    #[test]
    fn paused_session_does_not_tick() {
        let mut core = GbaCore::new();
        core.load_test_rom();
        core.skip_bios();
        let (inspector, mut session) = inspection_channel(core, SessionConfig {
            ticks_per_iteration: 10,
        });
        inspector.set_pause(true).unwrap();
        assert_eq!(session.run_iteration(), 0);
        assert!(session.is_paused());
        inspector.set_pause(false).unwrap();
        assert_eq!(session.run_iteration(), 10);
        assert_eq!(session.core().inspect_cpu().retired, 10);
    }
}
