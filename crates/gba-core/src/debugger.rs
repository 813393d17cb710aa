//! Breakpoint sets, stop state and program-counter history.

use std::collections::{BTreeSet, VecDeque};

/// Default number of committed program-counter values kept in the history.
pub const DEFAULT_PC_HISTORY_LEN: usize = 64;

/// Debugger state owned by the emulation context.
///
/// Breakpoints are kept per instruction width because the same address can
/// hold either an ARM or a Thumb instruction depending on CPSR.T.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debugger {
    arm_breakpoints: BTreeSet<u32>,
    thumb_breakpoints: BTreeSet<u32>,
    enabled: bool,
    stopped: bool,
    history: VecDeque<u32>,
    history_len: usize,
    executing_pc: u32,
    last_pc: u32,
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new(true, DEFAULT_PC_HISTORY_LEN)
    }
}

impl Debugger {
    /// Creates a running debugger with empty breakpoint sets.
    #[must_use]
    pub fn new(enabled: bool, history_len: usize) -> Self {
        Self {
            arm_breakpoints: BTreeSet::new(),
            thumb_breakpoints: BTreeSet::new(),
            enabled,
            stopped: false,
            history: VecDeque::new(),
            history_len,
            executing_pc: 0,
            last_pc: 0,
        }
    }

    /// Fresh debugger that keeps this one's breakpoints, instrumentation
    /// flag and history capacity. Everything else starts over.
    #[must_use]
    pub fn carry_over(&self) -> Self {
        Self {
            arm_breakpoints: self.arm_breakpoints.clone(),
            thumb_breakpoints: self.thumb_breakpoints.clone(),
            ..Self::new(self.enabled, self.history_len)
        }
    }

    /// Adds an ARM-state breakpoint. Adding twice is a no-op.
    pub fn add_arm_breakpoint(&mut self, addr: u32) {
        self.arm_breakpoints.insert(addr);
    }

    /// Removes an ARM-state breakpoint if present.
    pub fn remove_arm_breakpoint(&mut self, addr: u32) {
        self.arm_breakpoints.remove(&addr);
    }

    /// ARM-state breakpoints in ascending order.
    #[must_use]
    pub fn arm_breakpoints(&self) -> Vec<u32> {
        self.arm_breakpoints.iter().copied().collect()
    }

    /// Adds a Thumb-state breakpoint. Adding twice is a no-op.
    pub fn add_thumb_breakpoint(&mut self, addr: u32) {
        self.thumb_breakpoints.insert(addr);
    }

    /// Removes a Thumb-state breakpoint if present.
    pub fn remove_thumb_breakpoint(&mut self, addr: u32) {
        self.thumb_breakpoints.remove(&addr);
    }

    /// Thumb-state breakpoints in ascending order.
    #[must_use]
    pub fn thumb_breakpoints(&self) -> Vec<u32> {
        self.thumb_breakpoints.iter().copied().collect()
    }

    /// `true` when breakpoint checks and history recording run.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turns instrumentation on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// `true` while a breakpoint (or the host) holds execution.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stops or resumes execution.
    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    /// Address of the next instruction to retire.
    #[must_use]
    pub const fn executing_pc(&self) -> u32 {
        self.executing_pc
    }

    /// Address of the last committed instruction.
    #[must_use]
    pub const fn last_pc(&self) -> u32 {
        self.last_pc
    }

    /// Committed program-counter values, oldest first and newest last.
    #[must_use]
    pub fn pc_history(&self) -> Vec<u32> {
        self.history.iter().copied().collect()
    }

    /// Records a tick that left the CPU at `next_pc`, having committed the
    /// instruction at `committed_pc` if any, then checks the breakpoint set
    /// for the active width. Returns `true` when execution is stopped.
    pub fn after_tick(&mut self, committed_pc: Option<u32>, next_pc: u32, thumb: bool) -> bool {
        self.executing_pc = next_pc;
        if let Some(pc) = committed_pc {
            self.last_pc = pc;
        }
        if !self.enabled {
            return false;
        }

        if let Some(pc) = committed_pc.filter(|_| self.history_len > 0) {
            if self.history.len() == self.history_len {
                self.history.pop_front();
            }
            self.history.push_back(pc);
        }

        let breakpoints = if thumb {
            &self.thumb_breakpoints
        } else {
            &self.arm_breakpoints
        };
        if breakpoints.contains(&next_pc) {
            log::debug!(
                "breakpoint hit at {next_pc:#010X} ({})",
                if thumb { "thumb" } else { "arm" }
            );
            self.stopped = true;
        }
        self.stopped
    }

    /// Sets the next-instruction address without committing anything.
    pub fn set_executing_pc(&mut self, pc: u32) {
        self.executing_pc = pc;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{Debugger, DEFAULT_PC_HISTORY_LEN};

    #[test]
    fn breakpoint_sets_are_idempotent_and_sorted() {
        let mut debugger = Debugger::default();
        debugger.add_arm_breakpoint(0x0800_0010);
        debugger.add_arm_breakpoint(0x0800_0004);
        debugger.add_arm_breakpoint(0x0800_0010);
        assert_eq!(debugger.arm_breakpoints(), vec![0x0800_0004, 0x0800_0010]);
        debugger.remove_arm_breakpoint(0x0800_0004);
        debugger.remove_arm_breakpoint(0x0800_0004);
        assert_eq!(debugger.arm_breakpoints(), vec![0x0800_0010]);
        assert!(debugger.thumb_breakpoints().is_empty());
    }

    #[test]
    fn breakpoint_only_matches_active_width() {
        let mut debugger = Debugger::default();
        debugger.add_thumb_breakpoint(0x100);
        assert!(!debugger.after_tick(Some(0xFC), 0x100, false));
        assert!(debugger.after_tick(Some(0xFE), 0x100, true));
        assert!(debugger.is_stopped());
    }

    #[test]
    fn disabled_instrumentation_never_stops() {
        let mut debugger = Debugger::new(false, 8);
        debugger.add_arm_breakpoint(0x8);
        assert!(!debugger.after_tick(Some(0x4), 0x8, false));
        assert!(debugger.pc_history().is_empty());
        assert_eq!(debugger.executing_pc(), 0x8);
        assert_eq!(debugger.last_pc(), 0x4);
    }

    #[test]
    fn carry_over_keeps_breakpoints_and_flag_only() {
        let mut debugger = Debugger::new(false, 4);
        debugger.add_arm_breakpoint(1);
        debugger.add_thumb_breakpoint(2);
        debugger.set_stopped(true);
        debugger.after_tick(Some(0), 4, false);
        let fresh = debugger.carry_over();
        assert_eq!(fresh.arm_breakpoints(), vec![1]);
        assert_eq!(fresh.thumb_breakpoints(), vec![2]);
        assert!(!fresh.is_enabled());
        assert!(!fresh.is_stopped());
        assert_eq!(fresh.executing_pc(), 0);
    }

    #[test]
    fn default_history_capacity() {
        let mut debugger = Debugger::default();
        for pc in 0..100 {
            debugger.after_tick(Some(pc), pc + 1, false);
        }
        let history = debugger.pc_history();
        assert_eq!(history.len(), DEFAULT_PC_HISTORY_LEN);
        assert_eq!(history.first(), Some(&36));
        assert_eq!(history.last(), Some(&99));
    }

    #[test]
    fn unbounded_history_capacity_allocates_lazily() {
        let mut debugger = Debugger::new(true, usize::MAX);
        for pc in 0..3 {
            debugger.after_tick(Some(pc), pc + 1, false);
        }
        assert_eq!(debugger.pc_history(), vec![0, 1, 2]);
        assert_eq!(debugger.carry_over().pc_history(), Vec::<u32>::new());
    }

    proptest! {
        #[test]
        fn history_is_the_newest_tail_in_order(len in 0usize..16, pcs in prop::collection::vec(any::<u32>(), 0..64)) {
            let mut debugger = Debugger::new(true, len);
            for &pc in &pcs {
                debugger.after_tick(Some(pc), pc.wrapping_add(4), false);
            }
            let expected: Vec<u32> = pcs.iter().copied().skip(pcs.len().saturating_sub(len)).collect();
            prop_assert_eq!(debugger.pc_history(), expected);
        }
    }
}
