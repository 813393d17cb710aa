/// CPU execution state independent of the debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Fetching and executing instructions.
    #[default]
    Running,
    /// Waiting in HALTCNT low-power mode until an enabled interrupt is
    /// requested.
    Halted,
}

impl RunState {
    /// Returns the state after observing the pending interrupt mask.
    /// Any enabled and requested source wakes a halted CPU, even with IME
    /// clear.
    #[must_use]
    pub const fn wake_on(self, pending_interrupts: u16) -> Self {
        match self {
            Self::Halted if pending_interrupts != 0 => Self::Running,
            other => other,
        }
    }
}
