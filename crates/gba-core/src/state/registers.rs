/// Number of general-purpose registers visible at once (`r0..=r15`).
pub const GENERAL_REGISTER_COUNT: usize = 16;
/// Stack pointer register index.
pub const SP: usize = 13;
/// Link register index.
pub const LR: usize = 14;
/// Program counter register index.
pub const PC: usize = 15;

/// CPSR negative flag.
pub const PSR_N: u32 = 1 << 31;
/// CPSR zero flag.
pub const PSR_Z: u32 = 1 << 30;
/// CPSR carry flag.
pub const PSR_C: u32 = 1 << 29;
/// CPSR overflow flag.
pub const PSR_V: u32 = 1 << 28;
/// IRQ disable bit.
pub const PSR_I: u32 = 1 << 7;
/// FIQ disable bit.
pub const PSR_F: u32 = 1 << 6;
/// Thumb state bit.
pub const PSR_T: u32 = 1 << 5;
/// Mode field mask.
pub const PSR_MODE_MASK: u32 = 0x1F;

/// CPSR at power-on: Supervisor, IRQ and FIQ masked, ARM state, flags clear.
pub const POWER_ON_CPSR: u32 = PSR_I | PSR_F | Mode::Supervisor.bits();

/// Processor operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Mode {
    /// Unprivileged application mode.
    User,
    /// Fast interrupt mode with private `r8..=r14`.
    Fiq,
    /// Interrupt mode.
    Irq,
    /// Supervisor mode, entered on reset and SWI.
    Supervisor,
    /// Abort mode.
    Abort,
    /// Undefined-instruction mode.
    Undefined,
    /// Privileged mode sharing the User register set.
    System,
}

impl Mode {
    /// Decodes the CPSR mode field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits & PSR_MODE_MASK {
            0x10 => Some(Self::User),
            0x11 => Some(Self::Fiq),
            0x12 => Some(Self::Irq),
            0x13 => Some(Self::Supervisor),
            0x17 => Some(Self::Abort),
            0x1B => Some(Self::Undefined),
            0x1F => Some(Self::System),
            _ => None,
        }
    }

    /// Encodes this mode as a CPSR mode field.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::User => 0x10,
            Self::Fiq => 0x11,
            Self::Irq => 0x12,
            Self::Supervisor => 0x13,
            Self::Abort => 0x17,
            Self::Undefined => 0x1B,
            Self::System => 0x1F,
        }
    }

    /// `true` for every mode except User.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Self::User)
    }

    /// Returns the bank this mode uses for `r13`/`r14`.
    const fn bank(self) -> Bank {
        match self {
            Self::User | Self::System => Bank::User,
            Self::Fiq => Bank::Fiq,
            Self::Irq => Bank::Irq,
            Self::Supervisor => Bank::Supervisor,
            Self::Abort => Bank::Abort,
            Self::Undefined => Bank::Undefined,
        }
    }
}

/// Named register banks. User and System share [`Bank::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bank {
    User,
    Fiq,
    Irq,
    Supervisor,
    Abort,
    Undefined,
}

impl Bank {
    const fn index(self) -> usize {
        self as usize
    }

    /// Index into the SPSR array; the User bank has no SPSR.
    const fn spsr_index(self) -> Option<usize> {
        match self {
            Self::User => None,
            other => Some(other.index() - 1),
        }
    }
}

const BANK_COUNT: usize = 6;

/// CPU register file with explicit named banks.
///
/// `gpr` always holds the registers visible in the current mode. Switching
/// mode copies the outgoing mode's banked registers into their bank and the
/// incoming mode's bank into `gpr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    gpr: [u32; GENERAL_REGISTER_COUNT],
    /// `r8..=r12` for every mode except FIQ.
    shared_high: [u32; 5],
    /// FIQ-private `r8..=r12`.
    fiq_high: [u32; 5],
    /// `r13`/`r14` per bank.
    sp_lr: [[u32; 2]; BANK_COUNT],
    spsr: [u32; BANK_COUNT - 1],
    cpsr: u32,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            gpr: [0; GENERAL_REGISTER_COUNT],
            shared_high: [0; 5],
            fiq_high: [0; 5],
            sp_lr: [[0; 2]; BANK_COUNT],
            spsr: [0; BANK_COUNT - 1],
            cpsr: POWER_ON_CPSR,
        }
    }
}

impl RegisterFile {
    /// Reads a visible register. `r15` is the raw PC without pipeline offset.
    #[must_use]
    pub const fn gpr(&self, index: usize) -> u32 {
        self.gpr[index & 0xF]
    }

    /// Writes a visible register without alignment or pipeline handling.
    pub fn set_gpr(&mut self, index: usize, value: u32) {
        self.gpr[index & 0xF] = value;
    }

    /// All visible registers.
    #[must_use]
    pub const fn visible(&self) -> &[u32; GENERAL_REGISTER_COUNT] {
        &self.gpr
    }

    /// Program counter (address of the next instruction to execute).
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.gpr[PC]
    }

    /// Sets the program counter verbatim.
    pub fn set_pc(&mut self, value: u32) {
        self.gpr[PC] = value;
    }

    /// Raw CPSR.
    #[must_use]
    pub const fn cpsr(&self) -> u32 {
        self.cpsr
    }

    /// Current mode. Invalid mode fields never reach the CPSR.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match Mode::from_bits(self.cpsr) {
            Some(mode) => mode,
            None => Mode::System,
        }
    }

    /// `true` when executing Thumb code.
    #[must_use]
    pub const fn thumb(&self) -> bool {
        self.cpsr & PSR_T != 0
    }

    /// Sets or clears the Thumb bit.
    pub fn set_thumb(&mut self, thumb: bool) {
        if thumb {
            self.cpsr |= PSR_T;
        } else {
            self.cpsr &= !PSR_T;
        }
    }

    /// Tests a CPSR flag bit.
    #[must_use]
    pub const fn flag(&self, mask: u32) -> bool {
        self.cpsr & mask != 0
    }

    /// Sets or clears CPSR flag bits.
    pub fn set_flag(&mut self, mask: u32, value: bool) {
        if value {
            self.cpsr |= mask;
        } else {
            self.cpsr &= !mask;
        }
    }

    /// Writes the whole CPSR, banking registers if the mode field changes.
    /// A write carrying an invalid mode keeps the current mode.
    pub fn set_cpsr(&mut self, value: u32) {
        let target = Mode::from_bits(value).unwrap_or_else(|| self.mode());
        self.switch_mode(target);
        self.cpsr = (value & !PSR_MODE_MASK) | target.bits();
    }

    /// SPSR of the current mode; `None` in User and System.
    #[must_use]
    pub const fn spsr(&self) -> Option<u32> {
        match self.mode().bank().spsr_index() {
            Some(index) => Some(self.spsr[index]),
            None => None,
        }
    }

    /// Writes the current mode's SPSR. Ignored in User and System.
    pub fn set_spsr(&mut self, value: u32) {
        if let Some(index) = self.mode().bank().spsr_index() {
            self.spsr[index] = value;
        }
    }

    /// Reads register `index` as `mode` sees it, without switching. Returns
    /// `None` for an index above 15.
    #[must_use]
    pub fn banked(&self, mode: Mode, index: usize) -> Option<u32> {
        if index >= GENERAL_REGISTER_COUNT {
            return None;
        }
        let current = self.mode();
        let same_high = (current == Mode::Fiq) == (mode == Mode::Fiq);
        let value = match index {
            0..=7 | PC => self.gpr[index],
            8..=12 if same_high => self.gpr[index],
            8..=12 if mode == Mode::Fiq => self.fiq_high[index - 8],
            8..=12 => self.shared_high[index - 8],
            _ if current.bank() == mode.bank() => self.gpr[index],
            _ => self.sp_lr[mode.bank().index()][index - SP],
        };
        Some(value)
    }

    /// SPSR belonging to `mode`; `None` for User and System.
    #[must_use]
    pub fn banked_spsr(&self, mode: Mode) -> Option<u32> {
        mode.bank().spsr_index().map(|index| self.spsr[index])
    }

    /// Reads a register from the User bank regardless of current mode.
    #[must_use]
    pub fn user_register(&self, index: usize) -> u32 {
        self.banked(Mode::User, index).unwrap_or(0)
    }

    /// Writes a register in the User bank regardless of current mode.
    pub fn set_user_register(&mut self, index: usize, value: u32) {
        let index = index & 0xF;
        let current = self.mode();
        match index {
            0..=7 | PC => self.gpr[index] = value,
            8..=12 if current == Mode::Fiq => self.shared_high[index - 8] = value,
            8..=12 => self.gpr[index] = value,
            _ if current.bank() == Bank::User => self.gpr[index] = value,
            _ => self.sp_lr[Bank::User.index()][index - SP] = value,
        }
    }

    /// Banks out the current mode's registers and banks in `target`'s,
    /// updating the CPSR mode field.
    pub fn switch_mode(&mut self, target: Mode) {
        let current = self.mode();
        if current.bank() != target.bank() {
            let high = if current == Mode::Fiq {
                &mut self.fiq_high
            } else {
                &mut self.shared_high
            };
            high.copy_from_slice(&self.gpr[8..13]);
            self.sp_lr[current.bank().index()].copy_from_slice(&self.gpr[SP..PC]);

            let high = if target == Mode::Fiq {
                &self.fiq_high
            } else {
                &self.shared_high
            };
            self.gpr[8..13].copy_from_slice(high);
            self.gpr[SP..PC].copy_from_slice(&self.sp_lr[target.bank().index()]);
        }
        self.cpsr = (self.cpsr & !PSR_MODE_MASK) | target.bits();
    }
}

#[cfg(test)]
mod tests {
    use super::{Mode, RegisterFile, LR, POWER_ON_CPSR, PSR_C, SP};

    #[test]
    fn power_on_state_is_supervisor_with_interrupts_masked() {
        let regs = RegisterFile::default();
        assert_eq!(regs.cpsr(), POWER_ON_CPSR);
        assert_eq!(regs.cpsr(), 0xD3);
        assert_eq!(regs.mode(), Mode::Supervisor);
        assert!(!regs.thumb());
    }

    #[test]
    fn irq_bank_keeps_its_own_stack_pointer() {
        let mut regs = RegisterFile::default();
        regs.switch_mode(Mode::System);
        regs.set_gpr(SP, 0x0300_7F00);
        regs.switch_mode(Mode::Irq);
        assert_eq!(regs.gpr(SP), 0);
        regs.set_gpr(SP, 0x0300_7FA0);
        regs.switch_mode(Mode::User);
        assert_eq!(regs.gpr(SP), 0x0300_7F00);
        assert_eq!(regs.banked(Mode::Irq, SP), Some(0x0300_7FA0));
    }

    #[test]
    fn fiq_banks_r8_through_r14() {
        let mut regs = RegisterFile::default();
        regs.switch_mode(Mode::System);
        for index in 8..=14 {
            regs.set_gpr(index, index as u32);
        }
        regs.switch_mode(Mode::Fiq);
        for index in 8..=14 {
            assert_eq!(regs.gpr(index), 0);
            regs.set_gpr(index, 0x100 + index as u32);
        }
        regs.switch_mode(Mode::Supervisor);
        for index in 8..=12 {
            assert_eq!(regs.gpr(index), index as u32);
        }
        assert_eq!(regs.banked(Mode::Fiq, 9), Some(0x109));
        assert_eq!(regs.banked(Mode::User, LR), Some(14));
    }

    #[test]
    fn spsr_is_absent_in_user_and_system() {
        let mut regs = RegisterFile::default();
        regs.set_spsr(0x1234);
        assert_eq!(regs.spsr(), Some(0x1234));
        regs.switch_mode(Mode::System);
        assert_eq!(regs.spsr(), None);
        regs.set_spsr(0xFFFF);
        assert_eq!(regs.banked_spsr(Mode::Supervisor), Some(0x1234));
        assert_eq!(regs.banked_spsr(Mode::User), None);
    }

    #[test]
    fn invalid_mode_write_keeps_current_mode() {
        let mut regs = RegisterFile::default();
        regs.set_cpsr(PSR_C | 0x05);
        assert_eq!(regs.mode(), Mode::Supervisor);
        assert!(regs.flag(PSR_C));
    }

    #[test]
    fn user_bank_access_from_privileged_mode() {
        let mut regs = RegisterFile::default();
        regs.switch_mode(Mode::Fiq);
        regs.set_user_register(SP, 0xAA);
        regs.set_user_register(9, 0xBB);
        assert_eq!(regs.user_register(SP), 0xAA);
        assert_eq!(regs.user_register(9), 0xBB);
        regs.switch_mode(Mode::User);
        assert_eq!(regs.gpr(SP), 0xAA);
        assert_eq!(regs.gpr(9), 0xBB);
    }
}
