//! Odin32K system configuration.

/// How SysRAM is initialized at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RamInit {
    /// All 32 KiB start at zero.
    #[default]
    Zero,
    /// All 32 KiB are filled with a pseudo-random pattern, to surface guest
    /// bugs that depend on RAM starting zeroed.
    Random,
}

/// Trace verbosity. Each level is a superset of the ones below it: a
/// `BusLog` trace still prints instruction and register-dump lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// No trace output.
    #[default]
    Silent = 0,
    /// One line per instruction: PC, opcode, mnemonic, operand bytes.
    Instruction = 1,
    /// Instruction lines plus a full register dump after each one.
    Registers = 2,
    /// Every bus access (R/W, address, value), interleaved with the above.
    BusLog = 3,
}

impl Verbosity {
    /// Maps the CLI/config `0..3` integer to a verbosity level. Values
    /// above 3 saturate at `BusLog`.
    #[must_use]
    pub const fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Silent,
            1 => Self::Instruction,
            2 => Self::Registers,
            _ => Self::BusLog,
        }
    }
}

/// Odin32K system configuration.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Target CPU frequency in Hz. The real Odin32K runs its 65C02 at 4 MHz.
    pub clock_hz: u64,
    /// Whether the pacer actually sleeps to match `clock_hz`, or runs free.
    pub pacing_enabled: bool,
    /// SysRAM initialization policy.
    pub ram_init: RamInit,
    /// Trace verbosity.
    pub verbose: Verbosity,
    /// Pause for an input line at every instruction boundary.
    pub step_mode: bool,
    /// Pause for an input line before the first instruction, after the
    /// reset-vector fetch.
    pub wait_at_begin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clock_hz: 4_000_000,
            pacing_enabled: true,
            ram_init: RamInit::Zero,
            verbose: Verbosity::Silent,
            step_mode: false,
            wait_at_begin: false,
        }
    }
}
