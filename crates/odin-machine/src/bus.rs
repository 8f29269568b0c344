//! Odin32K memory bus.
//!
//! Address decode is by the top nibble of the 16-bit address:
//!
//! | Range | Device |
//! |---|---|
//! | $0000-$7FFF | SysRAM |
//! | $8000-$8FFF | I/O controller stub |
//! | $9000-$9FFF | Serial 0 stub |
//! | $A000-$AFFF | Serial 1 stub |
//! | $B000-$BFFF | unmapped (open bus) |
//! | $C000-$DFFF | ROM1 |
//! | $E000-$FFFF | ROM0 |
//!
//! The bus exclusively owns the RAM/ROM arrays (see `Ownership` in the
//! system design) and is the sole place cycles are charged: every `read`
//! or `write` ticks the pacer by exactly one cycle before returning.

use odin_core::{Bus, Pacer, PacerConfig, ReadResult};

use crate::config::{Config, RamInit, Verbosity};
use crate::rom::ROM_BANK_SIZE;

/// Size of system RAM in bytes.
pub const SYSRAM_SIZE: usize = 0x8000;

/// Open-bus placeholder byte for unmapped reads. Deliberately neither
/// `$00` nor `$FF` so tests can distinguish "mapped zero" from "open bus".
pub const OPEN_BUS_PLACEHOLDER: u8 = 0x5A;

/// Placeholder byte returned by the stubbed I/O regions ($8000-$AFFF).
/// Distinct from the open-bus value so a trace can tell "no device here
/// yet" apart from "reserved for a device that hasn't responded".
pub const IO_STUB_PLACEHOLDER: u8 = 0xFF;

/// Small non-cryptographic PRNG used only to fill RAM with a
/// reproducible-but-non-zero pattern when `RamInit::Random` is requested.
/// Not used for anything that needs to be unpredictable to a guest.
struct XorShift32(u32);

impl XorShift32 {
    const fn new(seed: u32) -> Self {
        Self(if seed == 0 { 0x9E37_79B9 } else { seed })
    }

    fn next_u8(&mut self) -> u8 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x & 0xFF) as u8
    }
}

/// The Odin32K memory and I/O bus.
pub struct OdinBus {
    ram: Box<[u8; SYSRAM_SIZE]>,
    rom0: Box<[u8; ROM_BANK_SIZE]>,
    rom1: Box<[u8; ROM_BANK_SIZE]>,
    pacer: Pacer,
    verbosity: Verbosity,
}

impl OdinBus {
    /// Builds a bus with the given ROM banks, initializing RAM per
    /// `config.ram_init` and the pacer per `config.clock_hz`/`pacing_enabled`.
    #[must_use]
    pub fn new(
        rom0: Box<[u8; ROM_BANK_SIZE]>,
        rom1: Box<[u8; ROM_BANK_SIZE]>,
        config: &Config,
    ) -> Self {
        let mut ram = Box::new([0u8; SYSRAM_SIZE]);
        if config.ram_init == RamInit::Random {
            let mut rng = XorShift32::new(0xC0FF_EE01);
            for byte in ram.iter_mut() {
                *byte = rng.next_u8();
            }
        }

        Self {
            ram,
            rom0,
            rom1,
            pacer: Pacer::new(PacerConfig {
                clock_hz: config.clock_hz,
                pacing_enabled: config.pacing_enabled,
            }),
            verbosity: config.verbose,
        }
    }

    /// Resynchronizes the pacer deadline to now. Called when resuming from
    /// an external pause (step-mode prompt) so the paused wall-clock time
    /// isn't charged against the guest.
    pub fn resync_pacer(&mut self) {
        self.pacer.resync();
    }

    /// Reads a byte without ticking the pacer or emitting a trace line.
    /// Used by the trace emitter and tests to inspect memory read-only.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match addr >> 12 {
            0x0..=0x7 => self.ram[usize::from(addr)],
            0x8..=0xA => IO_STUB_PLACEHOLDER,
            0xB => OPEN_BUS_PLACEHOLDER,
            0xC | 0xD => self.rom1[usize::from(addr) & 0x1FFF],
            0xE | 0xF => self.rom0[usize::from(addr) & 0x1FFF],
            _ => unreachable!("4-bit nibble"),
        }
    }
}

impl Bus for OdinBus {
    fn read(&mut self, address: u32) -> ReadResult {
        let addr = address as u16;
        let data = self.peek(addr);
        self.pacer.advance(1);
        if self.verbosity >= Verbosity::BusLog {
            println!("R ${addr:04X} ${data:02X}");
        }
        ReadResult::new(data)
    }

    fn write(&mut self, address: u32, value: u8) -> u8 {
        let addr = address as u16;
        match addr >> 12 {
            0x0..=0x7 => self.ram[usize::from(addr)] = value,
            // I/O stubs, the unmapped window, and both ROM banks discard
            // writes.
            0x8..=0xF => {}
            _ => unreachable!("4-bit nibble"),
        }
        self.pacer.advance(1);
        if self.verbosity >= Verbosity::BusLog {
            println!("W ${addr:04X} ${value:02X}");
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus_with(rom0: [u8; ROM_BANK_SIZE]) -> OdinBus {
        OdinBus::new(Box::new(rom0), Box::new([0; ROM_BANK_SIZE]), &Config {
            pacing_enabled: false,
            ..Config::default()
        })
    }

    #[test]
    fn sysram_round_trips() {
        let mut bus = bus_with([0; ROM_BANK_SIZE]);
        bus.write(0x1234, 0x42);
        assert_eq!(bus.read(0x1234).data, 0x42);
    }

    #[test]
    fn rom0_is_mapped_at_e000_and_read_only() {
        let mut rom0 = [0u8; ROM_BANK_SIZE];
        rom0[0] = 0xAA;
        rom0[ROM_BANK_SIZE - 1] = 0xBB;
        let mut bus = bus_with(rom0);

        assert_eq!(bus.read(0xE000).data, 0xAA);
        assert_eq!(bus.read(0xFFFF).data, 0xBB);

        bus.write(0xE000, 0x00);
        assert_eq!(bus.read(0xE000).data, 0xAA);
    }

    #[test]
    fn io_window_reads_stub_and_discards_writes() {
        let mut bus = bus_with([0; ROM_BANK_SIZE]);
        bus.write(0x8500, 0x42);
        assert_eq!(bus.read(0x8500).data, IO_STUB_PLACEHOLDER);
        assert_eq!(bus.read(0x9500).data, IO_STUB_PLACEHOLDER);
        assert_eq!(bus.read(0xA500).data, IO_STUB_PLACEHOLDER);
    }

    #[test]
    fn unmapped_window_is_open_bus() {
        let mut bus = bus_with([0; ROM_BANK_SIZE]);
        assert_eq!(bus.read(0xB123).data, OPEN_BUS_PLACEHOLDER);
        assert_ne!(OPEN_BUS_PLACEHOLDER, 0x00);
        assert_ne!(OPEN_BUS_PLACEHOLDER, 0xFF);
    }

    #[test]
    fn random_ram_init_is_not_all_zero() {
        let bus = OdinBus::new(
            Box::new([0; ROM_BANK_SIZE]),
            Box::new([0; ROM_BANK_SIZE]),
            &Config { ram_init: RamInit::Random, pacing_enabled: false, ..Config::default() },
        );
        assert!(bus.ram.iter().any(|&b| b != 0));
    }
}
