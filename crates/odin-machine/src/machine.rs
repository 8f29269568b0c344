//! Reset/boot driver.
//!
//! Drives the `Boot -> Running -> Halted` state machine described in the
//! system design: runs the CPU's architectural reset sequence, then ticks
//! instruction-by-instruction until the HALT sentinel (`$02`) is executed.
//! `Halted` is terminal for the run.

use std::io::{self, BufRead, Write};

use odin_core::Cpu;
use odin_cpu::{Registers, W65C02};

use crate::bus::OdinBus;
use crate::config::Config;
use crate::rom::ROM_BANK_SIZE;
use crate::trace;

/// A complete Odin32K system: CPU, bus, and the configuration that shaped
/// them.
pub struct Machine {
    cpu: W65C02,
    bus: OdinBus,
    config: Config,
}

impl Machine {
    /// Builds a machine from the given ROM banks and configuration. The
    /// CPU starts armed for reset; call [`Machine::boot`] or [`Machine::run`]
    /// to fetch the reset vector and begin execution.
    #[must_use]
    pub fn new(rom0: Box<[u8; ROM_BANK_SIZE]>, rom1: Box<[u8; ROM_BANK_SIZE]>, config: Config) -> Self {
        let bus = OdinBus::new(rom0, rom1, &config);
        let mut cpu = W65C02::new();
        cpu.reset();
        Self { cpu, bus, config }
    }

    /// Runs the architectural reset sequence: two dummy PC reads, three
    /// dummy stack reads, then the reset-vector fetch from $FFFC/$FFFD.
    /// This is the `Boot -> Running` transition; the reads it performs do
    /// consume pacer cycles, matching silicon.
    pub fn boot(&mut self) -> u16 {
        while !self.cpu.is_instruction_complete() {
            self.cpu.tick(&mut self.bus);
        }

        trace::emit_init(self.config.verbose, self.cpu.registers().pc);

        if self.config.wait_at_begin {
            Self::prompt();
            self.bus.resync_pacer();
        }

        self.cpu.registers().pc
    }

    /// Runs the machine to completion (the `$02` HALT sentinel), returning
    /// the total number of bus cycles executed including reset.
    pub fn run(&mut self) -> u64 {
        self.boot();
        while !self.step() {}
        self.cpu.total_cycles()
    }

    /// Executes exactly one instruction (or completes a pending reset, if
    /// still mid-sequence). Returns `true` once the machine has halted.
    pub fn step(&mut self) -> bool {
        if self.cpu.is_halted() {
            return true;
        }

        let pc = self.cpu.registers().pc;
        let opcode = trace::peek_opcode(&self.cpu, &self.bus);
        trace::emit_instruction(self.config.verbose, &self.bus, pc, opcode);

        self.cpu.tick(&mut self.bus);
        while !self.cpu.is_instruction_complete() && !self.cpu.is_halted() {
            self.cpu.tick(&mut self.bus);
        }

        trace::emit_registers(self.config.verbose, &self.cpu.registers(), self.cpu.total_cycles());

        if self.config.step_mode && !self.cpu.is_halted() {
            Self::prompt();
            self.bus.resync_pacer();
        }

        self.cpu.is_halted()
    }

    /// Requests a maskable interrupt. Returns `true` if accepted (the
    /// interrupt-disable flag was clear). No current device raises one;
    /// exposed for forward-compatibility with a future IRQ source, which
    /// would be polled here, between instructions, never mid-instruction.
    pub fn request_irq(&mut self) -> bool {
        self.cpu.interrupt()
    }

    /// Requests a non-maskable interrupt.
    pub fn request_nmi(&mut self) {
        self.cpu.nmi();
    }

    #[must_use]
    pub fn registers(&self) -> Registers {
        self.cpu.registers()
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.cpu.total_cycles()
    }

    #[must_use]
    pub fn bus(&self) -> &OdinBus {
        &self.bus
    }

    /// Blocks for one line on stdin. Used by `step_mode` and
    /// `wait_at_begin`. A closed or errored stdin is treated as an empty
    /// line, same as a bare Enter press, rather than halting the machine.
    fn prompt() {
        print!("(poppyemu) ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    }
}
