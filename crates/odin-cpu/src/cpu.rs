//! 65C02 CPU implementation.
//!
//! Cycle-accurate emulation where each `tick()` performs at most one bus
//! access. Instructions are broken down into their component cycles; the
//! CPU tracks which cycle of which instruction it is on between calls.

use odin_core::{Bus, Cpu, Observable, ReadResult, Value};

use crate::flags::{C, I, N, V, Z};
use crate::{Registers, Status};

/// Internal state tracking instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Fetching opcode byte.
    FetchOpcode,
    /// Executing instruction cycles.
    Execute,
    /// Running the reset-vector-fetch sequence.
    Reset,
    /// Stopped by the HALT opcode ($02). Terminal for the current run.
    Halted,
}

/// The 65C02 CPU.
///
/// Implements cycle-accurate execution where each `tick()` advances the CPU
/// by one cycle. Interrupts are checked only at instruction boundaries;
/// there is no mid-instruction preemption.
#[derive(Debug)]
pub struct W65C02 {
    /// CPU registers.
    pub regs: Registers,

    /// Current execution state.
    state: State,

    /// Current opcode being executed.
    opcode: u8,

    /// Current cycle within the instruction (0 = opcode fetch).
    cycle: u8,

    /// Temporary address register for addressing modes.
    addr: u16,

    /// Temporary data register.
    data: u8,

    /// Pointer for indirect addressing.
    pointer: u8,

    /// NMI edge detector - true when NMI has been requested and not yet
    /// serviced.
    nmi_pending: bool,

    /// IRQ level - true while an interrupt is pending.
    irq_pending: bool,

    /// Set while `op_brk`'s cycle sequence is servicing a hardware NMI/IRQ
    /// rather than a `BRK` instruction byte, so the pushed status has its B
    /// bit clear instead of set.
    hw_interrupt_entry: bool,

    /// Total bus accesses performed since construction. The fundamental
    /// unit of emulator time; equals the cycle count of every completed
    /// instruction summed together.
    total_cycles: u64,
}

impl Default for W65C02 {
    fn default() -> Self {
        Self::new()
    }
}

impl W65C02 {
    /// Creates a new CPU. Registers start at their post-`Registers::new()`
    /// values; call `reset()` to run the architectural reset sequence
    /// (which fetches the reset vector from the bus) before executing
    /// guest code.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            state: State::FetchOpcode,
            opcode: 0,
            cycle: 0,
            addr: 0,
            data: 0,
            pointer: 0,
            nmi_pending: false,
            irq_pending: false,
            hw_interrupt_entry: false,
            total_cycles: 0,
        }
    }

    /// Returns true if the previous instruction has completed and the CPU
    /// is ready to fetch the next opcode.
    #[must_use]
    pub fn is_instruction_complete(&self) -> bool {
        self.state == State::FetchOpcode
    }

    #[must_use]
    pub const fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    #[inline]
    fn read_mem<B: Bus>(&self, bus: &mut B, addr: u16) -> u8 {
        bus.read(u32::from(addr)).data
    }

    #[inline]
    fn read_mem_result<B: Bus>(&self, bus: &mut B, addr: u16) -> ReadResult {
        bus.read(u32::from(addr))
    }

    #[inline]
    fn write_mem<B: Bus>(&self, bus: &mut B, addr: u16, value: u8) {
        bus.write(u32::from(addr), value);
    }

    /// True for the 65C02's single-byte reserved-opcode slots (columns
    /// `$x3`, `$xB`, `$x7`, `$xF`). These complete within the opcode fetch
    /// itself and perform no further bus access.
    const fn is_single_cycle_reserved(opcode: u8) -> bool {
        matches!(opcode & 0x0F, 0x03 | 0x07 | 0x0B | 0x0F)
    }

    fn execute_cycle<B: Bus>(&mut self, bus: &mut B) {
        self.total_cycles += 1;

        match self.state {
            State::FetchOpcode => {
                if self.nmi_pending {
                    self.nmi_pending = false;
                    self.begin_nmi(bus);
                    return;
                }
                if self.irq_pending && !self.regs.p.is_set(I) {
                    self.begin_irq(bus);
                    return;
                }

                self.opcode = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);

                if self.opcode == 0x02 || Self::is_single_cycle_reserved(self.opcode) {
                    // HALT, or a reserved opcode whose documented cycle
                    // count is exactly the opcode fetch. Either way there
                    // is nothing left to do this instruction.
                    if self.opcode == 0x02 {
                        self.state = State::Halted;
                        self.addr = 0;
                        self.data = 0;
                        self.pointer = 0;
                    } else {
                        self.finish();
                    }
                    return;
                }

                self.cycle = 1;
                self.state = State::Execute;
            }
            State::Execute => {
                self.execute_instruction(bus);
            }
            State::Reset => {
                self.execute_reset(bus);
            }
            State::Halted => {
                // Halt is terminal; tolerate further ticks without side
                // effects beyond a read of whatever PC currently holds.
                let _ = self.read_mem_result(bus, self.regs.pc);
            }
        }
    }

    /// Begin NMI sequence. Uses the same cycle shape as BRK/IRQ but reads
    /// the vector from $FFFA.
    fn begin_nmi<B: Bus>(&mut self, bus: &mut B) {
        let _ = self.read_mem_result(bus, self.regs.pc);
        self.opcode = 0x00;
        self.cycle = 1;
        self.addr = 0xFFFA;
        self.hw_interrupt_entry = true;
        self.state = State::Execute;
    }

    /// Begin IRQ sequence. Vector at $FFFE, shared with BRK. The first of
    /// two predecode dummy reads happens here; the second is `op_brk`'s own
    /// cycle 1, matching the `BRK`-instruction path's fetch-then-cycle-1
    /// shape so both take 7 cycles total.
    fn begin_irq<B: Bus>(&mut self, bus: &mut B) {
        let _ = self.read_mem_result(bus, self.regs.pc);
        self.opcode = 0x00;
        self.cycle = 1;
        self.addr = 0xFFFE;
        self.hw_interrupt_entry = true;
        self.state = State::Execute;
    }

    /// Architectural reset: two dummy fetches, three dummy stack reads (SP
    /// is not written - the real chip leaves it undefined), then the
    /// reset-vector fetch from $FFFC/$FFFD. Seven cycles total, matching
    /// silicon.
    fn execute_reset<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            0 | 1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle += 1;
            }
            2 | 3 | 4 => {
                let _ = self.read_mem_result(bus, self.regs.stack_addr());
                self.cycle += 1;
            }
            5 => {
                self.data = self.read_mem(bus, 0xFFFC);
                self.cycle = 6;
            }
            6 => {
                let hi = self.read_mem(bus, 0xFFFD);
                self.regs.pc = u16::from(self.data) | (u16::from(hi) << 8);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn finish(&mut self) {
        self.state = State::FetchOpcode;
        self.cycle = 0;
        self.addr = 0;
        self.data = 0;
        self.pointer = 0;
    }

    // ========================================================================
    // Addressing mode helpers - read operations
    // ========================================================================

    fn addr_imm<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        if self.cycle == 1 {
            self.data = self.read_mem(bus, self.regs.pc);
            self.regs.pc = self.regs.pc.wrapping_add(1);
            op(self, self.data);
            self.finish();
        }
    }

    fn addr_zp<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.data = self.read_mem(bus, self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_zpx<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.x));
                self.cycle = 3;
            }
            3 => {
                self.data = self.read_mem(bus, self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_zpy<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.y));
                self.cycle = 3;
            }
            3 => {
                self.data = self.read_mem(bus, self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_abs<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(self.read_mem(bus, self.regs.pc)) << 8;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 3;
            }
            3 => {
                self.data = self.read_mem(bus, self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// Absolute,X addressing. Dummy read only on page crossing.
    fn addr_abx<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.x);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.x);
                self.cycle = 3;
            }
            3 => {
                if self.data != 0 {
                    let _ = self.read_mem_result(bus, self.addr);
                    self.addr = self.addr.wrapping_add(0x100);
                    self.cycle = 4;
                } else {
                    self.data = self.read_mem(bus, self.addr);
                    op(self, self.data);
                    self.finish();
                }
            }
            4 => {
                self.data = self.read_mem(bus, self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// Absolute,Y addressing. Dummy read only on page crossing.
    fn addr_aby<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 3;
            }
            3 => {
                if self.data != 0 {
                    let _ = self.read_mem_result(bus, self.addr);
                    self.addr = self.addr.wrapping_add(0x100);
                    self.cycle = 4;
                } else {
                    self.data = self.read_mem(bus, self.addr);
                    op(self, self.data);
                    self.finish();
                }
            }
            4 => {
                self.data = self.read_mem(bus, self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_izx<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, u16::from(self.pointer));
                self.pointer = self.pointer.wrapping_add(self.regs.x);
                self.cycle = 3;
            }
            3 => {
                self.addr = u16::from(self.read_mem_result(bus, u16::from(self.pointer)).data);
                self.cycle = 4;
            }
            4 => {
                self.addr |=
                    u16::from(self.read_mem_result(bus, u16::from(self.pointer.wrapping_add(1))).data) << 8;
                self.cycle = 5;
            }
            5 => {
                self.data = self.read_mem(bus, self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_izy<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr = u16::from(self.read_mem_result(bus, u16::from(self.pointer)).data);
                self.cycle = 3;
            }
            3 => {
                let hi = self.read_mem_result(bus, u16::from(self.pointer.wrapping_add(1))).data;
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 4;
            }
            4 => {
                if self.data != 0 {
                    let _ = self.read_mem_result(bus, self.addr);
                    self.addr = self.addr.wrapping_add(0x100);
                    self.cycle = 5;
                } else {
                    self.data = self.read_mem(bus, self.addr);
                    op(self, self.data);
                    self.finish();
                }
            }
            5 => {
                self.data = self.read_mem(bus, self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// `(zp)` addressing - 65C02 only. No index; same pointer dereference
    /// as `(zp),Y` without the final add.
    fn addr_zpi<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr = u16::from(self.read_mem_result(bus, u16::from(self.pointer)).data);
                self.cycle = 3;
            }
            3 => {
                self.addr |=
                    u16::from(self.read_mem_result(bus, u16::from(self.pointer.wrapping_add(1))).data) << 8;
                self.cycle = 4;
            }
            4 => {
                self.data = self.read_mem(bus, self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // ========================================================================
    // Addressing mode helpers - write operations
    // ========================================================================

    fn addr_zp_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.write_mem(bus, self.addr, val(self));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_zpx_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.x));
                self.cycle = 3;
            }
            3 => {
                self.write_mem(bus, self.addr, val(self));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_zpy_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.y));
                self.cycle = 3;
            }
            3 => {
                self.write_mem(bus, self.addr, val(self));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_abs_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(self.read_mem(bus, self.regs.pc)) << 8;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 3;
            }
            3 => {
                self.write_mem(bus, self.addr, val(self));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// Absolute,X write - the page-cross dummy read is unconditional.
    fn addr_abx_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.x);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.x);
                self.cycle = 3;
            }
            3 => {
                let _ = self.read_mem_result(bus, self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 4;
            }
            4 => {
                self.write_mem(bus, self.addr, val(self));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_aby_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 3;
            }
            3 => {
                let _ = self.read_mem_result(bus, self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 4;
            }
            4 => {
                self.write_mem(bus, self.addr, val(self));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_izx_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, u16::from(self.pointer));
                self.pointer = self.pointer.wrapping_add(self.regs.x);
                self.cycle = 3;
            }
            3 => {
                self.addr = u16::from(self.read_mem_result(bus, u16::from(self.pointer)).data);
                self.cycle = 4;
            }
            4 => {
                self.addr |=
                    u16::from(self.read_mem_result(bus, u16::from(self.pointer.wrapping_add(1))).data) << 8;
                self.cycle = 5;
            }
            5 => {
                self.write_mem(bus, self.addr, val(self));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_izy_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr = u16::from(self.read_mem_result(bus, u16::from(self.pointer)).data);
                self.cycle = 3;
            }
            3 => {
                let hi = self.read_mem_result(bus, u16::from(self.pointer.wrapping_add(1))).data;
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 4;
            }
            4 => {
                let _ = self.read_mem_result(bus, self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 5;
            }
            5 => {
                self.write_mem(bus, self.addr, val(self));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_zpi_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr = u16::from(self.read_mem_result(bus, u16::from(self.pointer)).data);
                self.cycle = 3;
            }
            3 => {
                self.addr |=
                    u16::from(self.read_mem_result(bus, u16::from(self.pointer.wrapping_add(1))).data) << 8;
                self.cycle = 4;
            }
            4 => {
                self.write_mem(bus, self.addr, val(self));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // ========================================================================
    // Addressing mode helpers - read-modify-write operations
    //
    // The dummy access between the real read and the real write is a READ
    // of the operand address, not a write of the stale value. On NMOS 6502
    // silicon the dummy access is a write; the 65C02 corrected this.
    // ========================================================================

    fn addr_zp_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.data = self.read_mem(bus, self.addr);
                self.cycle = 3;
            }
            3 => {
                let _ = self.read_mem_result(bus, self.addr);
                self.data = op(self, self.data);
                self.cycle = 4;
            }
            4 => {
                self.write_mem(bus, self.addr, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_zpx_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.x));
                self.cycle = 3;
            }
            3 => {
                self.data = self.read_mem(bus, self.addr);
                self.cycle = 4;
            }
            4 => {
                let _ = self.read_mem_result(bus, self.addr);
                self.data = op(self, self.data);
                self.cycle = 5;
            }
            5 => {
                self.write_mem(bus, self.addr, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn addr_abs_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(self.read_mem(bus, self.regs.pc)) << 8;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 3;
            }
            3 => {
                self.data = self.read_mem(bus, self.addr);
                self.cycle = 4;
            }
            4 => {
                let _ = self.read_mem_result(bus, self.addr);
                self.data = op(self, self.data);
                self.cycle = 5;
            }
            5 => {
                self.write_mem(bus, self.addr, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// Absolute,X read-modify-write (always 7 cycles; page-cross dummy
    /// read unconditional, matching the write-class rule).
    fn addr_abx_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.x);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.x);
                self.cycle = 3;
            }
            3 => {
                let _ = self.read_mem_result(bus, self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 4;
            }
            4 => {
                self.data = self.read_mem(bus, self.addr);
                self.cycle = 5;
            }
            5 => {
                let _ = self.read_mem_result(bus, self.addr);
                self.data = op(self, self.data);
                self.cycle = 6;
            }
            6 => {
                self.write_mem(bus, self.addr, self.data);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    // ========================================================================
    // ALU operations
    // ========================================================================

    fn do_lda(&mut self, val: u8) {
        self.regs.a = val;
        self.regs.p.update_nz(val);
    }

    fn do_ldx(&mut self, val: u8) {
        self.regs.x = val;
        self.regs.p.update_nz(val);
    }

    fn do_ldy(&mut self, val: u8) {
        self.regs.y = val;
        self.regs.p.update_nz(val);
    }

    fn do_ora(&mut self, val: u8) {
        self.regs.a |= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_and(&mut self, val: u8) {
        self.regs.a &= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_eor(&mut self, val: u8) {
        self.regs.a ^= val;
        self.regs.p.update_nz(self.regs.a);
    }

    /// Decimal mode never alters ADC/SBC here: the D flag can be set and
    /// read by software but arithmetic is always binary.
    fn do_adc(&mut self, val: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(a) + u16::from(val) + carry;
        let result = sum as u8;

        self.regs.p.set_if(C, sum > 0xFF);
        self.regs.p.set_if(V, (a ^ result) & (val ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    fn do_sbc(&mut self, val: u8) {
        self.do_adc(!val);
    }

    fn do_cmp(&mut self, val: u8) {
        let result = self.regs.a.wrapping_sub(val);
        self.regs.p.set_if(C, self.regs.a >= val);
        self.regs.p.update_nz(result);
    }

    fn do_cpx(&mut self, val: u8) {
        let result = self.regs.x.wrapping_sub(val);
        self.regs.p.set_if(C, self.regs.x >= val);
        self.regs.p.update_nz(result);
    }

    fn do_cpy(&mut self, val: u8) {
        let result = self.regs.y.wrapping_sub(val);
        self.regs.p.set_if(C, self.regs.y >= val);
        self.regs.p.update_nz(result);
    }

    fn do_bit(&mut self, val: u8) {
        self.regs.p.set_if(Z, self.regs.a & val == 0);
        self.regs.p.set_if(N, val & 0x80 != 0);
        self.regs.p.set_if(V, val & 0x40 != 0);
    }

    /// BIT #imm (65C02 only) has no memory location to reflect into N/V;
    /// only Z is affected.
    fn do_bit_imm(&mut self, val: u8) {
        self.regs.p.set_if(Z, self.regs.a & val == 0);
    }

    fn do_asl(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = val << 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_lsr(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = val >> 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_rol(&mut self, val: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = (val << 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    fn do_ror(&mut self, val: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = (val >> 1) | (carry_in << 7);
        self.regs.p.update_nz(result);
        result
    }

    fn do_inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.regs.p.update_nz(result);
        result
    }

    fn do_dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.regs.p.update_nz(result);
        result
    }

    /// TSB: Z reflects `A & mem` *before* the write; the written value is
    /// `mem | A`.
    fn do_tsb(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(Z, self.regs.a & val == 0);
        val | self.regs.a
    }

    /// TRB: Z reflects `A & mem` *before* the write; the written value is
    /// `mem & !A`.
    fn do_trb(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(Z, self.regs.a & val == 0);
        val & !self.regs.a
    }

    fn discard(&mut self, _val: u8) {}

    fn val_a(&self) -> u8 {
        self.regs.a
    }

    fn val_x(&self) -> u8 {
        self.regs.x
    }

    fn val_y(&self) -> u8 {
        self.regs.y
    }

    fn val_zero(&self) -> u8 {
        0
    }

    // ========================================================================
    // Instruction handlers with bespoke cycle shapes
    // ========================================================================

    fn op_brk<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                if self.hw_interrupt_entry {
                    // Second of two predecode dummy reads on the hardware
                    // IRQ/NMI path; the first already happened in
                    // begin_irq/begin_nmi. No opcode byte to skip past, so
                    // PC is left untouched.
                    let _ = self.read_mem_result(bus, self.regs.pc);
                } else {
                    self.addr = 0;
                    let _ = self.read_mem_result(bus, self.regs.pc);
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                }
                self.cycle = 2;
            }
            2 => {
                let stack_addr = self.regs.push();
                self.write_mem(bus, stack_addr, (self.regs.pc >> 8) as u8);
                self.cycle = 3;
            }
            3 => {
                let stack_addr = self.regs.push();
                self.write_mem(bus, stack_addr, self.regs.pc as u8);
                self.cycle = 4;
            }
            4 => {
                let stack_addr = self.regs.push();
                let status = if self.hw_interrupt_entry {
                    self.regs.p.to_byte_irq()
                } else {
                    self.regs.p.to_byte_brk()
                };
                self.write_mem(bus, stack_addr, status);
                self.cycle = 5;
            }
            5 => {
                let vector = if self.addr != 0 { self.addr } else { 0xFFFE };
                self.data = self.read_mem(bus, vector);
                self.addr = vector;
                self.cycle = 6;
            }
            6 => {
                let hi = self.read_mem_result(bus, self.addr.wrapping_add(1)).data;
                self.regs.pc = u16::from(self.data) | (u16::from(hi) << 8);
                self.regs.p.set(I);
                self.addr = 0;
                self.hw_interrupt_entry = false;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_rti<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.regs.p = Status::from_byte(self.read_mem(bus, addr));
                self.cycle = 4;
            }
            4 => {
                let addr = self.regs.pop();
                self.addr = u16::from(self.read_mem(bus, addr));
                self.cycle = 5;
            }
            5 => {
                let addr = self.regs.pop();
                self.addr |= u16::from(self.read_mem(bus, addr)) << 8;
                self.regs.pc = self.addr;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_rts<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.addr = u16::from(self.read_mem(bus, addr));
                self.cycle = 4;
            }
            4 => {
                let addr = self.regs.pop();
                self.addr |= u16::from(self.read_mem(bus, addr)) << 8;
                self.cycle = 5;
            }
            5 => {
                let _ = self.read_mem_result(bus, self.addr);
                self.regs.pc = self.addr.wrapping_add(1);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// The pushed return address is `PC - 1` where PC is the value after
    /// both operand bytes have been fetched. At the point the low byte of
    /// PC is pushed below, `self.regs.pc` has only been advanced past the
    /// low operand byte - i.e. it already equals target-address-minus-one,
    /// which is exactly the value the reference behavior stores.
    fn op_jsr<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.push();
                self.write_mem(bus, addr, (self.regs.pc >> 8) as u8);
                self.cycle = 4;
            }
            4 => {
                let addr = self.regs.push();
                self.write_mem(bus, addr, self.regs.pc as u8);
                self.cycle = 5;
            }
            5 => {
                self.addr |= u16::from(self.read_mem(bus, self.regs.pc)) << 8;
                self.regs.pc = self.addr;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_jmp_abs<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(self.read_mem(bus, self.regs.pc)) << 8;
                self.regs.pc = self.addr;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// `JMP (abs)`. The 65C02 fixes the NMOS page-wrap bug (where the high
    /// byte was fetched from the start of the same page instead of the
    /// following address) at the cost of one extra internal cycle.
    fn op_jmp_ind<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(self.read_mem(bus, self.regs.pc)) << 8;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 3;
            }
            3 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 4;
            }
            4 => {
                self.data = self.read_mem(bus, self.addr);
                self.cycle = 5;
            }
            5 => {
                let hi = self.read_mem(bus, self.addr.wrapping_add(1));
                self.regs.pc = u16::from(self.data) | (u16::from(hi) << 8);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// `JMP (abs,X)` - 65C02 only. The base address is indexed by X before
    /// the indirection, with full 16-bit carry (no zero-page-style wrap).
    fn op_jmp_abx<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(self.read_mem(bus, self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(self.read_mem(bus, self.regs.pc)) << 8;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 3;
            }
            3 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.addr = self.addr.wrapping_add(u16::from(self.regs.x));
                self.cycle = 4;
            }
            4 => {
                self.data = self.read_mem(bus, self.addr);
                self.cycle = 5;
            }
            5 => {
                let hi = self.read_mem(bus, self.addr.wrapping_add(1));
                self.regs.pc = u16::from(self.data) | (u16::from(hi) << 8);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_branch<B: Bus>(&mut self, bus: &mut B, taken: bool) {
        match self.cycle {
            1 => {
                self.data = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                if taken {
                    self.cycle = 2;
                } else {
                    self.finish();
                }
            }
            2 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                let offset = i16::from(self.data as i8);
                let new_pc = (self.regs.pc as i16).wrapping_add(offset) as u16;
                if (new_pc ^ self.regs.pc) & 0xFF00 != 0 {
                    self.addr = new_pc;
                    self.cycle = 3;
                } else {
                    self.regs.pc = new_pc;
                    self.finish();
                }
            }
            3 => {
                let _ = self.read_mem_result(bus, (self.regs.pc & 0xFF00) | (self.addr & 0x00FF));
                self.regs.pc = self.addr;
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_php<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let addr = self.regs.push();
                self.write_mem(bus, addr, self.regs.p.to_byte_brk());
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_plp<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.regs.p = Status::from_byte(self.read_mem(bus, addr));
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_pha<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let addr = self.regs.push();
                self.write_mem(bus, addr, self.regs.a);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_pla<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.regs.a = self.read_mem(bus, addr);
                self.regs.p.update_nz(self.regs.a);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_phx<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let addr = self.regs.push();
                self.write_mem(bus, addr, self.regs.x);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_phy<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let addr = self.regs.push();
                self.write_mem(bus, addr, self.regs.y);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_plx<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.regs.x = self.read_mem(bus, addr);
                self.regs.p.update_nz(self.regs.x);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_ply<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = self.read_mem_result(bus, self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = self.read_mem_result(bus, self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.regs.y = self.read_mem(bus, addr);
                self.regs.p.update_nz(self.regs.y);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    fn op_flag<B: Bus>(&mut self, bus: &mut B, flag: u8, set: bool) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.p.set_if(flag, set);
            self.finish();
        }
    }

    fn op_nop<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.finish();
        }
    }

    fn op_tax<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.x = self.regs.a;
            self.regs.p.update_nz(self.regs.x);
            self.finish();
        }
    }

    fn op_tay<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.y = self.regs.a;
            self.regs.p.update_nz(self.regs.y);
            self.finish();
        }
    }

    fn op_txa<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.a = self.regs.x;
            self.regs.p.update_nz(self.regs.a);
            self.finish();
        }
    }

    fn op_tya<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.a = self.regs.y;
            self.regs.p.update_nz(self.regs.a);
            self.finish();
        }
    }

    fn op_tsx<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.x = self.regs.s;
            self.regs.p.update_nz(self.regs.x);
            self.finish();
        }
    }

    fn op_txs<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.s = self.regs.x;
            self.finish();
        }
    }

    fn op_inx<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.x = self.regs.x.wrapping_add(1);
            self.regs.p.update_nz(self.regs.x);
            self.finish();
        }
    }

    fn op_iny<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.y = self.regs.y.wrapping_add(1);
            self.regs.p.update_nz(self.regs.y);
            self.finish();
        }
    }

    fn op_dex<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.x = self.regs.x.wrapping_sub(1);
            self.regs.p.update_nz(self.regs.x);
            self.finish();
        }
    }

    fn op_dey<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.y = self.regs.y.wrapping_sub(1);
            self.regs.p.update_nz(self.regs.y);
            self.finish();
        }
    }

    fn op_asl_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.a = self.do_asl(self.regs.a);
            self.finish();
        }
    }

    fn op_lsr_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.a = self.do_lsr(self.regs.a);
            self.finish();
        }
    }

    fn op_rol_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.a = self.do_rol(self.regs.a);
            self.finish();
        }
    }

    fn op_ror_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.a = self.do_ror(self.regs.a);
            self.finish();
        }
    }

    fn op_inc_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.a = self.regs.a.wrapping_add(1);
            self.regs.p.update_nz(self.regs.a);
            self.finish();
        }
    }

    fn op_dec_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = self.read_mem_result(bus, self.regs.pc);
            self.regs.a = self.regs.a.wrapping_sub(1);
            self.regs.p.update_nz(self.regs.a);
            self.finish();
        }
    }

    /// `$5C`, the single 3-byte/8-cycle reserved opcode: two operand bytes
    /// are fetched and then five further cycles read an address nothing
    /// backs, before the instruction completes.
    fn op_reserved_5c<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.data = self.read_mem(bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr = u16::from(self.data) | (u16::from(self.read_mem(bus, self.regs.pc)) << 8);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 3;
            }
            3..=6 => {
                let _ = self.read_mem_result(bus, self.addr);
                self.cycle += 1;
            }
            7 => {
                let _ = self.read_mem_result(bus, self.addr);
                self.finish();
            }
            _ => unreachable!(),
        }
    }

    /// Dispatch for every opcode not implemented as a documented
    /// instruction and not one of the single-cycle reserved slots handled
    /// directly in `execute_cycle`. Each documented reserved NOP reuses the
    /// addressing-mode helper whose cycle shape matches its byte/cycle
    /// count exactly.
    fn op_reserved_nop<B: Bus>(&mut self, bus: &mut B) {
        match self.opcode {
            0x5C => self.op_reserved_5c(bus),
            0x44 => self.addr_zp(bus, Self::discard),
            0x54 | 0xD4 | 0xF4 => self.addr_zpx(bus, Self::discard),
            0xDC | 0xFC => self.addr_abs(bus, Self::discard),
            0x22 | 0x42 | 0x62 | 0x82 | 0xC2 | 0xE2 => self.addr_imm(bus, Self::discard),
            _ => unreachable!("opcode {:#04X} is not a reserved NOP", self.opcode),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    #[allow(clippy::too_many_lines)]
    fn execute_instruction<B: Bus>(&mut self, bus: &mut B) {
        match self.opcode {
            0x00 => self.op_brk(bus),
            0x01 => self.addr_izx(bus, Self::do_ora),
            0x04 => self.addr_zp_rmw(bus, Self::do_tsb),
            0x05 => self.addr_zp(bus, Self::do_ora),
            0x06 => self.addr_zp_rmw(bus, Self::do_asl),
            0x08 => self.op_php(bus),
            0x09 => self.addr_imm(bus, Self::do_ora),
            0x0A => self.op_asl_a(bus),
            0x0C => self.addr_abs_rmw(bus, Self::do_tsb),
            0x0D => self.addr_abs(bus, Self::do_ora),
            0x0E => self.addr_abs_rmw(bus, Self::do_asl),

            0x10 => self.op_branch(bus, !self.regs.p.is_set(N)),
            0x11 => self.addr_izy(bus, Self::do_ora),
            0x12 => self.addr_zpi(bus, Self::do_ora),
            0x14 => self.addr_zp_rmw(bus, Self::do_trb),
            0x15 => self.addr_zpx(bus, Self::do_ora),
            0x16 => self.addr_zpx_rmw(bus, Self::do_asl),
            0x18 => self.op_flag(bus, C, false),
            0x19 => self.addr_aby(bus, Self::do_ora),
            0x1A => self.op_inc_a(bus),
            0x1C => self.addr_abs_rmw(bus, Self::do_trb),
            0x1D => self.addr_abx(bus, Self::do_ora),
            0x1E => self.addr_abx_rmw(bus, Self::do_asl),

            0x20 => self.op_jsr(bus),
            0x21 => self.addr_izx(bus, Self::do_and),
            0x24 => self.addr_zp(bus, Self::do_bit),
            0x25 => self.addr_zp(bus, Self::do_and),
            0x26 => self.addr_zp_rmw(bus, Self::do_rol),
            0x28 => self.op_plp(bus),
            0x29 => self.addr_imm(bus, Self::do_and),
            0x2A => self.op_rol_a(bus),
            0x2C => self.addr_abs(bus, Self::do_bit),
            0x2D => self.addr_abs(bus, Self::do_and),
            0x2E => self.addr_abs_rmw(bus, Self::do_rol),

            0x30 => self.op_branch(bus, self.regs.p.is_set(N)),
            0x31 => self.addr_izy(bus, Self::do_and),
            0x32 => self.addr_zpi(bus, Self::do_and),
            0x34 => self.addr_zpx(bus, Self::do_bit),
            0x35 => self.addr_zpx(bus, Self::do_and),
            0x36 => self.addr_zpx_rmw(bus, Self::do_rol),
            0x38 => self.op_flag(bus, C, true),
            0x39 => self.addr_aby(bus, Self::do_and),
            0x3A => self.op_dec_a(bus),
            0x3C => self.addr_abx(bus, Self::do_bit),
            0x3D => self.addr_abx(bus, Self::do_and),
            0x3E => self.addr_abx_rmw(bus, Self::do_rol),

            0x40 => self.op_rti(bus),
            0x41 => self.addr_izx(bus, Self::do_eor),
            0x45 => self.addr_zp(bus, Self::do_eor),
            0x46 => self.addr_zp_rmw(bus, Self::do_lsr),
            0x48 => self.op_pha(bus),
            0x49 => self.addr_imm(bus, Self::do_eor),
            0x4A => self.op_lsr_a(bus),
            0x4C => self.op_jmp_abs(bus),
            0x4D => self.addr_abs(bus, Self::do_eor),
            0x4E => self.addr_abs_rmw(bus, Self::do_lsr),

            0x50 => self.op_branch(bus, !self.regs.p.is_set(V)),
            0x51 => self.addr_izy(bus, Self::do_eor),
            0x52 => self.addr_zpi(bus, Self::do_eor),
            0x55 => self.addr_zpx(bus, Self::do_eor),
            0x56 => self.addr_zpx_rmw(bus, Self::do_lsr),
            0x58 => self.op_flag(bus, I, false),
            0x59 => self.addr_aby(bus, Self::do_eor),
            0x5A => self.op_phy(bus),
            0x5D => self.addr_abx(bus, Self::do_eor),
            0x5E => self.addr_abx_rmw(bus, Self::do_lsr),

            0x60 => self.op_rts(bus),
            0x61 => self.addr_izx(bus, Self::do_adc),
            0x64 => self.addr_zp_w(bus, Self::val_zero),
            0x65 => self.addr_zp(bus, Self::do_adc),
            0x66 => self.addr_zp_rmw(bus, Self::do_ror),
            0x68 => self.op_pla(bus),
            0x69 => self.addr_imm(bus, Self::do_adc),
            0x6A => self.op_ror_a(bus),
            0x6C => self.op_jmp_ind(bus),
            0x6D => self.addr_abs(bus, Self::do_adc),
            0x6E => self.addr_abs_rmw(bus, Self::do_ror),

            0x70 => self.op_branch(bus, self.regs.p.is_set(V)),
            0x71 => self.addr_izy(bus, Self::do_adc),
            0x72 => self.addr_zpi(bus, Self::do_adc),
            0x74 => self.addr_zpx_w(bus, Self::val_zero),
            0x75 => self.addr_zpx(bus, Self::do_adc),
            0x76 => self.addr_zpx_rmw(bus, Self::do_ror),
            0x78 => self.op_flag(bus, I, true),
            0x79 => self.addr_aby(bus, Self::do_adc),
            0x7A => self.op_ply(bus),
            0x7C => self.op_jmp_abx(bus),
            0x7D => self.addr_abx(bus, Self::do_adc),
            0x7E => self.addr_abx_rmw(bus, Self::do_ror),

            0x80 => self.op_branch(bus, true),
            0x81 => self.addr_izx_w(bus, Self::val_a),
            0x84 => self.addr_zp_w(bus, Self::val_y),
            0x85 => self.addr_zp_w(bus, Self::val_a),
            0x86 => self.addr_zp_w(bus, Self::val_x),
            0x88 => self.op_dey(bus),
            0x89 => self.addr_imm(bus, Self::do_bit_imm),
            0x8A => self.op_txa(bus),
            0x8C => self.addr_abs_w(bus, Self::val_y),
            0x8D => self.addr_abs_w(bus, Self::val_a),
            0x8E => self.addr_abs_w(bus, Self::val_x),

            0x90 => self.op_branch(bus, !self.regs.p.is_set(C)),
            0x91 => self.addr_izy_w(bus, Self::val_a),
            0x92 => self.addr_zpi_w(bus, Self::val_a),
            0x94 => self.addr_zpx_w(bus, Self::val_y),
            0x95 => self.addr_zpx_w(bus, Self::val_a),
            0x96 => self.addr_zpy_w(bus, Self::val_x),
            0x98 => self.op_tya(bus),
            0x99 => self.addr_aby_w(bus, Self::val_a),
            0x9A => self.op_txs(bus),
            0x9C => self.addr_abs_w(bus, Self::val_zero),
            0x9D => self.addr_abx_w(bus, Self::val_a),
            0x9E => self.addr_abx_w(bus, Self::val_zero),

            0xA0 => self.addr_imm(bus, Self::do_ldy),
            0xA1 => self.addr_izx(bus, Self::do_lda),
            0xA2 => self.addr_imm(bus, Self::do_ldx),
            0xA4 => self.addr_zp(bus, Self::do_ldy),
            0xA5 => self.addr_zp(bus, Self::do_lda),
            0xA6 => self.addr_zp(bus, Self::do_ldx),
            0xA8 => self.op_tay(bus),
            0xA9 => self.addr_imm(bus, Self::do_lda),
            0xAA => self.op_tax(bus),
            0xAC => self.addr_abs(bus, Self::do_ldy),
            0xAD => self.addr_abs(bus, Self::do_lda),
            0xAE => self.addr_abs(bus, Self::do_ldx),

            0xB0 => self.op_branch(bus, self.regs.p.is_set(C)),
            0xB1 => self.addr_izy(bus, Self::do_lda),
            0xB2 => self.addr_zpi(bus, Self::do_lda),
            0xB4 => self.addr_zpx(bus, Self::do_ldy),
            0xB5 => self.addr_zpx(bus, Self::do_lda),
            0xB6 => self.addr_zpy(bus, Self::do_ldx),
            0xB8 => self.op_flag(bus, V, false),
            0xB9 => self.addr_aby(bus, Self::do_lda),
            0xBA => self.op_tsx(bus),
            0xBC => self.addr_abx(bus, Self::do_ldy),
            0xBD => self.addr_abx(bus, Self::do_lda),
            0xBE => self.addr_aby(bus, Self::do_ldx),

            0xC0 => self.addr_imm(bus, Self::do_cpy),
            0xC1 => self.addr_izx(bus, Self::do_cmp),
            0xC4 => self.addr_zp(bus, Self::do_cpy),
            0xC5 => self.addr_zp(bus, Self::do_cmp),
            0xC6 => self.addr_zp_rmw(bus, Self::do_dec),
            0xC8 => self.op_iny(bus),
            0xC9 => self.addr_imm(bus, Self::do_cmp),
            0xCA => self.op_dex(bus),
            0xCC => self.addr_abs(bus, Self::do_cpy),
            0xCD => self.addr_abs(bus, Self::do_cmp),
            0xCE => self.addr_abs_rmw(bus, Self::do_dec),

            0xD0 => self.op_branch(bus, !self.regs.p.is_set(Z)),
            0xD1 => self.addr_izy(bus, Self::do_cmp),
            0xD2 => self.addr_zpi(bus, Self::do_cmp),
            0xD5 => self.addr_zpx(bus, Self::do_cmp),
            0xD6 => self.addr_zpx_rmw(bus, Self::do_dec),
            0xD8 => self.op_flag(bus, crate::flags::D, false),
            0xD9 => self.addr_aby(bus, Self::do_cmp),
            0xDA => self.op_phx(bus),
            0xDD => self.addr_abx(bus, Self::do_cmp),
            0xDE => self.addr_abx_rmw(bus, Self::do_dec),

            0xE0 => self.addr_imm(bus, Self::do_cpx),
            0xE1 => self.addr_izx(bus, Self::do_sbc),
            0xE4 => self.addr_zp(bus, Self::do_cpx),
            0xE5 => self.addr_zp(bus, Self::do_sbc),
            0xE6 => self.addr_zp_rmw(bus, Self::do_inc),
            0xE8 => self.op_inx(bus),
            0xE9 => self.addr_imm(bus, Self::do_sbc),
            0xEA => self.op_nop(bus),
            0xEC => self.addr_abs(bus, Self::do_cpx),
            0xED => self.addr_abs(bus, Self::do_sbc),
            0xEE => self.addr_abs_rmw(bus, Self::do_inc),

            0xF0 => self.op_branch(bus, self.regs.p.is_set(Z)),
            0xF1 => self.addr_izy(bus, Self::do_sbc),
            0xF2 => self.addr_zpi(bus, Self::do_sbc),
            0xF5 => self.addr_zpx(bus, Self::do_sbc),
            0xF6 => self.addr_zpx_rmw(bus, Self::do_inc),
            0xF8 => self.op_flag(bus, crate::flags::D, true),
            0xF9 => self.addr_aby(bus, Self::do_sbc),
            0xFA => self.op_plx(bus),
            0xFD => self.addr_abx(bus, Self::do_sbc),
            0xFE => self.addr_abx_rmw(bus, Self::do_inc),

            _ => self.op_reserved_nop(bus),
        }
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

impl Cpu for W65C02 {
    type Registers = Registers;

    fn tick<B: Bus>(&mut self, bus: &mut B) {
        self.execute_cycle(bus);
    }

    fn pc(&self) -> u32 {
        u32::from(self.regs.pc)
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.state == State::Halted
    }

    fn interrupt(&mut self) -> bool {
        if self.regs.p.is_set(I) {
            false
        } else {
            self.irq_pending = true;
            true
        }
    }

    fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    fn reset(&mut self) {
        self.regs.a = 0;
        self.regs.x = 0;
        self.regs.y = 0;
        self.regs.p = Status::from_byte(0);
        self.nmi_pending = false;
        self.irq_pending = false;
        self.hw_interrupt_entry = false;
        self.state = State::Reset;
        self.cycle = 0;
        self.addr = 0;
        self.data = 0;
        self.pointer = 0;
    }
}

impl Observable for W65C02 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "p" | "status" => Some(self.regs.p.0.into()),
            "flags.c" | "c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" | "z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" | "i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" | "d" => Some(self.regs.p.is_set(crate::flags::D).into()),
            "flags.v" | "v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" | "n" => Some(self.regs.p.is_set(N).into()),
            "cycle" => Some(Value::U64(self.total_cycles)),
            "halted" => Some(self.is_halted().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "s", "p", "flags.c", "flags.z", "flags.i", "flags.d", "flags.v",
            "flags.n", "cycle", "halted",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odin_core::SimpleBus;

    #[test]
    fn lda_immediate() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0xA9, 0x42]);
        cpu.regs.pc = 0x0000;

        cpu.tick(&mut bus);
        cpu.tick(&mut bus);

        assert_eq!(cpu.regs.a, 0x42);
        assert_eq!(cpu.regs.pc, 0x0002);
    }

    #[test]
    fn sta_zeropage() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        cpu.regs.a = 0x55;
        bus.load(0x0000, &[0x85, 0x10]);
        cpu.regs.pc = 0x0000;

        for _ in 0..3 {
            cpu.tick(&mut bus);
        }

        assert_eq!(bus.peek(0x0010), 0x55);
    }

    #[test]
    fn jmp_absolute() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0x4C, 0x34, 0x12]);
        cpu.regs.pc = 0x0000;

        for _ in 0..3 {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.pc, 0x1234);
    }

    #[test]
    fn brk_stack_layout() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        cpu.regs.s = 0xFF;
        cpu.regs.p = Status::from_byte(0x00);
        bus.load(0x0200, &[0x00, 0xEA]);
        bus.poke(0xFFFE, 0x34);
        bus.poke(0xFFFF, 0x12);
        cpu.regs.pc = 0x0200;

        for _ in 0..7 {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.pc, 0x1234);
        assert_eq!(cpu.regs.s, 0xFC);
        assert_eq!(bus.peek(0x01FF), 0x02);
        assert_eq!(bus.peek(0x01FE), 0x02);
        assert_eq!(bus.peek(0x01FD), 0x30);
    }

    #[test]
    fn reset_sequence_loads_vector() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        bus.poke(0xFFFC, 0x00);
        bus.poke(0xFFFD, 0xE0);

        cpu.reset();
        while !cpu.is_instruction_complete() {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.pc, 0xE000);
    }

    #[test]
    fn halt_opcode_stops_the_cpu() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        // LDX #$05; DEX; HALT
        bus.load(0xE000, &[0xA2, 0x05, 0xCA, 0x02]);
        cpu.regs.pc = 0xE000;

        while !cpu.is_halted() {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.x, 0x04);
        assert!(!cpu.regs.p.is_set(Z));
        assert!(!cpu.regs.p.is_set(N));
        assert_eq!(cpu.regs.pc, 0xE004);
    }

    #[test]
    fn adc_signed_overflow_scenario() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        bus.load(0xE000, &[0xA9, 0x7F, 0x69, 0x01, 0x02]);
        cpu.regs.pc = 0xE000;
        cpu.regs.p.clear(C);

        while !cpu.is_halted() {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.a, 0x80);
        assert!(cpu.regs.p.is_set(N));
        assert!(!cpu.regs.p.is_set(Z));
        assert!(cpu.regs.p.is_set(V));
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn adc_carry_and_zero_scenario() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        bus.load(0xE000, &[0xA9, 0xFF, 0x69, 0x01, 0x02]);
        cpu.regs.pc = 0xE000;
        cpu.regs.p.clear(C);

        while !cpu.is_halted() {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.a, 0x00);
        assert!(cpu.regs.p.is_set(Z));
        assert!(!cpu.regs.p.is_set(N));
        assert!(!cpu.regs.p.is_set(V));
        assert!(cpu.regs.p.is_set(C));
    }

    #[test]
    fn stack_roundtrip_via_txs_pha_pla() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        // LDX #$FF; TXS; LDA #$AA; PHA; PLA; HALT
        bus.load(0xE000, &[0xA2, 0xFF, 0x9A, 0xA9, 0xAA, 0x48, 0x68, 0x02]);
        cpu.regs.pc = 0xE000;

        while !cpu.is_halted() {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.s, 0xFF);
        assert_eq!(cpu.regs.a, 0xAA);
        assert!(!cpu.regs.p.is_set(Z));
        assert!(cpu.regs.p.is_set(N));
        assert_eq!(bus.peek(0x01FF), 0xAA);
    }

    #[test]
    fn jsr_rts_round_trip_preserves_stack_and_registers() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        // JSR $E006; HALT; NOP NOP; LDA #$42; RTS
        bus.load(0xE000, &[0x20, 0x06, 0xE0, 0x02, 0xEA, 0xEA, 0xA9, 0x42, 0x60]);
        cpu.regs.pc = 0xE000;
        cpu.regs.s = 0xFD;

        while !cpu.is_halted() {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.a, 0x42);
        assert_eq!(cpu.regs.s, 0xFD);
        assert_eq!(cpu.regs.pc, 0xE004);
    }

    #[test]
    fn rmw_performs_dummy_read_not_dummy_write() {
        struct LoggingBus {
            mem: [u8; 0x10000],
            accesses: Vec<(u16, bool)>,
        }

        impl Bus for LoggingBus {
            fn read(&mut self, address: u32) -> ReadResult {
                let addr = (address & 0xFFFF) as u16;
                self.accesses.push((addr, false));
                ReadResult::new(self.mem[addr as usize])
            }

            fn write(&mut self, address: u32, value: u8) -> u8 {
                let addr = (address & 0xFFFF) as u16;
                self.accesses.push((addr, true));
                self.mem[addr as usize] = value;
                0
            }
        }

        let mut cpu = W65C02::new();
        let mut bus = LoggingBus { mem: [0; 0x10000], accesses: Vec::new() };
        bus.mem[0x0000] = 0xE6; // INC zp
        bus.mem[0x0001] = 0x10;
        bus.mem[0x0010] = 0x7F;
        cpu.regs.pc = 0x0000;

        for _ in 0..5 {
            cpu.tick(&mut bus);
        }

        assert_eq!(bus.mem[0x0010], 0x80);
        let target_accesses: Vec<bool> =
            bus.accesses.iter().filter(|(addr, _)| *addr == 0x0010).map(|(_, is_write)| *is_write).collect();
        assert_eq!(target_accesses, vec![false, false, true]);
    }

    #[test]
    fn page_cross_timing_on_indexed_load() {
        struct CountingBus {
            mem: [u8; 0x10000],
            reads: u32,
        }

        impl Bus for CountingBus {
            fn read(&mut self, address: u32) -> ReadResult {
                self.reads += 1;
                ReadResult::new(self.mem[(address & 0xFFFF) as usize])
            }

            fn write(&mut self, address: u32, value: u8) -> u8 {
                self.mem[(address & 0xFFFF) as usize] = value;
                0
            }
        }

        let mut bus = CountingBus { mem: [0; 0x10000], reads: 0 };
        bus.mem[0x0000] = 0xBD; // LDA $00FF,X
        bus.mem[0x0001] = 0xFF;
        bus.mem[0x0002] = 0x00;
        let mut cpu = W65C02::new();
        cpu.regs.pc = 0x0000;
        cpu.regs.x = 1;
        while !cpu.is_instruction_complete() {
            cpu.tick(&mut bus);
        }
        assert_eq!(bus.reads, 5); // opcode + lo + hi + page-cross dummy + real

        let mut bus2 = CountingBus { mem: [0; 0x10000], reads: 0 };
        bus2.mem[0x0000] = 0xBD; // LDA $0000,X
        bus2.mem[0x0001] = 0x00;
        bus2.mem[0x0002] = 0x00;
        let mut cpu2 = W65C02::new();
        cpu2.regs.pc = 0x0000;
        cpu2.regs.x = 1;
        while !cpu2.is_instruction_complete() {
            cpu2.tick(&mut bus2);
        }
        assert_eq!(bus2.reads, 4); // opcode + lo + hi + real, no page cross
    }

    #[test]
    fn stz_writes_zero_regardless_of_accumulator() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        cpu.regs.a = 0xFF;
        bus.load(0x0000, &[0x64, 0x20]); // STZ $20
        bus.poke(0x0020, 0xAB);
        cpu.regs.pc = 0x0000;

        for _ in 0..3 {
            cpu.tick(&mut bus);
        }

        assert_eq!(bus.peek(0x0020), 0x00);
    }

    #[test]
    fn bra_always_branches() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0x80, 0x02, 0xEA, 0xEA]); // BRA +2
        cpu.regs.pc = 0x0000;

        for _ in 0..3 {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.pc, 0x0004);
    }

    #[test]
    fn phx_plx_roundtrip() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        cpu.regs.x = 0x37;
        cpu.regs.s = 0xFF;
        bus.load(0x0000, &[0xDA, 0xA2, 0x00, 0xFA]); // PHX; LDX #0; PLX
        cpu.regs.pc = 0x0000;

        for _ in 0..(3 + 2 + 4) {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.x, 0x37);
        assert_eq!(cpu.regs.s, 0xFF);
    }

    #[test]
    fn zero_page_indirect_mode_without_index() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0xB2, 0x10]); // LDA ($10)
        bus.poke(0x0010, 0x00);
        bus.poke(0x0011, 0xE0);
        bus.poke(0xE000, 0x99);
        cpu.regs.pc = 0x0000;

        for _ in 0..5 {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.a, 0x99);
    }

    #[test]
    fn irq_pushes_status_with_break_bit_clear() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        cpu.regs.s = 0xFF;
        cpu.regs.p = Status::from_byte(0x00);
        bus.load(0x0200, &[0xEA, 0xEA]);
        bus.poke(0xFFFE, 0x00);
        bus.poke(0xFFFF, 0x03);
        cpu.regs.pc = 0x0200;

        // Run the leading NOP, then request an IRQ for the next fetch.
        for _ in 0..2 {
            cpu.tick(&mut bus);
        }
        assert!(cpu.interrupt());
        for _ in 0..7 {
            cpu.tick(&mut bus);
        }

        assert_eq!(cpu.regs.pc, 0x0300);
        let pushed_status = bus.peek(0x01FD);
        assert_eq!(pushed_status & crate::flags::B, 0, "hardware IRQ must push B=0");
        assert_ne!(pushed_status & crate::flags::U, 0, "bit 5 is always observed as 1");
        assert!(cpu.regs.p.is_set(I), "IRQ entry sets the interrupt-disable flag");
    }

    #[test]
    fn brk_instruction_pushes_status_with_break_bit_set() {
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        cpu.regs.s = 0xFF;
        cpu.regs.p = Status::from_byte(0x00);
        bus.load(0x0200, &[0x00, 0xEA]);
        bus.poke(0xFFFE, 0x00);
        bus.poke(0xFFFF, 0x03);
        cpu.regs.pc = 0x0200;

        for _ in 0..7 {
            cpu.tick(&mut bus);
        }

        let pushed_status = bus.peek(0x01FD);
        assert_ne!(pushed_status & crate::flags::B, 0, "BRK must push B=1");
    }

    #[test]
    fn reserved_opcodes_consume_their_documented_cycle_count() {
        // $03 is a 1-byte/1-cycle reserved opcode: only the fetch counts.
        let mut cpu = W65C02::new();
        let mut bus = SimpleBus::new();
        bus.load(0x0000, &[0x03, 0xEA]);
        cpu.regs.pc = 0x0000;
        cpu.tick(&mut bus);
        assert!(cpu.is_instruction_complete());
        assert_eq!(cpu.regs.pc, 0x0001);
    }
}
