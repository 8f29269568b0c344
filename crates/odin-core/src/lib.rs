//! Core traits and types for cycle-accurate emulation.
//!
//! A `Cpu` drives a `Bus` one cycle at a time; the `Pacer` turns cycle
//! counts into real wall-clock delay, and `Observable` lets a caller
//! inspect either one without disturbing it.

mod bus;
mod cpu;
mod observable;
mod pacer;

pub use bus::{Bus, ReadResult, SimpleBus};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use pacer::{Pacer, PacerConfig};
