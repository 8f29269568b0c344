//! The Odin32K system: memory map, ROM loading, reset/boot driver, and
//! trace emitter built on top of `odin-core` and `odin-cpu`.

mod bus;
mod config;
mod machine;
mod rom;
mod trace;

pub use bus::{OdinBus, IO_STUB_PLACEHOLDER, OPEN_BUS_PLACEHOLDER, SYSRAM_SIZE};
pub use config::{Config, RamInit, Verbosity};
pub use machine::Machine;
pub use rom::{load_rom_bank, ROM_BANK_SIZE};
