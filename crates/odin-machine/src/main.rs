//! PoppyEMU: a cycle-accurate Odin32K emulator.
//!
//! Usage: `poppyemu ROM0 [ROM1] [options]`
//!
//! `ROM0` (mapped $E000-$FFFF) must contain the reset/IRQ/NMI vectors.
//! `ROM1` (mapped $C000-$DFFF) is optional.

use std::path::PathBuf;
use std::process;

use odin_machine::{load_rom_bank, Config, Machine, RamInit, Verbosity, ROM_BANK_SIZE};

struct Args {
    rom0: PathBuf,
    rom1: Option<PathBuf>,
    config: Config,
}

fn usage() -> ! {
    eprintln!("Usage: poppyemu ROM0 [ROM1] [options]");
    eprintln!();
    eprintln!("  ROM0                 8192-byte image mapped at $E000-$FFFF (required)");
    eprintln!("  ROM1                 8192-byte image mapped at $C000-$DFFF (optional)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --verbose N          Trace verbosity 0-3 [default: 0]");
    eprintln!("  --ram-init zero|random   SysRAM initialization [default: zero]");
    eprintln!("  --clock-hz N         Target clock frequency in Hz [default: 4000000]");
    eprintln!("  --no-pacing          Run free instead of pacing to clock-hz");
    eprintln!("  --step               Pause for input at every instruction boundary");
    eprintln!("  --wait-at-begin      Pause for input after the reset-vector fetch");
    process::exit(1);
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut positional = Vec::new();
    let mut config = Config::default();

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--verbose" => {
                i += 1;
                let level: u8 = argv.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(usage);
                config.verbose = Verbosity::from_level(level);
            }
            "--ram-init" => {
                i += 1;
                config.ram_init = match argv.get(i).map(String::as_str) {
                    Some("zero") => RamInit::Zero,
                    Some("random") => RamInit::Random,
                    _ => usage(),
                };
            }
            "--clock-hz" => {
                i += 1;
                config.clock_hz = argv.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(usage);
            }
            "--no-pacing" => config.pacing_enabled = false,
            "--step" => config.step_mode = true,
            "--wait-at-begin" => config.wait_at_begin = true,
            "-h" | "--help" => {
                usage();
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown option: {other}");
                usage();
            }
            other => positional.push(PathBuf::from(other)),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let Some(rom0) = positional.next() else {
        usage();
    };
    let rom1 = positional.next();
    if positional.next().is_some() {
        usage();
    }

    Args { rom0, rom1, config }
}

fn main() {
    let args = parse_args();

    let rom0 = load_rom_bank(&args.rom0).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    let rom1 = match &args.rom1 {
        Some(path) => load_rom_bank(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => Box::new([0u8; ROM_BANK_SIZE]),
    };

    let mut machine = Machine::new(rom0, rom1, args.config);
    machine.run();

    process::exit(0);
}
