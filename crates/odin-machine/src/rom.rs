//! ROM file loading.
//!
//! ROM images are raw binary, exactly `ROM_BANK_SIZE` bytes logically.
//! Short files are zero-padded; oversized files are truncated. Neither
//! case is an error — only an unreadable file is.

use std::fs;
use std::path::Path;

/// Size of a single ROM bank in bytes.
pub const ROM_BANK_SIZE: usize = 0x2000;

/// Reads a ROM file from `path`, zero-padding short files and truncating
/// oversized ones to exactly [`ROM_BANK_SIZE`] bytes.
///
/// # Errors
///
/// Returns the underlying `io::Error` (rendered to a `String` for the
/// caller, which reports it to stderr and exits) if the file cannot be
/// read at all.
pub fn load_rom_bank(path: &Path) -> Result<Box<[u8; ROM_BANK_SIZE]>, String> {
    let data = fs::read(path).map_err(|e| format!("cannot read ROM file {}: {e}", path.display()))?;

    let mut bank = Box::new([0u8; ROM_BANK_SIZE]);
    let n = data.len().min(ROM_BANK_SIZE);
    bank[..n].copy_from_slice(&data[..n]);
    Ok(bank)
}
