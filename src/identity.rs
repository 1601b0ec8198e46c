//! Device identity: a 24-hex-character UID derived from three 32-bit words
//! read from immutable, per-chip bytes.
//!
//! The real bytes live in a read-only flash region that only exists on the
//! actual silicon; everywhere else (host tests, simulation) a stub
//! implementation supplies a deterministic value, exactly as the original
//! firmware's `collect_bid` reads a fixed flash address that a test build
//! would have to fake out.

use core::fmt::Write as _;

use crate::config::UID_SIZE;

/// External collaborator providing the immutable per-chip bytes and the
/// linker-derived end-of-RAM pointer. Bring-up of the underlying hardware
/// (flash controller, linker script) is out of scope for this crate; only
/// the contract is specified here.
pub trait ChipInfo {
    /// The three 32-bit words read from the chip's immutable ID region,
    /// most significant word first.
    fn id_words(&self) -> [u32; 3];

    /// Start address of the contiguous RAM region this node manages.
    fn sram_base(&self) -> u32;

    /// End-of-RAM address, as extracted from the reset vector table
    /// (`vector_table[0]` in the original firmware).
    fn sram_end(&self) -> u32;

    /// Size of the managed RAM region, in bytes.
    fn sram_size(&self) -> u32 {
        self.sram_end() - self.sram_base()
    }
}

/// Format the three ID words into the wire UID buffer as
/// `%08X%08X%08X`, NUL-terminated, matching `collect_bid`/`snprintf`.
pub fn format_uid(words: [u32; 3]) -> [u8; UID_SIZE] {
    let mut out = [0u8; UID_SIZE];
    let mut s = heapless::String::<24>::new();
    for w in words {
        // infallible: 8 hex digits at a time into a 24-byte buffer.
        write!(s, "{:08X}", w).unwrap();
    }
    out[..s.len()].copy_from_slice(s.as_bytes());
    out
}

#[cfg(test)]
pub struct FixedChipInfo {
    pub words: [u32; 3],
    pub sram_base: u32,
    pub sram_end: u32,
}

#[cfg(test)]
impl ChipInfo for FixedChipInfo {
    fn id_words(&self) -> [u32; 3] {
        self.words
    }
    fn sram_base(&self) -> u32 {
        self.sram_base
    }
    fn sram_end(&self) -> u32 {
        self.sram_end
    }
}
