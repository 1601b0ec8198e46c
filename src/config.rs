//! Compile-time tunables.
//!
//! These mirror the `#define`s in the original firmware's `sramconf.h` and
//! `zforth.h`. There is no runtime configuration surface in this system —
//! every size here is baked into fixed-size buffers, exactly as in the
//! original.

/// Payload size of a single packet data block, in bytes.
///
/// Chosen so that the total wire packet (`31 + DATA_SIZE + 2`, see
/// [`crate::wire`]) comes out to a fixed 64-byte frame.
pub const DATA_SIZE: usize = 31;

/// Total wire size of one packet, in bytes.
pub const PACKET_SIZE: usize = 31 + DATA_SIZE + 2;

/// Number of raw bytes making up a UID field on the wire (24 hex digits + NUL).
pub const UID_SIZE: usize = 25;

/// Block offset (in `DATA_SIZE`-byte units) of the VM source staging buffer.
pub const SRC_BUF_OFFSET: usize = 56;

/// Number of `DATA_SIZE`-byte blocks reserved for the source staging buffer.
pub const SRC_BUF_BLOCKS: usize = 2;

/// Block offset (in `DATA_SIZE`-byte units) of the VM result buffer.
pub const WRITE_BUF_OFFSET: usize = 58;

/// Size of the managed RAM region, in bytes.
///
/// The original firmware reports SRAM size from the linker's end-of-RAM
/// pointer rather than a fixed constant; this is the size of the
/// in-process buffer this crate backs that region with.
pub const RAM_SIZE: usize = 4096;

/// Number of 32-bit cells in the VM result buffer (`WRITE_BUF`). The
/// buffer is a dedicated byte array indexed in whole cells by `.`/EMIT,
/// not a view into the block-addressed RAM region.
pub const WRITE_BUF_CELLS: usize = DATA_SIZE;

/// Byte length of the VM result buffer.
pub const WRITE_BUF_BYTES: usize = WRITE_BUF_CELLS * 4;

/// Forth dictionary size, in bytes.
pub const DICT_SIZE: usize = 1 << 12;

/// Data stack depth, in cells.
pub const DSTACK_SIZE: usize = 32;

/// Return stack depth, in cells.
pub const RSTACK_SIZE: usize = 32;

/// Maximum length of a lexed word (identifier or number), in bytes.
pub const WORD_BUF_SIZE: usize = 32;

/// Number of user variables aliased at the base of the dictionary.
pub const USERVAR_COUNT: usize = 5;
