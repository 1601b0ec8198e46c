/*! Low-level packet access and construction.
 *
 * The `wire` module deals with the packet *representation*, following the
 * same split a zero-copy networking stack uses for its own frame types: a
 * [`Packet`] wrapper that lets accessor/setter methods work directly on a
 * byte buffer (no copying, no allocation), and a [`PacketRepr`] structured
 * form that is easier to build and pattern-match against in the protocol
 * engine.
 *
 * The `Packet` family guarantees that, once [`Packet::check_len`] has
 * returned `Ok(())`, no accessor will panic. [`Packet::new_checked`] is
 * the shorthand combination used whenever the buffer comes from an
 * untrusted source (i.e. every packet read off a link).
 */

mod packet;
mod repr;

pub use self::packet::Packet;
pub use self::repr::PacketRepr;

use core::fmt;

use crate::config::PACKET_SIZE;
use crate::macros::enum_with_unknown;

pub(crate) mod field {
    pub type Field = ::core::ops::Range<usize>;

    pub const COMMAND: usize = 0;
    pub const PIC: usize = 1;
    pub const OPTIONS: Field = 2..6;
    pub const UID: Field = 6..31;
    pub const DATA: Field = 31..31 + crate::config::DATA_SIZE;
    pub const CHECKSUM: Field = DATA.end..DATA.end + 2;
}

const _: () = assert!(field::CHECKSUM.end == PACKET_SIZE);

/// Parsing or building a packet failed because the buffer was the wrong
/// size. The protocol engine distinguishes this from a checksum mismatch:
/// a short buffer can never have arrived over a real link (links only ever
/// hand over exactly [`PACKET_SIZE`] bytes), so this is a programming
/// error rather than something the chain protocol needs to recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wire::Error: truncated packet buffer")
    }
}

pub type Result<T> = core::result::Result<T, Error>;

enum_with_unknown! {
    /// The packet's command tag (offset 0 on the wire).
    pub enum Command(u8) {
        Ping = 0,
        Read = 1,
        Write = 2,
        Sensors = 3,
        Load = 4,
        Exec = 5,
        Retr = 6,
        Ack = 7,
        Err = 8,
    }
}

enum_with_unknown! {
    /// Sub-selector carried in `options` for PING and SENSORS requests.
    pub enum Selector(u32) {
        Own = 0,
        All = 1,
        Temp = 2,
        Vdd = 3,
    }
}
