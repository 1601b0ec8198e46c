use super::{Command, Packet};
use crate::config::{DATA_SIZE, PACKET_SIZE, UID_SIZE};
use crate::crc;

/// A structured, owned representation of a chain protocol packet.
///
/// A `wire::arp::Repr`-style structured form applied to a single concrete
/// frame instead of a family of variants: building one, mutating its
/// fields, and re-emitting it is far more convenient in the protocol
/// engine than poking at a raw [`Packet`] buffer directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketRepr {
    pub command: Command,
    pub pic: u8,
    pub options: u32,
    pub uid: [u8; UID_SIZE],
    pub data: [u8; DATA_SIZE],
    pub checksum: u16,
}

impl PacketRepr {
    /// Parse a wire buffer into a structured packet. Performs no
    /// validation beyond the fixed length of `buf` itself — checksum
    /// verification is the protocol engine's job, not the codec's.
    pub fn parse(buf: &[u8; PACKET_SIZE]) -> PacketRepr {
        let packet = Packet::new_unchecked(buf.as_slice());

        let mut uid = [0u8; UID_SIZE];
        uid.copy_from_slice(packet.uid());

        let mut data = [0u8; DATA_SIZE];
        data.copy_from_slice(packet.data());

        PacketRepr {
            command: packet.command(),
            pic: packet.pic(),
            options: packet.options(),
            uid,
            data,
            checksum: packet.checksum(),
        }
    }

    /// Serialize into wire order: command(1), pic(1), options(4),
    /// uid(25), data(D), checksum(2). The checksum field is written as
    /// whatever `self.checksum` currently holds — call
    /// [`refresh_checksum`](PacketRepr::refresh_checksum) first if it
    /// needs to reflect the rest of the fields.
    pub fn emit(&self) -> [u8; PACKET_SIZE] {
        let mut buf = [0u8; PACKET_SIZE];
        let mut packet = Packet::new_unchecked(buf.as_mut_slice());
        packet.set_command(self.command);
        packet.set_pic(self.pic);
        packet.set_options(self.options);
        packet.set_uid(&self.uid);
        packet.set_data(&self.data);
        packet.set_checksum(self.checksum);
        buf
    }

    /// Recompute and store the checksum over the rest of the fields, as
    /// the original firmware's `make_crc` does: serialize with the
    /// checksum bytes zeroed, then CRC the whole image.
    pub fn refresh_checksum(&mut self) {
        self.checksum = 0;
        let buf = self.emit();
        self.checksum = crc::make_crc(&buf);
    }

    /// Whether `uid` matches `mine` byte-for-byte over [`UID_SIZE`] bytes.
    pub fn uid_matches(&self, mine: &[u8; UID_SIZE]) -> bool {
        &self.uid == mine
    }
}
