use byteorder::{ByteOrder, LittleEndian};

use super::{field, Command, Error, Result};
use crate::config::PACKET_SIZE;

/// A read/write wrapper around a fixed-size chain protocol packet buffer.
///
/// Mirrors a zero-copy `wire::arp::Packet<T>`-style wrapper: field access
/// goes straight through the underlying buffer with no intermediate copy,
/// and [`new_checked`](Packet::new_checked) is the only constructor that
/// should be used on bytes that came off a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with packet structure, without checking
    /// its length.
    pub const fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for [`new_unchecked`](Packet::new_unchecked) followed by
    /// [`check_len`](Packet::check_len).
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure the buffer is exactly [`PACKET_SIZE`] bytes long, so that no
    /// accessor below will ever panic.
    pub fn check_len(&self) -> Result<()> {
        if self.buffer.as_ref().len() == PACKET_SIZE {
            Ok(())
        } else {
            Err(Error)
        }
    }

    /// Consume the packet, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn command(&self) -> Command {
        Command::from(self.buffer.as_ref()[field::COMMAND])
    }

    pub fn pic(&self) -> u8 {
        self.buffer.as_ref()[field::PIC]
    }

    pub fn options(&self) -> u32 {
        LittleEndian::read_u32(&self.buffer.as_ref()[field::OPTIONS])
    }

    pub fn uid(&self) -> &[u8] {
        &self.buffer.as_ref()[field::UID]
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer.as_ref()[field::DATA]
    }

    pub fn checksum(&self) -> u16 {
        LittleEndian::read_u16(&self.buffer.as_ref()[field::CHECKSUM])
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_command(&mut self, command: Command) {
        self.buffer.as_mut()[field::COMMAND] = u8::from(command);
    }

    pub fn set_pic(&mut self, pic: u8) {
        self.buffer.as_mut()[field::PIC] = pic;
    }

    pub fn set_options(&mut self, options: u32) {
        LittleEndian::write_u32(&mut self.buffer.as_mut()[field::OPTIONS], options);
    }

    pub fn set_uid(&mut self, uid: &[u8]) {
        let field = &mut self.buffer.as_mut()[field::UID];
        let len = field.len().min(uid.len());
        field[..len].copy_from_slice(&uid[..len]);
        field[len..].fill(0);
    }

    pub fn set_data(&mut self, data: &[u8]) {
        let field = &mut self.buffer.as_mut()[field::DATA];
        let len = field.len().min(data.len());
        field[..len].copy_from_slice(&data[..len]);
        field[len..].fill(0);
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[field::DATA]
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        LittleEndian::write_u16(&mut self.buffer.as_mut()[field::CHECKSUM], checksum);
    }
}
