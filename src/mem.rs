//! Memory surface: one contiguous RAM region, block-indexed for the wire
//! protocol's READ/WRITE/LOAD/RETR commands, plus the two buffers the VM
//! and the protocol engine share — the source staging buffer (`SRC_BUF`)
//! and the VM's result buffer (`WRITE_BUF`).
//!
//! Bounds-checking block indices is this type's job (read/write never
//! panic on an out-of-range index — every offset wraps modulo the number
//! of blocks, the same "trust within bounds established by PING/ACK"
//! posture as the original, made panic-free). The VM's own
//! dictionary/stack bounds are a separate concern, owned by [`crate::vm`].

use byteorder::{ByteOrder, LittleEndian};

use crate::config::{
    DATA_SIZE, RAM_SIZE, SRC_BUF_BLOCKS, SRC_BUF_OFFSET, WRITE_BUF_BYTES, WRITE_BUF_CELLS,
};

/// A contiguous, block-addressed RAM region with a dedicated VM result
/// buffer. No dynamic allocation: both the RAM region and the result
/// buffer are fixed-size arrays.
pub struct MemorySurface {
    ram: [u8; RAM_SIZE],
    write_buf: [u8; WRITE_BUF_BYTES],
    write_pos: usize,
}

impl Default for MemorySurface {
    fn default() -> Self {
        MemorySurface {
            ram: [0; RAM_SIZE],
            write_buf: [0; WRITE_BUF_BYTES],
            write_pos: 0,
        }
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn block_count(&self) -> usize {
        RAM_SIZE / DATA_SIZE
    }

    /// Read the `DATA_SIZE`-byte block at `offset` (wrapping modulo the
    /// number of blocks) into `dst`.
    pub fn read_block(&self, offset: u32, dst: &mut [u8; DATA_SIZE]) {
        let start = (offset as usize % self.block_count()) * DATA_SIZE;
        dst.copy_from_slice(&self.ram[start..start + DATA_SIZE]);
    }

    /// Write `src` into the `DATA_SIZE`-byte block at `offset` (wrapping
    /// modulo the number of blocks).
    pub fn write_block(&mut self, offset: u32, src: &[u8; DATA_SIZE]) {
        let start = (offset as usize % self.block_count()) * DATA_SIZE;
        self.ram[start..start + DATA_SIZE].copy_from_slice(src);
    }

    /// Read a single byte at raw offset `off` into the RAM region
    /// (`@D`, wrapping modulo [`RAM_SIZE`]).
    pub fn dev_read(&self, off: i32) -> u8 {
        self.ram[off.rem_euclid(RAM_SIZE as i32) as usize]
    }

    /// Write a single byte at raw offset `off` into the RAM region
    /// (`!D`, wrapping modulo [`RAM_SIZE`]).
    pub fn dev_write(&mut self, off: i32, value: u8) {
        self.ram[off.rem_euclid(RAM_SIZE as i32) as usize] = value;
    }

    /// Copy `data` into the `DATA_SIZE`-byte block at `offset` within the
    /// VM source staging buffer (LOAD).
    pub fn load_src_block(&mut self, offset: u32, data: &[u8; DATA_SIZE]) {
        let block = offset as usize % SRC_BUF_BLOCKS;
        let start = (SRC_BUF_OFFSET + block) * DATA_SIZE;
        self.ram[start..start + DATA_SIZE].copy_from_slice(data);
    }

    /// The source staging buffer, as the NUL-terminated byte string the
    /// VM evaluates on EXEC.
    pub fn src_buf(&self) -> &[u8] {
        let start = SRC_BUF_OFFSET * DATA_SIZE;
        &self.ram[start..start + SRC_BUF_BLOCKS * DATA_SIZE]
    }

    /// Reset the VM result buffer's write cursor to the start (EXEC with
    /// `options == 1`).
    pub fn reset_write_pos(&mut self) {
        self.write_pos = 0;
    }

    /// Append one little-endian cell to the VM result buffer at the
    /// current write position (`.`/EMIT), then advance, wrapping at
    /// [`WRITE_BUF_CELLS`].
    pub fn emit_cell(&mut self, value: i32) {
        let start = self.write_pos * 4;
        LittleEndian::write_i32(&mut self.write_buf[start..start + 4], value);
        self.write_pos = (self.write_pos + 1) % WRITE_BUF_CELLS;
    }

    /// Read the `DATA_SIZE`-byte window at `offset` out of the flat
    /// result buffer (RETR), wrapping modulo the buffer's total length.
    pub fn retr_block(&self, offset: u32, dst: &mut [u8; DATA_SIZE]) {
        let start = (offset as usize * DATA_SIZE) % WRITE_BUF_BYTES;
        for (i, slot) in dst.iter_mut().enumerate() {
            *slot = self.write_buf[(start + i) % WRITE_BUF_BYTES];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut mem = MemorySurface::new();
        let block = [7u8; DATA_SIZE];
        mem.write_block(7, &block);
        let mut out = [0u8; DATA_SIZE];
        mem.read_block(7, &mut out);
        assert_eq!(out, block);
    }

    #[test]
    fn load_then_src_buf_is_visible() {
        let mut mem = MemorySurface::new();
        let mut block = [0u8; DATA_SIZE];
        block[..5].copy_from_slice(b"41 1+");
        mem.load_src_block(0, &block);
        assert_eq!(&mem.src_buf()[..5], b"41 1+");
    }

    #[test]
    fn emit_then_retr_first_cell() {
        let mut mem = MemorySurface::new();
        mem.reset_write_pos();
        mem.emit_cell(42);
        let mut out = [0u8; DATA_SIZE];
        mem.retr_block(0, &mut out);
        assert_eq!(LittleEndian::read_i32(&out[0..4]), 42);
    }

    #[test]
    fn emit_wraps_at_write_buf_cells() {
        let mut mem = MemorySurface::new();
        mem.reset_write_pos();
        for i in 0..(WRITE_BUF_CELLS as i32 + 1) {
            mem.emit_cell(i);
        }
        let mut out = [0u8; DATA_SIZE];
        mem.retr_block(0, &mut out);
        // wrapped around: cell 0 got overwritten by the (CELLS)-th emit.
        assert_eq!(LittleEndian::read_i32(&out[0..4]), WRITE_BUF_CELLS as i32);
    }
}
