//! MSB-first bit reader and writer used by both entropy backends.

use crate::error::CodecError;

/// Reads bits most-significant first from a byte slice.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit_buffer: u8,
    bits_left: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit_buffer: 0,
            bits_left: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, CodecError> {
        if self.bits_left == 0 {
            if self.pos >= self.data.len() {
                return Err(CodecError::TruncatedPayload);
            }
            self.bit_buffer = self.data[self.pos];
            self.pos += 1;
            self.bits_left = 8;
        }

        let bit = (self.bit_buffer >> (self.bits_left - 1)) & 1;
        self.bits_left -= 1;
        Ok(bit == 1)
    }

    /// Reads `count` bits (at most 32) as an unsigned value.
    pub fn read_bits(&mut self, count: u8) -> Result<u32, CodecError> {
        debug_assert!(count <= 32);
        let mut bits = 0u32;
        for _ in 0..count {
            bits = (bits << 1) | self.read_bit()? as u32;
        }
        Ok(bits)
    }

    pub fn has_data(&self) -> bool {
        self.pos < self.data.len() || self.bits_left > 0
    }

    /// Number of bytes pulled from the source so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Packs bits most-significant first into a growable byte buffer.
#[derive(Default)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_buffer: u8,
    bits_count: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.bit_buffer = (self.bit_buffer << 1) | bit as u8;
        self.bits_count += 1;
        if self.bits_count == 8 {
            self.data.push(self.bit_buffer);
            self.bit_buffer = 0;
            self.bits_count = 0;
        }
    }

    /// Writes the low `count` bits of `value` (at most 32).
    pub fn write_bits(&mut self, value: u32, count: u8) {
        debug_assert!(count <= 32);
        for i in (0..count).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Emits the pending partial byte, zero-padded on the low end, and returns the buffer.
    pub fn finish(mut self) -> Vec<u8> {
        if self.bits_count > 0 {
            self.bit_buffer <<= 8 - self.bits_count;
            self.data.push(self.bit_buffer);
        }
        self.data
    }
}
