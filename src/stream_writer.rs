//! Codestream writer: magic, frame parameters and table segments.

use crate::StreamHeader;
use crate::codec::huffman::HuffmanTable;
use crate::codec::traversal::TraversalTable;
use crate::constants::MAXIMUM_PLANE_COUNT;
use crate::error::CodecError;

/// Accumulates the header fields and payload of one codestream.
#[derive(Default)]
pub struct StreamWriter {
    destination: Vec<u8>,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destination.is_empty()
    }

    pub fn write_byte(&mut self, value: u8) {
        self.destination.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.destination.extend_from_slice(bytes);
    }

    pub fn write_header(&mut self, header: &StreamHeader) -> Result<(), CodecError> {
        if header.plane_count == 0 || header.plane_count > MAXIMUM_PLANE_COUNT {
            return Err(CodecError::InvalidPlaneCount(header.plane_count));
        }

        self.write_bytes(header.dimensionality.magic());
        for &extent in &header.dims {
            self.write_u64(extent as u64);
        }

        self.write_byte(header.bits_per_sample);
        self.write_byte(header.plane_count as u8);
        self.write_byte(header.quality);
        self.write_byte(header.color_model as u8);
        self.write_byte(header.entropy as u8);
        self.write_byte(header.precondition.to_byte());

        for table in &header.quant_tables {
            self.write_bytes(table.entries());
        }
        self.write_traversal(&header.traversal);

        if let Some(tables) = &header.huffman_tables {
            for table in tables.in_stream_order() {
                self.write_huffman_table(table);
            }
        }
        Ok(())
    }

    /// Flag byte; a custom order follows as one `u16` per scan position.
    pub fn write_traversal(&mut self, traversal: &TraversalTable) {
        if traversal.is_default() {
            self.write_byte(0);
        } else {
            self.write_byte(1);
            for &index in traversal.order() {
                self.write_u16(index as u16);
            }
        }
    }

    /// Per-length code counts followed by the symbols in canonical order.
    pub fn write_huffman_table(&mut self, table: &HuffmanTable) {
        for &count in table.lengths() {
            self.write_u16(count);
        }
        for &symbol in table.values() {
            self.write_u16(symbol);
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.destination
    }
}
