//! Quantization tables for blocks of any dimension and the quantization of
//! transform coefficients.
//!
//! A D-dimensional table reuses the 2D base tables: the divisor at a position
//! is the base value at that position's first two coordinates, so axes beyond
//! the second never change the divisor.

use crate::block_model::block_len;
use crate::constants::{BLOCK_DIM_2D, MAXIMUM_QUALITY, MINIMUM_QUALITY};
use crate::error::CodecError;

/// Standard JPEG luminance quantization table (Quality 50).
pub const STD_LUMINANCE_QUANT_TABLE: [u8; BLOCK_DIM_2D] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard JPEG chrominance quantization table (Quality 50).
pub const STD_CHROMINANCE_QUANT_TABLE: [u8; BLOCK_DIM_2D] = [
    17, 18, 24, 47, 99, 99, 99, 99,
    18, 21, 26, 66, 99, 99, 99, 99,
    24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Which base table a plane is quantized (and entropy coded) with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableClass {
    Luma = 0,
    Chroma = 1,
}

impl TableClass {
    pub fn base_table(self) -> &'static [u8; BLOCK_DIM_2D] {
        match self {
            TableClass::Luma => &STD_LUMINANCE_QUANT_TABLE,
            TableClass::Chroma => &STD_CHROMINANCE_QUANT_TABLE,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

pub fn validate_quality(quality: u32) -> Result<(), CodecError> {
    if !(MINIMUM_QUALITY..=MAXIMUM_QUALITY).contains(&quality) {
        return Err(CodecError::InvalidQuality(quality));
    }
    Ok(())
}

/// Scales a quantization table by a quality factor (1-100).
pub fn get_scaled_quant_table(base_table: &[u8; BLOCK_DIM_2D], quality: u32) -> [u8; BLOCK_DIM_2D] {
    let mut scaled_table = [0u8; BLOCK_DIM_2D];
    let s = if quality < 50 { 5000 / quality } else { 200 - 2 * quality };

    for i in 0..BLOCK_DIM_2D {
        let val = (base_table[i] as u32 * s + 50) / 100;
        scaled_table[i] = val.clamp(1, 255) as u8;
    }
    scaled_table
}

/// Per-position divisors for one block shape; immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantTable {
    entries: Vec<u8>,
}

impl QuantTable {
    pub fn build(dimensions: usize, class: TableClass, quality: u32) -> Result<Self, CodecError> {
        validate_quality(quality)?;
        let scaled = get_scaled_quant_table(class.base_table(), quality);
        let entries = (0..block_len(dimensions))
            .map(|i| scaled[i % BLOCK_DIM_2D])
            .collect();
        Ok(Self { entries })
    }

    /// Wraps entries read from a stream; zero divisors are rejected.
    pub fn from_entries(entries: Vec<u8>) -> Result<Self, CodecError> {
        if entries.contains(&0) {
            return Err(CodecError::InvalidHeaderField("quantization table entry"));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[u8] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn quantize(&self, coef: f32, i: usize) -> i32 {
        (coef / self.entries[i] as f32).round() as i32
    }

    pub fn dequantize(&self, q: i32, i: usize) -> f32 {
        q as f32 * self.entries[i] as f32
    }
}

/// Quantizes transform coefficients using a quantization table.
pub fn quantize_block(dct_block: &[f32], table: &QuantTable, output: &mut [i32]) {
    for (i, (coef, out)) in dct_block.iter().zip(output.iter_mut()).enumerate() {
        *out = table.quantize(*coef, i);
    }
}

/// De-quantizes transform coefficients.
pub fn dequantize_block(quant_block: &[i32], table: &QuantTable, output: &mut [f32]) {
    for (i, (q, out)) in quant_block.iter().zip(output.iter_mut()).enumerate() {
        *out = table.dequantize(*q, i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_50_is_base_table() {
        let table = QuantTable::build(2, TableClass::Luma, 50).unwrap();
        assert_eq!(table.entries(), &STD_LUMINANCE_QUANT_TABLE[..]);
    }

    #[test]
    fn test_quality_range_is_checked() {
        assert!(matches!(
            QuantTable::build(2, TableClass::Luma, 0),
            Err(CodecError::InvalidQuality(0))
        ));
        assert!(matches!(
            QuantTable::build(3, TableClass::Chroma, 101),
            Err(CodecError::InvalidQuality(101))
        ));
    }

    #[test]
    fn test_entries_never_increase_with_quality() {
        for class in [TableClass::Luma, TableClass::Chroma] {
            let mut previous = QuantTable::build(2, class, 1).unwrap();
            for quality in 2..=100 {
                let table = QuantTable::build(2, class, quality).unwrap();
                for (a, b) in table.entries().iter().zip(previous.entries()) {
                    assert!(a <= b, "quality {} raised an entry {} > {}", quality, a, b);
                    assert!(*a >= 1);
                }
                previous = table;
            }
        }
    }

    #[test]
    fn test_quality_100_is_near_identity() {
        let table = QuantTable::build(2, TableClass::Luma, 100).unwrap();
        assert!(table.entries().iter().all(|&e| e == 1));
    }

    #[test]
    fn test_higher_dimensions_ignore_extra_axes() {
        let table2 = QuantTable::build(2, TableClass::Chroma, 80).unwrap();
        let table4 = QuantTable::build(4, TableClass::Chroma, 80).unwrap();
        assert_eq!(table4.len(), 4096);
        // (c0, c1, c2, c3) = (3, 5, 6, 1) -> base position (3, 5)
        let index = 3 + 5 * 8 + 6 * 64 + 1 * 512;
        assert_eq!(table4.entries()[index], table2.entries()[3 + 5 * 8]);
    }

    #[test]
    fn test_quantize_dequantize() {
        let table = QuantTable::build(2, TableClass::Luma, 50).unwrap();
        let mut coeffs = vec![0.0f32; 64];
        coeffs[0] = 100.0;
        coeffs[1] = -17.0;
        let mut quantized = vec![0i32; 64];
        quantize_block(&coeffs, &table, &mut quantized);
        assert_eq!(quantized[0], 6); // 100 / 16 = 6.25
        assert_eq!(quantized[1], -2); // -17 / 11 = -1.55
        let mut restored = vec![0.0f32; 64];
        dequantize_block(&quantized, &table, &mut restored);
        assert_eq!(restored[0], 96.0);
        assert_eq!(restored[1], -22.0);
    }

    #[test]
    fn test_zero_entries_rejected() {
        assert!(QuantTable::from_entries(vec![1, 0, 3]).is_err());
    }
}
