//! Canonical Huffman coding: optimal length-limited code construction from
//! symbol weights, canonical codeword assignment and bit-level decoding.

use crate::bit_io::{BitReader, BitWriter};
use crate::codec::quantization::TableClass;
use crate::constants::{
    END_OF_BLOCK_SYMBOL, HUFFMAN_ALPHABET_SIZE, MAX_CATEGORY, MAX_CODE_LENGTH, MAX_SYMBOL_RUN,
    ZERO_RUN_SYMBOL,
};
use crate::error::CodecError;

/// Represents a Huffman code with its bit value and length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    pub value: u16,
    pub length: u8,
}

/// Canonical Huffman table: per-length code counts, the symbols sorted by
/// (length, symbol), and the derived encode map and decode boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    codes: Vec<HuffmanCode>,
    lengths: [u16; MAX_CODE_LENGTH],
    values: Vec<u16>,

    // Decoding fields
    min_code: [i32; MAX_CODE_LENGTH],
    max_code: [i32; MAX_CODE_LENGTH],
    val_ptr: [i32; MAX_CODE_LENGTH],
}

impl Default for HuffmanTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HuffmanTable {
    /// A table without any codes.
    pub fn new() -> Self {
        Self {
            codes: vec![HuffmanCode::default(); HUFFMAN_ALPHABET_SIZE],
            lengths: [0; MAX_CODE_LENGTH],
            values: Vec::new(),
            min_code: [0; MAX_CODE_LENGTH],
            max_code: [-1; MAX_CODE_LENGTH],
            val_ptr: [0; MAX_CODE_LENGTH],
        }
    }

    /// Builds a table from per-length counts and the symbols in canonical order.
    pub fn build_from_counts(lengths: &[u16; MAX_CODE_LENGTH], values: &[u16]) -> Result<Self, CodecError> {
        let total: usize = lengths.iter().map(|&n| n as usize).sum();
        if total != values.len() || total > HUFFMAN_ALPHABET_SIZE {
            return Err(CodecError::InvalidHuffmanTable);
        }

        let mut table = Self::new();
        table.lengths = *lengths;
        table.values = values.to_vec();

        let mut seen = vec![false; HUFFMAN_ALPHABET_SIZE];
        let mut code = 0u32;
        let mut val_idx = 0usize;

        for i in 0..MAX_CODE_LENGTH {
            let n_codes = lengths[i] as usize;
            if n_codes == 0 {
                table.max_code[i] = -1;
            } else {
                table.val_ptr[i] = val_idx as i32;
                table.min_code[i] = code as i32;
                for _ in 0..n_codes {
                    let symbol = values[val_idx] as usize;
                    if symbol >= HUFFMAN_ALPHABET_SIZE || seen[symbol] {
                        return Err(CodecError::InvalidHuffmanTable);
                    }
                    seen[symbol] = true;
                    table.codes[symbol] = HuffmanCode {
                        value: code as u16,
                        length: (i + 1) as u8,
                    };
                    code += 1;
                    val_idx += 1;
                }
                if code > 1 << (i + 1) {
                    return Err(CodecError::InvalidHuffmanTable);
                }
                table.max_code[i] = (code - 1) as i32;
            }
            code <<= 1;
        }
        Ok(table)
    }

    /// Builds an optimal table for the given symbol frequencies.
    pub fn build_from_weights(freqs: &[u32]) -> Result<Self, CodecError> {
        let code_lengths = code_lengths_from_weights(freqs);
        let (counts, values) = counts_from_code_lengths(&code_lengths);
        Self::build_from_counts(&counts, &values)
    }

    pub fn lengths(&self) -> &[u16; MAX_CODE_LENGTH] {
        &self.lengths
    }

    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// The symbol → codeword map, in canonical order.
    pub fn codewords(&self) -> impl Iterator<Item = (u16, HuffmanCode)> + '_ {
        self.values.iter().map(|&symbol| (symbol, self.codes[symbol as usize]))
    }

    pub fn code(&self, symbol: u16) -> Result<HuffmanCode, CodecError> {
        match self.codes.get(symbol as usize) {
            Some(code) if code.length > 0 => Ok(*code),
            _ => Err(CodecError::MissingHuffmanCode),
        }
    }

    pub fn encode(&self, symbol: u16, writer: &mut BitWriter) -> Result<(), CodecError> {
        let code = self.code(symbol)?;
        writer.write_bits(code.value as u32, code.length);
        Ok(())
    }

    /// Decodes the next symbol from the given BitReader.
    pub fn decode(&self, reader: &mut BitReader) -> Result<u16, CodecError> {
        let mut code = 0i32;
        for i in 0..MAX_CODE_LENGTH {
            let bit = reader.read_bit()? as i32;
            code = (code << 1) | bit;
            if code <= self.max_code[i] {
                let idx = self.val_ptr[i] + (code - self.min_code[i]);
                return Ok(self.values[idx as usize]);
            }
        }
        Err(CodecError::UnmatchedHuffmanCode)
    }
}

/// DC and AC tables for both table classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HuffmanTableSet {
    pub dc: [HuffmanTable; 2],
    pub ac: [HuffmanTable; 2],
}

impl HuffmanTableSet {
    pub fn dc(&self, class: TableClass) -> &HuffmanTable {
        &self.dc[class.index()]
    }

    pub fn ac(&self, class: TableClass) -> &HuffmanTable {
        &self.ac[class.index()]
    }

    /// Tables in stream order: luma DC, luma AC, chroma DC, chroma AC.
    pub fn in_stream_order(&self) -> [&HuffmanTable; 4] {
        [&self.dc[0], &self.ac[0], &self.dc[1], &self.ac[1]]
    }

    pub fn from_stream_order(tables: [HuffmanTable; 4]) -> Self {
        let [luma_dc, luma_ac, chroma_dc, chroma_ac] = tables;
        Self {
            dc: [luma_dc, chroma_dc],
            ac: [luma_ac, chroma_ac],
        }
    }
}

/// Computes code lengths (0 for unused symbols) for the given frequencies,
/// limited to `MAX_CODE_LENGTH` bits (ISO/IEC 10918-1 Annex K.2).
///
/// A reserved pseudo-symbol with frequency 1 takes part in the construction so
/// that no real symbol receives the all-ones codeword.
pub fn code_lengths_from_weights(freqs: &[u32]) -> Vec<u8> {
    let n = freqs.len();
    let mut lengths = vec![0u8; n];
    if freqs.iter().all(|&f| f == 0) {
        return lengths;
    }

    let mut freq: Vec<u64> = freqs.iter().map(|&f| f as u64).collect();
    freq.push(1);
    let mut codesize = vec![0usize; n + 1];
    let mut others: Vec<Option<usize>> = vec![None; n + 1];

    loop {
        // Least frequent group, preferring the larger index on ties, then the next least.
        let mut c1 = None;
        let mut v = u64::MAX;
        for (i, &f) in freq.iter().enumerate() {
            if f != 0 && f <= v {
                v = f;
                c1 = Some(i);
            }
        }
        let mut c2 = None;
        v = u64::MAX;
        for (i, &f) in freq.iter().enumerate() {
            if f != 0 && f <= v && Some(i) != c1 {
                v = f;
                c2 = Some(i);
            }
        }
        let (Some(mut c1), Some(mut c2)) = (c1, c2) else {
            break;
        };

        freq[c1] += freq[c2];
        freq[c2] = 0;

        codesize[c1] += 1;
        while let Some(next) = others[c1] {
            c1 = next;
            codesize[c1] += 1;
        }
        others[c1] = Some(c2);

        codesize[c2] += 1;
        while let Some(next) = others[c2] {
            c2 = next;
            codesize[c2] += 1;
        }
    }

    let longest = codesize.iter().copied().max().unwrap_or(0);
    let mut bits = vec![0usize; longest.max(MAX_CODE_LENGTH) + 1];
    for &size in &codesize {
        if size > 0 {
            bits[size] += 1;
        }
    }

    // Move codes longer than the limit up the tree (K.2, Figure K.3).
    let mut i = bits.len() - 1;
    while i > MAX_CODE_LENGTH {
        while bits[i] > 0 {
            let mut j = i - 2;
            while bits[j] == 0 {
                j -= 1;
            }
            bits[i] -= 2;
            bits[i - 1] += 1;
            bits[j + 1] += 2;
            bits[j] -= 1;
        }
        i -= 1;
    }

    // Drop the reserved pseudo-symbol from the longest length.
    let mut i = MAX_CODE_LENGTH;
    while bits[i] == 0 {
        i -= 1;
    }
    bits[i] -= 1;

    let mut order: Vec<usize> = (0..n).filter(|&s| codesize[s] > 0).collect();
    order.sort_by_key(|&s| (codesize[s], s));
    let mut symbols = order.into_iter();
    for (len, &count) in bits.iter().enumerate().take(MAX_CODE_LENGTH + 1).skip(1) {
        for _ in 0..count {
            if let Some(symbol) = symbols.next() {
                lengths[symbol] = len as u8;
            }
        }
    }
    lengths
}

/// Per-length counts and the symbols sorted by increasing length, then symbol.
pub fn counts_from_code_lengths(code_lengths: &[u8]) -> ([u16; MAX_CODE_LENGTH], Vec<u16>) {
    let mut counts = [0u16; MAX_CODE_LENGTH];
    let mut values: Vec<u16> = Vec::new();
    for (symbol, &len) in code_lengths.iter().enumerate() {
        if len > 0 {
            counts[len as usize - 1] += 1;
            values.push(symbol as u16);
        }
    }
    values.sort_by_key(|&symbol| (code_lengths[symbol as usize], symbol));
    (counts, values)
}

/// Computes the magnitude category of an integer (ISO/IEC 10918-1 F.1.2.1).
pub fn get_category(value: i32) -> u8 {
    if value == 0 {
        return 0;
    }
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

/// Encodes the bits for a given category and value (ISO/IEC 10918-1 F.1.2.1.1).
pub fn get_diff_bits(value: i32, category: u8) -> u32 {
    if category == 0 {
        return 0;
    }
    if value >= 0 {
        value as u32
    } else {
        (value as i64 + (1i64 << category) - 1) as u32
    }
}

/// Decodes the value from bits given its category.
pub fn decode_value_bits(bits: u32, category: u8) -> i32 {
    if category == 0 {
        return 0;
    }
    let threshold = 1u32 << (category - 1);
    if bits >= threshold {
        bits as i32
    } else {
        (bits as i64 - (1i64 << category) + 1) as i32
    }
}

/// Category of a coefficient, rejecting magnitudes the symbol alphabet cannot carry.
pub fn checked_category(value: i32) -> Result<u8, CodecError> {
    let category = get_category(value);
    if category > MAX_CATEGORY {
        return Err(CodecError::InvalidSymbol);
    }
    Ok(category)
}

/// AC symbol for a run of at most `MAX_SYMBOL_RUN` zeros followed by a value of `category`.
pub fn ac_symbol(run: usize, category: u8) -> u16 {
    debug_assert!(run <= MAX_SYMBOL_RUN);
    ((run as u16) << 5) | category as u16
}

/// Splits an AC symbol into (run, category).
pub fn split_ac_symbol(symbol: u16) -> (usize, u8) {
    ((symbol >> 5) as usize, (symbol & 0x1F) as u8)
}

pub fn is_end_of_block(symbol: u16) -> bool {
    symbol == END_OF_BLOCK_SYMBOL
}

pub fn is_zero_run(symbol: u16) -> bool {
    symbol == ZERO_RUN_SYMBOL
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_prefix_free(table: &HuffmanTable) {
        let codes: Vec<(u16, HuffmanCode)> = table.codewords().collect();
        for (i, (_, a)) in codes.iter().enumerate() {
            for (j, (_, b)) in codes.iter().enumerate() {
                if i == j || a.length > b.length {
                    continue;
                }
                let prefix = b.value >> (b.length - a.length);
                assert!(
                    prefix != a.value,
                    "code {:0w1$b} is a prefix of {:0w2$b}",
                    a.value,
                    b.value,
                    w1 = a.length as usize,
                    w2 = b.length as usize
                );
            }
        }
    }

    #[test]
    fn test_prefix_free_and_complete() {
        let mut freqs = vec![0u32; HUFFMAN_ALPHABET_SIZE];
        for (i, f) in freqs.iter_mut().enumerate().take(40) {
            *f = ((i * 7919) % 113 + 1) as u32;
        }
        freqs[480] = 3;
        let table = HuffmanTable::build_from_weights(&freqs).unwrap();
        assert_prefix_free(&table);
        for (symbol, &f) in freqs.iter().enumerate() {
            assert_eq!(table.code(symbol as u16).is_ok(), f > 0, "symbol {}", symbol);
        }
    }

    #[test]
    fn test_single_symbol_gets_one_bit_code() {
        let mut freqs = vec![0u32; 16];
        freqs[5] = 100;
        let lengths = code_lengths_from_weights(&freqs);
        assert_eq!(lengths[5], 1);
        assert_eq!(lengths.iter().filter(|&&l| l > 0).count(), 1);
    }

    #[test]
    fn test_lengths_are_limited() {
        // Fibonacci weights produce a maximally skewed tree.
        let mut freqs = vec![0u32; 40];
        let (mut a, mut b) = (1u32, 1u32);
        for f in freqs.iter_mut() {
            *f = a;
            let next = a.saturating_add(b);
            a = b;
            b = next;
        }
        let lengths = code_lengths_from_weights(&freqs);
        assert!(lengths.iter().all(|&l| l >= 1 && l as usize <= MAX_CODE_LENGTH));
        let table = HuffmanTable::build_from_weights(&freqs).unwrap();
        assert_prefix_free(&table);
    }

    #[test]
    fn test_frequent_symbols_get_shorter_codes() {
        let mut freqs = vec![0u32; 8];
        freqs[0] = 1000;
        freqs[1] = 10;
        freqs[2] = 10;
        freqs[3] = 1;
        let lengths = code_lengths_from_weights(&freqs);
        assert!(lengths[0] < lengths[1]);
        assert!(lengths[1] <= lengths[3]);
    }

    #[test]
    fn test_encode_decode_symbols() {
        let mut freqs = vec![0u32; HUFFMAN_ALPHABET_SIZE];
        let message: Vec<u16> = vec![0, 1, 1, 2, 33, 480, 0, 0, 511, 2, 1, 0];
        for &s in &message {
            freqs[s as usize] += 1;
        }
        let table = HuffmanTable::build_from_weights(&freqs).unwrap();
        let mut writer = BitWriter::new();
        for &s in &message {
            table.encode(s, &mut writer).unwrap();
        }
        let data = writer.finish();
        let mut reader = BitReader::new(&data);
        for &s in &message {
            assert_eq!(table.decode(&mut reader).unwrap(), s);
        }
        assert!(matches!(table.encode(7, &mut BitWriter::new()), Err(CodecError::MissingHuffmanCode)));
    }

    #[test]
    fn test_counts_reproduce_identical_table() {
        let freqs: Vec<u32> = (0..64).map(|i| (i % 5) as u32 * 3).collect();
        let table = HuffmanTable::build_from_weights(&freqs).unwrap();
        let rebuilt = HuffmanTable::build_from_counts(table.lengths(), table.values()).unwrap();
        assert_eq!(table, rebuilt);
    }

    #[test]
    fn test_invalid_counts_rejected() {
        let mut lengths = [0u16; MAX_CODE_LENGTH];
        lengths[0] = 3; // three 1-bit codes cannot exist
        assert!(matches!(
            HuffmanTable::build_from_counts(&lengths, &[0, 1, 2]),
            Err(CodecError::InvalidHuffmanTable)
        ));
        lengths[0] = 2;
        assert!(HuffmanTable::build_from_counts(&lengths, &[4, 4]).is_err());
        assert!(HuffmanTable::build_from_counts(&lengths, &[1]).is_err());
    }

    #[test]
    fn test_empty_table_never_matches() {
        let table = HuffmanTable::new();
        let data = [0u8; 4];
        let mut reader = BitReader::new(&data);
        assert!(matches!(table.decode(&mut reader), Err(CodecError::UnmatchedHuffmanCode)));
    }

    #[test]
    fn test_category_and_value_bits() {
        assert_eq!(get_category(0), 0);
        assert_eq!(get_category(1), 1);
        assert_eq!(get_category(-1), 1);
        assert_eq!(get_category(255), 8);
        assert_eq!(get_category(-256), 9);
        for value in [-70000, -255, -3, -1, 1, 2, 7, 1024, 1 << 20] {
            let category = get_category(value);
            let bits = get_diff_bits(value, category);
            assert_eq!(decode_value_bits(bits, category), value);
        }
        assert!(checked_category(i32::MIN).is_err());
    }

    #[test]
    fn test_ac_symbol_layout() {
        assert_eq!(ac_symbol(0, 0), END_OF_BLOCK_SYMBOL);
        assert_eq!(ac_symbol(15, 0), ZERO_RUN_SYMBOL);
        assert_eq!(split_ac_symbol(ac_symbol(7, 19)), (7, 19));
        assert!((ac_symbol(15, 31) as usize) < HUFFMAN_ALPHABET_SIZE);
    }
}
