//! Context-adaptive binary arithmetic coder (ITU-T H.264 clause 9.3).
//!
//! The engine keeps a 9-bit range and adapts one 6-bit probability state per
//! context. Bypass bins are coded with probability one half. The stream is
//! closed with a terminating bin of value 1, which the decoder checks after
//! the last block.

use crate::bit_io::{BitReader, BitWriter};
use crate::error::CodecError;

/// LPS sub-range indexed by probability state and `(range >> 6) & 3` (Table 9-44).
const RANGE_TAB_LPS: [[u8; 4]; 64] = [
    [128, 176, 208, 240],
    [128, 167, 197, 227],
    [128, 158, 187, 216],
    [123, 150, 178, 205],
    [116, 142, 169, 195],
    [111, 135, 160, 185],
    [105, 128, 152, 175],
    [100, 122, 144, 166],
    [95, 116, 137, 158],
    [90, 110, 130, 150],
    [85, 104, 123, 142],
    [81, 99, 117, 135],
    [77, 94, 111, 128],
    [73, 89, 105, 122],
    [69, 85, 100, 116],
    [66, 80, 95, 110],
    [62, 76, 90, 104],
    [59, 72, 86, 99],
    [56, 69, 81, 94],
    [53, 65, 77, 89],
    [51, 62, 73, 85],
    [48, 59, 69, 80],
    [46, 56, 66, 76],
    [43, 53, 63, 72],
    [41, 50, 59, 69],
    [39, 48, 56, 65],
    [37, 45, 54, 62],
    [35, 43, 51, 59],
    [33, 41, 48, 56],
    [32, 39, 46, 53],
    [30, 37, 43, 50],
    [29, 35, 41, 48],
    [27, 33, 39, 45],
    [26, 31, 37, 43],
    [24, 30, 35, 41],
    [23, 28, 33, 39],
    [22, 27, 32, 37],
    [21, 26, 30, 35],
    [20, 24, 29, 33],
    [19, 23, 27, 31],
    [18, 22, 26, 30],
    [17, 21, 25, 28],
    [16, 20, 23, 27],
    [15, 19, 22, 25],
    [14, 18, 21, 24],
    [14, 17, 20, 23],
    [13, 16, 19, 22],
    [12, 15, 18, 21],
    [12, 14, 17, 20],
    [11, 14, 16, 19],
    [11, 13, 15, 18],
    [10, 12, 15, 17],
    [10, 12, 14, 16],
    [9, 11, 13, 15],
    [9, 11, 12, 14],
    [8, 10, 12, 14],
    [8, 9, 11, 13],
    [7, 9, 11, 12],
    [7, 9, 10, 12],
    [7, 8, 10, 11],
    [6, 8, 9, 11],
    [6, 7, 9, 10],
    [6, 7, 8, 9],
    [2, 2, 2, 2],
];

/// Next state after coding an LPS (Table 9-45).
const TRANS_IDX_LPS: [u8; 64] = [
    0, 0, 1, 2, 2, 4, 4, 5, 6, 7, 8, 9, 9, 11, 11, 12, 13, 13, 15, 15, 16, 16, 18, 18, 19, 19, 21, 21, 22, 22, 23,
    24, 24, 25, 26, 26, 27, 27, 28, 29, 29, 30, 30, 30, 31, 32, 32, 33, 33, 33, 34, 34, 35, 35, 35, 36, 36, 36, 37,
    37, 37, 38, 38, 63,
];

/// Highest state reachable through MPS transitions; state 63 is reserved for termination.
const MAX_ADAPTIVE_STATE: u8 = 62;

/// Longest Exp-Golomb prefix the decoder accepts before declaring the stream corrupt.
const MAX_EXP_GOLOMB_PREFIX: u32 = 32;

/// Adaptive probability model of one binary decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextModel {
    state: u8,
    mps: bool,
}

impl ContextModel {
    pub fn state(&self) -> u8 {
        self.state
    }

    pub fn mps(&self) -> bool {
        self.mps
    }

    fn range_lps(&self, range: u32) -> u32 {
        RANGE_TAB_LPS[self.state as usize][((range >> 6) & 3) as usize] as u32
    }

    fn update_mps(&mut self) {
        if self.state < MAX_ADAPTIVE_STATE {
            self.state += 1;
        }
    }

    fn update_lps(&mut self) {
        if self.state == 0 {
            self.mps = !self.mps;
        }
        self.state = TRANS_IDX_LPS[self.state as usize];
    }
}

/// Contexts of the block syntax for one table class.
///
/// Significance, last and level contexts are selected by the diagonal of the
/// scan position, so there is one of each per diagonal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidualContexts {
    pub dc_significant: ContextModel,
    pub dc_greater_one: ContextModel,
    pub dc_greater_two: ContextModel,
    pub coded_block: ContextModel,
    pub significant: Vec<ContextModel>,
    pub last: Vec<ContextModel>,
    pub greater_one: Vec<ContextModel>,
    pub greater_two: Vec<ContextModel>,
}

impl ResidualContexts {
    pub fn new(diagonal_count: usize) -> Self {
        Self {
            dc_significant: ContextModel::default(),
            dc_greater_one: ContextModel::default(),
            dc_greater_two: ContextModel::default(),
            coded_block: ContextModel::default(),
            significant: vec![ContextModel::default(); diagonal_count],
            last: vec![ContextModel::default(); diagonal_count],
            greater_one: vec![ContextModel::default(); diagonal_count],
            greater_two: vec![ContextModel::default(); diagonal_count],
        }
    }
}

pub struct CabacEncoder {
    low: u32,
    range: u32,
    first_bit: bool,
    bits_outstanding: u32,
    writer: BitWriter,
}

impl Default for CabacEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CabacEncoder {
    pub fn new() -> Self {
        Self {
            low: 0,
            range: 510,
            first_bit: true,
            bits_outstanding: 0,
            writer: BitWriter::new(),
        }
    }

    pub fn encode_decision(&mut self, ctx: &mut ContextModel, bin: bool) {
        let range_lps = ctx.range_lps(self.range);
        self.range -= range_lps;
        if bin != ctx.mps {
            self.low += self.range;
            self.range = range_lps;
            ctx.update_lps();
        } else {
            ctx.update_mps();
        }
        self.renormalize();
    }

    pub fn encode_bypass(&mut self, bin: bool) {
        self.low <<= 1;
        if bin {
            self.low += self.range;
        }
        if self.low >= 1024 {
            self.put_bit(true);
            self.low -= 1024;
        } else if self.low < 512 {
            self.put_bit(false);
        } else {
            self.low -= 512;
            self.bits_outstanding += 1;
        }
    }

    pub fn encode_bypass_bits(&mut self, value: u32, count: u8) {
        for i in (0..count).rev() {
            self.encode_bypass((value >> i) & 1 == 1);
        }
    }

    /// Zeroth-order Exp-Golomb code in bypass bins.
    pub fn encode_exp_golomb(&mut self, value: u32) {
        let mut value = value as u64;
        let mut k = 0u32;
        while value >= 1u64 << k {
            self.encode_bypass(true);
            value -= 1u64 << k;
            k += 1;
        }
        self.encode_bypass(false);
        while k > 0 {
            k -= 1;
            self.encode_bypass((value >> k) & 1 == 1);
        }
    }

    pub fn encode_terminate(&mut self, bin: bool) {
        self.range -= 2;
        if bin {
            self.low += self.range;
            self.flush();
        } else {
            self.renormalize();
        }
    }

    /// Codes the terminating bin and returns the arithmetic-coded bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.encode_terminate(true);
        self.writer.finish()
    }

    fn flush(&mut self) {
        self.range = 2;
        self.renormalize();
        self.put_bit((self.low >> 9) & 1 == 1);
        self.writer.write_bits(((self.low >> 7) & 3) | 1, 2);
    }

    fn renormalize(&mut self) {
        while self.range < 256 {
            if self.low < 256 {
                self.put_bit(false);
            } else if self.low >= 512 {
                self.low -= 512;
                self.put_bit(true);
            } else {
                self.low -= 256;
                self.bits_outstanding += 1;
            }
            self.range <<= 1;
            self.low <<= 1;
        }
    }

    fn put_bit(&mut self, bit: bool) {
        if self.first_bit {
            self.first_bit = false;
        } else {
            self.writer.write_bit(bit);
        }
        while self.bits_outstanding > 0 {
            self.writer.write_bit(!bit);
            self.bits_outstanding -= 1;
        }
    }
}

pub struct CabacDecoder<'a> {
    range: u32,
    offset: u32,
    reader: BitReader<'a>,
}

impl<'a> CabacDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, CodecError> {
        let mut reader = BitReader::new(data);
        let offset = reader.read_bits(9)?;
        if offset >= 510 {
            return Err(CodecError::CabacStateInconsistent);
        }
        Ok(Self {
            range: 510,
            offset,
            reader,
        })
    }

    pub fn decode_decision(&mut self, ctx: &mut ContextModel) -> Result<bool, CodecError> {
        let range_lps = ctx.range_lps(self.range);
        self.range -= range_lps;
        let bin = if self.offset >= self.range {
            self.offset -= self.range;
            self.range = range_lps;
            let bin = !ctx.mps;
            ctx.update_lps();
            bin
        } else {
            ctx.update_mps();
            ctx.mps
        };
        self.renormalize()?;
        Ok(bin)
    }

    pub fn decode_bypass(&mut self) -> Result<bool, CodecError> {
        self.offset = (self.offset << 1) | self.reader.read_bit()? as u32;
        if self.offset >= self.range {
            self.offset -= self.range;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn decode_bypass_bits(&mut self, count: u8) -> Result<u32, CodecError> {
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | self.decode_bypass()? as u32;
        }
        Ok(value)
    }

    pub fn decode_exp_golomb(&mut self) -> Result<u32, CodecError> {
        let mut value = 0u64;
        let mut k = 0u32;
        while self.decode_bypass()? {
            value += 1u64 << k;
            k += 1;
            if k >= MAX_EXP_GOLOMB_PREFIX {
                return Err(CodecError::CabacStateInconsistent);
            }
        }
        while k > 0 {
            k -= 1;
            value += (self.decode_bypass()? as u64) << k;
        }
        u32::try_from(value).map_err(|_| CodecError::CabacStateInconsistent)
    }

    pub fn decode_terminate(&mut self) -> Result<bool, CodecError> {
        self.range -= 2;
        if self.offset >= self.range {
            Ok(true)
        } else {
            self.renormalize()?;
            Ok(false)
        }
    }

    fn renormalize(&mut self) -> Result<(), CodecError> {
        while self.range < 256 {
            self.range <<= 1;
            self.offset = (self.offset << 1) | self.reader.read_bit()? as u32;
        }
        Ok(())
    }
}
