//! Decoding of block symbols from the Huffman and CABAC payloads.

use crate::bit_io::BitReader;
use crate::codec::cabac::{CabacDecoder, ContextModel, ResidualContexts};
use crate::codec::huffman::{
    decode_value_bits, is_end_of_block, is_zero_run, split_ac_symbol, HuffmanTable, HuffmanTableSet,
};
use crate::codec::quantization::TableClass;
use crate::codec::run_length::{AcToken, BlockSymbols};
use crate::codec::scan_encoder::framing_bits;
use crate::codec::traversal::TraversalTable;
use crate::constants::{MAX_CATEGORY, MAX_SYMBOL_RUN};
use crate::error::CodecError;
use crate::precondition::{PreconditionKind, Preconditioner, SymbolTransform};

/// Produces the block symbols of every plane block in stream order.
pub trait ScanDecoder {
    fn decode_block(&mut self, class: TableClass) -> Result<BlockSymbols, CodecError>;

    /// Called once after the last block.
    fn finish(&mut self) -> Result<(), CodecError> {
        Ok(())
    }
}

pub struct HuffmanScanDecoder<'a> {
    reader: BitReader<'a>,
    tables: &'a HuffmanTableSet,
    block_len: usize,
    precondition: PreconditionKind,
    count_bits: u8,
    preconditioners: [Preconditioner; 2],
}

impl<'a> HuffmanScanDecoder<'a> {
    pub fn new(data: &'a [u8], tables: &'a HuffmanTableSet, dimensions: usize, precondition: PreconditionKind) -> Self {
        Self {
            reader: BitReader::new(data),
            tables,
            block_len: crate::block_model::block_len(dimensions),
            precondition,
            count_bits: framing_bits(dimensions),
            preconditioners: [Preconditioner::new(precondition), Preconditioner::new(precondition)],
        }
    }

    fn decode_dc(&mut self, table: &HuffmanTable) -> Result<i32, CodecError> {
        let category = table.decode(&mut self.reader)?;
        if category > MAX_CATEGORY as u16 {
            return Err(CodecError::InvalidSymbol);
        }
        let category = category as u8;
        let bits = self.reader.read_bits(category)?;
        Ok(decode_value_bits(bits, category))
    }

    fn decode_framed_ac(&mut self, class: TableClass) -> Result<Vec<AcToken>, CodecError> {
        let tables = self.tables;
        let table = tables.ac(class);
        let count = self.reader.read_bits(self.count_bits)? as usize;
        if count >= self.block_len {
            return Err(CodecError::InvalidSymbol);
        }
        let primary_index = if self.precondition.uses_bwt() {
            self.reader.read_bits(self.count_bits)? as usize
        } else {
            0
        };
        let transformed = (0..count)
            .map(|_| table.decode(&mut self.reader))
            .collect::<Result<Vec<_>, _>>()?;
        let symbols = self.preconditioners[class.index()].inverse(&transformed, primary_index)?;

        let mut symbols = symbols.into_iter();
        let tokens = assemble_ac(&mut self.reader, self.block_len, |_| Ok(symbols.next()))?;
        if symbols.next().is_some() {
            return Err(CodecError::InvalidSymbol);
        }
        Ok(tokens)
    }
}

impl ScanDecoder for HuffmanScanDecoder<'_> {
    fn decode_block(&mut self, class: TableClass) -> Result<BlockSymbols, CodecError> {
        let tables = self.tables;
        let dc_delta = self.decode_dc(tables.dc(class))?;
        let ac = if self.precondition.is_none() {
            let table = tables.ac(class);
            assemble_ac(&mut self.reader, self.block_len, |reader| table.decode(reader).map(Some))?
        } else {
            self.decode_framed_ac(class)?
        };
        Ok(BlockSymbols { dc_delta, ac })
    }
}

/// Rebuilds AC tokens from a stream of AC symbols, reading each value's extra
/// bits right after its symbol is taken.
fn assemble_ac<'a>(
    reader: &mut BitReader<'a>,
    block_len: usize,
    mut next_symbol: impl FnMut(&mut BitReader<'a>) -> Result<Option<u16>, CodecError>,
) -> Result<Vec<AcToken>, CodecError> {
    let mut tokens = Vec::new();
    let mut zeros = 0;
    let mut position = 1;
    while position < block_len {
        let symbol = next_symbol(reader)?.ok_or(CodecError::InvalidSymbol)?;
        if is_end_of_block(symbol) {
            tokens.push(AcToken::EndOfBlock);
            return Ok(tokens);
        }
        if is_zero_run(symbol) {
            zeros += MAX_SYMBOL_RUN + 1;
            position += MAX_SYMBOL_RUN + 1;
            continue;
        }
        let (run, category) = split_ac_symbol(symbol);
        if category == 0 {
            return Err(CodecError::InvalidSymbol);
        }
        zeros += run;
        position += run;
        if position >= block_len {
            return Err(CodecError::RunLengthOverflow);
        }
        let value = decode_value_bits(reader.read_bits(category)?, category);
        tokens.push(AcToken::Run { zeros, value });
        zeros = 0;
        position += 1;
    }
    if zeros > 0 {
        return Err(CodecError::RunLengthOverflow);
    }
    Ok(tokens)
}

pub struct CabacScanDecoder<'a> {
    decoder: CabacDecoder<'a>,
    contexts: [ResidualContexts; 2],
    traversal: TraversalTable,
}

impl<'a> CabacScanDecoder<'a> {
    pub fn new(data: &'a [u8], traversal: &TraversalTable) -> Result<Self, CodecError> {
        let diagonals = traversal.diagonal_count();
        Ok(Self {
            decoder: CabacDecoder::new(data)?,
            contexts: [ResidualContexts::new(diagonals), ResidualContexts::new(diagonals)],
            traversal: traversal.clone(),
        })
    }

    pub fn contexts(&self) -> &[ResidualContexts; 2] {
        &self.contexts
    }

    fn decode_magnitude(
        decoder: &mut CabacDecoder<'a>,
        greater_one: &mut ContextModel,
        greater_two: &mut ContextModel,
    ) -> Result<u32, CodecError> {
        if !decoder.decode_decision(greater_one)? {
            return Ok(1);
        }
        if !decoder.decode_decision(greater_two)? {
            return Ok(2);
        }
        decoder
            .decode_exp_golomb()?
            .checked_add(3)
            .ok_or(CodecError::CabacStateInconsistent)
    }
}

fn signed(magnitude: u32, negative: bool) -> Result<i32, CodecError> {
    let magnitude = magnitude as i64;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).map_err(|_| CodecError::CabacStateInconsistent)
}

impl ScanDecoder for CabacScanDecoder<'_> {
    fn decode_block(&mut self, class: TableClass) -> Result<BlockSymbols, CodecError> {
        let ctx = &mut self.contexts[class.index()];
        let decoder = &mut self.decoder;

        let dc_delta = if decoder.decode_decision(&mut ctx.dc_significant)? {
            let negative = decoder.decode_bypass()?;
            let magnitude = Self::decode_magnitude(decoder, &mut ctx.dc_greater_one, &mut ctx.dc_greater_two)?;
            signed(magnitude, negative)?
        } else {
            0
        };

        if !decoder.decode_decision(&mut ctx.coded_block)? {
            return Ok(BlockSymbols {
                dc_delta,
                ac: vec![AcToken::EndOfBlock],
            });
        }

        let block_len = self.traversal.len();
        let mut positions = Vec::new();
        let mut last_found = false;
        for position in 1..block_len - 1 {
            let diagonal = self.traversal.diagonal(position);
            if decoder.decode_decision(&mut ctx.significant[diagonal])? {
                positions.push(position);
                if decoder.decode_decision(&mut ctx.last[diagonal])? {
                    last_found = true;
                    break;
                }
            }
        }
        if !last_found {
            positions.push(block_len - 1);
        }

        let mut ac = Vec::with_capacity(positions.len() + 1);
        let mut previous = 0;
        for &position in &positions {
            let diagonal = self.traversal.diagonal(position);
            let magnitude =
                Self::decode_magnitude(decoder, &mut ctx.greater_one[diagonal], &mut ctx.greater_two[diagonal])?;
            let negative = decoder.decode_bypass()?;
            ac.push(AcToken::Run {
                zeros: position - previous - 1,
                value: signed(magnitude, negative)?,
            });
            previous = position;
        }
        if previous < block_len - 1 {
            ac.push(AcToken::EndOfBlock);
        }
        Ok(BlockSymbols { dc_delta, ac })
    }

    fn finish(&mut self) -> Result<(), CodecError> {
        if self.decoder.decode_terminate()? {
            Ok(())
        } else {
            Err(CodecError::CabacStateInconsistent)
        }
    }
}
