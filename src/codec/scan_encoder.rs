//! Entropy coding of block symbols: Huffman (two-pass, optional
//! preconditioning) and CABAC.

use crate::bit_io::BitWriter;
use crate::codec::cabac::{CabacEncoder, ContextModel, ResidualContexts};
use crate::codec::huffman::{
    ac_symbol, checked_category, get_diff_bits, HuffmanTable, HuffmanTableSet,
};
use crate::codec::quantization::TableClass;
use crate::codec::run_length::{AcToken, BlockSymbols};
use crate::codec::traversal::TraversalTable;
use crate::constants::{END_OF_BLOCK_SYMBOL, HUFFMAN_ALPHABET_SIZE, MAX_SYMBOL_RUN, ZERO_RUN_SYMBOL};
use crate::error::CodecError;
use crate::precondition::{PreconditionKind, Preconditioner, SymbolTransform};

/// Consumes the block symbols of every plane block in stream order.
pub trait ScanEncoder {
    fn encode_block(&mut self, class: TableClass, symbols: &BlockSymbols) -> Result<(), CodecError>;
}

/// A Huffman symbol together with the extra bits that follow its codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodedSymbol {
    pub symbol: u16,
    pub bits: u32,
    pub bit_count: u8,
}

impl CodedSymbol {
    pub fn dc(delta: i32) -> Result<Self, CodecError> {
        let category = checked_category(delta)?;
        Ok(Self {
            symbol: category as u16,
            bits: get_diff_bits(delta, category),
            bit_count: category,
        })
    }

    pub fn ac(run: usize, value: i32) -> Result<Self, CodecError> {
        let category = checked_category(value)?;
        Ok(Self {
            symbol: ac_symbol(run, category),
            bits: get_diff_bits(value, category),
            bit_count: category,
        })
    }

    fn bare(symbol: u16) -> Self {
        Self {
            symbol,
            bits: 0,
            bit_count: 0,
        }
    }
}

/// Maps AC tokens to Huffman symbols, splitting runs longer than
/// `MAX_SYMBOL_RUN` with zero-run symbols.
pub fn ac_symbols(tokens: &[AcToken]) -> Result<Vec<CodedSymbol>, CodecError> {
    let mut symbols = Vec::with_capacity(tokens.len());
    for token in tokens {
        match *token {
            AcToken::Run { mut zeros, value } => {
                while zeros > MAX_SYMBOL_RUN {
                    symbols.push(CodedSymbol::bare(ZERO_RUN_SYMBOL));
                    zeros -= MAX_SYMBOL_RUN + 1;
                }
                symbols.push(CodedSymbol::ac(zeros, value)?);
            }
            AcToken::EndOfBlock => symbols.push(CodedSymbol::bare(END_OF_BLOCK_SYMBOL)),
        }
    }
    Ok(symbols)
}

struct PendingBlock {
    class: TableClass,
    dc: CodedSymbol,
    ac: Vec<CodedSymbol>,
    /// Preconditioned AC symbols and BWT primary index.
    framed: Option<(Vec<u16>, usize)>,
}

/// Collects every block first so the tables can be fitted to the actual
/// symbol statistics, then emits the payload.
pub struct HuffmanScanEncoder {
    precondition: PreconditionKind,
    count_bits: u8,
    preconditioners: [Preconditioner; 2],
    dc_frequencies: [Vec<u32>; 2],
    ac_frequencies: [Vec<u32>; 2],
    blocks: Vec<PendingBlock>,
}

impl HuffmanScanEncoder {
    pub fn new(dimensions: usize, precondition: PreconditionKind) -> Self {
        Self {
            precondition,
            count_bits: framing_bits(dimensions),
            preconditioners: [Preconditioner::new(precondition), Preconditioner::new(precondition)],
            dc_frequencies: [vec![0; HUFFMAN_ALPHABET_SIZE], vec![0; HUFFMAN_ALPHABET_SIZE]],
            ac_frequencies: [vec![0; HUFFMAN_ALPHABET_SIZE], vec![0; HUFFMAN_ALPHABET_SIZE]],
            blocks: Vec::new(),
        }
    }

    pub fn build_tables(&self) -> Result<HuffmanTableSet, CodecError> {
        Ok(HuffmanTableSet {
            dc: [
                HuffmanTable::build_from_weights(&self.dc_frequencies[0])?,
                HuffmanTable::build_from_weights(&self.dc_frequencies[1])?,
            ],
            ac: [
                HuffmanTable::build_from_weights(&self.ac_frequencies[0])?,
                HuffmanTable::build_from_weights(&self.ac_frequencies[1])?,
            ],
        })
    }

    /// Builds the tables and codes every collected block.
    pub fn finish(self) -> Result<(HuffmanTableSet, Vec<u8>), CodecError> {
        let tables = self.build_tables()?;
        let mut writer = BitWriter::new();
        for block in &self.blocks {
            self.write_block(&tables, block, &mut writer)?;
        }
        Ok((tables, writer.finish()))
    }

    fn write_block(&self, tables: &HuffmanTableSet, block: &PendingBlock, writer: &mut BitWriter) -> Result<(), CodecError> {
        write_coded(tables.dc(block.class), &block.dc, writer)?;
        let ac_table = tables.ac(block.class);
        match &block.framed {
            None => {
                for symbol in &block.ac {
                    write_coded(ac_table, symbol, writer)?;
                }
            }
            Some((transformed, primary_index)) => {
                writer.write_bits(transformed.len() as u32, self.count_bits);
                if self.precondition.uses_bwt() {
                    writer.write_bits(*primary_index as u32, self.count_bits);
                }
                for &symbol in transformed {
                    ac_table.encode(symbol, writer)?;
                }
                for symbol in &block.ac {
                    writer.write_bits(symbol.bits, symbol.bit_count);
                }
            }
        }
        Ok(())
    }
}

impl ScanEncoder for HuffmanScanEncoder {
    fn encode_block(&mut self, class: TableClass, symbols: &BlockSymbols) -> Result<(), CodecError> {
        let dc = CodedSymbol::dc(symbols.dc_delta)?;
        let ac = ac_symbols(&symbols.ac)?;
        let index = class.index();

        self.dc_frequencies[index][dc.symbol as usize] += 1;
        let framed = if self.precondition.is_none() {
            for symbol in &ac {
                self.ac_frequencies[index][symbol.symbol as usize] += 1;
            }
            None
        } else {
            let raw: Vec<u16> = ac.iter().map(|s| s.symbol).collect();
            let (transformed, primary_index) = self.preconditioners[index].forward(&raw)?;
            for &symbol in &transformed {
                self.ac_frequencies[index][symbol as usize] += 1;
            }
            Some((transformed, primary_index))
        };

        self.blocks.push(PendingBlock { class, dc, ac, framed });
        Ok(())
    }
}

/// Width of the symbol count and primary index fields of a framed block:
/// enough for any position within a block of `8^dimensions` coefficients.
pub fn framing_bits(dimensions: usize) -> u8 {
    (3 * dimensions) as u8
}

fn write_coded(table: &HuffmanTable, symbol: &CodedSymbol, writer: &mut BitWriter) -> Result<(), CodecError> {
    table.encode(symbol.symbol, writer)?;
    writer.write_bits(symbol.bits, symbol.bit_count);
    Ok(())
}

pub struct CabacScanEncoder {
    encoder: CabacEncoder,
    contexts: [ResidualContexts; 2],
    traversal: TraversalTable,
}

impl CabacScanEncoder {
    pub fn new(traversal: &TraversalTable) -> Self {
        let diagonals = traversal.diagonal_count();
        Self {
            encoder: CabacEncoder::new(),
            contexts: [ResidualContexts::new(diagonals), ResidualContexts::new(diagonals)],
            traversal: traversal.clone(),
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.encoder.finish()
    }

    /// Adapted context state of the luma and chroma classes.
    pub fn contexts(&self) -> &[ResidualContexts; 2] {
        &self.contexts
    }

    fn encode_magnitude(encoder: &mut CabacEncoder, greater_one: &mut ContextModel, greater_two: &mut ContextModel, magnitude: u32) {
        encoder.encode_decision(greater_one, magnitude > 1);
        if magnitude > 1 {
            encoder.encode_decision(greater_two, magnitude > 2);
            if magnitude > 2 {
                encoder.encode_exp_golomb(magnitude - 3);
            }
        }
    }
}

impl ScanEncoder for CabacScanEncoder {
    fn encode_block(&mut self, class: TableClass, symbols: &BlockSymbols) -> Result<(), CodecError> {
        let ctx = &mut self.contexts[class.index()];
        let encoder = &mut self.encoder;

        let dc = symbols.dc_delta;
        encoder.encode_decision(&mut ctx.dc_significant, dc != 0);
        if dc != 0 {
            encoder.encode_bypass(dc < 0);
            Self::encode_magnitude(encoder, &mut ctx.dc_greater_one, &mut ctx.dc_greater_two, dc.unsigned_abs());
        }

        let positions = symbols.nonzero_positions();
        let Some(&(last_position, _)) = positions.last() else {
            encoder.encode_decision(&mut ctx.coded_block, false);
            return Ok(());
        };
        encoder.encode_decision(&mut ctx.coded_block, true);
        let block_len = self.traversal.len();
        if last_position >= block_len {
            return Err(CodecError::RunLengthOverflow);
        }

        // Significance map; the final position is implied when reached.
        let mut next = positions.iter().map(|&(p, _)| p).peekable();
        for position in 1..block_len - 1 {
            let diagonal = self.traversal.diagonal(position);
            let significant = next.peek() == Some(&position);
            encoder.encode_decision(&mut ctx.significant[diagonal], significant);
            if significant {
                next.next();
                let last = position == last_position;
                encoder.encode_decision(&mut ctx.last[diagonal], last);
                if last {
                    break;
                }
            }
        }

        for &(position, value) in &positions {
            let diagonal = self.traversal.diagonal(position);
            Self::encode_magnitude(
                encoder,
                &mut ctx.greater_one[diagonal],
                &mut ctx.greater_two[diagonal],
                value.unsigned_abs(),
            );
            encoder.encode_bypass(value < 0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_runs_use_zero_run_symbols() {
        let tokens = [AcToken::Run { zeros: 35, value: -3 }, AcToken::EndOfBlock];
        let symbols = ac_symbols(&tokens).unwrap();
        let codes: Vec<u16> = symbols.iter().map(|s| s.symbol).collect();
        assert_eq!(codes, vec![ZERO_RUN_SYMBOL, ZERO_RUN_SYMBOL, ac_symbol(3, 2), END_OF_BLOCK_SYMBOL]);
        assert_eq!(symbols[2].bit_count, 2);
        assert_eq!(symbols[2].bits, 0b00);
    }

    #[test]
    fn test_dc_symbol_is_category() {
        let dc = CodedSymbol::dc(-5).unwrap();
        assert_eq!(dc.symbol, 3);
        assert_eq!(dc.bits, 0b010);
        assert!(CodedSymbol::dc(i32::MIN).is_err());
    }

    #[test]
    fn test_unused_class_gets_empty_tables() {
        let mut encoder = HuffmanScanEncoder::new(2, PreconditionKind::None);
        let symbols = BlockSymbols {
            dc_delta: 4,
            ac: vec![AcToken::Run { zeros: 0, value: 1 }, AcToken::EndOfBlock],
        };
        encoder.encode_block(TableClass::Luma, &symbols).unwrap();
        let tables = encoder.build_tables().unwrap();
        assert!(tables.dc(TableClass::Chroma).values().is_empty());
        assert_eq!(tables.ac(TableClass::Luma).values().len(), 2);
    }

    #[test]
    fn test_framing_bits_cover_block() {
        for d in 2..=4 {
            assert_eq!(1usize << framing_bits(d), crate::block_model::block_len(d));
        }
    }
}
