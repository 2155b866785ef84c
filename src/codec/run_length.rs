//! Differential DC prediction and zero-run coding of AC coefficients.

use crate::error::CodecError;

/// One element of a block's AC stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcToken {
    /// `zeros` zero coefficients followed by the nonzero `value`.
    Run { zeros: usize, value: i32 },
    /// All remaining coefficients of the block are zero.
    EndOfBlock,
}

/// The run-length representation of one quantized, scanned block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSymbols {
    pub dc_delta: i32,
    pub ac: Vec<AcToken>,
}

impl BlockSymbols {
    /// Scan positions and values of the nonzero AC coefficients.
    pub fn nonzero_positions(&self) -> Vec<(usize, i32)> {
        let mut positions = Vec::new();
        let mut k = 1;
        for token in &self.ac {
            if let AcToken::Run { zeros, value } = *token {
                k += zeros;
                positions.push((k, value));
                k += 1;
            }
        }
        positions
    }
}

/// DC predictor of one plane; starts at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct DcPredictor {
    previous: i32,
}

impl DcPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delta(&mut self, dc: i32) -> i32 {
        let diff = dc.wrapping_sub(self.previous);
        self.previous = dc;
        diff
    }

    pub fn restore(&mut self, delta: i32) -> i32 {
        self.previous = self.previous.wrapping_add(delta);
        self.previous
    }
}

/// Run-length codes the AC part (positions `1..`) of a scanned block.
pub fn encode_ac(scanned: &[i32]) -> Vec<AcToken> {
    let mut tokens = Vec::new();
    let mut run = 0;
    for &value in scanned.iter().skip(1) {
        if value == 0 {
            run += 1;
        } else {
            tokens.push(AcToken::Run { zeros: run, value });
            run = 0;
        }
    }
    if run > 0 {
        tokens.push(AcToken::EndOfBlock);
    }
    tokens
}

/// Expands AC tokens into positions `1..` of `scanned`, leaving position 0 untouched.
pub fn decode_ac(tokens: &[AcToken], scanned: &mut [i32]) -> Result<(), CodecError> {
    scanned[1..].iter_mut().for_each(|v| *v = 0);
    let mut k = 1;
    for token in tokens {
        match *token {
            AcToken::Run { zeros, value } => {
                k += zeros;
                if k >= scanned.len() {
                    return Err(CodecError::RunLengthOverflow);
                }
                scanned[k] = value;
                k += 1;
            }
            AcToken::EndOfBlock => break,
        }
    }
    Ok(())
}

/// Builds the block symbols for a scanned block, advancing the plane's predictor.
pub fn encode_block(scanned: &[i32], predictor: &mut DcPredictor) -> BlockSymbols {
    BlockSymbols {
        dc_delta: predictor.delta(scanned[0]),
        ac: encode_ac(scanned),
    }
}

/// Inverse of [`encode_block`].
pub fn decode_block(symbols: &BlockSymbols, predictor: &mut DcPredictor, scanned: &mut [i32]) -> Result<(), CodecError> {
    scanned[0] = predictor.restore(symbols.dc_delta);
    decode_ac(&symbols.ac, scanned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_zeros_become_end_of_block() {
        let scanned = [50, 0, 0, 3, -1, 0, 0, 0];
        assert_eq!(
            encode_ac(&scanned),
            vec![
                AcToken::Run { zeros: 2, value: 3 },
                AcToken::Run { zeros: 0, value: -1 },
                AcToken::EndOfBlock,
            ]
        );
    }

    #[test]
    fn test_no_end_of_block_when_last_is_nonzero() {
        let scanned = [0, 0, 0, 7];
        assert_eq!(encode_ac(&scanned), vec![AcToken::Run { zeros: 2, value: 7 }]);
    }

    #[test]
    fn test_all_zero_ac_is_single_end_of_block() {
        assert_eq!(encode_ac(&[9, 0, 0, 0]), vec![AcToken::EndOfBlock]);
    }

    #[test]
    fn test_block_roundtrip_with_predictor() {
        let blocks: Vec<Vec<i32>> = vec![
            (0..64).map(|i| if i % 9 == 0 { 40 - i } else { 0 }).collect(),
            (0..64).map(|i| if i < 3 { 12 } else { 0 }).collect(),
            vec![-5; 64],
        ];
        let mut encoder_predictor = DcPredictor::new();
        let symbols: Vec<BlockSymbols> = blocks
            .iter()
            .map(|b| encode_block(b, &mut encoder_predictor))
            .collect();
        assert_eq!(symbols[0].dc_delta, 40);
        assert_eq!(symbols[1].dc_delta, 12 - 40);

        let mut decoder_predictor = DcPredictor::new();
        for (block, symbols) in blocks.iter().zip(symbols.iter()) {
            let mut scanned = vec![99; 64];
            decode_block(symbols, &mut decoder_predictor, &mut scanned).unwrap();
            assert_eq!(&scanned, block);
        }
    }

    #[test]
    fn test_overflowing_run_is_rejected() {
        let mut scanned = [0i32; 8];
        let tokens = [AcToken::Run { zeros: 7, value: 1 }];
        assert!(matches!(
            decode_ac(&tokens, &mut scanned),
            Err(CodecError::RunLengthOverflow)
        ));
    }

    #[test]
    fn test_nonzero_positions() {
        let symbols = BlockSymbols {
            dc_delta: 0,
            ac: vec![
                AcToken::Run { zeros: 2, value: 3 },
                AcToken::Run { zeros: 0, value: -1 },
                AcToken::EndOfBlock,
            ],
        };
        assert_eq!(symbols.nonzero_positions(), vec![(3, 3), (4, -1)]);
    }
}
