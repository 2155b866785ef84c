//! Move-to-front recoding of symbols into list ranks.

use crate::constants::{FREQUENCY_THRESHOLD, HUFFMAN_ALPHABET_SIZE};
use crate::error::CodecError;

use super::{MtfHeuristic, SymbolTransform};

/// Self-organizing symbol list. Each coded symbol is replaced by its current
/// rank, after which the list is reordered according to the heuristic.
///
/// The list persists across blocks, so one instance must see the blocks of a
/// class in stream order on both sides.
#[derive(Debug, Clone)]
pub struct MoveToFront {
    heuristic: MtfHeuristic,
    list: Vec<u16>,
    hits: Vec<u32>,
}

impl MoveToFront {
    pub fn new(heuristic: MtfHeuristic) -> Self {
        Self {
            heuristic,
            list: (0..HUFFMAN_ALPHABET_SIZE as u16).collect(),
            hits: vec![0; HUFFMAN_ALPHABET_SIZE],
        }
    }

    pub fn encode_symbol(&mut self, symbol: u16) -> Result<u16, CodecError> {
        let rank = self
            .list
            .iter()
            .position(|&s| s == symbol)
            .ok_or(CodecError::InvalidSymbol)?;
        self.promote(rank);
        Ok(rank as u16)
    }

    pub fn decode_symbol(&mut self, rank: u16) -> Result<u16, CodecError> {
        let rank = rank as usize;
        let symbol = *self.list.get(rank).ok_or(CodecError::InvalidSymbol)?;
        self.promote(rank);
        Ok(symbol)
    }

    fn promote(&mut self, rank: usize) {
        match self.heuristic {
            MtfHeuristic::MoveToFront => self.move_to(rank, 0),
            MtfHeuristic::MoveUpExceptFront => match rank {
                0 => {}
                1 => self.move_to(1, 0),
                _ => self.move_to(rank, 1),
            },
            MtfHeuristic::FrequencyThreshold => {
                let symbol = self.list[rank] as usize;
                self.hits[symbol] += 1;
                if self.hits[symbol] >= FREQUENCY_THRESHOLD {
                    self.hits[symbol] = 0;
                    self.move_to(rank, 0);
                } else if rank > 0 {
                    self.list.swap(rank, rank - 1);
                }
            }
            MtfHeuristic::DistanceScaled => self.move_to(rank, rank / 2),
        }
    }

    fn move_to(&mut self, from: usize, to: usize) {
        if from > to {
            self.list[to..=from].rotate_right(1);
        }
    }
}

impl SymbolTransform for MoveToFront {
    fn forward(&mut self, symbols: &[u16]) -> Result<(Vec<u16>, usize), CodecError> {
        let ranks = symbols
            .iter()
            .map(|&s| self.encode_symbol(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((ranks, 0))
    }

    fn inverse(&mut self, symbols: &[u16], _primary_index: usize) -> Result<Vec<u16>, CodecError> {
        symbols.iter().map(|&r| self.decode_symbol(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [MtfHeuristic; 4] = [
        MtfHeuristic::MoveToFront,
        MtfHeuristic::MoveUpExceptFront,
        MtfHeuristic::FrequencyThreshold,
        MtfHeuristic::DistanceScaled,
    ];

    #[test]
    fn test_move_to_front_ranks() {
        let mut mtf = MoveToFront::new(MtfHeuristic::MoveToFront);
        let (ranks, _) = mtf.forward(&[5, 5, 5, 2, 5]).unwrap();
        assert_eq!(ranks, vec![5, 0, 0, 3, 1]);
    }

    #[test]
    fn test_move_up_except_front() {
        let mut mtf = MoveToFront::new(MtfHeuristic::MoveUpExceptFront);
        // 9 goes to slot 1, then its second hit moves it to the front.
        let (ranks, _) = mtf.forward(&[9, 9, 9, 0]).unwrap();
        assert_eq!(ranks, vec![9, 1, 0, 1]);
    }

    #[test]
    fn test_frequency_threshold() {
        let mut mtf = MoveToFront::new(MtfHeuristic::FrequencyThreshold);
        // First hit transposes 4 with 3; the second hit (threshold 2) rotates it to the front.
        let (ranks, _) = mtf.forward(&[4, 4, 4]).unwrap();
        assert_eq!(ranks, vec![4, 3, 0]);
    }

    #[test]
    fn test_distance_scaled() {
        let mut mtf = MoveToFront::new(MtfHeuristic::DistanceScaled);
        let (ranks, _) = mtf.forward(&[8, 8, 8, 8]).unwrap();
        assert_eq!(ranks, vec![8, 4, 2, 1]);
    }

    #[test]
    fn test_every_heuristic_roundtrips_across_blocks() {
        let blocks: Vec<Vec<u16>> = vec![vec![1, 33, 1, 0], vec![480, 2, 2, 2, 511, 0], vec![33, 33, 1, 65, 0]];
        for heuristic in ALL {
            let mut encoder = MoveToFront::new(heuristic);
            let mut decoder = MoveToFront::new(heuristic);
            for block in &blocks {
                let (ranks, _) = encoder.forward(block).unwrap();
                assert_eq!(&decoder.inverse(&ranks, 0).unwrap(), block, "{:?}", heuristic);
            }
        }
    }

    #[test]
    fn test_out_of_alphabet() {
        let mut mtf = MoveToFront::new(MtfHeuristic::MoveToFront);
        assert!(mtf.encode_symbol(512).is_err());
        assert!(mtf.decode_symbol(600).is_err());
    }
}
