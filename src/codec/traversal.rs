//! Diagonal ("zigzag") coefficient scan generalized to D dimensions.
//!
//! Positions are grouped by diagonal, the sum of their per-axis coordinates.
//! Successive diagonals are swept in alternating directions: ascending linear
//! index on odd diagonals and descending on even ones. For D=2 this is the
//! classical JPEG zigzag order.

use crate::block_model::block_len;
use crate::constants::BLOCK_SIZE;
use crate::error::CodecError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalTable {
    dimensions: usize,
    /// `order[scan_pos]` is the natural (linear) coefficient index.
    order: Vec<usize>,
    /// Diagonal of the coefficient visited at each scan position.
    diagonals: Vec<usize>,
}

impl TraversalTable {
    pub fn build(dimensions: usize) -> Self {
        let sums = diagonal_sums(dimensions);
        let mut order: Vec<usize> = (0..sums.len()).collect();
        order.sort_by_key(|&index| {
            let diagonal = sums[index];
            let sweep = if diagonal % 2 == 1 {
                index as isize
            } else {
                -(index as isize)
            };
            (diagonal, sweep)
        });
        Self::with_order(dimensions, order, &sums)
    }

    /// Accepts an explicit scan order; it must be a permutation of the block positions.
    pub fn from_order(dimensions: usize, order: Vec<usize>) -> Result<Self, CodecError> {
        let len = block_len(dimensions);
        if order.len() != len {
            return Err(CodecError::InvalidTraversalTable);
        }
        let mut seen = vec![false; len];
        for &index in &order {
            if index >= len || seen[index] {
                return Err(CodecError::InvalidTraversalTable);
            }
            seen[index] = true;
        }
        let sums = diagonal_sums(dimensions);
        Ok(Self::with_order(dimensions, order, &sums))
    }

    fn with_order(dimensions: usize, order: Vec<usize>, sums: &[usize]) -> Self {
        let diagonals = order.iter().map(|&index| sums[index]).collect();
        Self {
            dimensions,
            order,
            diagonals,
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_default(&self) -> bool {
        *self == Self::build(self.dimensions)
    }

    pub fn diagonal(&self, scan_pos: usize) -> usize {
        self.diagonals[scan_pos]
    }

    /// Number of distinct diagonals; sizes the per-diagonal CABAC contexts.
    pub fn diagonal_count(&self) -> usize {
        self.dimensions * (BLOCK_SIZE - 1) + 1
    }

    /// Natural order → scan order.
    pub fn reorder(&self, natural: &[i32], scanned: &mut [i32]) {
        for (out, &index) in scanned.iter_mut().zip(self.order.iter()) {
            *out = natural[index];
        }
    }

    /// Scan order → natural order.
    pub fn restore(&self, scanned: &[i32], natural: &mut [i32]) {
        for (&value, &index) in scanned.iter().zip(self.order.iter()) {
            natural[index] = value;
        }
    }
}

/// Per-axis coordinate sum of every linear block index (mixed radix, axis 0 fastest).
fn diagonal_sums(dimensions: usize) -> Vec<usize> {
    (0..block_len(dimensions))
        .map(|index| {
            let mut rest = index;
            let mut sum = 0;
            for _ in 0..dimensions {
                sum += rest % BLOCK_SIZE;
                rest /= BLOCK_SIZE;
            }
            sum
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Zigzag scan pattern for 8x8 blocks.
    const ZIGZAG_ORDER: [usize; 64] = [
        0,  1,  8, 16,  9,  2,  3, 10,
        17, 24, 32, 25, 18, 11,  4,  5,
        12, 19, 26, 33, 40, 48, 41, 34,
        27, 20, 13,  6,  7, 14, 21, 28,
        35, 42, 49, 56, 57, 50, 43, 36,
        29, 22, 15, 23, 30, 37, 44, 51,
        58, 59, 52, 45, 38, 31, 39, 46,
        53, 60, 61, 54, 47, 55, 62, 63,
    ];

    #[test]
    fn test_two_dimensional_is_jpeg_zigzag() {
        assert_eq!(TraversalTable::build(2).order(), &ZIGZAG_ORDER[..]);
    }

    #[test]
    fn test_traversal_is_bijection() {
        for d in 2..=4 {
            let table = TraversalTable::build(d);
            let mut seen = vec![false; block_len(d)];
            for &index in table.order() {
                assert!(!seen[index], "duplicate index {} for D={}", index, d);
                seen[index] = true;
            }
            assert!(seen.iter().all(|&s| s), "missing index for D={}", d);
        }
    }

    #[test]
    fn test_diagonals_are_non_decreasing() {
        let table = TraversalTable::build(3);
        assert_eq!(table.diagonal(0), 0);
        for pos in 1..table.len() {
            assert!(table.diagonal(pos) >= table.diagonal(pos - 1));
        }
        assert_eq!(table.diagonal(table.len() - 1), table.diagonal_count() - 1);
        assert_eq!(table.diagonal_count(), 22);
    }

    #[test]
    fn test_reorder_restore_is_lossless() {
        let table = TraversalTable::build(4);
        let natural: Vec<i32> = (0..4096).map(|v| v * 3 - 700).collect();
        let mut scanned = vec![0; 4096];
        table.reorder(&natural, &mut scanned);
        let mut restored = vec![0; 4096];
        table.restore(&scanned, &mut restored);
        assert_eq!(natural, restored);
    }

    #[test]
    fn test_custom_order_validation() {
        let mut order: Vec<usize> = (0..64).collect();
        let table = TraversalTable::from_order(2, order.clone()).unwrap();
        assert!(!table.is_default());
        assert!(TraversalTable::from_order(2, ZIGZAG_ORDER.to_vec()).unwrap().is_default());

        order[5] = 4;
        assert!(matches!(
            TraversalTable::from_order(2, order),
            Err(CodecError::InvalidTraversalTable)
        ));
        assert!(TraversalTable::from_order(2, vec![0; 10]).is_err());
    }
}
