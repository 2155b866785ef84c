//! Mapping between N-dimensional sample planes and sequences of hypercube blocks.
//!
//! Coordinates are mixed radix with axis 0 varying fastest, both for pixels in a
//! plane and for coefficients inside a block. Blocks are enumerated in the same
//! order over the per-axis block counts.

use crate::constants::BLOCK_SIZE;
use crate::error::CodecError;

/// Number of coefficients in a block of dimension `d`.
pub const fn block_len(d: usize) -> usize {
    BLOCK_SIZE.pow(d as u32)
}

/// Iterative mixed-radix enumerator over all coordinates within `extents`.
#[derive(Debug, Clone)]
pub struct MultiIndex<const D: usize> {
    extents: [usize; D],
    current: [usize; D],
    done: bool,
}

impl<const D: usize> MultiIndex<D> {
    pub fn new(extents: [usize; D]) -> Self {
        Self {
            extents,
            current: [0; D],
            done: extents.iter().any(|&e| e == 0),
        }
    }

    /// Restarts the enumeration from the origin.
    pub fn reset(&mut self) {
        self.current = [0; D];
        self.done = self.extents.iter().any(|&e| e == 0);
    }
}

impl<const D: usize> Iterator for MultiIndex<D> {
    type Item = [usize; D];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.current;

        let mut axis = 0;
        loop {
            if axis == D {
                self.done = true;
                break;
            }
            self.current[axis] += 1;
            if self.current[axis] < self.extents[axis] {
                break;
            }
            self.current[axis] = 0;
            axis += 1;
        }
        Some(item)
    }
}

/// Encodes a coordinate as a linear index using each axis extent as its radix.
pub fn linear_index<const D: usize>(coord: &[usize; D], extents: &[usize; D]) -> usize {
    let mut index = 0;
    for axis in (0..D).rev() {
        index = index * extents[axis] + coord[axis];
    }
    index
}

/// The block partitioning of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid<const D: usize> {
    dims: [usize; D],
    blocks_per_axis: [usize; D],
}

impl<const D: usize> BlockGrid<D> {
    pub fn new(dims: [usize; D]) -> Result<Self, CodecError> {
        let mut blocks_per_axis = [0; D];
        for axis in 0..D {
            if dims[axis] == 0 {
                return Err(CodecError::ZeroExtent { axis });
            }
            blocks_per_axis[axis] = dims[axis].div_ceil(BLOCK_SIZE);
        }
        Ok(Self {
            dims,
            blocks_per_axis,
        })
    }

    pub fn block_count(&self) -> usize {
        self.blocks_per_axis.iter().product()
    }

    pub fn sample_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Origins (in sample coordinates) of every block, in coding order.
    pub fn block_origins(&self) -> impl Iterator<Item = [usize; D]> {
        MultiIndex::new(self.blocks_per_axis).map(|block| block.map(|b| b * BLOCK_SIZE))
    }

    /// Copies one block out of `plane`; positions at or beyond an axis extent read as zero.
    pub fn extract(&self, plane: &[f32], origin: &[usize; D], block: &mut [f32]) {
        debug_assert_eq!(block.len(), block_len(D));
        for (offset, value) in MultiIndex::new([BLOCK_SIZE; D]).zip(block.iter_mut()) {
            *value = match self.source_index(origin, &offset) {
                Some(index) => plane[index],
                None => 0.0,
            };
        }
    }

    /// Writes the in-range part of `block` back into `plane`, dropping the padding.
    pub fn insert(&self, block: &[f32], origin: &[usize; D], plane: &mut [f32]) {
        debug_assert_eq!(block.len(), block_len(D));
        for (offset, value) in MultiIndex::new([BLOCK_SIZE; D]).zip(block.iter()) {
            if let Some(index) = self.source_index(origin, &offset) {
                plane[index] = *value;
            }
        }
    }

    fn source_index(&self, origin: &[usize; D], offset: &[usize; D]) -> Option<usize> {
        let mut coord = [0; D];
        for axis in 0..D {
            coord[axis] = origin[axis] + offset[axis];
            if coord[axis] >= self.dims[axis] {
                return None;
            }
        }
        Some(linear_index(&coord, &self.dims))
    }
}

/// Splits a plane into zero-padded blocks in coding order.
pub fn decompose<const D: usize>(plane: &[f32], dims: [usize; D]) -> Result<Vec<Vec<f32>>, CodecError> {
    let grid = BlockGrid::new(dims)?;
    Ok(grid
        .block_origins()
        .map(|origin| {
            let mut block = vec![0.0f32; block_len(D)];
            grid.extract(plane, &origin, &mut block);
            block
        })
        .collect())
}

/// Reassembles a plane from blocks produced by [`decompose`].
pub fn compose<const D: usize>(blocks: &[Vec<f32>], dims: [usize; D]) -> Result<Vec<f32>, CodecError> {
    let grid = BlockGrid::new(dims)?;
    let mut plane = vec![0.0f32; grid.sample_count()];
    for (block, origin) in blocks.iter().zip(grid.block_origins()) {
        grid.insert(block, &origin, &mut plane);
    }
    Ok(plane)
}
