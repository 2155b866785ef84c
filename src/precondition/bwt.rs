//! Burrows-Wheeler transform over symbol sequences.

use crate::error::CodecError;

use super::SymbolTransform;

/// Sorts the cyclic rotations of a block's symbols and keeps the last column.
#[derive(Debug, Clone, Copy, Default)]
pub struct BurrowsWheeler;

impl SymbolTransform for BurrowsWheeler {
    fn forward(&mut self, symbols: &[u16]) -> Result<(Vec<u16>, usize), CodecError> {
        Ok(forward(symbols))
    }

    fn inverse(&mut self, symbols: &[u16], primary_index: usize) -> Result<Vec<u16>, CodecError> {
        inverse(symbols, primary_index)
    }
}

/// Returns the last column of the sorted rotation matrix and the row holding
/// the unrotated input.
pub fn forward(symbols: &[u16]) -> (Vec<u16>, usize) {
    let n = symbols.len();
    if n == 0 {
        return (Vec::new(), 0);
    }
    let order = sort_rotations(symbols);
    let last = order.iter().map(|&start| symbols[(start + n - 1) % n]).collect();
    let primary_index = order.iter().position(|&start| start == 0).unwrap_or(0);
    (last, primary_index)
}

pub fn inverse(last: &[u16], primary_index: usize) -> Result<Vec<u16>, CodecError> {
    let n = last.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if primary_index >= n {
        return Err(CodecError::InvalidSymbol);
    }

    let alphabet = last.iter().map(|&s| s as usize).max().unwrap_or(0) + 1;
    let mut starts = vec![0usize; alphabet + 1];
    for &s in last {
        starts[s as usize + 1] += 1;
    }
    for i in 1..starts.len() {
        starts[i] += starts[i - 1];
    }

    // LF mapping: row of the rotation that starts with the last symbol of row i.
    let mut seen = vec![0usize; alphabet];
    let lf: Vec<usize> = last
        .iter()
        .map(|&s| {
            let s = s as usize;
            let row = starts[s] + seen[s];
            seen[s] += 1;
            row
        })
        .collect();

    let mut output = vec![0u16; n];
    let mut row = primary_index;
    for slot in output.iter_mut().rev() {
        *slot = last[row];
        row = lf[row];
    }
    Ok(output)
}

/// Rotation start positions in sorted order, by prefix doubling.
fn sort_rotations(symbols: &[u16]) -> Vec<usize> {
    let n = symbols.len();
    let mut rank: Vec<usize> = symbols.iter().map(|&s| s as usize).collect();
    let mut order: Vec<usize> = (0..n).collect();
    let mut k = 1;
    loop {
        let key = |i: usize| (rank[i], rank[(i + k) % n]);
        order.sort_by_key(|&i| key(i));
        let mut next = vec![0usize; n];
        for w in 1..n {
            let (a, b) = (order[w - 1], order[w]);
            next[b] = next[a] + usize::from(key(a) != key(b));
        }
        rank = next;
        if rank[order[n - 1]] == n - 1 || k >= n {
            break;
        }
        k *= 2;
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banana() {
        let text: Vec<u16> = b"banana".iter().map(|&b| b as u16).collect();
        let (last, primary) = forward(&text);
        let expected: Vec<u16> = b"nnbaaa".iter().map(|&b| b as u16).collect();
        assert_eq!(last, expected);
        assert_eq!(primary, 3);
        assert_eq!(inverse(&last, primary).unwrap(), text);
    }

    #[test]
    fn test_periodic_and_degenerate_inputs() {
        for input in [vec![], vec![7u16], vec![3; 40], vec![1, 2, 1, 2, 1, 2], vec![480, 0, 480, 0, 511]] {
            let (last, primary) = forward(&input);
            assert_eq!(inverse(&last, primary).unwrap(), input);
        }
    }

    #[test]
    fn test_long_sequence_roundtrip() {
        let input: Vec<u16> = (0..4095u32).map(|i| ((i * i + 7 * i) % 37) as u16).collect();
        let mut transform = BurrowsWheeler;
        let (last, primary) = transform.forward(&input).unwrap();
        assert_eq!(transform.inverse(&last, primary).unwrap(), input);
    }

    #[test]
    fn test_primary_index_out_of_range() {
        assert!(matches!(inverse(&[1, 2, 3], 3), Err(CodecError::InvalidSymbol)));
    }
}
