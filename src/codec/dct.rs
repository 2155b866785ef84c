//! Separable D-dimensional DCT-II over blocks of side `BLOCK_SIZE`.

use std::f32::consts::PI;
use std::sync::OnceLock;

use crate::block_model::block_len;
use crate::constants::BLOCK_SIZE;

type Basis = [[f32; BLOCK_SIZE]; BLOCK_SIZE];

/// Orthonormal 1D basis: `basis[k][n] = 0.5 * alpha(k) * cos((2n+1)kπ/16)`.
fn basis() -> &'static Basis {
    static BASIS: OnceLock<Basis> = OnceLock::new();
    BASIS.get_or_init(|| {
        let mut basis = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];
        let scale = (2.0 / BLOCK_SIZE as f32).sqrt();
        for (k, row) in basis.iter_mut().enumerate() {
            let alpha = if k == 0 { 1.0 / 2.0f32.sqrt() } else { 1.0 };
            for (n, value) in row.iter_mut().enumerate() {
                let angle = ((2 * n + 1) * k) as f32 * PI / (2 * BLOCK_SIZE) as f32;
                *value = scale * alpha * angle.cos();
            }
        }
        basis
    })
}

/// Forward transform of a block of dimension `D`, in place.
pub fn forward_dct<const D: usize>(block: &mut [f32]) {
    transform_axes::<D>(block, |line, out, basis| {
        for k in 0..BLOCK_SIZE {
            out[k] = (0..BLOCK_SIZE).map(|n| basis[k][n] * line[n]).sum();
        }
    });
}

/// Inverse transform of a block of dimension `D`, in place.
pub fn inverse_dct<const D: usize>(block: &mut [f32]) {
    transform_axes::<D>(block, |line, out, basis| {
        for n in 0..BLOCK_SIZE {
            out[n] = (0..BLOCK_SIZE).map(|k| basis[k][n] * line[k]).sum();
        }
    });
}

fn transform_axes<const D: usize>(
    block: &mut [f32],
    kernel: impl Fn(&[f32; BLOCK_SIZE], &mut [f32; BLOCK_SIZE], &Basis),
) {
    debug_assert_eq!(block.len(), block_len(D));
    let basis = basis();
    let mut line = [0.0f32; BLOCK_SIZE];
    let mut out = [0.0f32; BLOCK_SIZE];

    for axis in 0..D {
        let stride = BLOCK_SIZE.pow(axis as u32);
        for start in 0..block.len() {
            // Only visit the first element of each line along `axis`.
            if (start / stride) % BLOCK_SIZE != 0 {
                continue;
            }
            for n in 0..BLOCK_SIZE {
                line[n] = block[start + n * stride];
            }
            kernel(&line, &mut out, basis);
            for n in 0..BLOCK_SIZE {
                block[start + n * stride] = out[n];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct 2D formula, used as an oracle for the separable implementation.
    fn fdct_8x8(input: &[f32], output: &mut [f32]) {
        for u in 0..8 {
            for v in 0..8 {
                let mut sum = 0.0f32;
                for x in 0..8 {
                    for y in 0..8 {
                        let cos_x = (((2 * x + 1) * u) as f32 * PI) / 16.0;
                        let cos_y = (((2 * y + 1) * v) as f32 * PI) / 16.0;
                        sum += input[x * 8 + y] * cos_x.cos() * cos_y.cos();
                    }
                }
                let cu = if u == 0 { 1.0 / 2.0f32.sqrt() } else { 1.0 };
                let cv = if v == 0 { 1.0 / 2.0f32.sqrt() } else { 1.0 };
                output[u * 8 + v] = 0.25 * cu * cv * sum;
            }
        }
    }

    #[test]
    fn test_fdct_idct_dc_only() {
        let input = [-128.0f32; 64];
        let mut block = input.to_vec();
        forward_dct::<2>(&mut block);
        assert!((block[0] - (-1024.0)).abs() < 0.01);
        assert!(block[1..].iter().all(|c| c.abs() < 0.01));

        inverse_dct::<2>(&mut block);
        for i in 0..64 {
            assert!((input[i] - block[i]).abs() < 0.1, "Mismatch at {}: {} vs {}", i, input[i], block[i]);
        }
    }

    #[test]
    fn test_separable_matches_direct_2d() {
        let input: Vec<f32> = (0..64).map(|i| ((i * 37) % 255) as f32 - 128.0).collect();
        let mut expected = vec![0.0f32; 64];
        fdct_8x8(&input, &mut expected);

        let mut block = input.clone();
        forward_dct::<2>(&mut block);
        for i in 0..64 {
            assert!((expected[i] - block[i]).abs() < 0.05, "coef {}: {} vs {}", i, expected[i], block[i]);
        }
    }

    #[test]
    fn test_roundtrip_higher_dimensions() {
        for_dims::<3>();
        for_dims::<4>();
    }

    fn for_dims<const D: usize>() {
        let len = block_len(D);
        let input: Vec<f32> = (0..len).map(|i| ((i * 91) % 256) as f32 - 128.0).collect();
        let mut block = input.clone();
        forward_dct::<D>(&mut block);
        inverse_dct::<D>(&mut block);
        for i in 0..len {
            assert!((input[i] - block[i]).abs() < 0.05, "D={} index {}", D, i);
        }
    }

    #[test]
    fn test_energy_is_preserved() {
        let input: Vec<f32> = (0..512).map(|i| ((i * 13) % 97) as f32).collect();
        let mut block = input.clone();
        forward_dct::<3>(&mut block);
        let before: f32 = input.iter().map(|v| v * v).sum();
        let after: f32 = block.iter().map(|v| v * v).sum();
        assert!((before - after).abs() / before < 1e-4);
    }
}
