//! RGB ↔ YCbCr conversion (ITU-R BT.601, full range) and level shifting.

use crate::traits::{maximum_sample_value, mid_sample_value};

/// Converts one RGB pixel to luma/chroma, clamping each output to `[0, max]`.
pub fn rgb_to_ycbcr(r: f32, g: f32, b: f32, bits_per_sample: u32) -> (f32, f32, f32) {
    let max = maximum_sample_value(bits_per_sample);
    let mid = mid_sample_value(bits_per_sample);

    let luma = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = -0.168_736 * r - 0.331_264 * g + 0.5 * b + mid;
    let cr = 0.5 * r - 0.418_688 * g - 0.081_312 * b + mid;

    (luma.clamp(0.0, max), cb.clamp(0.0, max), cr.clamp(0.0, max))
}

/// Inverse of [`rgb_to_ycbcr`].
pub fn ycbcr_to_rgb(luma: f32, cb: f32, cr: f32, bits_per_sample: u32) -> (f32, f32, f32) {
    let max = maximum_sample_value(bits_per_sample);
    let mid = mid_sample_value(bits_per_sample);
    let cb = cb - mid;
    let cr = cr - mid;

    let r = luma + 1.402 * cr;
    let g = luma - 0.344_136 * cb - 0.714_136 * cr;
    let b = luma + 1.772 * cb;

    (r.clamp(0.0, max), g.clamp(0.0, max), b.clamp(0.0, max))
}

/// Converts three co-located RGB blocks to Y, Cb and Cr in place.
pub fn forward_blocks(planes: &mut [Vec<f32>], bits_per_sample: u32) {
    let [red, green, blue] = planes else {
        return;
    };
    for ((r, g), b) in red.iter_mut().zip(green.iter_mut()).zip(blue.iter_mut()) {
        let (y, cb, cr) = rgb_to_ycbcr(*r, *g, *b, bits_per_sample);
        *r = y;
        *g = cb;
        *b = cr;
    }
}

/// Converts three co-located Y, Cb and Cr blocks back to RGB in place.
pub fn inverse_blocks(planes: &mut [Vec<f32>], bits_per_sample: u32) {
    let [luma, cb, cr] = planes else {
        return;
    };
    for ((y, u), v) in luma.iter_mut().zip(cb.iter_mut()).zip(cr.iter_mut()) {
        let (r, g, b) = ycbcr_to_rgb(*y, *u, *v, bits_per_sample);
        *y = r;
        *u = g;
        *v = b;
    }
}

/// Centers samples around zero ahead of the cosine transform.
pub fn shift(block: &mut [f32], bits_per_sample: u32) {
    let mid = mid_sample_value(bits_per_sample);
    block.iter_mut().for_each(|v| *v -= mid);
}

pub fn unshift(block: &mut [f32], bits_per_sample: u32) {
    let mid = mid_sample_value(bits_per_sample);
    block.iter_mut().for_each(|v| *v += mid);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_maps_to_neutral_chroma() {
        let (y, cb, cr) = rgb_to_ycbcr(100.0, 100.0, 100.0, 8);
        assert!((y - 100.0).abs() < 1e-3);
        assert!((cb - 128.0).abs() < 1e-3);
        assert!((cr - 128.0).abs() < 1e-3);
    }

    #[test]
    fn test_color_roundtrip_within_rounding() {
        for &(r, g, b) in &[(0.0, 0.0, 0.0), (200.0, 30.0, 60.0), (12.0, 200.0, 77.0), (255.0, 255.0, 255.0)] {
            let (y, cb, cr) = rgb_to_ycbcr(r, g, b, 8);
            let (r2, g2, b2) = ycbcr_to_rgb(y, cb, cr, 8);
            assert!((r - r2).abs() < 0.5, "r {r} vs {r2}");
            assert!((g - g2).abs() < 0.5, "g {g} vs {g2}");
            assert!((b - b2).abs() < 0.5, "b {b} vs {b2}");
        }
    }

    #[test]
    fn test_sixteen_bit_uses_scaled_midpoint() {
        let (_, cb, cr) = rgb_to_ycbcr(40000.0, 40000.0, 40000.0, 16);
        assert!((cb - 32768.0).abs() < 0.5);
        assert!((cr - 32768.0).abs() < 0.5);
    }

    #[test]
    fn test_shift_unshift() {
        let mut block = vec![0.0, 128.0, 255.0];
        shift(&mut block, 8);
        assert_eq!(block, vec![-128.0, 0.0, 127.0]);
        unshift(&mut block, 8);
        assert_eq!(block, vec![0.0, 128.0, 255.0]);
    }

    #[test]
    fn test_block_conversion_roundtrip() {
        let mut planes = vec![vec![10.0, 250.0], vec![20.0, 5.0], vec![30.0, 128.0]];
        let original = planes.clone();
        forward_blocks(&mut planes, 8);
        inverse_blocks(&mut planes, 8);
        for (p, o) in planes.iter().zip(original.iter()) {
            for (a, b) in p.iter().zip(o.iter()) {
                assert!((a - b).abs() < 0.5);
            }
        }
    }
}
