use std::fmt::Debug;

/// A single channel value of a pixel.
pub trait Sample: Copy + Clone + Debug + Default + PartialEq + PartialOrd {
    const BITS: u32;
    const MAX_VALUE: i32;

    fn to_f32(self) -> f32;

    /// Rounds and clamps a reconstructed value into the sample range.
    fn from_f32(val: f32) -> Self;
}

impl Sample for u8 {
    const BITS: u32 = 8;
    const MAX_VALUE: i32 = 255;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(val: f32) -> Self {
        val.round().clamp(0.0, Self::MAX_VALUE as f32) as u8
    }
}

impl Sample for u16 {
    const BITS: u32 = 16;
    const MAX_VALUE: i32 = 65535;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(val: f32) -> Self {
        val.round().clamp(0.0, Self::MAX_VALUE as f32) as u16
    }
}

/// Largest representable value for the given bit depth.
pub fn maximum_sample_value(bits_per_sample: u32) -> f32 {
    ((1u32 << bits_per_sample) - 1) as f32
}

/// Mid-range value for the given bit depth (128 for 8-bit samples).
pub fn mid_sample_value(bits_per_sample: u32) -> f32 {
    (1u32 << (bits_per_sample - 1)) as f32
}
