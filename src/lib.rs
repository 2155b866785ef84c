//! Block-transform codec for 2D images, 3D image stacks and 4D light fields.
//!
//! Samples are split into 8^D blocks, transformed with a separable DCT,
//! quantized, scanned diagonally and entropy coded with either canonical
//! Huffman codes or a context-adaptive binary arithmetic coder.
//!
//! ```no_run
//! use ndjpeg_rs::{compress, decompress, Samples, VolumeInfo};
//!
//! let info = VolumeInfo::new(vec![16, 16, 4], 1);
//! let samples = vec![128u8; 16 * 16 * 4];
//! let encoded = compress(&samples, &info, 90)?;
//! let decoded = decompress(&encoded)?;
//! assert!(matches!(decoded.samples, Samples::Eight(_)));
//! # Ok::<(), ndjpeg_rs::CodecError>(())
//! ```

pub mod bit_io;
pub mod block_model;
pub mod codec;
pub mod color;
pub mod constants;
pub mod error;
pub mod precondition;
pub mod stream_reader;
pub mod stream_writer;
pub mod traits;

use std::io::{Read, Write};

use num_enum::TryFromPrimitive;

pub use codec::decoder::Decoder;
pub use codec::encoder::Encoder;
pub use error::{CodecError, ErrorKind};
pub use precondition::{MtfHeuristic, PreconditionKind};
pub use traits::Sample;

use codec::huffman::HuffmanTableSet;
use codec::quantization::{QuantTable, TableClass};
use codec::traversal::TraversalTable;
use constants::{DEFAULT_QUALITY, MAGIC_2D, MAGIC_3D, MAGIC_4D};

/// Number of spatial axes of a volume; selects the block shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Dimensionality {
    Two = 2,
    Three = 3,
    Four = 4,
}

impl Dimensionality {
    pub fn from_count(count: usize) -> Result<Self, CodecError> {
        u8::try_from(count)
            .ok()
            .and_then(|value| Self::try_from(value).ok())
            .ok_or(CodecError::UnsupportedDimensionCount(count))
    }

    pub fn count(self) -> usize {
        self as usize
    }

    pub fn magic(self) -> &'static [u8; 6] {
        match self {
            Dimensionality::Two => MAGIC_2D,
            Dimensionality::Three => MAGIC_3D,
            Dimensionality::Four => MAGIC_4D,
        }
    }

    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        [Dimensionality::Two, Dimensionality::Three, Dimensionality::Four]
            .into_iter()
            .find(|d| d.magic().as_slice() == magic)
    }
}

/// Color model of the coded planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum ColorModel {
    /// Planes are coded as given.
    None = 0,
    /// Three RGB planes are converted to Y, Cb and Cr before coding.
    YCbCr = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, TryFromPrimitive)]
#[repr(u8)]
pub enum EntropyCoding {
    #[default]
    Huffman = 0,
    Cabac = 1,
}

/// Shape of a sample buffer: per-axis extents (axis 0 varies fastest) and the
/// number of interleaved planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub dims: Vec<usize>,
    pub plane_count: usize,
}

impl VolumeInfo {
    pub fn new(dims: Vec<usize>, plane_count: usize) -> Self {
        Self { dims, plane_count }
    }

    pub fn dimensionality(&self) -> Result<Dimensionality, CodecError> {
        Dimensionality::from_count(self.dims.len())
    }

    /// Pixels per plane, or `None` on overflow.
    pub fn pixel_count(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
    }

    /// Total samples across all planes, or `None` on overflow.
    pub fn sample_count(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(self.plane_count)
    }
}

/// Decoded sample buffer, typed by the stream's bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    Eight(Vec<u8>),
    Sixteen(Vec<u16>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Eight(samples) => samples.len(),
            Samples::Sixteen(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub info: VolumeInfo,
    pub bits_per_sample: u32,
    pub samples: Samples,
}

/// Encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Quality factor in `1..=100`.
    pub quality: u32,
    pub entropy: EntropyCoding,
    /// Only valid with [`EntropyCoding::Huffman`].
    pub precondition: PreconditionKind,
    /// `None` selects YCbCr for three planes and no transform otherwise.
    pub color_model: Option<ColorModel>,
    /// Custom coefficient scan order, written into the stream.
    pub traversal_order: Option<Vec<usize>>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY as u32,
            entropy: EntropyCoding::Huffman,
            precondition: PreconditionKind::None,
            color_model: None,
            traversal_order: None,
        }
    }
}

/// Everything before the entropy-coded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    pub dimensionality: Dimensionality,
    pub dims: Vec<usize>,
    pub bits_per_sample: u8,
    pub plane_count: usize,
    pub quality: u8,
    pub color_model: ColorModel,
    pub entropy: EntropyCoding,
    pub precondition: PreconditionKind,
    /// Luma then chroma.
    pub quant_tables: [QuantTable; 2],
    pub traversal: TraversalTable,
    /// Present for the Huffman backend only.
    pub huffman_tables: Option<HuffmanTableSet>,
}

impl StreamHeader {
    /// Planes 1 and 2 of a YCbCr stream use the chroma tables; everything else uses luma.
    pub fn table_class(&self, plane: usize) -> TableClass {
        if self.color_model == ColorModel::YCbCr && plane > 0 {
            TableClass::Chroma
        } else {
            TableClass::Luma
        }
    }

    pub fn quant_table(&self, class: TableClass) -> &QuantTable {
        &self.quant_tables[class.index()]
    }

    pub fn info(&self) -> VolumeInfo {
        VolumeInfo::new(self.dims.clone(), self.plane_count)
    }
}

/// Compresses `samples` with default options at the given quality.
pub fn compress<S: Sample>(samples: &[S], info: &VolumeInfo, quality: u32) -> Result<Vec<u8>, CodecError> {
    let options = EncoderOptions {
        quality,
        ..EncoderOptions::default()
    };
    compress_with(samples, info, &options)
}

pub fn compress_with<S: Sample>(
    samples: &[S],
    info: &VolumeInfo,
    options: &EncoderOptions,
) -> Result<Vec<u8>, CodecError> {
    Encoder::with_options(options.clone()).encode(samples, info)
}

/// Compresses into `destination`; write failures surface as [`CodecError::Io`].
pub fn compress_to<S: Sample, W: Write>(
    samples: &[S],
    info: &VolumeInfo,
    options: &EncoderOptions,
    destination: &mut W,
) -> Result<(), CodecError> {
    let encoded = compress_with(samples, info, options)?;
    destination.write_all(&encoded)?;
    destination.flush()?;
    Ok(())
}

pub fn decompress(source: &[u8]) -> Result<DecodedImage, CodecError> {
    Decoder::new(source).decode()
}

/// Reads the whole stream from `source` and decompresses it.
pub fn decompress_from<R: Read>(source: &mut R) -> Result<DecodedImage, CodecError> {
    let mut data = Vec::new();
    source.read_to_end(&mut data)?;
    decompress(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensionality_lookup() {
        assert_eq!(Dimensionality::from_count(3).unwrap(), Dimensionality::Three);
        assert!(matches!(
            Dimensionality::from_count(5),
            Err(CodecError::UnsupportedDimensionCount(5))
        ));
        assert!(Dimensionality::from_count(1).is_err());
        assert_eq!(Dimensionality::from_magic(b"NDJ4D\n"), Some(Dimensionality::Four));
        assert_eq!(Dimensionality::from_magic(b"NDJ4D"), None);
    }

    #[test]
    fn test_volume_counts() {
        let info = VolumeInfo::new(vec![10, 20, 3], 3);
        assert_eq!(info.pixel_count(), Some(600));
        assert_eq!(info.sample_count(), Some(1800));
        assert_eq!(VolumeInfo::new(vec![usize::MAX, 2], 1).pixel_count(), None);
    }

    #[test]
    fn test_default_options() {
        let options = EncoderOptions::default();
        assert_eq!(options.quality, 75);
        assert_eq!(options.entropy, EntropyCoding::Huffman);
        assert!(options.precondition.is_none());
    }
}
