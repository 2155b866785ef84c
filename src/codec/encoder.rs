//! Encoder orchestration: samples → blocks → entropy-coded codestream.

use log::{debug, trace};

use crate::block_model::{block_len, BlockGrid};
use crate::codec::dct::forward_dct;
use crate::codec::quantization::{quantize_block, validate_quality, QuantTable, TableClass};
use crate::codec::run_length::{encode_block, DcPredictor};
use crate::codec::scan_encoder::{CabacScanEncoder, HuffmanScanEncoder, ScanEncoder};
use crate::codec::traversal::TraversalTable;
use crate::color;
use crate::constants::MAXIMUM_PLANE_COUNT;
use crate::error::CodecError;
use crate::precondition::PreconditionKind;
use crate::stream_writer::StreamWriter;
use crate::traits::Sample;
use crate::{ColorModel, Dimensionality, EncoderOptions, EntropyCoding, StreamHeader, VolumeInfo};

#[derive(Debug, Clone, Default)]
pub struct Encoder {
    options: EncoderOptions,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn set_quality(&mut self, quality: u32) {
        self.options.quality = quality;
    }

    pub fn set_entropy_coding(&mut self, entropy: EntropyCoding) {
        self.options.entropy = entropy;
    }

    pub fn set_precondition(&mut self, precondition: PreconditionKind) {
        self.options.precondition = precondition;
    }

    /// `None` restores the automatic choice.
    pub fn set_color_model(&mut self, color_model: Option<ColorModel>) {
        self.options.color_model = color_model;
    }

    pub fn set_traversal_order(&mut self, order: Option<Vec<usize>>) {
        self.options.traversal_order = order;
    }

    /// Encodes an interleaved sample buffer into a complete codestream.
    pub fn encode<S: Sample>(&self, samples: &[S], info: &VolumeInfo) -> Result<Vec<u8>, CodecError> {
        let header = self.prepare_header::<S>(info)?;
        let expected = info.sample_count().ok_or(CodecError::ImageTooLarge)?;
        if samples.len() != expected {
            return Err(CodecError::SampleCountMismatch {
                expected,
                actual: samples.len(),
            });
        }

        debug!(
            "encoding {}D volume {:?}, {} plane(s) x {} bits, quality {}, {:?}, {:?}, {:?}",
            header.dimensionality.count(),
            header.dims,
            header.plane_count,
            header.bits_per_sample,
            header.quality,
            header.color_model,
            header.entropy,
            header.precondition
        );

        match header.dimensionality {
            Dimensionality::Two => encode_volume::<2, S>(samples, header),
            Dimensionality::Three => encode_volume::<3, S>(samples, header),
            Dimensionality::Four => encode_volume::<4, S>(samples, header),
        }
    }

    /// Validates the options against `info` and builds every table the stream carries.
    fn prepare_header<S: Sample>(&self, info: &VolumeInfo) -> Result<StreamHeader, CodecError> {
        let options = &self.options;
        validate_quality(options.quality)?;
        let dimensionality = info.dimensionality()?;
        let d = dimensionality.count();
        if let Some(axis) = info.dims.iter().position(|&extent| extent == 0) {
            return Err(CodecError::ZeroExtent { axis });
        }
        if info.plane_count == 0 || info.plane_count > MAXIMUM_PLANE_COUNT {
            return Err(CodecError::InvalidPlaneCount(info.plane_count));
        }
        if options.entropy == EntropyCoding::Cabac && !options.precondition.is_none() {
            return Err(CodecError::PreconditionRequiresHuffman);
        }

        let color_model = match options.color_model {
            Some(ColorModel::YCbCr) if info.plane_count != 3 => {
                return Err(CodecError::InvalidPlaneCount(info.plane_count));
            }
            Some(model) => model,
            None if info.plane_count == 3 => ColorModel::YCbCr,
            None => ColorModel::None,
        };

        let traversal = match &options.traversal_order {
            Some(order) => TraversalTable::from_order(d, order.clone())?,
            None => TraversalTable::build(d),
        };

        Ok(StreamHeader {
            dimensionality,
            dims: info.dims.clone(),
            bits_per_sample: S::BITS as u8,
            plane_count: info.plane_count,
            quality: options.quality as u8,
            color_model,
            entropy: options.entropy,
            precondition: options.precondition,
            quant_tables: [
                QuantTable::build(d, TableClass::Luma, options.quality)?,
                QuantTable::build(d, TableClass::Chroma, options.quality)?,
            ],
            traversal,
            huffman_tables: None,
        })
    }
}

fn encode_volume<const D: usize, S: Sample>(samples: &[S], mut header: StreamHeader) -> Result<Vec<u8>, CodecError> {
    let dims: [usize; D] = header
        .dims
        .as_slice()
        .try_into()
        .map_err(|_| CodecError::UnsupportedDimensionCount(header.dims.len()))?;
    let grid = BlockGrid::new(dims)?;
    let planes = deinterleave(samples, header.plane_count);

    let payload = match header.entropy {
        EntropyCoding::Huffman => {
            let mut scan = HuffmanScanEncoder::new(D, header.precondition);
            code_blocks::<D, _>(&grid, &planes, &header, &mut scan)?;
            let (tables, payload) = scan.finish()?;
            header.huffman_tables = Some(tables);
            payload
        }
        EntropyCoding::Cabac => {
            let mut scan = CabacScanEncoder::new(&header.traversal);
            code_blocks::<D, _>(&grid, &planes, &header, &mut scan)?;
            scan.finish()
        }
    };

    let mut writer = StreamWriter::new();
    writer.write_header(&header)?;
    let header_len = writer.len();
    writer.write_bytes(&payload);
    debug!(
        "encoded {} block(s) per plane: header {} bytes, payload {} bytes",
        grid.block_count(),
        header_len,
        payload.len()
    );
    Ok(writer.into_inner())
}

/// Runs every block through the pixel-domain stages and hands the resulting
/// symbols to the entropy backend: grid order, planes interleaved per block.
fn code_blocks<const D: usize, E: ScanEncoder>(
    grid: &BlockGrid<D>,
    planes: &[Vec<f32>],
    header: &StreamHeader,
    scan: &mut E,
) -> Result<(), CodecError> {
    let bits = header.bits_per_sample as u32;
    let n = block_len(D);
    let mut predictors = vec![DcPredictor::new(); header.plane_count];
    let mut blocks = vec![vec![0.0f32; n]; header.plane_count];
    let mut quantized = vec![0i32; n];
    let mut scanned = vec![0i32; n];

    for (index, origin) in grid.block_origins().enumerate() {
        for (plane, block) in planes.iter().zip(blocks.iter_mut()) {
            grid.extract(plane, &origin, block);
        }
        if header.color_model == ColorModel::YCbCr {
            color::forward_blocks(&mut blocks, bits);
        }

        for (p, block) in blocks.iter_mut().enumerate() {
            let class = header.table_class(p);
            color::shift(block, bits);
            forward_dct::<D>(block);
            quantize_block(block, header.quant_table(class), &mut quantized);
            header.traversal.reorder(&quantized, &mut scanned);
            let symbols = encode_block(&scanned, &mut predictors[p]);
            trace!("block {} {:?} plane {}: dc delta {}, {} ac token(s)", index, origin, p, symbols.dc_delta, symbols.ac.len());
            scan.encode_block(class, &symbols)?;
        }
    }
    Ok(())
}

/// Splits an interleaved buffer into one `f32` plane per channel.
fn deinterleave<S: Sample>(samples: &[S], plane_count: usize) -> Vec<Vec<f32>> {
    (0..plane_count)
        .map(|p| samples.iter().skip(p).step_by(plane_count).map(|s| s.to_f32()).collect())
        .collect()
}
