//! Decoder orchestration: codestream → blocks → interleaved samples.

use log::{debug, trace};

use crate::block_model::{block_len, BlockGrid};
use crate::codec::dct::inverse_dct;
use crate::codec::quantization::dequantize_block;
use crate::codec::run_length::{decode_block, DcPredictor};
use crate::codec::scan_decoder::{CabacScanDecoder, HuffmanScanDecoder, ScanDecoder};
use crate::color;
use crate::error::CodecError;
use crate::stream_reader::StreamReader;
use crate::traits::Sample;
use crate::{ColorModel, DecodedImage, Dimensionality, EntropyCoding, Samples, StreamHeader};

pub struct Decoder<'a> {
    source: &'a [u8],
    header: Option<StreamHeader>,
    payload_offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            header: None,
            payload_offset: 0,
        }
    }

    /// Parses and validates the header; later calls return the cached result.
    pub fn read_header(&mut self) -> Result<&StreamHeader, CodecError> {
        if self.header.is_none() {
            let mut reader = StreamReader::new(self.source);
            let header = reader.read_header()?;
            self.payload_offset = reader.position();
            self.header = Some(header);
        }
        self.header.as_ref().ok_or(CodecError::TruncatedHeader)
    }

    pub fn decode(&mut self) -> Result<DecodedImage, CodecError> {
        self.read_header()?;
        let header = self.header.as_ref().ok_or(CodecError::TruncatedHeader)?;
        let payload = &self.source[self.payload_offset..];
        debug!("decoding {} payload byte(s)", payload.len());

        let planes = match header.dimensionality {
            Dimensionality::Two => decode_volume::<2>(header, payload)?,
            Dimensionality::Three => decode_volume::<3>(header, payload)?,
            Dimensionality::Four => decode_volume::<4>(header, payload)?,
        };

        let samples = match header.bits_per_sample {
            8 => Samples::Eight(interleave(&planes)?),
            _ => Samples::Sixteen(interleave(&planes)?),
        };
        Ok(DecodedImage {
            info: header.info(),
            bits_per_sample: header.bits_per_sample as u32,
            samples,
        })
    }
}

fn decode_volume<const D: usize>(header: &StreamHeader, payload: &[u8]) -> Result<Vec<Vec<f32>>, CodecError> {
    let dims: [usize; D] = header
        .dims
        .as_slice()
        .try_into()
        .map_err(|_| CodecError::UnsupportedDimensionCount(header.dims.len()))?;
    let grid = BlockGrid::new(dims)?;
    check_payload_capacity(grid.block_count(), header, payload.len())?;

    match header.entropy {
        EntropyCoding::Huffman => {
            let tables = header
                .huffman_tables
                .as_ref()
                .ok_or(CodecError::InvalidHeaderField("huffman tables"))?;
            let mut scan = HuffmanScanDecoder::new(payload, tables, D, header.precondition);
            reconstruct_blocks(&grid, header, &mut scan)
        }
        EntropyCoding::Cabac => {
            let mut scan = CabacScanDecoder::new(payload, &header.traversal)?;
            reconstruct_blocks(&grid, header, &mut scan)
        }
    }
}

/// Inverse of the encoder's block loop; planes come back in the sample domain.
fn reconstruct_blocks<const D: usize, R: ScanDecoder>(
    grid: &BlockGrid<D>,
    header: &StreamHeader,
    scan: &mut R,
) -> Result<Vec<Vec<f32>>, CodecError> {
    let bits = header.bits_per_sample as u32;
    let n = block_len(D);
    let mut planes = (0..header.plane_count)
        .map(|_| allocate(grid.sample_count(), 0.0f32))
        .collect::<Result<Vec<_>, _>>()?;
    let mut predictors = vec![DcPredictor::new(); header.plane_count];
    let mut blocks = vec![vec![0.0f32; n]; header.plane_count];
    let mut scanned = vec![0i32; n];
    let mut quantized = vec![0i32; n];

    for (index, origin) in grid.block_origins().enumerate() {
        for (p, block) in blocks.iter_mut().enumerate() {
            let class = header.table_class(p);
            let symbols = scan.decode_block(class)?;
            trace!("block {} {:?} plane {}: dc delta {}", index, origin, p, symbols.dc_delta);
            decode_block(&symbols, &mut predictors[p], &mut scanned)?;
            header.traversal.restore(&scanned, &mut quantized);
            dequantize_block(&quantized, header.quant_table(class), block);
            inverse_dct::<D>(block);
            color::unshift(block, bits);
        }
        if header.color_model == ColorModel::YCbCr {
            color::inverse_blocks(&mut blocks, bits);
        }
        for (block, plane) in blocks.iter().zip(planes.iter_mut()) {
            grid.insert(block, &origin, plane);
        }
    }
    scan.finish()?;
    Ok(planes)
}

/// Rejects headers announcing more blocks than the payload could hold.
///
/// A Huffman block spends at least one bit. A CABAC block spends at least two
/// decisions, and every decision shrinks the range by at least 6, so at most
/// 43 decisions share one renormalization bit.
fn check_payload_capacity(block_count: usize, header: &StreamHeader, payload_len: usize) -> Result<(), CodecError> {
    let coded_blocks = block_count
        .checked_mul(header.plane_count)
        .ok_or(CodecError::ImageTooLarge)?;
    let payload_bits = payload_len.saturating_mul(8);
    let capacity = match header.entropy {
        EntropyCoding::Huffman => payload_bits,
        EntropyCoding::Cabac => payload_bits.saturating_add(1).saturating_mul(CABAC_BLOCKS_PER_BIT),
    };
    if coded_blocks > capacity {
        debug!("{} block(s) announced for {} payload bit(s)", coded_blocks, payload_bits);
        return Err(CodecError::TruncatedPayload);
    }
    Ok(())
}

const CABAC_BLOCKS_PER_BIT: usize = 32;

/// Allocates a filled buffer, reporting exhaustion instead of aborting.
fn allocate<T: Clone>(len: usize, value: T) -> Result<Vec<T>, CodecError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| CodecError::ImageTooLarge)?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// Rounds, clamps and interleaves planes into one sample buffer.
fn interleave<S: Sample>(planes: &[Vec<f32>]) -> Result<Vec<S>, CodecError> {
    let plane_count = planes.len();
    let pixels = planes.first().map_or(0, |plane| plane.len());
    let mut samples = Vec::new();
    samples
        .try_reserve_exact(pixels * plane_count)
        .map_err(|_| CodecError::ImageTooLarge)?;
    for i in 0..pixels {
        for plane in planes {
            samples.push(S::from_f32(plane[i]));
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave() {
        let planes = vec![vec![1.4, 4.0], vec![2.0, 300.0]];
        assert_eq!(interleave::<u8>(&planes).unwrap(), vec![1, 2, 4, 255]);
    }

    #[test]
    fn test_oversized_allocation_is_an_error() {
        assert!(matches!(allocate(usize::MAX / 2, 0.0f32), Err(CodecError::ImageTooLarge)));
        assert_eq!(allocate(3, 1.5f32).unwrap(), vec![1.5; 3]);
    }

    #[test]
    fn test_payload_capacity() {
        let data = crate::compress(&[7u8; 64], &crate::VolumeInfo::new(vec![8, 8], 1), 50).unwrap();
        let mut header = Decoder::new(&data).read_header().unwrap().clone();
        assert!(check_payload_capacity(8, &header, 1).is_ok());
        assert!(matches!(
            check_payload_capacity(9, &header, 1),
            Err(CodecError::TruncatedPayload)
        ));
        header.entropy = EntropyCoding::Cabac;
        assert!(check_payload_capacity(64, &header, 0).is_ok());
        assert!(check_payload_capacity(1 << 40, &header, 1000).is_err());
        header.plane_count = 3;
        assert!(matches!(
            check_payload_capacity(usize::MAX / 2, &header, 1),
            Err(CodecError::ImageTooLarge)
        ));
    }

    #[test]
    fn test_header_is_cached() {
        let data = crate::compress(&[7u8; 64], &crate::VolumeInfo::new(vec![8, 8], 1), 50).unwrap();
        let mut decoder = Decoder::new(&data);
        assert_eq!(decoder.read_header().unwrap().dims, vec![8, 8]);
        assert_eq!(decoder.read_header().unwrap().quality, 50);
        let image = decoder.decode().unwrap();
        assert_eq!(image.samples.len(), 64);
    }

    #[test]
    fn test_empty_input_is_format_error() {
        let error = Decoder::new(&[]).decode().unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Format);
    }
}
