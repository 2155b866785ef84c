//! Codestream reader: validates the magic and header fields and rebuilds the
//! tables the decoder needs.

use log::debug;

use crate::block_model::block_len;
use crate::codec::huffman::{HuffmanTable, HuffmanTableSet};
use crate::codec::quantization::QuantTable;
use crate::codec::traversal::TraversalTable;
use crate::constants::{
    HUFFMAN_ALPHABET_SIZE, MAGIC_LENGTH, MAX_CODE_LENGTH, MAXIMUM_QUALITY, MINIMUM_QUALITY,
};
use crate::error::CodecError;
use crate::precondition::PreconditionKind;
use crate::{ColorModel, Dimensionality, EntropyCoding, StreamHeader};

pub struct StreamReader<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> StreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self { source, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining_data(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let value = *self.source.get(self.position).ok_or(CodecError::TruncatedHeader)?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.read_bytes(8)?;
        let mut buffer = [0u8; 8];
        buffer.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buffer))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], CodecError> {
        let end = self.position.checked_add(count).ok_or(CodecError::TruncatedHeader)?;
        let bytes = self.source.get(self.position..end).ok_or(CodecError::TruncatedHeader)?;
        self.position = end;
        Ok(bytes)
    }

    pub fn read_magic(&mut self) -> Result<Dimensionality, CodecError> {
        if self.source.len() < self.position + MAGIC_LENGTH {
            let available = &self.source[self.position..];
            // A short prefix of a valid token is a truncation, anything else is not ours.
            let is_prefix = [2, 3, 4].into_iter().any(|d| {
                Dimensionality::from_count(d).is_ok_and(|dim| dim.magic().starts_with(available))
            });
            return Err(if is_prefix {
                CodecError::TruncatedHeader
            } else {
                CodecError::InvalidMagic
            });
        }
        let magic = self.read_bytes(MAGIC_LENGTH)?;
        Dimensionality::from_magic(magic).ok_or(CodecError::InvalidMagic)
    }

    pub fn read_header(&mut self) -> Result<StreamHeader, CodecError> {
        let dimensionality = self.read_magic()?;
        let d = dimensionality.count();

        let mut dims = Vec::with_capacity(d);
        for _ in 0..d {
            let extent = usize::try_from(self.read_u64()?).map_err(|_| CodecError::ImageTooLarge)?;
            if extent == 0 {
                return Err(CodecError::InvalidHeaderField("extent"));
            }
            dims.push(extent);
        }

        let bits_per_sample = self.read_u8()?;
        if bits_per_sample != 8 && bits_per_sample != 16 {
            return Err(CodecError::InvalidHeaderField("bits per sample"));
        }
        let plane_count = self.read_u8()? as usize;
        if plane_count == 0 {
            return Err(CodecError::InvalidHeaderField("plane count"));
        }
        dims.iter()
            .try_fold(plane_count, |acc, &extent| acc.checked_mul(extent))
            .ok_or(CodecError::ImageTooLarge)?;

        let quality = self.read_u8()?;
        if !(MINIMUM_QUALITY..=MAXIMUM_QUALITY).contains(&(quality as u32)) {
            return Err(CodecError::InvalidHeaderField("quality"));
        }
        let color_model =
            ColorModel::try_from(self.read_u8()?).map_err(|_| CodecError::InvalidHeaderField("color model"))?;
        if color_model == ColorModel::YCbCr && plane_count != 3 {
            return Err(CodecError::InvalidHeaderField("color model"));
        }
        let entropy =
            EntropyCoding::try_from(self.read_u8()?).map_err(|_| CodecError::InvalidHeaderField("entropy coding"))?;
        let precondition = PreconditionKind::from_byte(self.read_u8()?)?;
        if entropy == EntropyCoding::Cabac && !precondition.is_none() {
            return Err(CodecError::InvalidHeaderField("precondition"));
        }

        let table_len = block_len(d);
        let luma = QuantTable::from_entries(self.read_bytes(table_len)?.to_vec())?;
        let chroma = QuantTable::from_entries(self.read_bytes(table_len)?.to_vec())?;
        let traversal = self.read_traversal(d)?;

        let huffman_tables = match entropy {
            EntropyCoding::Huffman => {
                let tables = [
                    self.read_huffman_table()?,
                    self.read_huffman_table()?,
                    self.read_huffman_table()?,
                    self.read_huffman_table()?,
                ];
                Some(HuffmanTableSet::from_stream_order(tables))
            }
            EntropyCoding::Cabac => None,
        };

        debug!(
            "header: {}D {:?}, {} plane(s) x {} bits, quality {}, {:?}/{:?}/{:?}, payload at {}",
            d, dims, plane_count, bits_per_sample, quality, color_model, entropy, precondition, self.position
        );

        Ok(StreamHeader {
            dimensionality,
            dims,
            bits_per_sample,
            plane_count,
            quality,
            color_model,
            entropy,
            precondition,
            quant_tables: [luma, chroma],
            traversal,
            huffman_tables,
        })
    }

    pub fn read_traversal(&mut self, dimensions: usize) -> Result<TraversalTable, CodecError> {
        match self.read_u8()? {
            0 => Ok(TraversalTable::build(dimensions)),
            1 => {
                let order = (0..block_len(dimensions))
                    .map(|_| self.read_u16().map(|index| index as usize))
                    .collect::<Result<Vec<_>, _>>()?;
                TraversalTable::from_order(dimensions, order)
            }
            _ => Err(CodecError::InvalidHeaderField("traversal flag")),
        }
    }

    pub fn read_huffman_table(&mut self) -> Result<HuffmanTable, CodecError> {
        let mut lengths = [0u16; MAX_CODE_LENGTH];
        let mut total_values = 0usize;
        for length in lengths.iter_mut() {
            *length = self.read_u16()?;
            total_values += *length as usize;
        }
        if total_values > HUFFMAN_ALPHABET_SIZE {
            return Err(CodecError::InvalidHuffmanTable);
        }

        let values = (0..total_values)
            .map(|_| self.read_u16())
            .collect::<Result<Vec<_>, _>>()?;
        HuffmanTable::build_from_counts(&lengths, &values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::quantization::TableClass;
    use crate::stream_writer::StreamWriter;

    fn sample_header(entropy: EntropyCoding) -> StreamHeader {
        let huffman_tables = (entropy == EntropyCoding::Huffman).then(|| {
            let mut freqs = vec![0u32; HUFFMAN_ALPHABET_SIZE];
            freqs[0] = 10;
            freqs[3] = 4;
            freqs[481] = 1;
            let table = HuffmanTable::build_from_weights(&freqs).unwrap();
            HuffmanTableSet::from_stream_order([table.clone(), table, HuffmanTable::new(), HuffmanTable::new()])
        });
        StreamHeader {
            dimensionality: Dimensionality::Three,
            dims: vec![17, 8, 3],
            bits_per_sample: 16,
            plane_count: 3,
            quality: 42,
            color_model: ColorModel::YCbCr,
            entropy,
            precondition: PreconditionKind::None,
            quant_tables: [
                QuantTable::build(3, TableClass::Luma, 42).unwrap(),
                QuantTable::build(3, TableClass::Chroma, 42).unwrap(),
            ],
            traversal: TraversalTable::build(3),
            huffman_tables,
        }
    }

    fn write(header: &StreamHeader) -> Vec<u8> {
        let mut writer = StreamWriter::new();
        writer.write_header(header).unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_header_roundtrip() {
        for entropy in [EntropyCoding::Huffman, EntropyCoding::Cabac] {
            let header = sample_header(entropy);
            let mut bytes = write(&header);
            bytes.extend_from_slice(&[0xAB, 0xCD]);

            let mut reader = StreamReader::new(&bytes);
            assert_eq!(reader.read_header().unwrap(), header);
            assert_eq!(reader.remaining_data(), &[0xAB, 0xCD]);
        }
    }

    #[test]
    fn test_layout_starts_with_magic_and_extents() {
        let bytes = write(&sample_header(EntropyCoding::Cabac));
        assert_eq!(&bytes[..6], b"NDJ3D\n");
        assert_eq!(&bytes[6..14], &17u64.to_be_bytes());
        assert_eq!(&bytes[30..36], &[16, 3, 42, 1, 1, 0]);
        assert_eq!(bytes.len(), 6 + 3 * 8 + 6 + 2 * 512 + 1);
    }

    #[test]
    fn test_custom_traversal_roundtrip() {
        let mut header = sample_header(EntropyCoding::Cabac);
        header.dimensionality = Dimensionality::Two;
        header.dims = vec![9, 9];
        header.quant_tables = [
            QuantTable::build(2, TableClass::Luma, 42).unwrap(),
            QuantTable::build(2, TableClass::Chroma, 42).unwrap(),
        ];
        header.traversal = TraversalTable::from_order(2, (0..64).rev().collect()).unwrap();
        let bytes = write(&header);
        assert_eq!(StreamReader::new(&bytes).read_header().unwrap(), header);
    }

    #[test]
    fn test_magic_errors() {
        assert!(matches!(StreamReader::new(b"").read_header(), Err(CodecError::TruncatedHeader)));
        assert!(matches!(StreamReader::new(b"NDJ").read_header(), Err(CodecError::TruncatedHeader)));
        assert!(matches!(StreamReader::new(b"GIF89a....").read_header(), Err(CodecError::InvalidMagic)));
        assert!(matches!(StreamReader::new(b"NDJ5D\n").read_header(), Err(CodecError::InvalidMagic)));
    }

    #[test]
    fn test_every_truncation_is_a_format_error() {
        let bytes = write(&sample_header(EntropyCoding::Huffman));
        for len in 0..bytes.len() {
            let error = StreamReader::new(&bytes[..len]).read_header().unwrap_err();
            assert_eq!(error.kind(), crate::ErrorKind::Format, "length {}: {:?}", len, error);
        }
    }

    #[test]
    fn test_invalid_fields() {
        let bytes = write(&sample_header(EntropyCoding::Cabac));
        let cases: [(usize, u8); 5] = [(30, 12), (31, 0), (32, 0), (33, 7), (35, 0x10)];
        for (offset, value) in cases {
            let mut corrupted = bytes.clone();
            corrupted[offset] = value;
            assert!(
                matches!(
                    StreamReader::new(&corrupted).read_header(),
                    Err(CodecError::InvalidHeaderField(_))
                ),
                "offset {}",
                offset
            );
        }
    }

    #[test]
    fn test_oversized_huffman_table_rejected() {
        let mut bytes = write(&sample_header(EntropyCoding::Huffman));
        let table_start = 6 + 3 * 8 + 6 + 2 * 512 + 1;
        bytes[table_start..table_start + 2].copy_from_slice(&600u16.to_be_bytes());
        assert!(matches!(
            StreamReader::new(&bytes).read_header(),
            Err(CodecError::InvalidHuffmanTable)
        ));
    }
}
