use thiserror::Error;

/// Coarse classification of a [`CodecError`], used by callers that only need
/// to know which stage failed (e.g. to pick a process exit status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Io,
    Range,
    Decode,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Format => 2,
            ErrorKind::Io => 3,
            ErrorKind::Range => 4,
            ErrorKind::Decode => 5,
        }
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    // Stream format errors
    #[error("Magic token not recognized")]
    InvalidMagic,
    #[error("Header is truncated")]
    TruncatedHeader,
    #[error("Invalid header field: {0}")]
    InvalidHeaderField(&'static str),
    #[error("Invalid Huffman table")]
    InvalidHuffmanTable,
    #[error("Traversal table is not a permutation")]
    InvalidTraversalTable,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    // Argument range errors
    #[error("Quality {0} outside 1..=100")]
    InvalidQuality(u32),
    #[error("Extent of axis {axis} must be non-zero")]
    ZeroExtent { axis: usize },
    #[error("Unsupported dimension count {0}")]
    UnsupportedDimensionCount(usize),
    #[error("Unsupported bits per sample {0}")]
    UnsupportedBitsPerSample(u32),
    #[error("Invalid plane count {0}")]
    InvalidPlaneCount(usize),
    #[error("Sample buffer holds {actual} samples, expected {expected}")]
    SampleCountMismatch { expected: usize, actual: usize },
    #[error("Image is too large")]
    ImageTooLarge,
    #[error("Preconditioning requires the Huffman backend")]
    PreconditionRequiresHuffman,

    // Entropy-coded payload errors
    #[error("Unmatched Huffman code")]
    UnmatchedHuffmanCode,
    #[error("Symbol has no Huffman code")]
    MissingHuffmanCode,
    #[error("Invalid coded symbol")]
    InvalidSymbol,
    #[error("Entropy-coded data ended prematurely")]
    TruncatedPayload,
    #[error("Run length overflows block")]
    RunLengthOverflow,
    #[error("Arithmetic decoder state inconsistent")]
    CabacStateInconsistent,
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::InvalidMagic
            | CodecError::TruncatedHeader
            | CodecError::InvalidHeaderField(_)
            | CodecError::InvalidHuffmanTable
            | CodecError::InvalidTraversalTable => ErrorKind::Format,
            CodecError::Io(_) => ErrorKind::Io,
            CodecError::InvalidQuality(_)
            | CodecError::ZeroExtent { .. }
            | CodecError::UnsupportedDimensionCount(_)
            | CodecError::UnsupportedBitsPerSample(_)
            | CodecError::InvalidPlaneCount(_)
            | CodecError::SampleCountMismatch { .. }
            | CodecError::ImageTooLarge
            | CodecError::PreconditionRequiresHuffman => ErrorKind::Range,
            CodecError::UnmatchedHuffmanCode
            | CodecError::MissingHuffmanCode
            | CodecError::InvalidSymbol
            | CodecError::TruncatedPayload
            | CodecError::RunLengthOverflow
            | CodecError::CabacStateInconsistent => ErrorKind::Decode,
        }
    }
}
