//! Optional symbol preconditioning ahead of Huffman coding.
//!
//! A block's AC symbols can be passed through a Burrows-Wheeler transform, a
//! move-to-front recoding, or both (BWT first). The transformed symbols are
//! what the AC Huffman tables are built for.

pub mod bwt;
pub mod mtf;

use num_enum::TryFromPrimitive;

use crate::error::CodecError;

pub use bwt::BurrowsWheeler;
pub use mtf::MoveToFront;

/// A reversible transform of one block's symbol sequence.
pub trait SymbolTransform {
    /// Returns the transformed symbols and the BWT primary index (0 when not applicable).
    fn forward(&mut self, symbols: &[u16]) -> Result<(Vec<u16>, usize), CodecError>;

    fn inverse(&mut self, symbols: &[u16], primary_index: usize) -> Result<Vec<u16>, CodecError>;
}

/// List reordering policy applied after each move-to-front lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum MtfHeuristic {
    /// The coded symbol moves to rank 0.
    MoveToFront = 0,
    /// The coded symbol moves to rank 1, or to rank 0 if it already was at rank 1.
    MoveUpExceptFront = 1,
    /// The coded symbol swaps with its predecessor; every `FREQUENCY_THRESHOLD` hits it moves to rank 0.
    FrequencyThreshold = 2,
    /// The coded symbol moves to half its rank.
    DistanceScaled = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum Stage {
    None = 0,
    Bwt = 1,
    Mtf = 2,
    BwtMtf = 3,
}

/// Preconditioning strategy, stored in one header byte: the stage in the high
/// nibble and the move-to-front heuristic in the low nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreconditionKind {
    #[default]
    None,
    Bwt,
    Mtf(MtfHeuristic),
    BwtMtf(MtfHeuristic),
}

impl PreconditionKind {
    pub fn is_none(self) -> bool {
        self == PreconditionKind::None
    }

    pub fn uses_bwt(self) -> bool {
        matches!(self, PreconditionKind::Bwt | PreconditionKind::BwtMtf(_))
    }

    pub fn heuristic(self) -> Option<MtfHeuristic> {
        match self {
            PreconditionKind::Mtf(h) | PreconditionKind::BwtMtf(h) => Some(h),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        let (stage, heuristic) = match self {
            PreconditionKind::None => (Stage::None, 0),
            PreconditionKind::Bwt => (Stage::Bwt, 0),
            PreconditionKind::Mtf(h) => (Stage::Mtf, h as u8),
            PreconditionKind::BwtMtf(h) => (Stage::BwtMtf, h as u8),
        };
        ((stage as u8) << 4) | heuristic
    }

    pub fn from_byte(value: u8) -> Result<Self, CodecError> {
        let invalid = |_| CodecError::InvalidHeaderField("precondition");
        let stage = Stage::try_from(value >> 4).map_err(invalid)?;
        let heuristic = value & 0x0F;
        match stage {
            Stage::None | Stage::Bwt if heuristic != 0 => Err(CodecError::InvalidHeaderField("precondition")),
            Stage::None => Ok(PreconditionKind::None),
            Stage::Bwt => Ok(PreconditionKind::Bwt),
            Stage::Mtf => Ok(PreconditionKind::Mtf(
                MtfHeuristic::try_from(heuristic).map_err(|_| CodecError::InvalidHeaderField("precondition"))?,
            )),
            Stage::BwtMtf => Ok(PreconditionKind::BwtMtf(
                MtfHeuristic::try_from(heuristic).map_err(|_| CodecError::InvalidHeaderField("precondition"))?,
            )),
        }
    }
}

/// The configured transform chain for one table class.
#[derive(Debug, Clone)]
pub struct Preconditioner {
    bwt: Option<BurrowsWheeler>,
    mtf: Option<MoveToFront>,
}

impl Preconditioner {
    pub fn new(kind: PreconditionKind) -> Self {
        Self {
            bwt: kind.uses_bwt().then_some(BurrowsWheeler),
            mtf: kind.heuristic().map(MoveToFront::new),
        }
    }
}

impl SymbolTransform for Preconditioner {
    fn forward(&mut self, symbols: &[u16]) -> Result<(Vec<u16>, usize), CodecError> {
        let (mut output, primary_index) = match self.bwt.as_mut() {
            Some(bwt) => bwt.forward(symbols)?,
            None => (symbols.to_vec(), 0),
        };
        if let Some(mtf) = self.mtf.as_mut() {
            output = mtf.forward(&output)?.0;
        }
        Ok((output, primary_index))
    }

    fn inverse(&mut self, symbols: &[u16], primary_index: usize) -> Result<Vec<u16>, CodecError> {
        let restored = match self.mtf.as_mut() {
            Some(mtf) => mtf.inverse(symbols, 0)?,
            None => symbols.to_vec(),
        };
        match self.bwt.as_mut() {
            Some(bwt) => bwt.inverse(&restored, primary_index),
            None => Ok(restored),
        }
    }
}
