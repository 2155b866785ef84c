/// Side length of a block along every axis.
pub const BLOCK_SIZE: usize = 8;

/// Number of coefficients in a 2D block; the base quantization tables have this size.
pub const BLOCK_DIM_2D: usize = BLOCK_SIZE * BLOCK_SIZE;

pub const MINIMUM_QUALITY: u32 = 1;
pub const MAXIMUM_QUALITY: u32 = 100;
pub const DEFAULT_QUALITY: u8 = 75;

pub const MAXIMUM_PLANE_COUNT: usize = 255;

// Magic tokens, one per supported dimensionality.
pub const MAGIC_2D: &[u8; 6] = b"NDJ2D\n";
pub const MAGIC_3D: &[u8; 6] = b"NDJ3D\n";
pub const MAGIC_4D: &[u8; 6] = b"NDJ4D\n";
pub const MAGIC_LENGTH: usize = 6;

/// Longest Huffman code length in bits.
pub const MAX_CODE_LENGTH: usize = 16;

/// Number of distinct Huffman symbols in both the DC and AC alphabets.
pub const HUFFMAN_ALPHABET_SIZE: usize = 512;

/// Largest magnitude category; categories are stored in the low 5 bits of an AC symbol.
pub const MAX_CATEGORY: u8 = 31;

/// Longest zero run carried by a single AC symbol.
pub const MAX_SYMBOL_RUN: usize = 15;

/// AC symbol terminating a block whose remaining coefficients are zero.
pub const END_OF_BLOCK_SYMBOL: u16 = 0x000;

/// AC symbol standing for sixteen consecutive zeros.
pub const ZERO_RUN_SYMBOL: u16 = (MAX_SYMBOL_RUN as u16) << 5;

/// Number of times a symbol is hit before the frequency-threshold MTF heuristic rotates it to the front.
pub const FREQUENCY_THRESHOLD: u32 = 2;
