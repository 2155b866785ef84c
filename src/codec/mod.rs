//! The block pipeline: transform, quantization, scan order, run-length
//! symbols, entropy backends and the encoder/decoder that drive them.

pub mod cabac;
pub mod dct;
pub mod decoder;
pub mod encoder;
pub mod huffman;
pub mod quantization;
pub mod run_length;
pub mod scan_decoder;
pub mod scan_encoder;
pub mod traversal;
