//! Bit-level hash-table compression (§4.8) and its container format and
//! parallel decompressor (§4.9).

pub mod bitio;
pub mod codec;
pub mod container;

pub use codec::{decode_buckets, encode_buckets};
pub use container::{chunk_fits_independent_addressing, read_container, write_container, Chunk};
