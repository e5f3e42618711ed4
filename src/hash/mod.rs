//! On-disk and in-memory hash-table data model: records, the extension
//! table, buckets, and the CRC primitives used to address them.

pub mod bucket;
pub mod crc;
pub mod extend;
pub mod record;

pub use bucket::{BucketSlot, BucketTable};
pub use crc::{Crc32cAccumulator, Crc64, crc32c_digest};
pub use extend::{ExtendHit, LiftCode};
pub use record::{ChainFilter, ChainLink, Extend, HashRecord, Hit, Interval, Opcode};
