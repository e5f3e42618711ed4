//! Compile-time tunables shared across the build pipeline.
//!
//! Values follow the binary-header field list and the component contracts
//! in sections 3–6: addressing widths, probe/chain bounds, and table-format
//! constants that are part of the on-disk contract rather than per-build
//! options.

/// Reference positions are sampled every `refSeedInterval` bases, quantized
/// to sixteenths and capped at this value.
pub const MAX_REF_SEED_INTERVAL_16THS: u32 = 255 * 16 + 15; // 255.9375 in 1/16ths

/// Upper bound on sampled seed positions across the whole reference.
pub const MAX_SEED_INDEXES: u64 = 4_000_000_000;

/// Records per bucket (8 × 8 bytes = 64-byte bucket).
pub const RECORDS_PER_BUCKET: usize = 8;
pub const BUCKET_BYTES: usize = RECORDS_PER_BUCKET * 8;

/// Bucket-thread partition count: 6 hash bits beyond the bucket address.
pub const BUCKET_THREAD_BITS: u32 = 6;
pub const BUCKET_THREADS: usize = 1 << BUCKET_THREAD_BITS;

/// Maximum linear-probe distance before a record must be chained instead.
pub const MAX_PROBES: u32 = 8;

/// Wrap-block size bound (bytes); probing never crosses this boundary.
pub const MAX_WRAP_BYTES: usize = 1 << 15;

/// Chain-block size in buckets; chain pointers are 18-bit offsets modulo this.
pub const CHAIN_BLOCK_BUCKETS: u32 = 1 << 18;
pub const CHAIN_PTR_BITS: u32 = 18;

/// Independent chunk addressing width (bits).
pub const INDEPENDENT_ADDR_BITS: u32 = 30;

/// Extension-id space per bin.
pub const HASH_RECORD_EXT_ID_BITS: u32 = 12;

/// Short-tandem-repeat scan: periods considered.
pub const STR_MAX_PERIOD: u32 = 8;
/// Per-(period, repeatLen) decimation table width.
pub const THINNING_MAX_PERIOD: u32 = 16;

/// Extension-planner bounds.
pub const MAX_PRI_SEED_LENGTH: u32 = 64;
pub const MAX_NET_SEED_EXTENSION: u32 = 128;
pub const MAX_SEED_EXTENSION_INCR: u32 = 12;

/// Extension-table index bucketing.
pub const EXTTAB_INDEX_BUCKET_BITS: u32 = 8;
pub const EXTTAB_INDEX_BUCKET_SIZE: u32 = 1 << EXTTAB_INDEX_BUCKET_BITS;

/// Secondary CRC width cap.
pub const MAX_SEC_CRC_BITS: u32 = 48;

/// Reference alignment granularity.
pub const REF_SEQ_ALIGN_BASES: u64 = 1024;
pub const REF_SEQ_POPALT_ALIGN_BASES: u64 = 1;
pub const REF_SEQ_END_PAD_BASES: u64 = 163_840;
pub const REF_INDEX_ENTRY_BYTES: usize = 16;

/// Compressed-stream literal run-length code widths.
pub const COMP_NOLITERAL_RUN_BITS_HASH: u32 = 6;
pub const COMP_NOLITERAL_RUN_BITS_EXT: u32 = 10;

/// Binary config header size (§6).
pub const HASH_TABLE_HEADER_BYTES: usize = 512;
pub const HASH_TABLE_HEADER_VERSION: u32 = 8;

/// Maximum contigs a single build may describe.
pub const MAX_REF_SEQS: usize = 1 << 16;

/// Records materialized per bucket before batching locks (§4.4 "Batching").
pub const HASH_BATCH_SIZE: usize = 16;

/// Default number of worker threads when not overridden — mirrors the
/// teacher's `default_nb_workers`, scaled to physical cores.
pub fn default_num_threads() -> usize {
    num_cpus::get_physical().max(1)
}
