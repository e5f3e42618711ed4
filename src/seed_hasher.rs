//! Seed Hasher (§4.4): parallel placement of canonical-k-mer hits into
//! buckets.

use crate::config::HASH_BATCH_SIZE;
use crate::error::BuildError;
use crate::hash::bucket::BucketTable;
use crate::hash::record::{Hit, HashRecord};
use crate::hash::Crc64;
use crate::seed::{canonical_kmer, pack_kmer};
use crate::sizer::Geometry;

/// Per-chunk hashing bounds: only hits whose bucket address falls in
/// `[chunk_bucket_start, chunk_bucket_start + num_buckets)` are kept; all
/// others are discarded by this chunk's pass (§4.4 step 4).
pub struct ChunkBounds {
    pub chunk_bucket_start: u64,
    pub num_buckets: usize,
}

/// Hash every sampled seed position in `codes` and place `Hit` records
/// into `buckets`, per §4.4. `liftover_skip` returns `true` for alt-contig
/// positions that should be subsampled away (exact-match liftover
/// dedup); the default no-op keeps everything.
pub fn hash_seeds(
    codes: &[u8],
    geometry: &Geometry,
    crc: &Crc64,
    num_threads: usize,
    bounds: &ChunkBounds,
    buckets: &BucketTable,
) -> Result<(), BuildError> {
    let interval = geometry.ref_seed_interval_16ths as f64 / 16.0;
    let k = geometry.pri_seed_length.max(1);
    let n = codes.len();
    if n < k as usize {
        return Ok(());
    }
    let max_index = ((n as f64) / interval).floor() as u64;
    let anchor_mask = (1u64 << geometry.anchor_bin_bits.min(20)) - 1;

    std::thread::scope(|scope| {
        for thread_id in 0..num_threads {
            let codes = &codes;
            let buckets = &buckets;
            let crc = &crc;
            scope.spawn(move || {
                let mut i = thread_id as u64;
                let mut batch: Vec<(usize, HashRecord)> = Vec::with_capacity(HASH_BATCH_SIZE);
                while i < max_index {
                    let pos = (i as f64 * interval).floor() as usize;
                    if pos + k as usize <= n {
                        let window = &codes[pos..pos + k as usize];
                        if let Some(kmer) = pack_kmer(window, k) {
                            let canon = canonical_kmer(kmer, k);
                            let hash_key = if geometry.anchor_bin_bits > 0 {
                                (canon.value << geometry.anchor_bin_bits) | (pos as u64 & anchor_mask)
                            } else {
                                canon.value
                            };
                            let hash = crc.hash(hash_key);
                            if let Some((bucket_index, thread_slot, hash_bits)) =
                                place(hash, bounds, geometry)
                            {
                                push_hits(&mut batch, bucket_index, i as u32, canon.rc, thread_slot, hash_bits, canon.palindrome);
                            }
                        }
                    }
                    if batch.len() >= HASH_BATCH_SIZE {
                        flush(buckets, &mut batch);
                    }
                    i += num_threads as u64;
                }
                flush(buckets, &mut batch);
            });
        }
    });

    Ok(())
}

fn place(hash: u64, bounds: &ChunkBounds, geometry: &Geometry) -> Option<(usize, u8, u32)> {
    let addr_bits = geometry.table_addr_bits;
    let bucket_addr = (hash >> 19) & ((1u64 << addr_bits) - 1).max(1);
    if bucket_addr < bounds.chunk_bucket_start
        || bucket_addr >= bounds.chunk_bucket_start + bounds.num_buckets as u64
    {
        return None;
    }
    let local_index = (bucket_addr - bounds.chunk_bucket_start) as usize;
    let thread_slot = ((hash >> (19 + addr_bits)) & 0x3F) as u8;
    let hash_bits = (hash & 0x7F_FFFF) as u32;
    Some((local_index, thread_slot, hash_bits))
}

fn push_hits(
    batch: &mut Vec<(usize, HashRecord)>,
    bucket_index: usize,
    seed_index: u32,
    rc: bool,
    thread_id: u8,
    hash_bits: u32,
    palindrome: bool,
) {
    batch.push((
        bucket_index,
        HashRecord::Hit(Hit { seed_index, rc, last_of_thread: false, extended: false, hash_bits, thread_id }),
    ));
    if palindrome {
        batch.push((
            bucket_index,
            HashRecord::Hit(Hit { seed_index, rc: true, last_of_thread: false, extended: false, hash_bits, thread_id }),
        ));
    }
}

fn flush(buckets: &BucketTable, batch: &mut Vec<(usize, HashRecord)>) {
    for (idx, rec) in batch.drain(..) {
        buckets.get(idx).with_locked(|records| records.push(rec));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildConfig;
    use crate::sizer;

    fn geometry() -> Geometry {
        let config = BuildConfig::default();
        sizer::plan(&config, 100_000, 0).unwrap()
    }

    #[test]
    fn palindrome_produces_two_hits_with_same_seed_index() {
        let geometry = geometry();
        let crc = test_crc64();
        // ACGT repeated: each 4-base window is a palindrome.
        let mut codes = Vec::new();
        for _ in 0..1000 {
            codes.extend_from_slice(&[0, 1, 2, 3]);
        }
        let bounds = ChunkBounds { chunk_bucket_start: 0, num_buckets: 1 << geometry.table_addr_bits.min(20) };
        let buckets = BucketTable::new(bounds.num_buckets);
        let mut small_geom = geometry;
        small_geom.pri_seed_length = 4;
        hash_seeds(&codes, &small_geom, &crc, 2, &bounds, &buckets).unwrap();
        let mut by_seed: std::collections::HashMap<u32, Vec<bool>> = std::collections::HashMap::new();
        for bucket_i in 0..buckets.len() {
            for rec in buckets.get(bucket_i).records() {
                if let HashRecord::Hit(h) = rec {
                    by_seed.entry(h.seed_index).or_default().push(h.rc);
                }
            }
        }
        assert!(by_seed.values().any(|rcs| rcs.len() == 2));
    }

    fn test_crc64() -> Crc64 {
        Crc64::new(34, 0x1EDC_6F41)
    }
}
