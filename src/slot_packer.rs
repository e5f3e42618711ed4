//! Slot Packer (§4.7): place each bucket's logical records into physical
//! wrap-block slots, reserving room for chain-escape records.

use crate::config::{BUCKET_THREADS, MAX_WRAP_BYTES, RECORDS_PER_BUCKET};
use crate::error::BuildError;
use crate::hash::record::HashRecord;

/// One wrap block's packed output: physical records in slot order, plus
/// the per-slot probe distance used to decode which logical bucket each
/// physical slot belongs to (§4.7 "probe-distance side array").
pub struct PackedWrapBlock {
    pub records: Vec<HashRecord>,
    pub probe_distance: Vec<u8>,
}

/// Pack one wrap block's buckets (each a `Vec<HashRecord>` already
/// resolved by the chain/probe resolver to belong physically within this
/// block) into contiguous physical slots, distance by distance: first
/// every bucket's own slot (distance 0), then every overflow record at
/// distance 1, then distance 2, and so on, up to `MAX_PROBES`.
///
/// The last physical slot of the block is reserved for a chain-escape
/// record whenever any bucket in the block still chains out to another
/// block (§4.7 "last physical slot reservation").
pub fn pack_wrap_block(
    bucket_records: &[Vec<HashRecord>],
    needs_chain_escape: bool,
) -> Result<PackedWrapBlock, BuildError> {
    let num_buckets = bucket_records.len();
    let capacity_bytes = num_buckets * RECORDS_PER_BUCKET as usize * 8;
    if capacity_bytes > MAX_WRAP_BYTES {
        return Err(BuildError::Capacity(
            "wrap block exceeds the maximum addressable size; lower --ht-size or raise --ht-mem-limit".into(),
        ));
    }

    let max_depth = bucket_records.iter().map(|v| v.len()).max().unwrap_or(0);
    let mut records = Vec::new();
    let mut probe_distance = Vec::new();

    for distance in 0..max_depth {
        for bucket in bucket_records {
            if let Some(rec) = bucket.get(distance) {
                records.push(*rec);
                probe_distance.push(distance.min(u8::MAX as usize) as u8);
            }
        }
    }

    let reserved_slots = num_buckets * RECORDS_PER_BUCKET as usize;
    if needs_chain_escape {
        if records.len() >= reserved_slots {
            return Err(BuildError::Capacity(
                "hash table needs to be larger: no room for a chain-escape record in this wrap block".into(),
            ));
        }
        records.push(HashRecord::Empty);
        probe_distance.push(0);
    }

    if records.len() > reserved_slots {
        return Err(BuildError::Capacity(
            "hash table needs to be larger: wrap block overflowed its reserved slots".into(),
        ));
    }

    while records.len() < reserved_slots {
        records.push(HashRecord::Empty);
        probe_distance.push(0);
    }

    Ok(PackedWrapBlock { records, probe_distance })
}

/// Map a logical `(bucket_index, thread_id)` pair to its home wrap-block
/// offset, per §4.4's `BUCKET_THREAD_BITS`-wide thread striping within a
/// bucket (§4.7 "thread-local sub-bucket addressing").
pub fn thread_slot_offset(thread_id: u8) -> usize {
    (thread_id as usize) % BUCKET_THREADS as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::record::{Hit, Opcode};

    fn hit(i: u32) -> HashRecord {
        HashRecord::Hit(Hit { seed_index: i, rc: false, last_of_thread: false, extended: false, hash_bits: 0, thread_id: 0 })
    }

    #[test]
    fn packs_distance_major_order() {
        let bucket0 = vec![hit(1), hit(2)];
        let bucket1 = vec![hit(3)];
        let packed = pack_wrap_block(&[bucket0, bucket1], false).unwrap();
        // distance 0: bucket0[0], bucket1[0]; distance 1: bucket0[1]
        assert_eq!(packed.records[0].opcode(), Opcode::Hit);
        assert_eq!(packed.probe_distance, vec![0, 0, 1, 0, 0]);
    }

    #[test]
    fn reserves_last_slot_for_chain_escape() {
        let bucket0: Vec<HashRecord> = (0..8).map(hit).collect();
        let packed = pack_wrap_block(&[bucket0], true);
        assert!(packed.is_err());
    }

    #[test]
    fn oversized_wrap_block_is_a_capacity_error() {
        let huge: Vec<Vec<HashRecord>> = (0..(MAX_WRAP_BYTES / 8 + 10)).map(|_| vec![]).collect();
        assert!(pack_wrap_block(&huge, false).is_err());
    }
}
